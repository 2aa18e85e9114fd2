//! Optional configuration pushed after a service is created or updated.
use tracing::debug;

use crate::error::ServiceManagerError;
use crate::handle::ScHandle;
use crate::native::{ConfigInfo, ScmApi};

/// Sets the description. `None` or an empty string clears it.
pub fn apply_description<A: ScmApi + ?Sized>(
    service: &ScHandle<'_, A>,
    description: Option<&str>,
) -> Result<(), ServiceManagerError> {
    apply(service, ConfigInfo::Description(description))
}

/// Sets the delayed auto-start flag. The SCM accepts it for every start
/// mode; it only has an effect for automatic services.
pub fn apply_delayed_auto_start<A: ScmApi + ?Sized>(
    service: &ScHandle<'_, A>,
    enabled: bool,
) -> Result<(), ServiceManagerError> {
    apply(service, ConfigInfo::DelayedAutoStart(enabled))
}

fn apply<A: ScmApi + ?Sized>(
    service: &ScHandle<'_, A>,
    info: ConfigInfo<'_>,
) -> Result<(), ServiceManagerError> {
    debug!("applying {}", info.operation());
    service
        .change_config2(info)
        .map_err(|source| ServiceManagerError::Configuration {
            operation: info.operation(),
            source,
        })
}
