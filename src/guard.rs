//! Precondition checks run before any native call.
use crate::error::ServiceManagerError;
use crate::native::ScmApi;

/// Fails when the backend has no Service Control Manager to talk to.
pub fn ensure_platform_supported<A: ScmApi + ?Sized>(
    api: &A,
) -> Result<(), ServiceManagerError> {
    if api.is_supported() {
        Ok(())
    } else {
        Err(ServiceManagerError::PlatformUnsupported)
    }
}

/// Fails when `value` is empty or whitespace only.
pub fn require_non_blank(value: &str, field: &str) -> Result<(), ServiceManagerError> {
    if value.trim().is_empty() {
        return Err(ServiceManagerError::InvalidArgument {
            field: field.to_string(),
        });
    }
    Ok(())
}
