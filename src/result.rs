//! Structured outcome of every mutating or control operation.
use std::{error::Error, fmt, sync::Arc};

use strum_macros::{AsRefStr, Display, EnumString};

/// Opaque failure detail attached to a failed [`OpResult`].
pub type FailureCause = Arc<dyn Error + Send + Sync + 'static>;

/// Short symbolic code of an [`OpResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultCode {
    Ok,
    /// The service could not be resolved.
    NotInstalled,
    /// A native call failed with an OS error code.
    #[strum(serialize = "WIN32_ERROR")]
    Win32Error,
    /// The status wait ran out of time.
    Timeout,
    /// Cooperative cancellation was observed.
    Canceled,
    /// Anything not classified above.
    Error,
}

/// Result of an operation against the SCM.
///
/// A successful result always carries [`ResultCode::Ok`] and no cause; the
/// constructors are the only way to build one.
#[derive(Clone)]
pub struct OpResult {
    success: bool,
    code: ResultCode,
    message: String,
    failure_cause: Option<FailureCause>,
}

impl OpResult {
    /// A successful result with a custom message.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            code: ResultCode::Ok,
            message: message.into(),
            failure_cause: None,
        }
    }

    /// A failed result without a cause.
    pub fn fail(code: ResultCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            code,
            message: message.into(),
            failure_cause: None,
        }
    }

    /// A failed result carrying the error that produced it.
    pub fn fail_with<E>(code: ResultCode, message: impl Into<String>, cause: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self::fail_with_cause(code, message, Arc::new(cause))
    }

    /// A failed result sharing an already wrapped cause.
    pub fn fail_with_cause(
        code: ResultCode,
        message: impl Into<String>,
        cause: FailureCause,
    ) -> Self {
        Self {
            success: false,
            code,
            message: message.into(),
            failure_cause: Some(cause),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn code(&self) -> ResultCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn failure_cause(&self) -> Option<&FailureCause> {
        self.failure_cause.as_ref()
    }
}

impl Default for OpResult {
    fn default() -> Self {
        Self::ok("OK")
    }
}

/// Causes compare by identity, not by content.
impl PartialEq for OpResult {
    fn eq(&self, other: &Self) -> bool {
        let same_cause = match (&self.failure_cause, &other.failure_cause) {
            (None, None) => true,
            (Some(left), Some(right)) => Arc::ptr_eq(left, right),
            _ => false,
        };

        self.success == other.success
            && self.code == other.code
            && self.message == other.message
            && same_cause
    }
}

impl Eq for OpResult {}

impl fmt::Debug for OpResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpResult")
            .field("success", &self.success)
            .field("code", &self.code)
            .field("message", &self.message)
            .field(
                "failure_cause",
                &self.failure_cause.as_ref().map(|cause| cause.to_string()),
            )
            .finish()
    }
}

impl fmt::Display for OpResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}
