use std::fmt;

/// Middleware return codes. The numeric values match `rcl_ret_t` so a log line
/// reads the same whichever backend produced it.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RetCode {
    Ok = 0,
    Error = 1,
    Timeout = 2,
    Unsupported = 3,
    BadAlloc = 10,
    InvalidArgument = 11,
    AlreadyInit = 100,
    NotInit = 101,
    MismatchedRmwId = 102,
    TopicNameInvalid = 103,
    ServiceNameInvalid = 104,
    UnknownSubstitution = 105,
    AlreadyShutdown = 106,
    NodeInvalid = 200,
    NodeInvalidName = 201,
    NodeInvalidNamespace = 202,
    NodeNameNonExistent = 203,
    PublisherInvalid = 300,
    SubscriptionInvalid = 400,
    SubscriptionTakeFailed = 401,
    InvalidRemapRule = 1001,
    WrongLexeme = 1002,
    InvalidRosArgs = 1003,
    InvalidParamRule = 1010,
    InvalidLogLevelRule = 1020,
}

impl RetCode {
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for RetCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A failed middleware call: the return code plus the message the library
/// attached to it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{code}' '{message}'")]
pub struct ProbeError {
    pub code: RetCode,
    pub message: String,
}

impl ProbeError {
    pub fn new(code: RetCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Wraps an error from a backend library that has no finer code than `RCL_RET_ERROR`.
    pub fn backend(err: impl fmt::Display) -> Self {
        Self::new(RetCode::Error, err.to_string())
    }
}

pub type ProbeResult<T> = Result<T, ProbeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_log_format() {
        let err = ProbeError::new(RetCode::SubscriptionTakeFailed, "no message");
        assert_eq!(err.to_string(), "'401' 'no message'");
    }

    #[test]
    fn test_codes_match_rcl() {
        assert_eq!(RetCode::Ok.code(), 0);
        assert_eq!(RetCode::NotInit.code(), 101);
        assert_eq!(RetCode::TopicNameInvalid.code(), 103);
        assert_eq!(RetCode::NodeInvalid.code(), 200);
        assert_eq!(RetCode::PublisherInvalid.code(), 300);
        assert_eq!(RetCode::SubscriptionInvalid.code(), 400);
        assert_eq!(RetCode::InvalidLogLevelRule.code(), 1020);
    }

    #[test]
    fn test_backend_wraps_as_generic_error() {
        let err = ProbeError::backend("participant creation failed");
        assert_eq!(err.code, RetCode::Error);
        assert_eq!(err.message, "participant creation failed");
    }
}
