//! Error status - whether an error is worth retrying

use std::fmt;

/// How an error should be handled by the caller.
///
/// - `Permanent`: retrying the same operation will not help
/// - `Temporary`: the operation may succeed if retried (network blips, rate limits)
/// - `Persistent`: was temporary, but retries were exhausted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorStatus {
    /// The error is not retryable
    Permanent,
    /// The error may be resolved by retrying
    Temporary,
    /// The error was retryable but retries have been exhausted
    Persistent,
}

impl ErrorStatus {
    /// Check whether the operation should be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorStatus::Temporary)
    }

    /// Transition after failed retries: temporary errors become persistent
    pub fn persist(self) -> Self {
        match self {
            ErrorStatus::Temporary => ErrorStatus::Persistent,
            other => other,
        }
    }

    /// Returns the status as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorStatus::Permanent => "permanent",
            ErrorStatus::Temporary => "temporary",
            ErrorStatus::Persistent => "persistent",
        }
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(ErrorStatus::Temporary.is_retryable());
        assert!(!ErrorStatus::Permanent.is_retryable());
        assert!(!ErrorStatus::Persistent.is_retryable());
    }

    #[test]
    fn test_persist() {
        assert_eq!(ErrorStatus::Temporary.persist(), ErrorStatus::Persistent);
        assert_eq!(ErrorStatus::Permanent.persist(), ErrorStatus::Permanent);
        assert_eq!(ErrorStatus::Persistent.persist(), ErrorStatus::Persistent);
    }
}
