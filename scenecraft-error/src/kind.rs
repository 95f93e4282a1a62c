//! Error kinds for scenecraft operations

use std::fmt;

/// The kind of error that occurred.
///
/// This enum categorizes errors to help callers write clear handling logic.
/// The agent loop matches on ErrorKind to decide whether a condition is
/// step-level (recorded against one thought entry) or loop-terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // General errors
    // =========================================================================
    /// An unexpected error occurred - catch-all for unhandled cases
    Unexpected,

    /// Invalid configuration or parameters
    ConfigInvalid,

    // =========================================================================
    // Session start preconditions
    // =========================================================================
    /// The scene store has not been initialized
    SceneNotReady,

    /// No credits remain to spend on commands
    CreditsExhausted,

    // =========================================================================
    // Step-level command errors (recorded, loop continues)
    // =========================================================================
    /// The proposed action is not in the supported command set
    UnknownCommand,

    /// The command referenced an entity that does not exist or is not addressable
    TargetNotFound,

    /// Command parameters failed validation (e.g. non-finite coordinates)
    InvalidParams,

    // =========================================================================
    // Proposal/transport errors
    // =========================================================================
    /// The model response was unparseable or structurally incomplete
    MalformedProposal,

    /// An in-flight proposal call was cancelled by an explicit stop
    TransportAborted,

    /// Network error reaching the proposal endpoint
    NetworkFailed,

    /// The proposal endpoint returned an error status
    ApiFailed,

    /// Rate limit exceeded at the proposal endpoint
    RateLimited,

    /// Authentication with the proposal endpoint failed
    AuthenticationFailed,

    // =========================================================================
    // Loop safety
    // =========================================================================
    /// The session reached the hard ceiling on accepted commands
    SafetyLimitReached,

    // =========================================================================
    // IO errors
    // =========================================================================
    /// File not found
    FileNotFound,

    /// Permission denied
    PermissionDenied,

    /// IO operation failed
    IoFailed,

    /// Persisted state (credit ledger) operation failed
    StorageFailed,

    // =========================================================================
    // Parse errors
    // =========================================================================
    /// Failed to parse input
    ParseFailed,

    /// Serialization/deserialization failed
    SerializationFailed,

    /// Invalid argument passed to function
    InvalidArgument,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            // General
            ErrorKind::Unexpected => "Unexpected",
            ErrorKind::ConfigInvalid => "ConfigInvalid",

            // Preconditions
            ErrorKind::SceneNotReady => "SceneNotReady",
            ErrorKind::CreditsExhausted => "CreditsExhausted",

            // Step-level
            ErrorKind::UnknownCommand => "UnknownCommand",
            ErrorKind::TargetNotFound => "TargetNotFound",
            ErrorKind::InvalidParams => "InvalidParams",

            // Proposal/transport
            ErrorKind::MalformedProposal => "MalformedProposal",
            ErrorKind::TransportAborted => "TransportAborted",
            ErrorKind::NetworkFailed => "NetworkFailed",
            ErrorKind::ApiFailed => "ApiFailed",
            ErrorKind::RateLimited => "RateLimited",
            ErrorKind::AuthenticationFailed => "AuthenticationFailed",

            // Loop safety
            ErrorKind::SafetyLimitReached => "SafetyLimitReached",

            // IO
            ErrorKind::FileNotFound => "FileNotFound",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::IoFailed => "IoFailed",
            ErrorKind::StorageFailed => "StorageFailed",

            // Parse
            ErrorKind::ParseFailed => "ParseFailed",
            ErrorKind::SerializationFailed => "SerializationFailed",
            ErrorKind::InvalidArgument => "InvalidArgument",
        }
    }

    /// Check if this error kind is retryable by default
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::NetworkFailed | ErrorKind::RateLimited)
    }

    /// Check if this error kind is recorded against a single thought entry
    /// rather than terminating the loop
    pub fn is_step_level(&self) -> bool {
        matches!(
            self,
            ErrorKind::UnknownCommand | ErrorKind::TargetNotFound | ErrorKind::InvalidParams
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::TargetNotFound.to_string(), "TargetNotFound");
        assert_eq!(ErrorKind::MalformedProposal.to_string(), "MalformedProposal");
    }

    #[test]
    fn test_is_retryable() {
        assert!(ErrorKind::NetworkFailed.is_retryable());
        assert!(ErrorKind::RateLimited.is_retryable());
        assert!(!ErrorKind::TargetNotFound.is_retryable());
        assert!(!ErrorKind::SafetyLimitReached.is_retryable());
    }

    #[test]
    fn test_is_step_level() {
        assert!(ErrorKind::UnknownCommand.is_step_level());
        assert!(ErrorKind::TargetNotFound.is_step_level());
        assert!(!ErrorKind::CreditsExhausted.is_step_level());
        assert!(!ErrorKind::MalformedProposal.is_step_level());
    }
}
