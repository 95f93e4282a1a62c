//! # scenecraft-error
//!
//! Unified error handling for scenecraft - following OpenDAL's error handling practices.
//!
//! ## Design Philosophy
//!
//! - **ErrorKind**: Know what error occurred (e.g., TargetNotFound, MalformedProposal)
//! - **ErrorStatus**: Decide how to handle it (Permanent, Temporary, Persistent)
//! - **Error Context**: Assist in locating the cause with rich context
//! - **Error Source**: Wrap underlying errors without leaking raw types
//!
//! ## Usage
//!
//! ```rust
//! use scenecraft_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::MalformedProposal, "response missing 'thought' field")
//!         .with_operation("provider::propose")
//!         .with_context("model", "claude-sonnet-4-20250514"))
//! }
//! ```
//!
//! ## Principles
//!
//! - All fallible functions return `Result<T, scenecraft_error::Error>`
//! - External errors are wrapped with `set_source(err)`
//! - Same error handled once, subsequent ops only append context
//! - Don't abuse `From<OtherError>` to prevent raw error leakage
//! - Step-level command outcomes (unknown command, missing target) are data,
//!   not `Err` - their kinds exist here for reporting only

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

/// Result type alias using scenecraft Error
pub type Result<T> = std::result::Result<T, Error>;
