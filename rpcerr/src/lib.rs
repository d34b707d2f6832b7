//! # rpcerr
//!
//! Rich, chainable errors that survive the trip through a gRPC status.
//!
//! ## Design Philosophy
//!
//! - **Code**: What category of error occurred, one to one with gRPC codes
//! - **Message**: What happened, formatted once at construction
//! - **Cause**: Which error led to this one, rich or plain
//! - **StackTrace**: Where the error was built, captured eagerly
//!
//! ## Usage
//!
//! ```rust
//! use rpcerr::{rpc_error, Code, Error};
//!
//! fn load(id: &str) -> rpcerr::Result<()> {
//!     Err(rpc_error!(Code::NotFound, "record '{}' not found", id))
//! }
//!
//! fn handler() -> Result<(), tonic::Status> {
//!     load("id42").map_err(|e| Error::internal_from(e, "load failed"))?;
//!     Ok(())
//! }
//!
//! let status = handler().unwrap_err();
//! let err = Error::from_status(&status);
//! assert_eq!(err.to_string(), "[Internal] load failed caused by [NotFound] record 'id42' not found");
//! ```
//!
//! ## Principles
//!
//! - Errors are immutable; wrapping shares the cause instead of copying it
//! - The whole chain travels in the status details, innermost cause first
//! - Decoding never fails; anything unrecognized becomes `Unknown`

mod code;
mod codec;
mod config;
mod error;
pub mod proto;
mod stack;

pub use code::{Code, UnknownCodeName};
pub use codec::{format_detail, parse_detail, StatusCodec};
pub use config::CodecConfig;
pub use error::{Cause, Chain, Error};
pub use stack::{StackTrace, MAX_FRAMES};

/// Result type alias using rpcerr Error
pub type Result<T> = std::result::Result<T, Error>;
