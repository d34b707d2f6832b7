//! Error codes for rpcerr

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The category of an error.
///
/// The set is closed and mirrors the gRPC status codes one to one, so every
/// `Code` has a wire representation and every wire code maps back to a `Code`.
/// Ordinals match the gRPC numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Code {
    /// Not an error. Permitted on an [`Error`](crate::Error) but unusual.
    #[serde(rename = "OK")]
    Ok = 0,

    /// The operation was canceled and will no longer be executed.
    Canceled = 1,

    /// An error happened but its type is not known.
    Unknown = 2,

    /// The caller passed an invalid argument.
    InvalidArgument = 3,

    /// The deadline expired before the operation could complete.
    DeadlineExceeded = 4,

    /// The requested entity was not found.
    NotFound = 5,

    /// The entity the caller tried to create already exists.
    AlreadyExists = 6,

    /// The caller lacks permission for the operation.
    PermissionDenied = 7,

    /// Some resource (quota, pages, space) has been exhausted.
    ResourceExhausted = 8,

    /// The system is not in a state required for the operation.
    FailedPrecondition = 9,

    /// The operation was aborted.
    Aborted = 10,

    /// The operation went past the valid range.
    OutOfRange = 11,

    /// The operation is declared but not implemented.
    Unimplemented = 12,

    /// An internal invariant was broken.
    Internal = 13,

    /// The service is currently unavailable.
    Unavailable = 14,

    /// Unrecoverable data loss or corruption.
    DataLoss = 15,

    /// The request lacks valid authentication credentials.
    Unauthenticated = 16,
}

impl Code {
    /// Every code, in ordinal order.
    pub const ALL: [Code; 17] = [
        Code::Ok,
        Code::Canceled,
        Code::Unknown,
        Code::InvalidArgument,
        Code::DeadlineExceeded,
        Code::NotFound,
        Code::AlreadyExists,
        Code::PermissionDenied,
        Code::ResourceExhausted,
        Code::FailedPrecondition,
        Code::Aborted,
        Code::OutOfRange,
        Code::Unimplemented,
        Code::Internal,
        Code::Unavailable,
        Code::DataLoss,
        Code::Unauthenticated,
    ];

    /// Returns the canonical CamelCase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Code::Ok => "OK",
            Code::Canceled => "Canceled",
            Code::Unknown => "Unknown",
            Code::InvalidArgument => "InvalidArgument",
            Code::DeadlineExceeded => "DeadlineExceeded",
            Code::NotFound => "NotFound",
            Code::AlreadyExists => "AlreadyExists",
            Code::PermissionDenied => "PermissionDenied",
            Code::ResourceExhausted => "ResourceExhausted",
            Code::FailedPrecondition => "FailedPrecondition",
            Code::Aborted => "Aborted",
            Code::OutOfRange => "OutOfRange",
            Code::Unimplemented => "Unimplemented",
            Code::Internal => "Internal",
            Code::Unavailable => "Unavailable",
            Code::DataLoss => "DataLoss",
            Code::Unauthenticated => "Unauthenticated",
        }
    }

    /// Reverse of [`Code::as_str`]. Unrecognized names map to `Unknown`.
    pub fn from_name(name: &str) -> Code {
        Code::ALL
            .iter()
            .copied()
            .find(|code| code.as_str() == name)
            .unwrap_or(Code::Unknown)
    }

    /// Stable numeric ordinal
    pub fn ordinal(&self) -> i32 {
        *self as i32
    }

    /// Map to the gRPC status code
    pub fn to_rpc(&self) -> tonic::Code {
        match self {
            Code::Ok => tonic::Code::Ok,
            Code::Canceled => tonic::Code::Cancelled,
            Code::Unknown => tonic::Code::Unknown,
            Code::InvalidArgument => tonic::Code::InvalidArgument,
            Code::DeadlineExceeded => tonic::Code::DeadlineExceeded,
            Code::NotFound => tonic::Code::NotFound,
            Code::AlreadyExists => tonic::Code::AlreadyExists,
            Code::PermissionDenied => tonic::Code::PermissionDenied,
            Code::ResourceExhausted => tonic::Code::ResourceExhausted,
            Code::FailedPrecondition => tonic::Code::FailedPrecondition,
            Code::Aborted => tonic::Code::Aborted,
            Code::OutOfRange => tonic::Code::OutOfRange,
            Code::Unimplemented => tonic::Code::Unimplemented,
            Code::Internal => tonic::Code::Internal,
            Code::Unavailable => tonic::Code::Unavailable,
            Code::DataLoss => tonic::Code::DataLoss,
            Code::Unauthenticated => tonic::Code::Unauthenticated,
        }
    }

    /// Map from the gRPC status code
    pub fn from_rpc(code: tonic::Code) -> Code {
        match code {
            tonic::Code::Ok => Code::Ok,
            tonic::Code::Cancelled => Code::Canceled,
            tonic::Code::Unknown => Code::Unknown,
            tonic::Code::InvalidArgument => Code::InvalidArgument,
            tonic::Code::DeadlineExceeded => Code::DeadlineExceeded,
            tonic::Code::NotFound => Code::NotFound,
            tonic::Code::AlreadyExists => Code::AlreadyExists,
            tonic::Code::PermissionDenied => Code::PermissionDenied,
            tonic::Code::ResourceExhausted => Code::ResourceExhausted,
            tonic::Code::FailedPrecondition => Code::FailedPrecondition,
            tonic::Code::Aborted => Code::Aborted,
            tonic::Code::OutOfRange => Code::OutOfRange,
            tonic::Code::Unimplemented => Code::Unimplemented,
            tonic::Code::Internal => Code::Internal,
            tonic::Code::Unavailable => Code::Unavailable,
            tonic::Code::DataLoss => Code::DataLoss,
            tonic::Code::Unauthenticated => Code::Unauthenticated,
        }
    }

    /// Map a raw wire integer. Values outside the known range become `Unknown`.
    pub fn from_rpc_i32(value: i32) -> Code {
        Code::ALL
            .iter()
            .copied()
            .find(|code| code.ordinal() == value)
            .unwrap_or(Code::Unknown)
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Returned by [`Code::from_str`] for names outside the taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCodeName(pub String);

impl fmt::Display for UnknownCodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown error code name '{}'", self.0)
    }
}

impl std::error::Error for UnknownCodeName {}

/// Strict parse, unlike [`Code::from_name`] which falls back to `Unknown`.
impl FromStr for Code {
    type Err = UnknownCodeName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Code::ALL
            .iter()
            .copied()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| UnknownCodeName(s.to_string()))
    }
}

impl From<tonic::Code> for Code {
    fn from(code: tonic::Code) -> Self {
        Code::from_rpc(code)
    }
}

impl From<Code> for tonic::Code {
    fn from(code: Code) -> Self {
        code.to_rpc()
    }
}
