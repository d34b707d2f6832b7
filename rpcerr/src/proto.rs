//! Wire schema for rich error statuses
//!
//! A status travels as a `google.rpc.Status` ([`RpcStatus`]) whose details
//! hold one [`ErrorDetails`] per link of the error chain, packed in
//! `google.protobuf.Any`. tonic carries the encoded `RpcStatus` in the
//! `grpc-status-details-bin` trailer.
//!
//! The equivalent schema:
//!
//! ```text
//! message ErrorDetails {
//!     repeated string stack_entries = 1;
//!     string detail = 2;
//! }
//! ```

use prost::Message;
use prost_types::Any;

/// Type URL under which [`ErrorDetails`] are packed.
pub const ERROR_DETAILS_TYPE_URL: &str = "type.googleapis.com/rpcerr.ErrorDetails";

const ERROR_DETAILS_MESSAGE: &str = "ErrorDetails";

/// One link of an error chain as sent on the wire.
///
/// `detail` has the form `"Code: <Name> - Msg: <message>"`.
#[derive(Clone, PartialEq, Message)]
pub struct ErrorDetails {
    #[prost(string, repeated, tag = "1")]
    pub stack_entries: Vec<String>,
    #[prost(string, tag = "2")]
    pub detail: String,
}

/// The `google.rpc.Status` message.
#[derive(Clone, PartialEq, Message)]
pub struct RpcStatus {
    #[prost(int32, tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: String,
    #[prost(message, repeated, tag = "3")]
    pub details: Vec<Any>,
}

impl ErrorDetails {
    pub fn to_any(&self) -> Any {
        Any {
            type_url: ERROR_DETAILS_TYPE_URL.to_string(),
            value: self.encode_to_vec(),
        }
    }

    /// Unpack from an `Any`. Returns `None` for other message types or
    /// payloads that do not decode.
    pub fn from_any(any: &Any) -> Option<Self> {
        if !is_error_details_url(&any.type_url) {
            return None;
        }
        ErrorDetails::decode(any.value.as_slice()).ok()
    }
}

/// Peers may publish the message under their own proto package, so only the
/// message name is checked.
fn is_error_details_url(type_url: &str) -> bool {
    let full_name = type_url.rsplit('/').next().unwrap_or(type_url);
    let message = full_name.rsplit('.').next().unwrap_or(full_name);
    message == ERROR_DETAILS_MESSAGE
}
