//! Conversion between rich errors and RPC statuses
//!
//! Encoding walks the cause chain and attaches one [`ErrorDetails`] per link,
//! innermost cause first and the outermost error last. Decoding folds the
//! details back up in the same order, so the last entry becomes the returned
//! error and every earlier entry becomes the cause of the one after it.
//!
//! ```rust
//! use rpcerr::{Error, StatusCodec};
//!
//! let err = Error::internal_from(Error::not_found("id42"), "lookup failed");
//! let status = err.to_status().unwrap();
//! assert_eq!(status.code(), tonic::Code::Internal);
//! assert_eq!(status.message(), "lookup failed");
//!
//! let back = StatusCodec::default().decode(&status);
//! assert_eq!(back, err);
//! ```

use crate::proto::{ErrorDetails, RpcStatus};
use crate::{Cause, Code, CodecConfig, Error, StackTrace};
use bytes::Bytes;
use prost::Message;
use prost_types::Any;
use std::sync::Arc;
use tonic::Status;

const CODE_MARKER: &str = "Code: ";
const MSG_MARKER: &str = " - Msg:";

/// Encodes rich errors into [`tonic::Status`] values and back.
#[derive(Debug, Clone, Default)]
pub struct StatusCodec {
    config: CodecConfig,
}

impl StatusCodec {
    /// Create a codec with default limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec with custom limits
    pub fn with_config(config: CodecConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    // =========================================================================
    // Encoding
    // =========================================================================

    /// Encode an error and its whole cause chain into a status.
    ///
    /// The status code and message come from the outermost error alone. When
    /// the chain cannot be attached (too deep, or larger than
    /// `max_details_len`), a warning is logged and the error itself is
    /// returned as `Err`.
    pub fn encode(&self, err: &Error) -> Result<Status, Error> {
        let status = self.encode_rpc_status(err)?;
        Ok(Status::with_details(
            err.code().to_rpc(),
            err.message(),
            Bytes::from(status.encode_to_vec()),
        ))
    }

    /// Encode into the `google.rpc.Status` message carried in the status
    /// details.
    pub fn encode_rpc_status(&self, err: &Error) -> Result<RpcStatus, Error> {
        let Some(details) = self.chain_details(err) else {
            tracing::warn!(
                code = %err.code(),
                max_chain_depth = self.config.chain_depth(),
                "error chain too deep to attach to status: {}",
                err.summary()
            );
            return Err(err.clone());
        };

        let status = RpcStatus {
            code: err.code().to_rpc() as i32,
            message: err.message().to_string(),
            details,
        };

        if let Some(limit) = self.config.max_details_len {
            let len = status.encoded_len();
            if len > limit {
                tracing::warn!(
                    code = %err.code(),
                    len,
                    limit,
                    "status details rejected: {}",
                    err.summary()
                );
                return Err(err.clone());
            }
        }

        Ok(status)
    }

    /// Encode into the raw `grpc-status-details-bin` payload.
    pub fn encode_details_bytes(&self, err: &Error) -> Result<Vec<u8>, Error> {
        Ok(self.encode_rpc_status(err)?.encode_to_vec())
    }

    /// One packed entry per link, cause first. `None` when the chain is
    /// deeper than the configured limit.
    fn chain_details(&self, err: &Error) -> Option<Vec<Any>> {
        let mut entries = vec![link_details(err).to_any()];
        let mut next: Option<Cause> = err.cause().cloned();

        while let Some(cause) = next {
            if entries.len() >= self.config.chain_depth() {
                return None;
            }
            let link: Arc<Error> = cause.adopt();
            entries.push(link_details(&link).to_any());
            next = link.cause().cloned();
        }

        entries.reverse();
        Some(entries)
    }

    // =========================================================================
    // Decoding
    // =========================================================================

    /// Rebuild a rich error from a status. Never fails.
    ///
    /// The status code and message are authoritative for the outermost
    /// error. A status without recognizable details yields an error with a
    /// trace captured here, since none came over the wire.
    pub fn decode(&self, status: &Status) -> Error {
        let mut rpc = if status.details().is_empty() {
            RpcStatus::default()
        } else {
            match RpcStatus::decode(status.details()) {
                Ok(rpc) => rpc,
                Err(err) => {
                    tracing::debug!(error = %err, "ignoring undecodable status details");
                    RpcStatus::default()
                }
            }
        };
        rpc.code = status.code() as i32;
        rpc.message = status.message().to_string();
        self.decode_rpc_status(rpc)
    }

    /// Decode a raw `grpc-status-details-bin` payload on its own, taking code
    /// and message from the embedded `google.rpc.Status`.
    pub fn decode_details_bytes(&self, bytes: &[u8]) -> Error {
        match RpcStatus::decode(bytes) {
            Ok(rpc) => self.decode_rpc_status(rpc),
            Err(err) => {
                tracing::debug!(error = %err, "undecodable status details");
                Error::new(Code::Unknown, String::from_utf8_lossy(bytes).into_owned())
            }
        }
    }

    pub fn decode_rpc_status(&self, status: RpcStatus) -> Error {
        let code = Code::from_rpc_i32(status.code);

        let entries: Vec<ErrorDetails> = status
            .details
            .iter()
            .filter_map(|any| {
                let details = ErrorDetails::from_any(any);
                if details.is_none() {
                    tracing::debug!(type_url = %any.type_url, "skipping unrecognized status detail");
                }
                details
            })
            .collect();

        // Keep the outermost links when the peer sent more than we accept.
        let skip = entries.len().saturating_sub(self.config.chain_depth());

        let mut chain: Option<Error> = None;
        for entry in entries.into_iter().skip(skip) {
            let (link_code, message) = parse_detail(&entry.detail);
            let cause = chain.take().map(Cause::from);
            chain = Some(Error::from_parts(
                link_code,
                message,
                cause,
                StackTrace::from_entries(entry.stack_entries),
            ));
        }

        match chain {
            Some(mut outer) => {
                outer.set_code(code);
                outer
            }
            None => Error::new(code, status.message),
        }
    }
}

fn link_details(err: &Error) -> ErrorDetails {
    ErrorDetails {
        stack_entries: err.stack_trace().frames().to_vec(),
        detail: format_detail(err.code(), err.message()),
    }
}

/// Render the `detail` field for one link: `"Code: <Name> - Msg: <message>"`
pub fn format_detail(code: Code, message: &str) -> String {
    format!("{}{}{} {}", CODE_MARKER, code, MSG_MARKER, message)
}

/// Split a `detail` field into code and message.
///
/// Text without the `"Code: "` and `" - Msg:"` markers is taken whole as the
/// message, with code `Unknown`. Unrecognized code names also map to
/// `Unknown`.
pub fn parse_detail(detail: &str) -> (Code, String) {
    let Some(code_at) = detail.find(CODE_MARKER) else {
        return (Code::Unknown, detail.to_string());
    };
    let name_start = code_at + CODE_MARKER.len();
    let Some(name_len) = detail[name_start..].find(MSG_MARKER) else {
        return (Code::Unknown, detail.to_string());
    };

    let name = &detail[name_start..name_start + name_len];
    let rest = &detail[name_start + name_len + MSG_MARKER.len()..];
    let message = rest.strip_prefix(' ').unwrap_or(rest);
    (Code::from_name(name), message.to_string())
}

// =============================================================================
// Conveniences on Error
// =============================================================================

impl Error {
    /// Encode with the default codec
    pub fn to_status(&self) -> Result<Status, Error> {
        StatusCodec::default().encode(self)
    }

    /// Decode with the default codec
    pub fn from_status(status: &Status) -> Error {
        StatusCodec::default().decode(status)
    }
}

/// Lets handlers return rich errors with `?`. If the chain cannot be
/// attached, the status still carries the outermost code and message.
impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err.to_status() {
            Ok(status) => status,
            Err(err) => Status::new(err.code().to_rpc(), err.message()),
        }
    }
}

impl From<Status> for Error {
    fn from(status: Status) -> Self {
        Error::from_status(&status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::fmt;

    #[derive(Debug)]
    struct Raw(&'static str);

    impl fmt::Display for Raw {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.0)
        }
    }

    impl std::error::Error for Raw {}

    fn details_of(status: &Status) -> Vec<ErrorDetails> {
        RpcStatus::decode(status.details())
            .unwrap()
            .details
            .iter()
            .filter_map(ErrorDetails::from_any)
            .collect()
    }

    #[test]
    fn test_encode_decode_leaf() {
        let err = Error::internal("oops");
        let status = err.to_status().unwrap();
        assert_eq!(status.code(), tonic::Code::Internal);
        assert_eq!(status.message(), "oops");

        let decoded = Error::from_status(&status);
        assert_eq!(decoded.code(), Code::Internal);
        assert_eq!(decoded.message(), "oops");
        assert!(decoded.cause().is_none());
        assert_eq!(decoded, err);
    }

    #[test]
    fn test_encode_decode_chain() {
        let err = Error::internal_from(
            Error::not_found_from(Error::canceled("c"), "nf"),
            "int",
        );
        let decoded = Error::from_status(&err.to_status().unwrap());

        let links: Vec<(Code, &str)> = decoded.chain().map(|e| (e.code(), e.message())).collect();
        assert_eq!(
            links,
            vec![(Code::Internal, "int"), (Code::NotFound, "nf"), (Code::Canceled, "c")]
        );
        for (got, want) in decoded.chain().zip(err.chain()) {
            assert_eq!(got.stack_trace(), want.stack_trace());
        }
        assert_eq!(decoded, err);
    }

    #[test]
    fn test_details_are_cause_first() {
        let err = Error::internal_from(
            Error::not_found_from(Error::canceled("c"), "nf"),
            "int",
        );
        let details = details_of(&err.to_status().unwrap());
        let texts: Vec<&str> = details.iter().map(|d| d.detail.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "Code: Canceled - Msg: c",
                "Code: NotFound - Msg: nf",
                "Code: Internal - Msg: int",
            ]
        );
        assert_eq!(details[2].stack_entries, err.stack_trace().frames());
    }

    #[test]
    fn test_plain_tail_collapses_to_unknown() {
        let err = Error::internal_from(
            Error::not_found_from(Cause::from_error(Raw("raw")), "not found"),
            "internal error",
        );
        let decoded = Error::from_status(&err.to_status().unwrap());

        let links: Vec<&Error> = decoded.chain().collect();
        assert_eq!(links.len(), 3);
        assert_eq!(links[0].code(), Code::Internal);
        assert_eq!(links[1].code(), Code::NotFound);
        assert_eq!(links[2].code(), Code::Unknown);
        assert_eq!(links[2].message(), "raw");
        assert!(!links[2].stack_trace().is_empty());
        assert!(links[2].cause().is_none());
    }

    #[test]
    fn test_status_cause_is_adopted() {
        let err = Error::internal_from(Status::aborted("new error"), "internal error");
        let decoded = Error::from_status(&err.to_status().unwrap());
        let inner = decoded.rich_cause().unwrap();
        assert_eq!(inner.code(), Code::Unknown);
        assert!(inner.message().contains("new error"));
    }

    #[test]
    fn test_decode_without_details() {
        let status = Status::not_found("id was not found");
        let decoded = Error::from_status(&status);
        assert_eq!(decoded.code(), Code::NotFound);
        assert_eq!(decoded.message(), "id was not found");
        assert!(decoded.cause().is_none());
        assert!(!decoded.stack_trace().is_empty());

        let again = decoded.to_status().unwrap();
        assert_eq!(again.code(), status.code());
        assert_eq!(again.message(), status.message());
    }

    #[test]
    fn test_wire_code_wins_for_outermost() {
        let rpc = RpcStatus {
            code: Code::Unavailable.ordinal(),
            message: "down".to_string(),
            details: vec![ErrorDetails {
                stack_entries: vec![],
                detail: format_detail(Code::Internal, "down"),
            }
            .to_any()],
        };
        let decoded = StatusCodec::new().decode_rpc_status(rpc);
        assert_eq!(decoded.code(), Code::Unavailable);
        assert_eq!(decoded.message(), "down");
    }

    #[test]
    fn test_unrecognized_wire_code_is_unknown() {
        let rpc = RpcStatus {
            code: 42,
            message: "strange".to_string(),
            details: vec![],
        };
        let decoded = StatusCodec::new().decode_rpc_status(rpc);
        assert_eq!(decoded.code(), Code::Unknown);
        assert_eq!(decoded.message(), "strange");
    }

    #[test]
    fn test_garbage_details_degrade() {
        let status = Status::with_details(
            tonic::Code::Internal,
            "broken",
            Bytes::from_static(&[0xff, 0x01, 0x02]),
        );
        let decoded = Error::from_status(&status);
        assert_eq!(decoded.code(), Code::Internal);
        assert_eq!(decoded.message(), "broken");
        assert!(decoded.cause().is_none());

        let decoded = StatusCodec::new().decode_details_bytes(&[0xff, 0x01]);
        assert_eq!(decoded.code(), Code::Unknown);
    }

    #[test]
    fn test_foreign_details_are_skipped() {
        let rpc = RpcStatus {
            code: Code::Aborted.ordinal(),
            message: "halt".to_string(),
            details: vec![
                Any {
                    type_url: "type.googleapis.com/google.rpc.RetryInfo".to_string(),
                    value: vec![],
                },
                ErrorDetails {
                    stack_entries: vec!["a.rs:1 - a\n".to_string()],
                    detail: format_detail(Code::Aborted, "halt"),
                }
                .to_any(),
            ],
        };
        let decoded = StatusCodec::new().decode_rpc_status(rpc);
        assert_eq!(decoded.code(), Code::Aborted);
        assert!(decoded.cause().is_none());
        assert_eq!(decoded.stack_trace().frames(), ["a.rs:1 - a\n".to_string()]);
    }

    #[test]
    fn test_parse_detail() {
        assert_eq!(
            parse_detail("Code: NotFound - Msg: missing id42"),
            (Code::NotFound, "missing id42".to_string())
        );
        assert_eq!(
            parse_detail("Code: NotFound - Msg: a - Msg: b"),
            (Code::NotFound, "a - Msg: b".to_string())
        );
        assert_eq!(
            parse_detail("Code: Bogus - Msg: whatever"),
            (Code::Unknown, "whatever".to_string())
        );
        assert_eq!(
            parse_detail("Code: Internal - Msg:"),
            (Code::Internal, String::new())
        );
    }

    #[test]
    fn test_parse_detail_without_markers() {
        assert_eq!(
            parse_detail("just some text"),
            (Code::Unknown, "just some text".to_string())
        );
        assert_eq!(
            parse_detail("Code: Internal but no message marker"),
            (Code::Unknown, "Code: Internal but no message marker".to_string())
        );
    }

    #[test]
    fn test_chain_depth_limit_on_encode() {
        let codec = StatusCodec::with_config(CodecConfig::default().with_max_chain_depth(2));
        let err = Error::internal_from(
            Error::not_found_from(Error::canceled("c"), "nf"),
            "int",
        );
        let rejected = codec.encode(&err).unwrap_err();
        assert_eq!(rejected, err);

        let shallow = Error::internal_from(Error::canceled("c"), "int");
        assert!(codec.encode(&shallow).is_ok());
    }

    #[test]
    fn test_chain_depth_limit_on_decode() {
        let err = Error::internal_from(
            Error::not_found_from(Error::canceled("c"), "nf"),
            "int",
        );
        let status = err.to_status().unwrap();
        let codec = StatusCodec::with_config(CodecConfig::default().with_max_chain_depth(2));
        let decoded = codec.decode(&status);
        let codes: Vec<Code> = decoded.chain().map(Error::code).collect();
        assert_eq!(codes, vec![Code::Internal, Code::NotFound]);
    }

    #[test]
    fn test_zero_depth_config_keeps_wire_trace() {
        let config: CodecConfig = serde_json::from_str(r#"{"max_chain_depth": 0}"#).unwrap();
        let codec = StatusCodec::with_config(config);
        let err = Error::internal("leaf");
        let decoded = codec.decode(&codec.encode(&err).unwrap());
        assert_eq!(decoded.stack_trace(), err.stack_trace());
        assert_eq!(decoded, err);

        let codec = StatusCodec::with_config(CodecConfig {
            max_chain_depth: 0,
            max_details_len: None,
        });
        let decoded = codec.decode(&codec.encode(&err).unwrap());
        assert_eq!(decoded, err);
    }

    #[test]
    fn test_oversize_details_rejected() {
        let codec = StatusCodec::with_config(CodecConfig::default().with_max_details_len(16));
        let err = Error::internal("this error carries a full stack trace");
        let rejected = codec.encode(&err).unwrap_err();
        assert_eq!(rejected, err);

        let status: Status = err.clone().into();
        assert_eq!(status.code(), tonic::Code::Internal);
    }

    #[test]
    fn test_details_bytes_round_trip() {
        let codec = StatusCodec::new();
        let err = Error::data_loss_from(Error::out_of_range("offset 9000"), "segment truncated");
        let bytes = codec.encode_details_bytes(&err).unwrap();
        assert_eq!(codec.decode_details_bytes(&bytes), err);
    }

    #[test]
    fn test_status_conversions() {
        let err = Error::permission_denied_from(Error::unauthenticated("no token"), "denied");
        let status: Status = err.clone().into();
        assert_eq!(status.code(), tonic::Code::PermissionDenied);

        let back: Error = status.into();
        assert_eq!(back, err);
    }

    #[test]
    fn test_ok_code_round_trips() {
        let err = Error::new(Code::Ok, "fine");
        let decoded = Error::from_status(&err.to_status().unwrap());
        assert_eq!(decoded.code(), Code::Ok);
        assert_eq!(decoded.message(), "fine");
    }

    fn build_chain(links: &[(usize, String)]) -> Error {
        let mut iter = links.iter().rev();
        let (code, message) = iter.next().unwrap();
        let mut err = Error::new(Code::ALL[*code], message.clone());
        for (code, message) in iter {
            err = Error::with_cause(Code::ALL[*code], err, message.clone());
        }
        err
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_chain_round_trip(links in prop::collection::vec((0usize..17, ".*"), 1..6)) {
            let err = build_chain(&links);
            let decoded = Error::from_status(&err.to_status().unwrap());

            prop_assert_eq!(decoded.chain().count(), links.len());
            for (got, want) in decoded.chain().zip(err.chain()) {
                prop_assert_eq!(got.code(), want.code());
                prop_assert_eq!(got.message(), want.message());
                prop_assert_eq!(got.stack_trace(), want.stack_trace());
            }
        }
    }
}
