//! The rich Error type for rpcerr

use crate::{Code, StackTrace};
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// A categorized error with a message, an optional cause and the stack trace
/// of the place it was built.
///
/// This error type provides:
/// - `code`: The category, aligned with gRPC status codes
/// - `message`: Human-readable description, already formatted
/// - `cause`: The error this one wraps (if any), rich or plain
/// - `stack`: Frames captured at construction
///
/// Errors are immutable once built. Wrapping shares the cause through an
/// `Arc`, so several errors may wrap the same cause without copying it.
///
/// # Example
///
/// ```rust
/// use rpcerr::{rpc_error, Code, Error};
///
/// let missing = Error::not_found("record 'id42' not found");
/// let err = rpc_error!(Code::Aborted, from = missing, "cannot continue after {} attempts", 3);
///
/// assert_eq!(err.code(), Code::Aborted);
/// assert_eq!(
///     err.to_string(),
///     "[Aborted] cannot continue after 3 attempts caused by [NotFound] record 'id42' not found"
/// );
/// ```
#[derive(Clone)]
pub struct Error {
    code: Code,
    message: String,
    cause: Option<Cause>,
    stack: StackTrace,
}

/// What an [`Error`] wraps: another rich error or any other error value.
#[derive(Clone)]
pub enum Cause {
    Rich(Arc<Error>),
    Plain(Arc<anyhow::Error>),
}

impl Error {
    /// Create a new error with the given code and message
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
            stack: StackTrace::capture(),
        }
    }

    /// Create a new error caused by another one
    pub fn with_cause(code: Code, cause: impl Into<Cause>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: Some(cause.into()),
            stack: StackTrace::capture(),
        }
    }

    /// Assemble an error without capturing a trace. Used when rebuilding
    /// errors received from the wire.
    pub(crate) fn from_parts(
        code: Code,
        message: String,
        cause: Option<Cause>,
        stack: StackTrace,
    ) -> Self {
        Self {
            code,
            message,
            cause,
            stack,
        }
    }

    pub(crate) fn set_code(&mut self, code: Code) {
        self.code = code;
    }

    /// Coerce any error into a rich one.
    ///
    /// A rich error is returned unchanged. Anything else becomes an `Unknown`
    /// error whose message is the original's text, with no cause and a trace
    /// captured here.
    pub fn adopt<E>(err: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        match err.into().downcast::<Error>() {
            Ok(rich) => rich,
            Err(plain) => Self::new(Code::Unknown, plain.to_string()),
        }
    }

    // =========================================================================
    // Getters
    // =========================================================================

    /// Get the error code
    pub fn code(&self) -> Code {
        self.code
    }

    /// Get the message, without code or cause
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the cause (if any)
    pub fn cause(&self) -> Option<&Cause> {
        self.cause.as_ref()
    }

    /// Get the cause if it is a rich error
    pub fn rich_cause(&self) -> Option<&Error> {
        self.cause.as_ref().and_then(Cause::as_rich)
    }

    /// Get the captured stack trace
    pub fn stack_trace(&self) -> &StackTrace {
        &self.stack
    }

    /// The error and its rich causes, outermost first. Stops at the first
    /// plain cause.
    pub fn chain(&self) -> Chain<'_> {
        Chain { next: Some(self) }
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// One-line form `"[Code] message"`, ignoring the cause
    pub fn summary(&self) -> String {
        format!("[{}] {}", self.code, self.message)
    }

    /// Multi-line dump of the whole chain with every captured frame.
    ///
    /// Plain causes have no trace; they are rendered with their text and a
    /// `<stack trace no available>` marker.
    pub fn stack_chain(&self) -> String {
        let mut out = String::new();
        let mut current = self;
        loop {
            out.push_str(&current.summary());
            out.push('\n');
            out.push_str(&current.stack.to_string());

            match &current.cause {
                None => break,
                Some(Cause::Rich(next)) => {
                    out.push_str("Caused by ");
                    current = &**next;
                }
                Some(Cause::Plain(plain)) => {
                    out.push_str("Caused by ");
                    out.push_str(&plain.to_string());
                    out.push('\n');
                    out.push_str(" <stack trace no available>");
                    break;
                }
            }
        }
        out
    }
}

/// Iterator returned by [`Error::chain`].
pub struct Chain<'a> {
    next: Option<&'a Error>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a Error;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.rich_cause();
        Some(current)
    }
}

// =============================================================================
// Cause
// =============================================================================

impl Cause {
    /// Wrap any error value, recognizing rich errors behind it
    pub fn from_error<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::from(anyhow::Error::new(err))
    }

    pub fn as_rich(&self) -> Option<&Error> {
        match self {
            Cause::Rich(err) => Some(&**err),
            Cause::Plain(_) => None,
        }
    }

    pub fn is_rich(&self) -> bool {
        matches!(self, Cause::Rich(_))
    }

    /// The cause as a rich error, adopting plain causes.
    pub fn adopt(&self) -> Arc<Error> {
        match self {
            Cause::Rich(err) => Arc::clone(err),
            Cause::Plain(plain) => Arc::new(Error::new(Code::Unknown, plain.to_string())),
        }
    }

    fn as_std(&self) -> &(dyn StdError + 'static) {
        match self {
            Cause::Rich(err) => &**err,
            Cause::Plain(plain) => {
                let inner: &(dyn StdError + Send + Sync + 'static) = &***plain;
                inner
            }
        }
    }
}

impl From<Error> for Cause {
    fn from(err: Error) -> Self {
        Cause::Rich(Arc::new(err))
    }
}

impl From<Arc<Error>> for Cause {
    fn from(err: Arc<Error>) -> Self {
        Cause::Rich(err)
    }
}

impl From<anyhow::Error> for Cause {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<Error>() {
            Ok(rich) => Cause::Rich(Arc::new(rich)),
            Err(plain) => Cause::Plain(Arc::new(plain)),
        }
    }
}

impl From<tonic::Status> for Cause {
    fn from(status: tonic::Status) -> Self {
        Cause::Plain(Arc::new(anyhow::Error::new(status)))
    }
}

impl From<std::io::Error> for Cause {
    fn from(err: std::io::Error) -> Self {
        Cause::Plain(Arc::new(anyhow::Error::new(err)))
    }
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cause::Rich(err) => fmt::Display::fmt(err, f),
            Cause::Plain(plain) => write!(f, "{}", plain),
        }
    }
}

impl fmt::Debug for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cause::Rich(err) => f.debug_tuple("Rich").field(&err.summary()).finish(),
            Cause::Plain(plain) => f.debug_tuple("Plain").field(&plain.to_string()).finish(),
        }
    }
}

// Plain causes carry no structure, so their text is all there is to compare.
impl PartialEq for Cause {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Cause::Rich(a), Cause::Rich(b)) => Arc::ptr_eq(a, b) || a == b,
            (Cause::Plain(a), Cause::Plain(b)) => {
                Arc::ptr_eq(a, b) || a.to_string() == b.to_string()
            }
            _ => false,
        }
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
            && self.message == other.message
            && self.stack == other.stack
            && self.cause == other.cause
    }
}

// =============================================================================
// Display - chained, single-line format for logs
// =============================================================================

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, " caused by {}", cause)?;
        }
        Ok(())
    }
}

// =============================================================================
// Debug - verbose, multi-line format with stack traces
// =============================================================================

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stack_chain())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause.as_ref().map(Cause::as_std)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let code = match err.kind() {
            std::io::ErrorKind::NotFound => Code::NotFound,
            std::io::ErrorKind::PermissionDenied => Code::PermissionDenied,
            std::io::ErrorKind::AlreadyExists => Code::AlreadyExists,
            std::io::ErrorKind::InvalidInput => Code::InvalidArgument,
            std::io::ErrorKind::TimedOut => Code::DeadlineExceeded,
            std::io::ErrorKind::Interrupted => Code::Canceled,
            std::io::ErrorKind::UnexpectedEof => Code::OutOfRange,
            _ => Code::Unknown,
        };
        let message = format!("i/o operation failed: {}", err.kind());
        Error::with_cause(code, err, message)
    }
}

// =============================================================================
// Per-code constructors
// =============================================================================

macro_rules! code_constructors {
    ($($code:ident => $new:ident, $from:ident;)*) => {
        impl Error {
            $(
                #[doc = concat!("Create a `", stringify!($code), "` error")]
                pub fn $new(message: impl Into<String>) -> Self {
                    Self::new(Code::$code, message)
                }

                #[doc = concat!("Create a `", stringify!($code), "` error caused by another one")]
                pub fn $from(cause: impl Into<Cause>, message: impl Into<String>) -> Self {
                    Self::with_cause(Code::$code, cause, message)
                }
            )*
        }
    };
}

code_constructors! {
    Canceled => canceled, canceled_from;
    Unknown => unknown, unknown_from;
    InvalidArgument => invalid_argument, invalid_argument_from;
    DeadlineExceeded => deadline_exceeded, deadline_exceeded_from;
    NotFound => not_found, not_found_from;
    AlreadyExists => already_exists, already_exists_from;
    PermissionDenied => permission_denied, permission_denied_from;
    ResourceExhausted => resource_exhausted, resource_exhausted_from;
    FailedPrecondition => failed_precondition, failed_precondition_from;
    Aborted => aborted, aborted_from;
    OutOfRange => out_of_range, out_of_range_from;
    Unimplemented => unimplemented, unimplemented_from;
    Internal => internal, internal_from;
    Unavailable => unavailable, unavailable_from;
    DataLoss => data_loss, data_loss_from;
    Unauthenticated => unauthenticated, unauthenticated_from;
}

/// Build an [`Error`] from a format string.
///
/// ```rust
/// use rpcerr::{rpc_error, Code};
///
/// let leaf = rpc_error!(Code::NotFound, "missing {}", "id42");
/// assert_eq!(leaf.summary(), "[NotFound] missing id42");
///
/// let wrapped = rpc_error!(Code::Internal, from = leaf, "lookup failed");
/// assert_eq!(wrapped.rich_cause().map(|c| c.code()), Some(Code::NotFound));
/// ```
#[macro_export]
macro_rules! rpc_error {
    ($code:expr, from = $cause:expr, $($arg:tt)+) => {
        $crate::Error::with_cause($code, $cause, ::std::format!($($arg)+))
    };
    ($code:expr, $($arg:tt)+) => {
        $crate::Error::new($code, ::std::format!($($arg)+))
    };
}
