//! Error taxonomy for the ingestion library.
//!
//! Every fallible operation in this crate returns [`Error`]. The variants
//! mirror the taxonomy callers need to pattern-match on: malformed
//! configuration, builder misuse, name validation, array shape, protocol
//! version mismatches, authentication, transport I/O, and non-retriable
//! server responses.
//!
//! # Examples
//!
//! ```rust
//! use ilp_sender::error::Error;
//!
//! let err = Error::invalid_name("table name contains a forbidden character");
//! assert!(matches!(err, Error::InvalidName(_)));
//! assert_eq!(
//!     err.to_string(),
//!     "invalid name: table name contains a forbidden character"
//! );
//! ```

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// The error taxonomy of the ingestion library.
///
/// Retriable-vs-terminal is deliberately not its own variant: it's a
/// classification of the existing variants, not a distinct failure mode
/// callers pattern-match against. [`Error::is_retriable`] exposes that
/// classification as a method instead, used internally by
/// [`crate::sender::retry`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configuration string was malformed or named an unknown property.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// A scheme/key combination that the scheme does not support
    /// (e.g. an HTTP-only key on a `tcp` configuration).
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// A table, symbol or column name violated the character or length
    /// rules for identifiers.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// The builder was used out of order: two `table` calls, a `symbol`
    /// after a column, `commit` outside a transaction, and so on.
    #[error("invalid api call: {0}")]
    InvalidApiCall(String),

    /// A binary array's declared shape didn't match its element count, or a
    /// dimension overflowed `u32`.
    #[error("invalid array shape: {0}")]
    InvalidArrayShape(String),

    /// A typed column is unsupported by the negotiated or configured
    /// protocol version.
    #[error("protocol version error: {0}")]
    ProtocolVersion(String),

    /// The TCP ECDSA challenge/response exchange was rejected, or the HTTP
    /// server returned 401/403.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// An I/O failure writing to or reading from a transport.
    #[error("socket error: {0}")]
    Socket(String),

    /// The HTTP transport itself failed (connect, TLS, request build).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// A non-retriable server response, carrying whatever detail the
    /// server supplied in its JSON error body.
    #[error(
        "Server Response (\n\tCode: `{code}`\n\tMessage: `{message}`\n\tLine: `{line}`\n\tErrorId: `{error_id}` \n)"
    )]
    ServerFlush {
        code: String,
        message: String,
        line: String,
        error_id: String,
    },
}

impl Error {
    pub fn config_parse(msg: impl Into<String>) -> Self {
        Self::ConfigParse(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    pub fn invalid_name(msg: impl Into<String>) -> Self {
        Self::InvalidName(msg.into())
    }

    pub fn invalid_api_call(msg: impl Into<String>) -> Self {
        Self::InvalidApiCall(msg.into())
    }

    pub fn invalid_array_shape(msg: impl Into<String>) -> Self {
        Self::InvalidArrayShape(msg.into())
    }

    pub fn protocol_version(msg: impl Into<String>) -> Self {
        Self::ProtocolVersion(msg.into())
    }

    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    pub fn socket(msg: impl Into<String>) -> Self {
        Self::Socket(msg.into())
    }

    pub fn server_flush(
        code: Option<String>,
        message: impl Into<String>,
        line: Option<u64>,
        error_id: Option<String>,
    ) -> Self {
        Self::ServerFlush {
            code: code.unwrap_or_default(),
            message: message.into(),
            line: line.map(|l| l.to_string()).unwrap_or_default(),
            error_id: error_id.unwrap_or_default(),
        }
    }

    /// Classifies whether a flush attempt that produced this error should
    /// be retried by [`crate::sender::retry`].
    ///
    /// `status` is the HTTP status code when the error originated from an
    /// HTTP response; `None` for socket-level errors.
    pub fn is_retriable(&self, status: Option<u16>) -> bool {
        match self {
            Error::Socket(_) => true,
            Error::Http(e) => {
                if e.is_connect() || e.is_timeout() {
                    return true;
                }
                matches!(status, Some(500 | 503 | 504 | 507 | 509 | 523 | 524))
            }
            Error::Authentication(_)
            | Error::InvalidApiCall(_)
            | Error::ConfigParse(_)
            | Error::Unsupported(_)
            | Error::InvalidName(_)
            | Error::InvalidArrayShape(_)
            | Error::ProtocolVersion(_)
            | Error::ServerFlush { .. } => false,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Socket(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_produce_matching_variants() {
        assert!(matches!(Error::config_parse("x"), Error::ConfigParse(_)));
        assert!(matches!(Error::invalid_name("x"), Error::InvalidName(_)));
        assert!(matches!(
            Error::invalid_api_call("x"),
            Error::InvalidApiCall(_)
        ));
        assert!(matches!(
            Error::invalid_array_shape("x"),
            Error::InvalidArrayShape(_)
        ));
        assert!(matches!(
            Error::protocol_version("x"),
            Error::ProtocolVersion(_)
        ));
        assert!(matches!(
            Error::authentication("x"),
            Error::Authentication(_)
        ));
        assert!(matches!(Error::socket("x"), Error::Socket(_)));
    }

    #[test]
    fn server_flush_message_has_the_expected_shape() {
        let err = Error::server_flush(
            Some("invalid".into()),
            "table not found",
            Some(12),
            Some("abc-123".into()),
        );
        let rendered = err.to_string();
        assert!(rendered.contains("Code: `invalid`"));
        assert!(rendered.contains("Message: `table not found`"));
        assert!(rendered.contains("Line: `12`"));
        assert!(rendered.contains("ErrorId: `abc-123`"));
    }

    #[test]
    fn retriability_matches_taxonomy() {
        assert!(Error::socket("broken pipe").is_retriable(None));
        assert!(!Error::authentication("bad user").is_retriable(Some(401)));
        assert!(!Error::invalid_api_call("x").is_retriable(None));
        assert!(Error::socket("x").is_retriable(Some(503)));
    }

    #[test]
    fn terminal_statuses_are_not_retriable() {
        let err = Error::server_flush(None, "bad request", None, None);
        assert!(!err.is_retriable(Some(400)));
        assert!(!err.is_retriable(Some(401)));
        assert!(!err.is_retriable(Some(403)));
    }
}
