use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;

/// Code reported for failures raised by the client itself (bad configuration,
/// transport construction) rather than by the remote peer.
pub const LOCAL_ERROR_CODE: i32 = -1;

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Error related to invalid client configuration
    Validation,
    /// Error constructing a transport for the composed URL
    Connection,
    /// Error reported by an established (or establishing) WebSocket
    WebSocket,
    /// Internal error from dependencies
    Internal,
}

#[derive(Debug)]
pub struct Error {
    kind: Kind,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    backtrace: Backtrace,
}

impl Error {
    pub fn with_source<S: StdError + Send + Sync + 'static>(kind: Kind, source: S) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
            backtrace: Backtrace::capture(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    #[must_use]
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    #[must_use]
    pub fn inner(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    #[must_use]
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        let e = self.source.as_deref()?;
        e.downcast_ref::<E>()
    }

    /// Numeric code handed to error callbacks.
    ///
    /// Failures raised locally carry [`LOCAL_ERROR_CODE`]; errors surfaced by the
    /// socket itself have no code.
    #[must_use]
    pub fn code(&self) -> Option<i32> {
        match self.kind {
            Kind::Validation | Kind::Connection => Some(LOCAL_ERROR_CODE),
            Kind::WebSocket | Kind::Internal => None,
        }
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Validation {
            reason: message.into(),
        }
        .into()
    }

    pub fn connection<S: Into<String>>(message: S) -> Self {
        Connection {
            reason: message.into(),
        }
        .into()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(src) => write!(f, "{:?}: {}", self.kind, src),
            None => write!(f, "{:?}", self.kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

/// Configuration rejected before any network action was attempted.
#[non_exhaustive]
#[derive(Debug)]
pub struct Validation {
    pub reason: String,
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

impl StdError for Validation {}

/// A transport could not be created for the composed URL.
#[non_exhaustive]
#[derive(Debug)]
pub struct Connection {
    pub reason: String,
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

impl StdError for Connection {}

impl From<Validation> for Error {
    fn from(err: Validation) -> Self {
        Error::with_source(Kind::Validation, err)
    }
}

impl From<Connection> for Error {
    fn from(err: Connection) -> Self {
        Error::with_source(Kind::Connection, err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::with_source(Kind::Internal, e)
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::with_source(Kind::Connection, e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display_is_the_bare_reason() {
        let error = Error::validation("url can not be empty");

        assert_eq!(error.kind(), Kind::Validation);
        assert_eq!(error.code(), Some(LOCAL_ERROR_CODE));
        assert_eq!(
            error.downcast_ref::<Validation>().map(ToString::to_string),
            Some("url can not be empty".to_owned()),
            "validation reason should survive the round trip through Error"
        );
        assert_eq!(error.to_string(), "Validation: url can not be empty");
    }

    #[test]
    fn connection_errors_carry_local_code() {
        let error = Error::connection("unsupported scheme");

        assert_eq!(error.kind(), Kind::Connection);
        assert_eq!(error.code(), Some(-1));
    }

    #[test]
    fn url_parse_errors_are_connection_errors() {
        let parse = url::Url::parse("not a url").unwrap_err();
        let error: Error = parse.into();

        assert_eq!(error.kind(), Kind::Connection);
        assert!(error.downcast_ref::<url::ParseError>().is_some(), "source should be kept");
    }

    #[test]
    fn internal_errors_have_no_code() {
        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: Error = json.into();

        assert_eq!(error.kind(), Kind::Internal);
        assert_eq!(error.code(), None);
    }
}
