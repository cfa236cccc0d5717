//! Error types for the SOAP client

use reqwest::StatusCode;

use crate::fault::Fault;

/// Result type alias for SOAP operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when encoding, sending or decoding a SOAP call
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The caller did not provide anything to decode the body content into
    #[error("soap: {0}")]
    Configuration(&'static str),

    /// The response is XML but not a compliant document/literal envelope
    #[error("soap: {0}")]
    Protocol(String),

    /// The request could not be serialized
    #[error("soap: {0}")]
    Encode(String),

    /// Network, TLS or HTTP level failure
    #[error("soap: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a zero-length body
    #[error("soap: body response is empty")]
    EmptyBody,

    /// HTTP 401, reported before any attempt to parse the body
    #[error("soap: unauthorized")]
    Unauthorized,

    /// The server did not answer with a SOAP envelope
    #[error("soap: {status} ({})", status.as_u16())]
    BadResponse { status: StatusCode },

    /// The cancellation token fired before the exchange completed
    #[error("soap: call cancelled")]
    Cancelled,

    /// Application-level failure reported by the remote endpoint
    #[error(transparent)]
    Fault(#[from] Fault),
}

impl Error {
    pub(crate) fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// The fault returned by the endpoint, if the call failed with one
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            Self::Fault(fault) => Some(fault),
            _ => None,
        }
    }

    /// True when the exchange itself failed: network, empty body, cancellation
    /// or a response that is not a SOAP envelope.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::EmptyBody | Self::BadResponse { .. } | Self::Cancelled
        )
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Self::Protocol(err.to_string())
    }
}

impl From<quick_xml::de::DeError> for Error {
    fn from(err: quick_xml::de::DeError) -> Self {
        Self::Protocol(err.to_string())
    }
}

impl From<quick_xml::se::SeError> for Error {
    fn from(err: quick_xml::se::SeError) -> Self {
        Self::Encode(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Encode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_messages() {
        assert_eq!(Error::EmptyBody.to_string(), "soap: body response is empty");
        assert_eq!(Error::Unauthorized.to_string(), "soap: unauthorized");
        assert_eq!(
            Error::Configuration("content destination required").to_string(),
            "soap: content destination required"
        );
    }

    #[test]
    fn test_bad_response_embeds_status_line() {
        let err = Error::BadResponse {
            status: StatusCode::INTERNAL_SERVER_ERROR,
        };
        assert_eq!(err.to_string(), "soap: 500 Internal Server Error (500)");
        assert!(err.is_transport());
        assert!(err.fault().is_none());
    }

    #[test]
    fn test_fault_is_not_transport() {
        let err = Error::from(Fault {
            text: "boom".to_string(),
            ..Default::default()
        });
        assert!(!err.is_transport());
        assert_eq!(err.fault().map(|f| f.text.as_str()), Some("boom"));
        assert_eq!(err.to_string(), "soap: boom");
    }
}
