use reqwest::{Method, StatusCode};
use url::{ParseError, Url};

/// Failure class of a [`WhepClientError`]. Transport and protocol errors
/// abort signaling, engine errors abort negotiation; all three are fatal
/// to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Protocol,
    Engine,
}

#[derive(Debug, thiserror::Error)]
pub enum WhepClientError {
    #[error("Bad status in response Status: {status} Body:\n{body}")]
    BadStatus {
        method: Method,
        status: StatusCode,
        body: String,
    },

    #[error("Request failed! Method: {0} URL: {1}")]
    RequestFailed(Method, Url, #[source] reqwest::Error),

    #[error("Failed to read {0} response body: {1}")]
    BodyReadError(&'static str, reqwest::Error),

    #[error(
        "Unable to get location header, check correctness of the WHEP endpoint and your bearer token"
    )]
    MissingLocationHeader,

    #[error("Invalid location header: {1}")]
    InvalidLocationHeader(#[source] ParseError, String),

    #[error("Invalid endpoint URL: {1}")]
    InvalidEndpointUrl(#[source] ParseError, String),

    #[error("Failed to parse the remote SDP offer: {0}")]
    InvalidSdpOffer(webrtc::Error),

    #[error("Failed to set remote description: {0}")]
    RemoteDescriptionError(webrtc::Error),

    #[error("Failed to create answer: {0}")]
    AnswerCreationError(webrtc::Error),

    #[error("Engine produced no usable answer description")]
    NoAnswerGenerated,

    #[error("Failed to set local description: {0}")]
    LocalDescriptionError(webrtc::Error),

    #[error("Engine shut down before requesting negotiation")]
    EngineClosed,

    #[error(transparent)]
    PeerConnectionInitError(#[from] webrtc::Error),
}

impl WhepClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BadStatus { .. } | Self::RequestFailed(..) | Self::BodyReadError(..) => {
                ErrorKind::Transport
            }
            Self::MissingLocationHeader
            | Self::InvalidLocationHeader(..)
            | Self::InvalidEndpointUrl(..)
            | Self::InvalidSdpOffer(..) => ErrorKind::Protocol,
            Self::RemoteDescriptionError(..)
            | Self::AnswerCreationError(..)
            | Self::NoAnswerGenerated
            | Self::LocalDescriptionError(..)
            | Self::EngineClosed
            | Self::PeerConnectionInitError(..) => ErrorKind::Engine,
        }
    }
}

/// Failure while wiring a media pad into the playback chain. The only
/// recoverable error class: it is logged and does not terminate the
/// session.
#[derive(Debug, thiserror::Error)]
pub enum PipelineLinkError {
    #[error("Media pad is already linked, multiple tracks are not supported")]
    AlreadyLinked,

    #[error("Cannot link media pad, unsupported codec: {0}")]
    UnsupportedCodec(String),
}
