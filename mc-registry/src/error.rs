use std::io::Error as IOError;

#[derive(Debug)]
pub enum Error {
    ConfigError(reqwest::Error),
    TlsConfigError(String),
    UrlParsingError(String),
    JSONParsingError(String),

    ConnectionError(String),
    IOError(IOError),
    StatusError(u16),

    ResponseLengthInvalid,
    ResponseDigestInvalid,
    PlatformNotFound(String),

    ReferenceInvalidError(String),
    DigestInvalidError,
    TagInvalidError,

    UnknownError,
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::ConfigError(e) => write!(f, "client configuration error: {}", e),
            Error::TlsConfigError(s) => write!(f, "TLS configuration error: {}", s),
            Error::UrlParsingError(s) => write!(f, "url parsing error: {}", s),
            Error::JSONParsingError(s) => write!(f, "JSON parsing error: {}", s),
            Error::ConnectionError(s) => write!(f, "connection error: {}", s),
            Error::IOError(e) => write!(f, "I/O error: {}", e),
            Error::StatusError(code) => write!(f, "registry returned HTTP status {}", code),
            Error::ResponseLengthInvalid => write!(f, "response length doesn't match Content-Length"),
            Error::ResponseDigestInvalid => write!(f, "response digest doesn't match Docker-Content-Digest"),
            Error::PlatformNotFound(s) => write!(f, "image index has no manifest for {}", s),
            Error::ReferenceInvalidError(s) => write!(f, "invalid image reference: {}", s),
            Error::DigestInvalidError => write!(f, "invalid digest"),
            Error::TagInvalidError => write!(f, "invalid tag"),
            Error::UnknownError => write!(f, "unknown error"),
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(value: url::ParseError) -> Self {
        Error::UrlParsingError(value.to_string())
    }
}

impl From<IOError> for Error {
    fn from(value: IOError) -> Self {
        Error::IOError(value)
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::JSONParsingError(value.to_string())
    }
}

impl Error {
    pub fn into_config(reqwest_error: reqwest::Error) -> Self {
        Self::ConfigError(reqwest_error)
    }
}
