use thiserror::Error;

/// Why an `Authorization` header could not be read.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("authorization header has no credentials")]
    MissingCredentials,
    #[error("unsupported authorization scheme {0}")]
    Scheme(String),
    #[error("credentials are not valid base64: {0}")]
    Base64(String),
    #[error("credentials have no ':' separator")]
    MissingSeparator,
}

impl From<base64::DecodeError> for AuthError {
    fn from(err: base64::DecodeError) -> Self {
        AuthError::Base64(err.to_string())
    }
}
