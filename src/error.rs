use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed challenge: {reason}")]
    MalformedChallenge { reason: String },
    #[error("no credentials, call login first")]
    MissingCredentials,
}

impl Error {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedChallenge {
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
