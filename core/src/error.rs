use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Stable classification of [`Error`], for boundary layers that map failures
/// to user-visible responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidRequest,
    UnknownUser,
    UnknownCalorie,
    UserAlreadyExists,
    NotAllowed,
    InitialAdminRole,
    InvalidCredentials,
    Internal,
}

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or incomplete input, including filter expressions that fail to parse.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("user not found")]
    UnknownUser,
    #[error("calorie entry not found")]
    UnknownCalorie,
    #[error("user already exists")]
    UserAlreadyExists,
    #[error("not allowed")]
    NotAllowed,
    /// Attempted removal or role change of the bootstrap admin.
    #[error("the initial admin account cannot be removed or have its role changed")]
    InitialAdminRole,
    #[error("wrong username or password")]
    InvalidCredentials,
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("credential hashing failed: {0}")]
    Credential(String),
}

impl Error {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::UnknownUser => ErrorKind::UnknownUser,
            Self::UnknownCalorie => ErrorKind::UnknownCalorie,
            Self::UserAlreadyExists => ErrorKind::UserAlreadyExists,
            Self::NotAllowed => ErrorKind::NotAllowed,
            Self::InitialAdminRole => ErrorKind::InitialAdminRole,
            Self::InvalidCredentials => ErrorKind::InvalidCredentials,
            Self::Storage(_) | Self::Credential(_) => ErrorKind::Internal,
        }
    }

    #[must_use]
    pub fn is_internal(&self) -> bool {
        self.kind() == ErrorKind::Internal
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }
}
