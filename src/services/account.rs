use thiserror::Error;
use tracing::info;

use crate::{
    api::{ApiError, Backend},
    models::session::Session,
    storage::{Storage, StorageError},
};

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("Wrong username or password")]
    InvalidCredentials,

    #[error("Login failed: {0}")]
    Api(#[source] ApiError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<ApiError> for LoginError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Unauthorized => LoginError::InvalidCredentials,
            other => LoginError::Api(other),
        }
    }
}

pub struct LoginParameters {
    pub identifier: String,
    pub password: String,
}

/// Log in and remember the identity cookie for later runs
pub fn login(
    storage: &impl Storage,
    backend: &impl Backend,
    parameters: LoginParameters,
) -> Result<Session, LoginError> {
    let cookie = backend.login(&parameters.identifier, &parameters.password)?;
    // The identifier may be an email, the cookie carries the username
    let username = Session::signed_username(&cookie).unwrap_or(parameters.identifier.as_str());
    let session = Session::from_login(&cookie, username);

    storage.save(&session)?;

    info!(user = %username, "session stored");
    Ok(session)
}

pub fn logout(storage: &impl Storage) -> Result<(), StorageError> {
    storage.save(&Session::default())
}

#[derive(Debug, Error)]
pub enum WhoAmIError {
    #[error("Not logged in, log in first (redirect to /login)")]
    NotLoggedIn,

    #[error("Failed to check the login: {0}")]
    Api(#[from] ApiError),
}

/// Ask the backend whether the stored cookie is still valid
pub fn whoami(backend: &impl Backend, session: &Session) -> Result<String, WhoAmIError> {
    if session.cookie.is_none() || !backend.check_logged_in()? {
        return Err(WhoAmIError::NotLoggedIn);
    }

    session
        .viewer()
        .map(str::to_string)
        .ok_or(WhoAmIError::NotLoggedIn)
}
