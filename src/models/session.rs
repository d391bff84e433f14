use serde::{Deserialize, Serialize};

/// Name of the cookie pair carrying the viewer's username
pub const IDENTITY_COOKIE: &str = "loggedinuser";

/// Explicit view context: who is looking at the dashboard.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct Session {
    /// Raw `Cookie` header value sent with every request
    pub cookie: Option<String>,
}

impl Session {
    pub fn with_cookie(cookie: impl Into<String>) -> Self {
        Self {
            cookie: Some(cookie.into()),
        }
    }

    /// Build the cookie stored after a successful login
    pub fn from_login(auth_cookie: &str, username: &str) -> Self {
        let auth_cookie = auth_cookie.trim();
        if auth_cookie.is_empty() {
            Self::with_cookie(format!("{}={}", IDENTITY_COOKIE, username))
        } else {
            Self::with_cookie(format!("{}; {}={}", auth_cookie, IDENTITY_COOKIE, username))
        }
    }

    /// Username signed into the backend's `user=<name>&signature=..` cookie
    pub fn signed_username(auth_cookie: &str) -> Option<&str> {
        auth_cookie
            .split(';')
            .map(str::trim)
            .find_map(|pair| pair.strip_prefix("user="))
            .map(|value| value.split_once('&').map_or(value, |(user, _)| user))
            .filter(|user| !user.is_empty())
    }

    /// The cookie's value suffix is the username of the viewer
    pub fn viewer(&self) -> Option<&str> {
        self.cookie
            .as_deref()
            .and_then(|cookie| cookie.rsplit_once('='))
            .map(|(_, user)| user)
            .filter(|user| !user.is_empty())
    }

    pub fn is_owner(&self, user: &str) -> bool {
        !user.is_empty()
            && self
                .cookie
                .as_deref()
                .is_some_and(|cookie| cookie.ends_with(&format!("={}", user)))
    }
}
