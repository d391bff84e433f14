use std::time::Duration;

use reqwest::{
    Method, StatusCode,
    blocking::{Client, RequestBuilder, Response},
    header::{COOKIE, SET_COOKIE},
    redirect::Policy,
};
use tracing::{debug, info};

use crate::{
    api::{ApiError, Backend, Mutation, encode, encode_path},
    models::{session::Session, vote::VotesResponse},
};

pub struct HttpBackend {
    base_url: String,
    cookie: Option<String>,
    client: Client,
}

impl HttpBackend {
    pub fn new(base_url: &str, session: &Session, timeout: Duration) -> Result<Self, ApiError> {
        // Unauthenticated requests get redirected to the login page, which
        // must not be mistaken for a successful answer
        let client = Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|e| ApiError::Network {
                url: base_url.to_string(),
                source: Box::new(e),
            })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            cookie: session.cookie.clone(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let request = self.client.request(method, url);
        match &self.cookie {
            Some(cookie) => request.header(COOKIE, cookie),
            None => request,
        }
    }

    fn execute(&self, url: &str, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().map_err(|e| ApiError::Network {
            url: url.to_string(),
            source: Box::new(e),
        })?;
        debug!(url, status = response.status().as_u16(), "backend answered");
        Ok(response)
    }
}

impl Backend for HttpBackend {
    fn get_votes(&self, user: &str, project: Option<&str>) -> Result<VotesResponse, ApiError> {
        let url = self.url(&format!(
            "/votes/{}/{}",
            encode(user),
            project.map(encode).unwrap_or_default()
        ));

        let response = self.execute(&url, self.request(Method::GET, &url))?;
        if !response.status().is_success() {
            return Err(ApiError::UserNotFound(user.to_string()));
        }

        let body = response.text().map_err(|e| ApiError::Network {
            url: url.clone(),
            source: Box::new(e),
        })?;

        serde_json::from_str(&body).map_err(|e| ApiError::Decode { url, source: e })
    }

    fn send(&self, mutation: &Mutation) -> Result<(), ApiError> {
        let url = self.url(&mutation.path());

        let mut request = self.request(Method::POST, &url);
        if let Some(body) = mutation.body() {
            request = request.body(body);
        }

        let response = self.execute(&url, request)?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ApiError::Rejected {
                url,
                status: response.status().as_u16(),
            })
        }
    }

    fn cast_vote(&self, topic: &str) -> Result<(), ApiError> {
        let url = self.url(&format!("/vote/{}", encode_path(topic)));

        // The read-more widget votes anonymously
        let response = self.execute(&url, self.client.request(Method::POST, &url))?;
        if response.status().is_success() || response.status().is_redirection() {
            Ok(())
        } else {
            Err(ApiError::Rejected {
                url,
                status: response.status().as_u16(),
            })
        }
    }

    fn check_logged_in(&self) -> Result<bool, ApiError> {
        let url = self.url("/user/loggedin");
        let response = self.execute(&url, self.request(Method::GET, &url))?;
        Ok(response.status().is_success())
    }

    fn login(&self, identifier: &str, password: &str) -> Result<String, ApiError> {
        let url = self.url("/user/login");
        let request = self
            .client
            .request(Method::POST, &url)
            .form(&[("identifier", identifier), ("password", password)]);

        let response = self.execute(&url, request)?;
        match response.status() {
            StatusCode::UNAUTHORIZED => return Err(ApiError::Unauthorized),
            status if !status.is_success() => {
                return Err(ApiError::Rejected {
                    url,
                    status: status.as_u16(),
                });
            }
            _ => {}
        }

        let cookie = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| value.split(';').next())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .collect::<Vec<_>>()
            .join("; ");

        info!(identifier, "logged in");
        Ok(cookie)
    }
}
