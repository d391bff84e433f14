use thiserror::Error;

use crate::models::vote::VotesResponse;

#[cfg(test)]
pub mod fake;
pub mod http;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("No user found with the name '{0}'")]
    UserNotFound(String),

    #[error("Request to '{url}' failed: {source}")]
    Network {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to decode the response from '{url}': {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("The backend refused the credentials")]
    Unauthorized,

    #[error("The backend answered '{url}' with status {status}")]
    Rejected { url: String, status: u16 },
}

impl ApiError {
    /// Transport problems may go away on a second attempt, answers won't
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Network { .. })
    }
}

/// A state change sent to the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    SetHidden {
        user: String,
        project: String,
        topic: String,
        hidden: bool,
    },
    Delete {
        user: String,
        project: String,
        topic: String,
    },
    SingleVoting {
        project: String,
        enabled: bool,
    },
}

impl Mutation {
    /// Request path of the POST, with every segment percent-encoded
    pub fn path(&self) -> String {
        match self {
            Mutation::SetHidden {
                user,
                project,
                topic,
                ..
            } => format!(
                "/votes/hidden/{}/{}/{}",
                encode(user),
                encode(project),
                encode(topic)
            ),
            Mutation::Delete {
                user,
                project,
                topic,
            } => format!(
                "/votes/delete/{}/{}/{}",
                encode(user),
                encode(project),
                encode(topic)
            ),
            Mutation::SingleVoting { enabled: true, .. } => {
                "/user/single_voting_project/add".to_string()
            }
            Mutation::SingleVoting { enabled: false, .. } => {
                "/user/single_voting_project/remove".to_string()
            }
        }
    }

    /// Raw request body, if the endpoint takes one
    pub fn body(&self) -> Option<String> {
        match self {
            Mutation::SetHidden { hidden, .. } => {
                Some(if *hidden { "1" } else { "0" }.to_string())
            }
            Mutation::Delete { .. } => None,
            Mutation::SingleVoting { project, .. } => Some(project.clone()),
        }
    }
}

/// Percent-encode a single path segment
pub fn encode(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

/// Percent-encode a path that may contain `/` separators (vote topics are
/// written as `user/project/topic`)
pub fn encode_path(path: &str) -> String {
    path.split('/').map(encode).collect::<Vec<_>>().join("/")
}

/// HTTP contract of the votes backend
pub trait Backend {
    /// `GET /votes/{user}/{project?}`
    fn get_votes(&self, user: &str, project: Option<&str>) -> Result<VotesResponse, ApiError>;

    /// POST one mutation; the response body is ignored
    fn send(&self, mutation: &Mutation) -> Result<(), ApiError>;

    /// `POST /vote/{topic}`
    fn cast_vote(&self, topic: &str) -> Result<(), ApiError>;

    /// `GET /user/loggedin`
    fn check_logged_in(&self) -> Result<bool, ApiError>;

    /// `POST /user/login`, returning the session cookie
    fn login(&self, identifier: &str, password: &str) -> Result<String, ApiError>;
}
