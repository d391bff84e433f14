use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    io,
};

use crate::{
    api::{ApiError, Backend, Mutation},
    models::vote::{VoteRecord, VotesResponse},
};

/// In-memory backend for service tests
#[derive(Default)]
pub struct FakeBackend {
    pub votes: RefCell<HashMap<String, Vec<VoteRecord>>>,
    pub single_voting_projects: RefCell<Vec<String>>,
    pub sent: RefCell<Vec<Mutation>>,
    pub attempts: Cell<usize>,
    /// Number of upcoming calls that fail with a transport error
    pub failures: Cell<usize>,
    /// Status used to refuse every mutation
    pub reject_with: Cell<Option<u16>>,
    pub logged_in: Cell<bool>,
    pub cast: RefCell<Vec<String>>,
}

impl FakeBackend {
    pub fn with_votes(user: &str, votes: Vec<VoteRecord>) -> Self {
        let backend = Self::default();
        backend.votes.borrow_mut().insert(user.to_string(), votes);
        backend
    }

    fn network_failure(&self, url: &str) -> Option<ApiError> {
        let failures = self.failures.get();
        if failures == 0 {
            return None;
        }
        self.failures.set(failures - 1);
        Some(ApiError::Network {
            url: url.to_string(),
            source: Box::new(io::Error::new(io::ErrorKind::ConnectionRefused, "refused")),
        })
    }
}

impl Backend for FakeBackend {
    fn get_votes(&self, user: &str, project: Option<&str>) -> Result<VotesResponse, ApiError> {
        if let Some(error) = self.network_failure("/votes") {
            return Err(error);
        }

        let votes = self.votes.borrow();
        let user_votes = votes
            .get(user)
            .ok_or_else(|| ApiError::UserNotFound(user.to_string()))?;

        Ok(VotesResponse {
            votes: user_votes
                .iter()
                .filter(|v| project.is_none_or(|p| v.project_name == p))
                .cloned()
                .collect(),
            single_voting_projects: self.single_voting_projects.borrow().clone(),
        })
    }

    fn send(&self, mutation: &Mutation) -> Result<(), ApiError> {
        self.attempts.set(self.attempts.get() + 1);

        if let Some(error) = self.network_failure(&mutation.path()) {
            return Err(error);
        }
        if let Some(status) = self.reject_with.get() {
            return Err(ApiError::Rejected {
                url: mutation.path(),
                status,
            });
        }

        self.sent.borrow_mut().push(mutation.clone());
        Ok(())
    }

    fn cast_vote(&self, topic: &str) -> Result<(), ApiError> {
        if let Some(error) = self.network_failure("/vote") {
            return Err(error);
        }
        self.cast.borrow_mut().push(topic.to_string());
        Ok(())
    }

    fn check_logged_in(&self) -> Result<bool, ApiError> {
        Ok(self.logged_in.get())
    }

    fn login(&self, identifier: &str, password: &str) -> Result<String, ApiError> {
        if password == "secret" {
            // Emails resolve to their local part
            let username = identifier.split_once('@').map_or(identifier, |(name, _)| name);
            Ok(format!("user={}&signature=fake", username))
        } else {
            Err(ApiError::Unauthorized)
        }
    }
}
