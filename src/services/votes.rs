use jiff::Zoned;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    api::{ApiError, Backend},
    models::{
        dashboard::{Dashboard, distinct_projects},
        session::Session,
        vote::VotesResponse,
    },
};

/// Read the user's votes, optionally scoped to one project
pub fn fetch_votes(
    backend: &impl Backend,
    user: &str,
    project: Option<&str>,
) -> Result<VotesResponse, ApiError> {
    debug!(user, project, "fetching votes");
    let response = backend.get_votes(user, project)?;
    debug!(
        user,
        votes = response.votes.len(),
        single_voting = response.single_voting_projects.len(),
        "votes fetched"
    );
    Ok(response)
}

#[derive(Debug, Error)]
pub enum LoadVotesError {
    #[error("No user found with the name '{0}'")]
    UserNotFound(String),

    #[error("Failed to load votes: {0}")]
    Api(#[source] ApiError),
}

impl From<ApiError> for LoadVotesError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::UserNotFound(user) => LoadVotesError::UserNotFound(user),
            other => LoadVotesError::Api(other),
        }
    }
}

pub struct LoadVotesParameters {
    pub project: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadVotesSummary {
    pub projects: usize,
    pub votes: usize,
}

/// Fetch votes and render them: build the tables on first load, then fill
/// every project's table with its rows.
pub fn load_votes(
    dashboard: &mut Dashboard,
    backend: &impl Backend,
    session: &Session,
    parameters: LoadVotesParameters,
    now: &Zoned,
) -> Result<LoadVotesSummary, LoadVotesError> {
    let user = dashboard.user.clone();

    let data = match fetch_votes(backend, &user, parameters.project.as_deref()) {
        Ok(data) => data,
        Err(ApiError::UserNotFound(user)) => {
            dashboard.show_user_not_found();
            return Err(LoadVotesError::UserNotFound(user));
        }
        Err(e) => return Err(e.into()),
    };

    // TODO: group by project on the backend once the votes endpoint can return it
    let projects = distinct_projects(&data.votes);

    dashboard.build_project_tables(session, &projects, &data.single_voting_projects);

    for project in &projects {
        let rows = data
            .votes
            .iter()
            .filter(|v| &v.project_name == project)
            .cloned()
            .collect();
        dashboard.fill_table(session, project, rows, now);
    }

    info!(user = %user, projects = projects.len(), votes = data.votes.len(), "votes loaded");

    Ok(LoadVotesSummary {
        projects: projects.len(),
        votes: data.votes.len(),
    })
}

#[derive(Debug, Error)]
pub enum ReloadTableError {
    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error(transparent)]
    Load(#[from] LoadVotesError),
}

/// Reload a single table by re-fetching only its project
pub fn reload_table(
    dashboard: &mut Dashboard,
    backend: &impl Backend,
    session: &Session,
    table_id: &str,
    now: &Zoned,
) -> Result<LoadVotesSummary, ReloadTableError> {
    let project = {
        let table = dashboard
            .get_table_mut(table_id)
            .ok_or_else(|| ReloadTableError::TableNotFound(table_id.to_string()))?;
        table.reloading = true;
        table.project.clone()
    };

    let summary = load_votes(
        dashboard,
        backend,
        session,
        LoadVotesParameters {
            project: Some(project.clone()),
        },
        now,
    )
    .inspect_err(|e| warn!(table = table_id, error = %e, "reload failed"))?;

    // Every topic of the project is gone: show an empty table instead of
    // spinning forever
    if summary.projects == 0 {
        dashboard.fill_table(session, &project, vec![], now);
    }

    Ok(summary)
}

#[derive(Debug, Error)]
pub enum CastVoteError {
    #[error("Failed to send the vote: {0}")]
    Api(#[from] ApiError),
}

/// The "I want to read more" widget: one anonymous vote for a topic
pub fn cast_vote(backend: &impl Backend, topic: &str) -> Result<(), CastVoteError> {
    backend.cast_vote(topic)?;
    info!(topic, "vote cast");
    Ok(())
}
