use std::collections::VecDeque;

use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    api::{Backend, Mutation},
    models::{
        dashboard::{Dashboard, MenuAction, MenuError},
        session::Session,
    },
};

/// How many times a mutation is sent before it is given up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { attempts: 3 }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    pub delivered: usize,
    pub dropped: usize,
}

/// Outgoing mutations. The view-model is updated before a command is queued
/// and is never rolled back: a dropped command leaves the dashboard out of
/// sync with the backend until the next reload.
#[derive(Debug, Default)]
pub struct MutationQueue {
    pending: VecDeque<Mutation>,
    policy: RetryPolicy,
}

impl MutationQueue {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            pending: VecDeque::new(),
            policy,
        }
    }

    pub fn push(&mut self, mutation: Mutation) {
        self.pending.push_back(mutation);
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Send everything queued. Transport errors are retried within the
    /// budget, answers from the backend are final.
    pub fn flush(&mut self, backend: &impl Backend) -> FlushReport {
        let mut report = FlushReport::default();
        let attempts = self.policy.attempts.max(1);
        debug!(pending = self.pending.len(), attempts, "flushing mutations");

        while let Some(mutation) = self.pending.pop_front() {
            for attempt in 1..=attempts {
                match backend.send(&mutation) {
                    Ok(()) => {
                        debug!(path = %mutation.path(), attempt, "mutation delivered");
                        report.delivered += 1;
                        break;
                    }
                    Err(e) if e.is_transient() && attempt < attempts => {
                        debug!(path = %mutation.path(), attempt, error = %e, "retrying mutation");
                    }
                    Err(e) => {
                        warn!(path = %mutation.path(), attempt, error = %e, "mutation dropped");
                        report.dropped += 1;
                        break;
                    }
                }
            }
        }

        report
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum MutationError {
    #[error("No configuration menu is open")]
    NoOpenMenu,

    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Topic '{0}' not found")]
    RowNotFound(String),

    #[error("Topic '{0}' can only be changed by the owner of the dashboard")]
    NotConfigurable(String),

    #[error("{0:?} is not offered for this topic")]
    ActionUnavailable(MenuAction),

    #[error("Only the owner of the dashboard can change single voting for '{0}'")]
    NotOwner(String),
}

impl From<MenuError> for MutationError {
    fn from(error: MenuError) -> Self {
        match error {
            MenuError::TableNotFound(id) => MutationError::TableNotFound(id),
            MenuError::RowNotFound(topic) => MutationError::RowNotFound(topic),
            MenuError::NotConfigurable(topic) => MutationError::NotConfigurable(topic),
        }
    }
}

/// Run an entry of the open configuration menu: hide, show or delete the
/// row right away, close the menu and send the change.
pub fn apply_menu_action(
    dashboard: &mut Dashboard,
    queue: &mut MutationQueue,
    backend: &impl Backend,
    action: MenuAction,
) -> Result<FlushReport, MutationError> {
    let menu = dashboard.open_menu_view().ok_or(MutationError::NoOpenMenu)?;
    if !menu.actions.contains(&action) {
        return Err(MutationError::ActionUnavailable(action));
    }

    let user = dashboard.user.clone();
    let table = dashboard
        .get_table_mut(&menu.table_id)
        .ok_or_else(|| MutationError::TableNotFound(menu.table_id.clone()))?;
    let project = table.project.clone();

    let mutation = match action {
        MenuAction::Hide | MenuAction::Show => {
            let hidden = action == MenuAction::Hide;
            let row = table
                .get_row_mut(&menu.topic)
                .ok_or_else(|| MutationError::RowNotFound(menu.topic.clone()))?;
            row.hidden = hidden;
            Mutation::SetHidden {
                user,
                project,
                topic: menu.topic.clone(),
                hidden,
            }
        }
        MenuAction::Delete => {
            table.remove_row(&menu.topic);
            Mutation::Delete {
                user,
                project,
                topic: menu.topic.clone(),
            }
        }
    };

    dashboard.click_page();

    queue.push(mutation);
    Ok(queue.flush(backend))
}

/// Open the row's menu and pick an action in one step
pub fn apply_row_action(
    dashboard: &mut Dashboard,
    queue: &mut MutationQueue,
    backend: &impl Backend,
    table_id: &str,
    topic: &str,
    action: MenuAction,
) -> Result<FlushReport, MutationError> {
    if dashboard.open_menu_view().is_none_or(|menu| menu.table_id != table_id || menu.topic != topic) {
        dashboard.toggle_menu(table_id, topic)?;
    }
    apply_menu_action(dashboard, queue, backend, action)
}

/// Flip the table's single-voting checkbox and tell the backend
pub fn set_single_voting(
    dashboard: &mut Dashboard,
    queue: &mut MutationQueue,
    backend: &impl Backend,
    session: &Session,
    table_id: &str,
    enabled: bool,
) -> Result<FlushReport, MutationError> {
    if !session.is_owner(&dashboard.user) {
        return Err(MutationError::NotOwner(table_id.to_string()));
    }

    let table = dashboard
        .get_table_mut(table_id)
        .ok_or_else(|| MutationError::TableNotFound(table_id.to_string()))?;
    table.single_voting = enabled;

    queue.push(Mutation::SingleVoting {
        project: table.project.clone(),
        enabled,
    });
    Ok(queue.flush(backend))
}

/// Local "show hidden" / "hide hidden" switch, never sent to the backend
pub fn set_show_hidden(
    dashboard: &mut Dashboard,
    table_id: &str,
    show: bool,
) -> Result<(), MutationError> {
    let table = dashboard
        .get_table_mut(table_id)
        .ok_or_else(|| MutationError::TableNotFound(table_id.to_string()))?;
    table.show_hidden = show;
    Ok(())
}

/// Queue and send a single mutation outside of a dashboard
pub fn submit(
    queue: &mut MutationQueue,
    backend: &impl Backend,
    mutation: Mutation,
) -> FlushReport {
    queue.push(mutation);
    queue.flush(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::fake::FakeBackend,
        models::vote::VoteRecord,
        services::votes::{LoadVotesParameters, load_votes},
    };
    use jiff::Zoned;

    fn now() -> Zoned {
        "2026-03-15T14:30:00Z"
            .parse::<jiff::Timestamp>()
            .unwrap()
            .to_zoned(jiff::tz::TimeZone::UTC)
    }

    fn owner() -> Session {
        Session::with_cookie("user=alice&sig=x; loggedinuser=alice")
    }

    fn vote(topic: &str, vote_count: u64, hidden: bool) -> VoteRecord {
        VoteRecord {
            project_name: "blog".into(),
            topic: topic.into(),
            vote_count,
            last_vote: 1_773_500_000,
            hidden,
        }
    }

    fn loaded(backend: &FakeBackend, session: &Session) -> Dashboard {
        let mut dashboard = Dashboard::new("alice");
        load_votes(
            &mut dashboard,
            backend,
            session,
            LoadVotesParameters { project: None },
            &now(),
        )
        .unwrap();
        dashboard
    }

    #[test]
    fn test_hide_applies_before_the_backend_answers() {
        let backend = FakeBackend::with_votes("alice", vec![vote("rust", 3, false), vote("go", 1, false)]);
        let mut dashboard = loaded(&backend, &owner());
        // Every attempt fails: the row must stay hidden anyway
        backend.failures.set(10);
        let mut queue = MutationQueue::new(RetryPolicy { attempts: 2 });

        dashboard.toggle_menu("table-blog", "rust").unwrap();
        let report = apply_menu_action(&mut dashboard, &mut queue, &backend, MenuAction::Hide).unwrap();

        let table = dashboard.get_table("table-blog").unwrap();
        assert!(table.get_row("rust").unwrap().hidden);
        assert_eq!(table.visible_rows().count(), 1);
        assert_eq!(report, FlushReport { delivered: 0, dropped: 1 });
        assert_eq!(backend.attempts.get(), 2);
        assert!(dashboard.open_menu_view().is_none());
    }

    #[test]
    fn test_hide_then_show_sends_flags() {
        let backend = FakeBackend::with_votes("alice", vec![vote("rust", 3, false)]);
        let mut dashboard = loaded(&backend, &owner());
        let mut queue = MutationQueue::default();

        apply_row_action(&mut dashboard, &mut queue, &backend, "table-blog", "rust", MenuAction::Hide).unwrap();
        apply_row_action(&mut dashboard, &mut queue, &backend, "table-blog", "rust", MenuAction::Show).unwrap();

        let sent = backend.sent.borrow();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].body().as_deref(), Some("1"));
        assert_eq!(sent[1].body().as_deref(), Some("0"));
        assert_eq!(sent[1].path(), "/votes/hidden/alice/blog/rust");
        assert!(!dashboard.get_table("table-blog").unwrap().get_row("rust").unwrap().hidden);
    }

    #[test]
    fn test_menu_offers_show_only_for_hidden_rows() {
        let backend = FakeBackend::with_votes("alice", vec![vote("rust", 3, true)]);
        let mut dashboard = loaded(&backend, &owner());
        let mut queue = MutationQueue::default();

        dashboard.toggle_menu("table-blog", "rust").unwrap();
        let result = apply_menu_action(&mut dashboard, &mut queue, &backend, MenuAction::Hide);

        assert_eq!(result, Err(MutationError::ActionUnavailable(MenuAction::Hide)));
        assert!(backend.sent.borrow().is_empty());
    }

    #[test]
    fn test_delete_removes_row_even_when_rejected() {
        let backend = FakeBackend::with_votes("alice", vec![vote("rust", 3, false), vote("go", 1, false)]);
        let mut dashboard = loaded(&backend, &owner());
        backend.reject_with.set(Some(500));
        let mut queue = MutationQueue::default();

        let report =
            apply_row_action(&mut dashboard, &mut queue, &backend, "table-blog", "go", MenuAction::Delete)
                .unwrap();

        // Rejections are not retried
        assert_eq!(backend.attempts.get(), 1);
        assert_eq!(report.dropped, 1);
        let table = dashboard.get_table("table-blog").unwrap();
        assert!(table.get_row("go").is_none());
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn test_transient_failure_is_retried() {
        let backend = FakeBackend::default();
        backend.failures.set(2);
        let mut queue = MutationQueue::new(RetryPolicy { attempts: 3 });

        let report = submit(
            &mut queue,
            &backend,
            Mutation::Delete {
                user: "alice".into(),
                project: "blog".into(),
                topic: "rust".into(),
            },
        );

        assert_eq!(report, FlushReport { delivered: 1, dropped: 0 });
        assert_eq!(backend.attempts.get(), 3);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_visitor_cannot_open_menus() {
        let backend = FakeBackend::with_votes("alice", vec![vote("rust", 3, false)]);
        let visitor = Session::with_cookie("loggedinuser=bob");
        let mut dashboard = loaded(&backend, &visitor);
        let mut queue = MutationQueue::default();

        let result =
            apply_row_action(&mut dashboard, &mut queue, &backend, "table-blog", "rust", MenuAction::Delete);

        assert_eq!(result, Err(MutationError::NotConfigurable("rust".into())));
        assert_eq!(dashboard.get_table("table-blog").unwrap().rows.len(), 1);
    }

    #[test]
    fn test_action_without_open_menu() {
        let backend = FakeBackend::with_votes("alice", vec![vote("rust", 3, false)]);
        let mut dashboard = loaded(&backend, &owner());
        let mut queue = MutationQueue::default();

        dashboard.toggle_menu("table-blog", "rust").unwrap();
        dashboard.click_page();

        let result = apply_menu_action(&mut dashboard, &mut queue, &backend, MenuAction::Delete);
        assert_eq!(result, Err(MutationError::NoOpenMenu));
    }

    #[test]
    fn test_single_voting_toggle() {
        let backend = FakeBackend::with_votes("alice", vec![vote("rust", 3, false)]);
        let mut dashboard = loaded(&backend, &owner());
        let mut queue = MutationQueue::default();

        set_single_voting(&mut dashboard, &mut queue, &backend, &owner(), "table-blog", true).unwrap();

        assert!(dashboard.get_table("table-blog").unwrap().single_voting);
        assert_eq!(
            backend.sent.borrow().as_slice(),
            [Mutation::SingleVoting {
                project: "blog".into(),
                enabled: true
            }]
        );
    }

    #[test]
    fn test_single_voting_requires_owner() {
        let backend = FakeBackend::with_votes("alice", vec![vote("rust", 3, false)]);
        let mut dashboard = loaded(&backend, &Session::default());
        let mut queue = MutationQueue::default();

        let result =
            set_single_voting(&mut dashboard, &mut queue, &backend, &Session::default(), "table-blog", true);

        assert_eq!(result, Err(MutationError::NotOwner("table-blog".into())));
    }

    #[test]
    fn test_show_hidden_reveals_hidden_rows() {
        let backend = FakeBackend::with_votes("alice", vec![vote("rust", 3, true), vote("go", 1, false)]);
        let mut dashboard = loaded(&backend, &owner());

        assert_eq!(dashboard.get_table("table-blog").unwrap().visible_rows().count(), 1);
        set_show_hidden(&mut dashboard, "table-blog", true).unwrap();
        assert_eq!(dashboard.get_table("table-blog").unwrap().visible_rows().count(), 2);
    }
}
