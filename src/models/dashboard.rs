use indexmap::IndexSet;
use jiff::Zoned;
use tracing::debug;

use crate::models::{
    session::Session,
    table::{ProjectTable, VoteRow, table_id},
    vote::VoteRecord,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyState {
    /// The viewer owns the dashboard but nobody voted yet
    NoVotes,
    /// The dashboard user does not exist (or could not be loaded)
    UserNotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Hide,
    Show,
    Delete,
}

/// Row whose configuration menu is currently open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuRef {
    pub table_id: String,
    pub topic: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuView {
    pub table_id: String,
    pub topic: String,
    pub actions: Vec<MenuAction>,
}

/// Which menu toggles are refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuError {
    TableNotFound(String),
    RowNotFound(String),
    NotConfigurable(String),
}

/// View-model of a whole stats page: one table per project.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    /// User whose votes are shown
    pub user: String,
    pub tables: Vec<ProjectTable>,
    pub empty_state: Option<EmptyState>,
    /// The template is consumed by the first build
    template_available: bool,
    open_menu: Option<MenuRef>,
}

impl Dashboard {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            tables: vec![],
            empty_state: None,
            template_available: true,
            open_menu: None,
        }
    }

    pub fn is_built(&self) -> bool {
        !self.template_available
    }

    /// Create one table per project, in first-occurrence order. Once the
    /// template has been consumed this is a no-op.
    pub fn build_project_tables(
        &mut self,
        session: &Session,
        projects: &IndexSet<String>,
        single_voting_projects: &[String],
    ) -> bool {
        if !self.template_available {
            debug!(user = %self.user, "tables already built, skipping");
            return false;
        }

        for project in projects {
            let single_voting = single_voting_projects.iter().any(|p| p == project);
            self.tables.push(ProjectTable::new(project, single_voting));
        }

        if projects.is_empty() {
            self.empty_state = Some(if session.is_owner(&self.user) {
                EmptyState::NoVotes
            } else {
                EmptyState::UserNotFound
            });
        }

        self.template_available = false;
        true
    }

    /// Replace the rows of the project's table, most voted first.
    pub fn fill_table(
        &mut self,
        session: &Session,
        project: &str,
        mut rows: Vec<VoteRecord>,
        now: &Zoned,
    ) -> bool {
        let configurable = session.is_owner(&self.user);
        let id = table_id(project);

        let Some(table) = self.get_table_mut(&id) else {
            debug!(table = %id, "no table to fill");
            return false;
        };

        // Stable: ties keep the order the backend returned
        rows.sort_by(|a, b| b.vote_count.cmp(&a.vote_count));

        table.rows = rows
            .into_iter()
            .map(|record| VoteRow::from_record(record, configurable, now))
            .collect();
        table.reloading = false;
        table.last_sort = None;

        if self
            .open_menu
            .as_ref()
            .is_some_and(|menu| menu.table_id == id)
        {
            self.open_menu = None;
        }

        true
    }

    /// A failed first load replaces the template with the "no user found"
    /// message. Tables that are already on screen stay.
    pub fn show_user_not_found(&mut self) {
        if self.is_built() {
            debug!(user = %self.user, "tables already built, keeping them");
            return;
        }
        self.empty_state = Some(EmptyState::UserNotFound);
        self.template_available = false;
    }

    pub fn get_table(&self, id: &str) -> Option<&ProjectTable> {
        self.tables.iter().find(|t| t.id == id)
    }

    pub fn get_table_mut(&mut self, id: &str) -> Option<&mut ProjectTable> {
        self.tables.iter_mut().find(|t| t.id == id)
    }

    /// Resolve a table by id or by project name
    pub fn find_table(&self, name: &str) -> Option<&ProjectTable> {
        self.get_table(name)
            .or_else(|| self.tables.iter().find(|t| t.project == name))
            .or_else(|| {
                self.tables
                    .iter()
                    .find(|t| t.project.to_lowercase() == name.to_lowercase())
            })
    }

    /// Open the row's menu, closing every other one. Toggling an open menu
    /// closes it.
    pub fn toggle_menu(&mut self, table_id: &str, topic: &str) -> Result<Option<MenuView>, MenuError> {
        let table = self
            .get_table(table_id)
            .ok_or_else(|| MenuError::TableNotFound(table_id.to_string()))?;
        let row = table
            .get_row(topic)
            .ok_or_else(|| MenuError::RowNotFound(topic.to_string()))?;

        if !row.configurable {
            return Err(MenuError::NotConfigurable(topic.to_string()));
        }

        let target = MenuRef {
            table_id: table_id.to_string(),
            topic: topic.to_string(),
        };

        if self.open_menu.as_ref() == Some(&target) {
            self.open_menu = None;
        } else {
            self.open_menu = Some(target);
        }

        Ok(self.open_menu_view())
    }

    /// A click anywhere else on the page closes all menus
    pub fn click_page(&mut self) {
        self.open_menu = None;
    }

    pub fn open_menu_view(&self) -> Option<MenuView> {
        let menu = self.open_menu.as_ref()?;
        let row = self.get_table(&menu.table_id)?.get_row(&menu.topic)?;

        let toggle = if row.hidden {
            MenuAction::Show
        } else {
            MenuAction::Hide
        };

        Some(MenuView {
            table_id: menu.table_id.clone(),
            topic: menu.topic.clone(),
            actions: vec![toggle, MenuAction::Delete],
        })
    }
}

/// Distinct project names in order of first occurrence
pub fn distinct_projects(votes: &[VoteRecord]) -> IndexSet<String> {
    votes.iter().map(|v| v.project_name.clone()).collect()
}
