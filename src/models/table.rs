use jiff::Zoned;

use crate::{models::vote::VoteRecord, ui::format_relative_date};

/// Header labels of every project table, in column order
pub const COLUMNS: [&str; 4] = ["Topic", "Votes", "Last vote", ""];

/// Number of leading columns that carry a sort control
pub const SORTABLE_COLUMNS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    /// Typed value used for sorting, when the column has one
    pub value: Option<String>,
    /// Text shown in the table
    pub text: String,
    /// Hover text (the absolute date for the last vote column)
    pub tooltip: Option<String>,
}

impl Cell {
    fn valued(value: impl ToString, text: impl Into<String>) -> Self {
        Self {
            value: Some(value.to_string()),
            text: text.into(),
            tooltip: None,
        }
    }

    fn empty() -> Self {
        Self {
            value: None,
            text: String::new(),
            tooltip: None,
        }
    }

    /// Value the sorter reads: the typed value if present, else the text
    pub fn sort_value(&self) -> &str {
        self.value.as_deref().unwrap_or(&self.text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoteRow {
    pub topic: String,
    pub vote_count: u64,
    pub last_vote: i64,
    /// Muted and excluded from the default view
    pub hidden: bool,
    /// Whether the viewer gets the hide/show/delete control
    pub configurable: bool,
    pub cells: Vec<Cell>,
}

impl VoteRow {
    pub fn from_record(record: VoteRecord, configurable: bool, now: &Zoned) -> Self {
        let date = format_relative_date(record.last_vote, now);

        let cells = vec![
            Cell::valued(&record.topic, record.topic.clone()),
            Cell::valued(record.vote_count, record.vote_count.to_string()),
            Cell {
                value: Some(record.last_vote.to_string()),
                text: date.label,
                tooltip: Some(date.tooltip),
            },
            Cell::empty(),
        ];

        Self {
            topic: record.topic,
            vote_count: record.vote_count,
            last_vote: record.last_vote,
            hidden: record.hidden,
            configurable,
            cells,
        }
    }
}

/// Per-column sort control. `descending` starts out `true` and is negated
/// before every use, so the first click sorts ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct SortButton {
    pub column_index: usize,
    pub descending: bool,
}

impl SortButton {
    pub fn new(column_index: usize) -> Self {
        Self {
            column_index,
            descending: true,
        }
    }

    pub fn press(&mut self) -> bool {
        self.descending = !self.descending;
        self.descending
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectTable {
    /// Deterministic identifier, `table-{project}`
    pub id: String,
    pub project: String,
    /// Uppercased project name
    pub title: String,
    pub rows: Vec<VoteRow>,
    pub single_voting: bool,
    /// Page-level "show hidden" toggle for this table
    pub show_hidden: bool,
    /// Reload spinner state
    pub reloading: bool,
    pub sort_buttons: Vec<SortButton>,
    /// Column and direction of the most recent sort, for the header arrow
    pub last_sort: Option<(usize, bool)>,
}

impl ProjectTable {
    pub fn new(project: &str, single_voting: bool) -> Self {
        Self {
            id: table_id(project),
            project: project.to_string(),
            title: project.to_uppercase(),
            rows: vec![],
            single_voting,
            show_hidden: false,
            reloading: false,
            sort_buttons: (0..SORTABLE_COLUMNS).map(SortButton::new).collect(),
            last_sort: None,
        }
    }

    pub fn get_sort_button_mut(&mut self, column_index: usize) -> Option<&mut SortButton> {
        self.sort_buttons
            .iter_mut()
            .find(|b| b.column_index == column_index)
    }

    pub fn get_row(&self, topic: &str) -> Option<&VoteRow> {
        self.rows.iter().find(|r| r.topic == topic)
    }

    pub fn get_row_mut(&mut self, topic: &str) -> Option<&mut VoteRow> {
        self.rows.iter_mut().find(|r| r.topic == topic)
    }

    pub fn remove_row(&mut self, topic: &str) -> Option<VoteRow> {
        let index = self.rows.iter().position(|r| r.topic == topic)?;
        Some(self.rows.remove(index))
    }

    /// Rows shown with the current "show hidden" toggle
    pub fn visible_rows(&self) -> impl Iterator<Item = &VoteRow> {
        self.rows.iter().filter(|r| self.show_hidden || !r.hidden)
    }

    pub fn hidden_count(&self) -> usize {
        self.rows.iter().filter(|r| r.hidden).count()
    }
}

pub fn table_id(project: &str) -> String {
    format!("table-{}", project)
}
