use colored::*;
use jiff::{Timestamp, Zoned};

use crate::models::{
    dashboard::{Dashboard, EmptyState, MenuAction},
    table::{COLUMNS, ProjectTable, VoteRow},
};

/// Get the terminal width, defaulting to 80 if unavailable
fn get_terminal_width() -> usize {
    term_size::dimensions().map(|(w, _)| w).unwrap_or(80)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelativeDate {
    /// Abbreviated label ("14:05", "Yesterday", "3 days ago", "01.02.2026")
    pub label: String,
    /// Absolute "DD.MM.YYYY HH:MM", always available on hover
    pub tooltip: String,
}

/// Format a vote timestamp relative to `now`, in `now`'s time zone.
///
/// The difference is counted in calendar days between local midnights:
/// same day shows the time, one day is "Yesterday", two to six days are
/// "N days ago" and anything else is the absolute date.
pub fn format_relative_date(unix_seconds: i64, now: &Zoned) -> RelativeDate {
    let Ok(timestamp) = Timestamp::from_second(unix_seconds) else {
        return RelativeDate {
            label: unix_seconds.to_string(),
            tooltip: unix_seconds.to_string(),
        };
    };
    let vote_time = timestamp.to_zoned(now.time_zone().clone());

    let tooltip = vote_time.strftime("%d.%m.%Y %H:%M").to_string();

    let days = vote_time
        .date()
        .until(now.date())
        .map(|span| span.get_days())
        .ok();

    let label = match days {
        Some(0) => vote_time.strftime("%H:%M").to_string(),
        Some(1) => "Yesterday".to_string(),
        Some(days @ 2..=6) => format!("{} days ago", days),
        _ => vote_time.strftime("%d.%m.%Y").to_string(),
    };

    RelativeDate { label, tooltip }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Show the absolute date next to relative labels
    pub show_tooltips: bool,
}

/// Render the whole dashboard: empty state or every project table
pub fn render_dashboard(dashboard: &Dashboard, options: RenderOptions) {
    match dashboard.empty_state {
        Some(EmptyState::NoVotes) => {
            println!("\n  {}\n", "No votes yet".cyan().bold());
            println!("  Add vote links to your pages and the votes will show up here.");
            return;
        }
        Some(EmptyState::UserNotFound) => {
            println!("\n  {}\n", "No user found".red().bold());
            return;
        }
        None => {}
    }

    for table in &dashboard.tables {
        render_table(dashboard, table, options);
    }
}

/// Render a project title line with the row count and table markers
pub fn render_table_header(table: &ProjectTable) {
    let count = table.visible_rows().count();
    let topic_word = if count == 1 { "topic" } else { "topics" };

    let mut markers = vec![];
    if table.reloading {
        markers.push("↻".yellow().to_string());
    }
    if table.single_voting {
        markers.push("single voting".blue().to_string());
    }
    let hidden = table.hidden_count();
    if hidden > 0 && !table.show_hidden {
        markers.push(format!("{} hidden", hidden).dimmed().to_string());
    }

    let markers = if markers.is_empty() {
        String::new()
    } else {
        format!("  {}", markers.join(&format!(" {} ", "•".dimmed())))
    };

    println!(
        "\n  {} ({} {}){}  {}\n",
        table.title.cyan().bold(),
        count,
        topic_word,
        markers,
        table.id.dimmed()
    );
}

fn column_heading(table: &ProjectTable, column: usize) -> String {
    let arrow = match table.last_sort {
        Some((sorted, true)) if sorted == column => " ▼",
        Some((sorted, false)) if sorted == column => " ▲",
        _ => "",
    };
    format!("{}{}", COLUMNS[column], arrow)
}

fn render_table(dashboard: &Dashboard, table: &ProjectTable, options: RenderOptions) {
    render_table_header(table);

    let terminal_width = get_terminal_width();
    let date_width = if options.show_tooltips { 32 } else { 16 };
    let count_width = 7;
    let topic_width = terminal_width
        .saturating_sub(date_width + count_width + 12)
        .clamp(12, 60);

    println!(
        "  {:<topic_width$} {:>count_width$}  {:<date_width$}",
        column_heading(table, 0).bold(),
        column_heading(table, 1).bold(),
        column_heading(table, 2).bold(),
    );
    println!("  {}", "─".repeat(topic_width + count_width + date_width + 3).dimmed());

    let open_menu = dashboard.open_menu_view();

    for row in table.visible_rows() {
        render_row(row, topic_width, count_width, date_width, options);

        if let Some(menu) = &open_menu
            && menu.table_id == table.id
            && menu.topic == row.topic
        {
            let actions: Vec<String> = menu
                .actions
                .iter()
                .map(|action| match action {
                    MenuAction::Hide => "[hide]".to_string(),
                    MenuAction::Show => "[show]".to_string(),
                    MenuAction::Delete => "[delete]".red().to_string(),
                })
                .collect();
            println!("    {} {}", "└".dimmed(), actions.join(" "));
        }
    }
}

fn render_row(
    row: &VoteRow,
    topic_width: usize,
    count_width: usize,
    date_width: usize,
    options: RenderOptions,
) {
    let topic = truncate(&row.cells[0].text, topic_width);
    let date_cell = &row.cells[2];
    let date = match (&date_cell.tooltip, options.show_tooltips) {
        (Some(tooltip), true) => format!("{} ({})", date_cell.text, tooltip),
        _ => date_cell.text.clone(),
    };
    let config = if row.configurable { "⚙" } else { " " };

    let line = format!(
        "  {:<topic_width$} {:>count_width$}  {:<date_width$} {}",
        topic, row.cells[1].text, date, config
    );

    if row.hidden {
        println!("{}", line.dimmed());
    } else {
        println!("{}", line);
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut short: String = text.chars().take(width.saturating_sub(1)).collect();
        short.push('…');
        short
    }
}

/// Toast shown after a read-more vote
pub fn render_toast(title: &str, text: &str) {
    if title.is_empty() && text.is_empty() {
        return;
    }
    println!("\n  {}", title.cyan().bold());
    println!("  {}\n", text);
}
