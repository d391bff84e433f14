use thiserror::Error;

use crate::{models::dashboard::MenuAction, services::sorting::column_index};

pub const HELP: &str = "\
  sort <table> <column>        sort by topic, votes or last (click again to flip)
  reload <table>               re-fetch one project
  menu <table> <topic>         open or close a topic's menu
  hide|show|delete [<table> <topic>]
                               act on the open menu, or on the given topic
  click                        close every menu
  hidden <table> show|hide     reveal or conceal hidden topics
  single <table> on|off        toggle single voting for the project
  tables                       list table ids
  help                         show this help
  quit                         leave the dashboard";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Sort { table: String, column: usize },
    Reload { table: String },
    Menu { table: String, topic: String },
    Action {
        action: MenuAction,
        target: Option<(String, String)>,
    },
    Click,
    Hidden { table: String, show: bool },
    Single { table: String, enabled: bool },
    Tables,
    Help,
    Quit,
    Empty,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReplError {
    #[error("Unknown command '{0}', type 'help' for the list")]
    UnknownCommand(String),

    #[error("'{command}' needs a {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("Unknown column '{0}', use topic, votes or last")]
    InvalidColumn(String),

    #[error("Expected on/off or show/hide, got '{0}'")]
    InvalidSwitch(String),
}

fn switch(value: &str) -> Result<bool, ReplError> {
    match value.to_lowercase().as_str() {
        "on" | "show" | "yes" | "true" => Ok(true),
        "off" | "hide" | "no" | "false" => Ok(false),
        _ => Err(ReplError::InvalidSwitch(value.to_string())),
    }
}

fn required<'a>(
    value: Option<&'a str>,
    command: &'static str,
    argument: &'static str,
) -> Result<&'a str, ReplError> {
    value.ok_or(ReplError::MissingArgument { command, argument })
}

/// Parse one line typed into the interactive dashboard
pub fn parse_command(line: &str) -> Result<ReplCommand, ReplError> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(ReplCommand::Empty);
    };

    match command.to_lowercase().as_str() {
        "sort" => {
            let table = required(words.next(), "sort", "table")?;
            let column = required(words.next(), "sort", "column")?;
            let column = column_index(column).ok_or_else(|| ReplError::InvalidColumn(column.to_string()))?;
            Ok(ReplCommand::Sort {
                table: table.to_string(),
                column,
            })
        }
        "reload" => Ok(ReplCommand::Reload {
            table: required(words.next(), "reload", "table")?.to_string(),
        }),
        "menu" => {
            let table = required(words.next(), "menu", "table")?;
            let topic = words.collect::<Vec<_>>().join(" ");
            if topic.is_empty() {
                return Err(ReplError::MissingArgument {
                    command: "menu",
                    argument: "topic",
                });
            }
            Ok(ReplCommand::Menu {
                table: table.to_string(),
                topic,
            })
        }
        name @ ("hide" | "show" | "delete") => {
            let action = match name {
                "hide" => MenuAction::Hide,
                "show" => MenuAction::Show,
                _ => MenuAction::Delete,
            };
            let target = match words.next() {
                None => None,
                Some(table) => {
                    let topic = words.collect::<Vec<_>>().join(" ");
                    if topic.is_empty() {
                        return Err(ReplError::MissingArgument {
                            command: "hide/show/delete",
                            argument: "topic",
                        });
                    }
                    Some((table.to_string(), topic))
                }
            };
            Ok(ReplCommand::Action { action, target })
        }
        "click" => Ok(ReplCommand::Click),
        "hidden" => {
            let table = required(words.next(), "hidden", "table")?;
            let show = switch(required(words.next(), "hidden", "show/hide switch")?)?;
            Ok(ReplCommand::Hidden {
                table: table.to_string(),
                show,
            })
        }
        "single" => {
            let table = required(words.next(), "single", "table")?;
            let enabled = switch(required(words.next(), "single", "on/off switch")?)?;
            Ok(ReplCommand::Single {
                table: table.to_string(),
                enabled,
            })
        }
        "tables" => Ok(ReplCommand::Tables),
        "help" | "?" => Ok(ReplCommand::Help),
        "quit" | "exit" | "q" => Ok(ReplCommand::Quit),
        other => Err(ReplError::UnknownCommand(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sort_by_name_and_position() {
        assert_eq!(
            parse_command("sort blog votes"),
            Ok(ReplCommand::Sort {
                table: "blog".into(),
                column: 1
            })
        );
        assert_eq!(
            parse_command("SORT table-blog 3"),
            Ok(ReplCommand::Sort {
                table: "table-blog".into(),
                column: 2
            })
        );
        assert_eq!(
            parse_command("sort blog size"),
            Err(ReplError::InvalidColumn("size".into()))
        );
    }

    #[test]
    fn test_parse_actions() {
        assert_eq!(
            parse_command("hide"),
            Ok(ReplCommand::Action {
                action: MenuAction::Hide,
                target: None
            })
        );
        assert_eq!(
            parse_command("delete blog async rust"),
            Ok(ReplCommand::Action {
                action: MenuAction::Delete,
                target: Some(("blog".into(), "async rust".into()))
            })
        );
        assert!(matches!(
            parse_command("show blog"),
            Err(ReplError::MissingArgument { .. })
        ));
    }

    #[test]
    fn test_parse_switches() {
        assert_eq!(
            parse_command("single blog on"),
            Ok(ReplCommand::Single {
                table: "blog".into(),
                enabled: true
            })
        );
        assert_eq!(
            parse_command("hidden blog hide"),
            Ok(ReplCommand::Hidden {
                table: "blog".into(),
                show: false
            })
        );
        assert_eq!(
            parse_command("single blog maybe"),
            Err(ReplError::InvalidSwitch("maybe".into()))
        );
    }

    #[test]
    fn test_parse_misc() {
        assert_eq!(parse_command("   "), Ok(ReplCommand::Empty));
        assert_eq!(parse_command("q"), Ok(ReplCommand::Quit));
        assert_eq!(parse_command("click"), Ok(ReplCommand::Click));
        assert_eq!(
            parse_command("dance"),
            Err(ReplError::UnknownCommand("dance".into()))
        );
        assert_eq!(
            parse_command("menu blog"),
            Err(ReplError::MissingArgument {
                command: "menu",
                argument: "topic"
            })
        );
    }
}
