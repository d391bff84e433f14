use std::io::{self, BufRead, Write};

use clap::{Parser, Subcommand};
use colored::*;
use jiff::Zoned;

use crate::{
    api::{Backend, Mutation, http::HttpBackend},
    config::Config,
    models::{
        dashboard::{Dashboard, MenuAction},
        session::Session,
    },
    repl::{HELP, ReplCommand, parse_command},
    services::{
        account::{LoginError, LoginParameters, WhoAmIError, login, logout, whoami},
        mutations::{
            FlushReport, MutationError, MutationQueue, RetryPolicy, apply_menu_action,
            apply_row_action, set_show_hidden, set_single_voting, submit,
        },
        sorting::click_table_header,
        votes::{
            CastVoteError, LoadVotesError, LoadVotesParameters, ReloadTableError, cast_vote,
            load_votes, reload_table,
        },
    },
    storage::{Storage, json::JsonFileStorage},
    ui::RenderOptions,
};

mod api;
mod config;
mod logging;
mod models;
mod repl;
mod services;
mod storage;
mod ui;

#[derive(Parser)]
#[command(
    name = "readmore",
    about = "Vote dashboard for I Want To Read More, in your terminal"
)]
struct Cli {
    /// Base URL of the votes backend (overrides config and READMORE_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// More logging (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive dashboard of a user
    Dashboard {
        /// Owner of the dashboard
        user: String,

        /// Only load one project
        project: Option<String>,

        /// Show absolute dates next to relative ones
        #[arg(long)]
        dates: bool,
    },

    /// Print a user's vote tables and exit
    Votes {
        /// Owner of the dashboard
        user: String,

        /// Only load one project
        project: Option<String>,

        /// Include hidden topics
        #[arg(long)]
        show_hidden: bool,

        /// Show absolute dates next to relative ones
        #[arg(long)]
        dates: bool,
    },

    /// Vote for a topic ("I want to read more"), e.g. "alice/blog/rust"
    Vote {
        /// Topic path as used by vote links
        topic: String,
    },

    /// Hide a topic from the default view
    Hide {
        user: String,
        project: String,
        topic: String,
    },

    /// Show a hidden topic again
    Show {
        user: String,
        project: String,
        topic: String,
    },

    /// Delete a topic and its votes
    Delete {
        user: String,
        project: String,
        topic: String,
    },

    /// Allow only one vote per visitor and topic in a project
    SingleVoting {
        project: String,

        /// Enable single voting
        #[arg(long, conflicts_with = "off")]
        on: bool,

        /// Disable single voting
        #[arg(long)]
        off: bool,
    },

    /// Log in and remember the session
    Login {
        /// Username or email
        identifier: String,

        /// Password (falls back to READMORE_PASSWORD)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show who is logged in
    Whoami,
}

fn main() {
    let cli = Cli::parse();

    logging::init(cli.verbose);

    let mut config = match Config::from_environment() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }

    let storage = JsonFileStorage::new(JsonFileStorage::default_path());
    let session = match storage.load() {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("\nRun `readmore logout` to reset the stored session.");
            std::process::exit(1);
        }
    };

    let backend = match HttpBackend::new(&config.api_url, &session, config.timeout()) {
        Ok(backend) => backend,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let mut queue = MutationQueue::new(RetryPolicy {
        attempts: config.retry_budget,
    });

    match cli.command {
        Commands::Dashboard {
            user,
            project,
            dates,
        } => {
            let options = RenderOptions {
                show_tooltips: dates,
            };
            let mut dashboard = open_dashboard(&backend, &session, user, project, options);
            ui::render_dashboard(&dashboard, options);

            if dashboard.tables.is_empty() {
                return;
            }

            println!("\n  {}", "Type 'help' for commands.".dimmed());
            run_dashboard(&mut dashboard, &mut queue, &backend, &session, options);
        }
        Commands::Votes {
            user,
            project,
            show_hidden,
            dates,
        } => {
            let options = RenderOptions {
                show_tooltips: dates,
            };
            let mut dashboard = open_dashboard(&backend, &session, user, project, options);
            for table in dashboard.tables.iter_mut() {
                table.show_hidden = show_hidden;
            }
            ui::render_dashboard(&dashboard, options);
        }
        Commands::Vote { topic } => match cast_vote(&backend, &topic) {
            Ok(()) => ui::render_toast(&config.message_title, &config.message_text),
            Err(CastVoteError::Api(e)) => {
                eprintln!("Error: Failed to vote for '{}': {}", topic, e);
                std::process::exit(1);
            }
        },
        Commands::Hide {
            user,
            project,
            topic,
        } => {
            let mutation = Mutation::SetHidden {
                user,
                project,
                topic: topic.clone(),
                hidden: true,
            };
            let report = submit(&mut queue, &backend, mutation);
            print_mutation_result(&format!("Topic hidden: {}", topic), report);
        }
        Commands::Show {
            user,
            project,
            topic,
        } => {
            let mutation = Mutation::SetHidden {
                user,
                project,
                topic: topic.clone(),
                hidden: false,
            };
            let report = submit(&mut queue, &backend, mutation);
            print_mutation_result(&format!("Topic visible: {}", topic), report);
        }
        Commands::Delete {
            user,
            project,
            topic,
        } => {
            let mutation = Mutation::Delete {
                user,
                project,
                topic: topic.clone(),
            };
            let report = submit(&mut queue, &backend, mutation);
            print_mutation_result(&format!("Topic deleted: {}", topic), report);
        }
        Commands::SingleVoting { project, on, off } => {
            if on == off {
                eprintln!("Error: Pass exactly one of --on or --off");
                eprintln!("\nExample: readmore single-voting blog --on");
                std::process::exit(1);
            }
            let mutation = Mutation::SingleVoting {
                project: project.clone(),
                enabled: on,
            };
            let report = submit(&mut queue, &backend, mutation);
            let state = if on { "enabled" } else { "disabled" };
            print_mutation_result(&format!("Single voting {} for {}", state, project), report);
        }
        Commands::Login {
            identifier,
            password,
        } => {
            let Some(password) = password.or_else(|| std::env::var("READMORE_PASSWORD").ok())
            else {
                eprintln!("Error: No password given");
                eprintln!("\nUse --password or set READMORE_PASSWORD.");
                std::process::exit(1);
            };

            let params = LoginParameters {
                identifier,
                password,
            };
            match login(&storage, &backend, params) {
                Ok(session) => {
                    println!("✓ Logged in as {}", session.viewer().unwrap_or("?"));
                }
                Err(LoginError::InvalidCredentials) => {
                    eprintln!("Error: Wrong username or password");
                    std::process::exit(1);
                }
                Err(e @ LoginError::Api(_)) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
                Err(LoginError::Storage(e)) => {
                    eprintln!("Error: Failed to save session: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Logout => match logout(&storage) {
            Ok(()) => println!("✓ Logged out"),
            Err(e) => {
                eprintln!("Error: Failed to clear session: {}", e);
                std::process::exit(1);
            }
        },
        Commands::Whoami => match whoami(&backend, &session) {
            Ok(user) => println!("{}", user.bold()),
            Err(WhoAmIError::NotLoggedIn) => {
                eprintln!("Not logged in (redirect to /login)");
                eprintln!("\nLog in with: readmore login <identifier> --password <password>");
                std::process::exit(1);
            }
            Err(WhoAmIError::Api(e)) => {
                eprintln!("Error: Failed to check the login: {}", e);
                std::process::exit(1);
            }
        },
    }
}

/// Initial load of a dashboard; exits when the votes cannot be fetched
fn open_dashboard(
    backend: &impl Backend,
    session: &Session,
    user: String,
    project: Option<String>,
    options: RenderOptions,
) -> Dashboard {
    let mut dashboard = Dashboard::new(user);
    let params = LoadVotesParameters { project };

    match load_votes(&mut dashboard, backend, session, params, &Zoned::now()) {
        Ok(_) => dashboard,
        Err(LoadVotesError::UserNotFound(_)) => {
            ui::render_dashboard(&dashboard, options);
            std::process::exit(1);
        }
        Err(LoadVotesError::Api(e)) => {
            eprintln!("Error: Failed to load votes: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_mutation_result(message: &str, report: FlushReport) {
    if report.dropped > 0 {
        eprintln!("Error: The backend did not accept the change");
        eprintln!("\nRun with -v for details.");
        std::process::exit(1);
    }
    println!("✓ {}", message);
}

/// Resolve a table given by id or project name
fn resolve_table(dashboard: &Dashboard, name: &str) -> Option<String> {
    let id = dashboard.find_table(name).map(|t| t.id.clone());
    if id.is_none() {
        eprintln!("Error: Table '{}' not found", name);
        let ids: Vec<_> = dashboard.tables.iter().map(|t| t.id.as_str()).collect();
        if !ids.is_empty() {
            eprintln!("\nAvailable tables: {}", ids.join(", "));
        }
    }
    id
}

fn report_mutation_error(error: MutationError) {
    eprintln!("Error: {}", error);
}

/// Line-driven event loop over an open dashboard
fn run_dashboard(
    dashboard: &mut Dashboard,
    queue: &mut MutationQueue,
    backend: &impl Backend,
    session: &Session,
    options: RenderOptions,
) {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("\n{} ", ">".cyan().bold());
        let _ = io::stdout().flush();

        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                eprintln!("Error: Failed to read input: {}", e);
                break;
            }
            None => break,
        };

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("Error: {}", e);
                continue;
            }
        };

        let redraw = match command {
            ReplCommand::Empty => false,
            ReplCommand::Quit => break,
            ReplCommand::Help => {
                println!("{}", HELP);
                false
            }
            ReplCommand::Tables => {
                for table in &dashboard.tables {
                    println!(
                        "  {} {} {}",
                        "•".green(),
                        table.id.bold(),
                        format!("({} topics)", table.rows.len()).dimmed()
                    );
                }
                false
            }
            ReplCommand::Sort { table, column } => {
                let Some(id) = resolve_table(dashboard, &table) else {
                    continue;
                };
                match click_table_header(dashboard, &id, column) {
                    Ok(_) => true,
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        false
                    }
                }
            }
            ReplCommand::Reload { table } => {
                let Some(id) = resolve_table(dashboard, &table) else {
                    continue;
                };
                match reload_table(dashboard, backend, session, &id, &Zoned::now()) {
                    Ok(_) => true,
                    Err(ReloadTableError::Load(LoadVotesError::UserNotFound(_))) => true,
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        true
                    }
                }
            }
            ReplCommand::Menu { table, topic } => {
                let Some(id) = resolve_table(dashboard, &table) else {
                    continue;
                };
                match dashboard.toggle_menu(&id, &topic) {
                    Ok(_) => true,
                    Err(e) => {
                        report_mutation_error(e.into());
                        false
                    }
                }
            }
            ReplCommand::Action { action, target } => {
                let result = match target {
                    Some((table, topic)) => {
                        let Some(id) = resolve_table(dashboard, &table) else {
                            continue;
                        };
                        apply_row_action(dashboard, queue, backend, &id, &topic, action)
                    }
                    None => apply_menu_action(dashboard, queue, backend, action),
                };
                match result {
                    Ok(_) => true,
                    Err(MutationError::ActionUnavailable(MenuAction::Hide)) => {
                        eprintln!("Error: That topic is already hidden");
                        false
                    }
                    Err(MutationError::ActionUnavailable(MenuAction::Show)) => {
                        eprintln!("Error: That topic is not hidden");
                        false
                    }
                    Err(e) => {
                        report_mutation_error(e);
                        false
                    }
                }
            }
            ReplCommand::Click => {
                dashboard.click_page();
                true
            }
            ReplCommand::Hidden { table, show } => {
                let Some(id) = resolve_table(dashboard, &table) else {
                    continue;
                };
                match set_show_hidden(dashboard, &id, show) {
                    Ok(()) => true,
                    Err(e) => {
                        report_mutation_error(e);
                        false
                    }
                }
            }
            ReplCommand::Single { table, enabled } => {
                let Some(id) = resolve_table(dashboard, &table) else {
                    continue;
                };
                match set_single_voting(dashboard, queue, backend, session, &id, enabled) {
                    Ok(_) => true,
                    Err(e) => {
                        report_mutation_error(e);
                        false
                    }
                }
            }
        };

        if redraw {
            ui::render_dashboard(dashboard, options);
        }
    }
}
