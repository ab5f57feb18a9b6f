//! # betterday
//!
//! A terminal habit tracker: be a little better than yesterday. Track one-time
//! and recurring tasks day by day, rate each day against the one before, and
//! keep your streak alive.
//!
//! ## Features
//!
//! *   **Recurring tasks**: repeat daily or on chosen weekdays. Changing the
//!     weekdays only affects days from the change onwards; history stays.
//! *   **Daily progress**: completion percentage and comparison with the day before.
//! *   **Reflections**: once a day, rate the day `better`, `same` or `worse`.
//!     A day stays open for reflection until 5 AM the next morning.
//! *   **Streaks and calendar**: consecutive days with completed tasks, and a
//!     month view colored by completion.
//! *   **Dual Interface**: a scriptable CLI and an interactive TUI.
//! *   **Data Persistence**: JSON documents in the XDG data directory, optionally
//!     mirrored to a sync folder.
//!
//! ## Usage
//!
//! ### Interactive Mode (TUI)
//!
//! ```bash
//! betterday
//! # or explicitly
//! betterday ui
//! ```
//!
//! #### TUI Key Bindings
//!
//! *   `q`: Quit
//! *   `h` / `l` (or arrows): Previous / next day, `t`: back to today
//! *   `j` / `k`: Move selection
//! *   `Space`: Toggle done
//! *   `a`: Add task, `e`: Edit title, `w`: Edit weekdays
//! *   `s`: Skip recurring task for the day, `m`: Move to next day
//! *   `d`: Delete (recurring tasks end from the shown day)
//! *   `i`: Show skipped tasks (`s` restores one)
//! *   `r`: Reflect on the shown day
//!
//! ### Command Line Interface (CLI)
//!
//! ```bash
//! betterday add "Read 20 pages" --days mon,wed,fri
//! betterday add "Call the bank"
//! betterday list
//! betterday done 1
//! betterday compare
//! betterday reflect better
//! betterday history --month
//! ```
//!
//! ## Data Storage
//!
//! *   Linux: `~/.local/share/betterday/`
//! *   macOS: `~/Library/Application Support/betterday/`
//! *   Windows: `%LOCALAPPDATA%\betterday\`
//!
//! Override with `BETTERDAY_DATA_DIR`. `config.json` in the same directory
//! holds `sync_dir`, `reflection_cutoff_hour` and `log_level`
//! (`BETTERDAY_SYNC_DIR` and `BETTERDAY_LOG` override them).

use betterday::commands::*;
use betterday::config::Config;
use betterday::errors::AppResult;
use betterday::logging::init_logging;
use betterday::progress::TimeFrame;
use betterday::storage::data_dir;
use betterday::tui::run_tui;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;

#[derive(Parser)]
#[command(name = "betterday")]
#[command(about = "Be a little better than yesterday: a terminal habit tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task
    Add {
        /// Task title (quoted if it has spaces)
        title: String,
        /// Longer description
        #[arg(short, long)]
        description: Option<String>,
        /// Repeat every day
        #[arg(short, long)]
        recur: bool,
        /// Repeat on these weekdays, e.g. mon,wed,fri or weekdays
        #[arg(long)]
        days: Option<String>,
        /// Day the task starts, YYYY-MM-DD (default today)
        #[arg(long)]
        date: Option<String>,
    },
    /// List the tasks of a day
    List {
        /// Day to show, YYYY-MM-DD
        #[arg(long)]
        date: Option<String>,
        /// Show tasks skipped on that day instead
        #[arg(short, long)]
        ignored: bool,
    },
    /// Mark a task as done
    Done {
        id: u64,
        #[arg(long)]
        date: Option<String>,
    },
    /// Mark a task as not done
    Undo {
        id: u64,
        #[arg(long)]
        date: Option<String>,
    },
    /// Toggle a task between done and pending
    Toggle {
        id: u64,
        #[arg(long)]
        date: Option<String>,
    },
    /// Edit a task
    Edit {
        id: u64,
        /// New title
        #[arg(short, long)]
        title: Option<String>,
        /// New description
        #[arg(short, long)]
        description: Option<String>,
        /// New weekdays; makes a one-time task recurring
        #[arg(long)]
        days: Option<String>,
        /// First day the new weekdays apply, YYYY-MM-DD (default today)
        #[arg(long)]
        from: Option<String>,
    },
    /// Remove a task, or end a recurring task from a day
    Remove {
        id: u64,
        /// Recurring tasks stop occurring from this day, YYYY-MM-DD
        #[arg(long)]
        from: Option<String>,
    },
    /// Skip a recurring task on one day
    Ignore {
        id: u64,
        #[arg(long)]
        date: Option<String>,
    },
    /// Restore a skipped day
    Unignore {
        id: u64,
        #[arg(long)]
        date: Option<String>,
    },
    /// Move a task to the following day
    Move {
        id: u64,
        #[arg(long)]
        date: Option<String>,
    },
    /// List recurring tasks
    Recurring,
    /// Compare completion with the previous day
    Compare {
        #[arg(long)]
        date: Option<String>,
        /// Day to compare against (default: the day before)
        #[arg(long)]
        against: Option<String>,
    },
    /// Show the current streak
    Streak,
    /// Show a month colored by completion
    Calendar {
        /// Month, YYYY-MM
        #[arg(short, long)]
        month: Option<String>,
    },
    /// Rate a day: better, same or worse than the one before
    Reflect {
        rating: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Show reflection history
    History {
        /// Page of past reflections
        #[arg(short, long, default_value_t = 1)]
        page: usize,
        /// Chart the last 30 days instead of 7
        #[arg(short, long)]
        month: bool,
    },
    /// Upload every record to the sync folder
    Sync,
    /// Reset the database (delete all tasks and reflections)
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
        shell: String,
    },
    /// Open interactive TUI
    Ui,
}

fn main() {
    let cli = Cli::parse();

    let config = Config::load(&data_dir());
    let interactive = matches!(cli.command, Some(Commands::Ui) | None);
    // The TUI owns the terminal; only log there when explicitly asked to.
    let level = if interactive && std::env::var("BETTERDAY_LOG").is_err() { "off".to_string() } else { config.log_level };
    let _logger = match init_logging(&level) {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("{}", e);
            None
        }
    };

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(command: Option<Commands>) -> AppResult<()> {
    match command {
        Some(Commands::Add { title, description, recur, days, date }) => cmd_add(title, description, recur, days, date, false),
        Some(Commands::List { date, ignored }) => cmd_list(date, ignored),
        Some(Commands::Done { id, date }) => cmd_set_done(id, date, true, false),
        Some(Commands::Undo { id, date }) => cmd_set_done(id, date, false, false),
        Some(Commands::Toggle { id, date }) => cmd_toggle(id, date, false),
        Some(Commands::Edit { id, title, description, days, from }) => cmd_edit(id, title, description, days, from, false),
        Some(Commands::Remove { id, from }) => cmd_remove(id, from, false),
        Some(Commands::Ignore { id, date }) => cmd_ignore(id, date, false),
        Some(Commands::Unignore { id, date }) => cmd_unignore(id, date, false),
        Some(Commands::Move { id, date }) => cmd_move(id, date, false),
        Some(Commands::Recurring) => cmd_recurring(),
        Some(Commands::Compare { date, against }) => cmd_compare(date, against),
        Some(Commands::Streak) => cmd_streak(),
        Some(Commands::Calendar { month }) => cmd_calendar(month),
        Some(Commands::Reflect { rating, date }) => cmd_reflect(rating, date, false),
        Some(Commands::History { page, month }) => {
            cmd_history(page, if month { TimeFrame::Month } else { TimeFrame::Week })
        }
        Some(Commands::Sync) => cmd_sync(false),
        Some(Commands::Reset { force }) => cmd_reset(force),
        Some(Commands::Completions { shell }) => {
            let shell_enum = match shell.as_str() {
                "bash" => Shell::Bash,
                "zsh" => Shell::Zsh,
                "fish" => Shell::Fish,
                "powershell" => Shell::PowerShell,
                "elvish" => Shell::Elvish,
                _ => {
                    eprintln!("Unsupported shell: {}", shell);
                    return Ok(());
                }
            };
            let mut cmd = Cli::command();
            generate(shell_enum, &mut cmd, "betterday", &mut io::stdout());
            Ok(())
        }
        Some(Commands::Ui) | None => {
            if let Err(e) = run_tui() {
                eprintln!("Error running TUI: {}", e);
            }
            Ok(())
        }
    }
}
