use std::io::{self, Write};
use chrono::{Datelike, Duration, Local, NaiveDate};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use log::info;
use crate::boundary::{can_reflect_on, effective_day};
use crate::calendar::is_completed;
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::models::{Rating, Recurrence, Schedule, Task, WeekdaySet};
use crate::progress::{
    compare_progress, completion_stats, month_grid, monthly_counts, reflection_chart, streak,
    weekly_counts, DayStatus, TimeFrame,
};
use crate::state::{AppState, Command, Outcome};
use crate::storage::{data_dir, Store};
use crate::sync::Repository;

/// Number of past reflections shown per history page.
pub const HISTORY_PAGE_SIZE: usize = 7;

/// Loaded configuration, repository and state for one command.
pub struct Session {
    pub config: Config,
    pub repo: Repository,
    pub state: AppState,
}

impl Session {
    /// Opens the data directory. Load failures are returned so that a damaged
    /// document is never overwritten.
    pub fn open() -> AppResult<Session> {
        let dir = data_dir();
        let config = Config::load(&dir);
        let repo = Repository::from_config(Store::new(dir), &config);
        let state = repo.load_state()?;
        Ok(Session { config, repo, state })
    }

    /// Opens the data directory for reading, degrading to an empty state.
    pub fn open_read_only() -> Session {
        let dir = data_dir();
        let config = Config::load(&dir);
        let repo = Repository::from_config(Store::new(dir), &config);
        let state = repo.load_state_or_empty();
        Session { config, repo, state }
    }

    /// Applies `command` and persists what it changed.
    pub fn execute(&mut self, command: Command) -> AppResult<Outcome> {
        let outcome = self.state.apply(command)?;
        self.repo.persist(&self.state, &outcome)?;
        info!("persisted {:?}", outcome);
        Ok(outcome)
    }

    /// The day the user is living in, honoring the reflection cutoff.
    pub fn today(&self) -> NaiveDate {
        effective_day(Local::now().naive_local(), self.config.reflection_cutoff_hour)
    }

    fn resolve_date(&self, date: Option<String>) -> AppResult<NaiveDate> {
        match date {
            Some(d) => parse_date(&d),
            None => Ok(self.today()),
        }
    }
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| AppError::InvalidDate(s.to_string()))
}

/// Parses a `YYYY-MM` month into its first day.
pub fn parse_month(s: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d").map_err(|_| AppError::InvalidMonth(s.to_string()))
}

fn schedule_label(task: &Task) -> String {
    match &task.schedule {
        Schedule::OneTime => "Once".to_string(),
        Schedule::Recurring(rec) => rec.weekdays.to_string(),
    }
}

/// Adds a new task.
///
/// A task is recurring when `recur` is set or `days` is given; without
/// `days` it repeats daily.
pub fn cmd_add(title: String, description: Option<String>, recur: bool, days: Option<String>, date: Option<String>, silent: bool) -> AppResult<()> {
    let mut session = Session::open()?;
    let on = session.resolve_date(date)?;
    let schedule = match days {
        Some(d) => Schedule::Recurring(Recurrence::new(d.parse::<WeekdaySet>()?)),
        None if recur => Schedule::Recurring(Recurrence::daily()),
        None => Schedule::OneTime,
    };
    let outcome = session.execute(Command::AddTask { title, description, schedule, on })?;
    if !silent {
        if let Some(id) = outcome.created.first() {
            println!("Task added (id = {})", id);
        }
    }
    Ok(())
}

/// Marks a task done or not done on a day.
pub fn cmd_set_done(id: u64, date: Option<String>, completed: bool, silent: bool) -> AppResult<()> {
    let mut session = Session::open()?;
    let date = session.resolve_date(date)?;
    session.execute(Command::SetCompletion { id, date, completed })?;
    if !silent {
        let state = if completed { "complete" } else { "not complete" };
        println!("Task {} marked as {} on {}.", id, state, date);
    }
    Ok(())
}

/// Flips the completion of a task on a day.
pub fn cmd_toggle(id: u64, date: Option<String>, silent: bool) -> AppResult<()> {
    let mut session = Session::open()?;
    let date = session.resolve_date(date)?;
    session.execute(Command::ToggleCompletion { id, date })?;
    if !silent {
        let done = session.state.task(id).map(|t| is_completed(t, date)).unwrap_or(false);
        println!("Task {} is now {} on {}.", id, if done { "done" } else { "pending" }, date);
    }
    Ok(())
}

/// Edits an existing task. New weekdays apply from `from` (default today),
/// earlier days keep their schedule.
pub fn cmd_edit(id: u64, title: Option<String>, description: Option<String>, days: Option<String>, from: Option<String>, silent: bool) -> AppResult<()> {
    let mut session = Session::open()?;
    let effective = session.resolve_date(from)?;
    let weekdays = days.map(|d| d.parse::<WeekdaySet>()).transpose()?;
    session.execute(Command::EditTask { id, title, description, weekdays, effective })?;
    if !silent {
        println!("Task {} updated.", id);
    }
    Ok(())
}

/// Removes a task. With `from`, a recurring task instead stops occurring from that day.
pub fn cmd_remove(id: u64, from: Option<String>, silent: bool) -> AppResult<()> {
    let mut session = Session::open()?;
    let from = from.map(|d| parse_date(&d)).transpose()?;
    let outcome = session.execute(Command::DeleteTask { id, from })?;
    if !silent {
        match from {
            Some(day) if outcome.removed.is_empty() => println!("Task {} ends on {}.", id, day),
            _ => println!("Task {} removed.", id),
        }
    }
    Ok(())
}

/// Skips a recurring task on one day.
pub fn cmd_ignore(id: u64, date: Option<String>, silent: bool) -> AppResult<()> {
    let mut session = Session::open()?;
    let date = session.resolve_date(date)?;
    session.execute(Command::IgnoreForDay { id, date })?;
    if !silent {
        println!("Task {} skipped on {}.", id, date);
    }
    Ok(())
}

/// Restores a skipped day.
pub fn cmd_unignore(id: u64, date: Option<String>, silent: bool) -> AppResult<()> {
    let mut session = Session::open()?;
    let date = session.resolve_date(date)?;
    session.execute(Command::UnignoreForDay { id, date })?;
    if !silent {
        println!("Task {} restored on {}.", id, date);
    }
    Ok(())
}

/// Postpones a task to the following day.
pub fn cmd_move(id: u64, date: Option<String>, silent: bool) -> AppResult<()> {
    let mut session = Session::open()?;
    let from = session.resolve_date(date)?;
    let outcome = session.execute(Command::MoveToNextDay { id, from })?;
    if !silent {
        if let Some(new_id) = outcome.created.first() {
            println!("Task {} moved to {} (id = {}).", id, from + Duration::days(1), new_id);
        }
    }
    Ok(())
}

/// Lists the tasks of a day, or the ones skipped on it.
pub fn cmd_list(date: Option<String>, ignored: bool) -> AppResult<()> {
    let session = Session::open_read_only();
    let date = session.resolve_date(date)?;
    let tasks = if ignored { session.state.ignored_on(date) } else { session.state.tasks_on(date) };
    if tasks.is_empty() {
        println!("No tasks found for {}.", date);
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("Title").add_attribute(Attribute::Bold),
            Cell::new("Repeats").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
            Cell::new("Description").add_attribute(Attribute::Bold),
        ]);

    for t in &tasks {
        let status = if ignored {
            Cell::new("Skipped").fg(Color::Grey)
        } else if is_completed(t, date) {
            Cell::new("Done").fg(Color::Green)
        } else {
            Cell::new("Pending").fg(Color::Yellow)
        };
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(&t.title),
            Cell::new(schedule_label(t)),
            status,
            Cell::new(t.description.clone().unwrap_or_default()),
        ]);
    }

    println!("{}", date.format("%A, %B %-d, %Y"));
    println!("{table}");
    if !ignored {
        let stats = completion_stats(&session.state.tasks, date);
        println!("{}/{} done ({:.1}%)", stats.completed, stats.available, stats.percentage());
    }
    Ok(())
}

/// Lists every recurring task with its schedule.
pub fn cmd_recurring() -> AppResult<()> {
    let session = Session::open_read_only();
    let tasks = session.state.recurring_tasks();
    if tasks.is_empty() {
        println!("No recurring tasks.");
        return Ok(());
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL)
        .set_header(vec!["ID", "Title", "Repeats", "Since", "Changed On", "Ends"]);
    for t in tasks {
        let rec = t.recurrence();
        table.add_row(vec![
            t.id.to_string(),
            t.title.clone(),
            schedule_label(t),
            t.created_on.to_string(),
            rec.and_then(|r| r.effective_from).map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
            rec.and_then(|r| r.ends_on).map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
        ]);
    }
    println!("{table}");
    Ok(())
}

/// Compares completion on `date` with `against` (default: the day before).
pub fn cmd_compare(date: Option<String>, against: Option<String>) -> AppResult<()> {
    let session = Session::open_read_only();
    let current = session.resolve_date(date)?;
    let previous = match against {
        Some(d) => parse_date(&d)?,
        None => current - Duration::days(1),
    };
    let cmp = compare_progress(&session.state.tasks, current, previous);

    let mut table = Table::new();
    table.load_preset(UTF8_FULL)
        .set_header(vec!["Day", "Done", "Available", "Completion"]);
    for (day, stats) in [(cmp.previous_date, cmp.previous), (cmp.current_date, cmp.current)] {
        table.add_row(vec![
            day.to_string(),
            stats.completed.to_string(),
            stats.available.to_string(),
            format!("{:.1}%", stats.percentage()),
        ]);
    }
    println!("{table}");

    if cmp.is_perfect() {
        println!("Perfect two days in a row!");
    } else if cmp.is_improvement() {
        println!("Better than the day before: {}", cmp.formatted_change());
    } else {
        println!("Change: {}", cmp.formatted_change());
    }
    Ok(())
}

/// Prints the current streak.
pub fn cmd_streak() -> AppResult<()> {
    let session = Session::open_read_only();
    let days = streak(&session.state.tasks, session.today());
    println!("Current streak: {} day{}", days, if days == 1 { "" } else { "s" });
    Ok(())
}

/// Prints a month grid colored by completion.
pub fn cmd_calendar(month: Option<String>) -> AppResult<()> {
    let session = Session::open_read_only();
    let today = session.today();
    let month = match month {
        Some(m) => parse_month(&m)?,
        None => today,
    };
    let days = month_grid(&session.state.tasks, month, today);

    let mut table = Table::new();
    table.load_preset(UTF8_FULL)
        .set_header(vec!["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]);

    let mut row: Vec<Cell> = Vec::new();
    if let Some((first, _)) = days.first() {
        for _ in 0..first.weekday().num_days_from_monday() {
            row.push(Cell::new(""));
        }
    }
    for (day, status) in days {
        let color = match status {
            DayStatus::Full => Color::Green,
            DayStatus::Partial => Color::Yellow,
            DayStatus::None if day > today => Color::DarkGrey,
            DayStatus::None => Color::Reset,
        };
        let mut cell = Cell::new(day.day()).fg(color);
        if day == today {
            cell = cell.add_attribute(Attribute::Bold);
        }
        row.push(cell);
        if row.len() == 7 {
            table.add_row(std::mem::take(&mut row));
        }
    }
    if !row.is_empty() {
        table.add_row(row);
    }

    println!("{}", month.format("%B %Y"));
    println!("{table}");
    println!(
        "Legend: green = {}, yellow = {}",
        DayStatus::Full.description().to_lowercase(),
        DayStatus::Partial.description().to_lowercase()
    );
    Ok(())
}

/// Records the reflection for a day.
pub fn cmd_reflect(rating: String, date: Option<String>, silent: bool) -> AppResult<()> {
    let mut session = Session::open()?;
    let rating: Rating = rating.parse()?;
    let date = session.resolve_date(date)?;
    if !can_reflect_on(date, Local::now().naive_local(), session.config.reflection_cutoff_hour) {
        return Err(AppError::ReflectionClosed(date));
    }
    session.execute(Command::RecordReflection { date, rating })?;
    if !silent {
        if let Some(r) = session.state.reflection_on(date) {
            println!("{}: {} ({}/{} tasks)", date, r.rating, r.tasks_completed, r.total_tasks);
        }
        println!("{}", rating.message());
    }
    Ok(())
}

/// Shows reflection history: summary counts, a cumulative chart and one page of past entries.
pub fn cmd_history(page: usize, frame: TimeFrame) -> AppResult<()> {
    let session = Session::open_read_only();
    let today = session.today();
    let reflections = &session.state.reflections;

    if let Some(r) = session.state.reflection_on(today) {
        println!("Today: {} ({}/{} tasks)", r.rating, r.tasks_completed, r.total_tasks);
    } else {
        println!("Today: not reflected yet");
    }

    let week = weekly_counts(reflections, today);
    let month = monthly_counts(reflections, today);
    println!("Last 7 days:  {} better, {} same, {} worse", week.better, week.same, week.worse);
    println!("Last month:   {} better, {} same, {} worse", month.better, month.same, month.worse);

    let mut chart = Table::new();
    chart.load_preset(UTF8_FULL).set_header(vec!["Day", "Rating", "Progress"]);
    for point in reflection_chart(reflections, today, frame) {
        let rating = point.rating.map(|r| r.to_string()).unwrap_or_else(|| "-".into());
        chart.add_row(vec![
            Cell::new(point.date.format("%a %d %b")),
            Cell::new(rating),
            Cell::new(format!("{:+}", point.value)),
        ]);
    }
    println!("{chart}");

    let past: Vec<_> = session.state.reflections_by_recency().into_iter().filter(|r| r.date != today).collect();
    let start = page.saturating_sub(1) * HISTORY_PAGE_SIZE;
    if start >= past.len() {
        if page > 1 {
            println!("No more reflections.");
        }
        return Ok(());
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL)
        .set_header(vec!["Date", "Rating", "Done", "Total"]);
    for r in past.iter().skip(start).take(HISTORY_PAGE_SIZE) {
        let color = match r.rating {
            Rating::Better => Color::Green,
            Rating::Same => Color::Blue,
            Rating::Worse => Color::Red,
        };
        table.add_row(vec![
            Cell::new(r.date),
            Cell::new(r.rating).fg(color),
            Cell::new(r.tasks_completed),
            Cell::new(r.total_tasks),
        ]);
    }
    println!("{table}");
    let pages = past.len().div_ceil(HISTORY_PAGE_SIZE);
    println!("Page {} of {}", page.max(1), pages);
    Ok(())
}

/// Uploads every record to the configured sync folder.
pub fn cmd_sync(silent: bool) -> AppResult<()> {
    let mut session = Session::open()?;
    let count = session.repo.push_all(&session.state)?;
    if !silent {
        println!("Synced {} record(s).", count);
    }
    Ok(())
}

/// Resets the database by deleting all tasks and reflections, including
/// their copies in the sync folder.
pub fn cmd_reset(force: bool) -> AppResult<()> {
    if !force {
        print!("Are you sure you want to delete all tasks and reflections? This cannot be undone. [y/N] ");
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if input.trim().to_lowercase() != "y" {
            println!("Aborted.");
            return Ok(());
        }
    }

    let dir = data_dir();
    let config = Config::load(&dir);
    let mut repo = Repository::from_config(Store::new(dir), &config);
    let mirrored = repo.clear()?;
    if mirrored > 0 {
        println!("Deleted {} record(s) from the sync folder.", mirrored);
    }
    println!("Database reset successfully.");
    Ok(())
}
