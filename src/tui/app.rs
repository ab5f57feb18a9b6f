use chrono::{Duration, Local, NaiveDate};
use ratatui::widgets::TableState;
use crate::boundary::can_reflect_on;
use crate::commands::Session;
use crate::errors::{AppError, AppResult};
use crate::models::{Rating, Recurrence, Schedule, Task, WeekdaySet};
use crate::progress::{compare_progress, streak, ProgressComparison};
use crate::state::Command;

#[derive(PartialEq)]
pub enum InputMode {
    Normal,
    Editing,
    Adding,
    Reflecting,
}

#[derive(PartialEq)]
pub enum ViewMode {
    Day,
    Skipped,
}

pub enum InputField {
    None,
    Title,
    Weekdays,
}

/// State for the multi-step "Add Task" wizard.
#[derive(Default)]
pub struct AddState {
    pub title: String,
    pub description: Option<String>,
    pub step: usize, // 0: Title, 1: Description, 2: Weekdays
}

pub struct App {
    pub session: Session,
    /// Day being shown.
    pub date: NaiveDate,
    /// Rows of the current view.
    pub tasks: Vec<Task>,
    pub state: TableState,
    pub view_mode: ViewMode,
    pub input_mode: InputMode,
    pub input_field: InputField,
    pub input_buffer: String,
    pub target_id: Option<u64>,
    pub add_state: AddState,
    /// Feedback or error from the last action.
    pub message: Option<String>,
}

impl App {
    /// Creates a new App instance showing today.
    pub fn new() -> AppResult<App> {
        let session = Session::open()?;
        let date = session.today();
        let mut app = App {
            session,
            date,
            tasks: Vec::new(),
            state: TableState::default(),
            view_mode: ViewMode::Day,
            input_mode: InputMode::Normal,
            input_field: InputField::None,
            input_buffer: String::new(),
            target_id: None,
            add_state: AddState::default(),
            message: None,
        };
        app.reload();
        Ok(app)
    }

    /// Refreshes the rows for the shown day and clamps the selection.
    pub fn reload(&mut self) {
        let rows = match self.view_mode {
            ViewMode::Day => self.session.state.tasks_on(self.date),
            ViewMode::Skipped => self.session.state.ignored_on(self.date),
        };
        self.tasks = rows.into_iter().cloned().collect();

        if self.tasks.is_empty() {
            self.state.select(None);
        } else if let Some(i) = self.state.selected() {
            if i >= self.tasks.len() {
                self.state.select(Some(self.tasks.len() - 1));
            }
        } else {
            self.state.select(Some(0));
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.session.today()
    }

    pub fn comparison(&self) -> ProgressComparison {
        compare_progress(&self.session.state.tasks, self.date, self.date - Duration::days(1))
    }

    pub fn streak(&self) -> u32 {
        streak(&self.session.state.tasks, self.today())
    }

    /// Selects the next row.
    pub fn next(&mut self) {
        if self.tasks.is_empty() { return; }
        let i = match self.state.selected() {
            Some(i) if i + 1 < self.tasks.len() => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    /// Selects the previous row.
    pub fn previous(&mut self) {
        if self.tasks.is_empty() { return; }
        let i = match self.state.selected() {
            Some(0) | None => self.tasks.len() - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn shift_day(&mut self, days: i64) {
        self.date = self.date + Duration::days(days);
        self.reload();
    }

    pub fn go_today(&mut self) {
        self.date = self.today();
        self.reload();
    }

    pub fn toggle_view(&mut self) {
        self.view_mode = match self.view_mode {
            ViewMode::Day => ViewMode::Skipped,
            ViewMode::Skipped => ViewMode::Day,
        };
        self.state.select(None);
        self.reload();
    }

    fn selected_id(&self) -> Option<u64> {
        self.state.selected().and_then(|i| self.tasks.get(i)).map(|t| t.id)
    }

    /// Runs a command and reports the result in the status line.
    fn run(&mut self, command: Command, success: &str) {
        self.message = match self.session.execute(command) {
            Ok(_) => Some(success.to_string()),
            Err(e) => Some(e.to_string()),
        };
        self.reload();
    }

    pub fn toggle_selected(&mut self) {
        if self.view_mode != ViewMode::Day { return; }
        if let Some(id) = self.selected_id() {
            self.run(Command::ToggleCompletion { id, date: self.date }, "Updated");
        }
    }

    /// Skips the selected task for the shown day, or restores it in the skipped view.
    pub fn skip_selected(&mut self) {
        if let Some(id) = self.selected_id() {
            match self.view_mode {
                ViewMode::Day => self.run(Command::IgnoreForDay { id, date: self.date }, "Skipped for the day"),
                ViewMode::Skipped => self.run(Command::UnignoreForDay { id, date: self.date }, "Restored"),
            }
        }
    }

    pub fn move_selected(&mut self) {
        if self.view_mode != ViewMode::Day { return; }
        if let Some(id) = self.selected_id() {
            self.run(Command::MoveToNextDay { id, from: self.date }, "Moved to the next day");
        }
    }

    /// Deletes one-time tasks; recurring tasks end from the shown day.
    pub fn delete_selected(&mut self) {
        if self.view_mode != ViewMode::Day { return; }
        if let Some(id) = self.selected_id() {
            self.run(Command::DeleteTask { id, from: Some(self.date) }, "Deleted");
        }
    }

    /// Initiates the "Add Task" wizard.
    pub fn start_add(&mut self) {
        self.input_mode = InputMode::Adding;
        self.add_state = AddState::default();
        self.input_buffer.clear();
    }

    pub fn start_reflect(&mut self) {
        self.input_mode = InputMode::Reflecting;
        self.input_buffer.clear();
    }

    /// Initiates editing of a field of the selected task.
    pub fn start_edit(&mut self, field: InputField) {
        if self.view_mode != ViewMode::Day { return; }
        let Some(t) = self.state.selected().and_then(|i| self.tasks.get(i)) else { return; };
        self.input_buffer = match field {
            InputField::Title => t.title.clone(),
            InputField::Weekdays => match &t.schedule {
                Schedule::Recurring(rec) => weekday_input(rec.weekdays),
                Schedule::OneTime => String::new(),
            },
            InputField::None => String::new(),
        };
        self.target_id = Some(t.id);
        self.input_field = field;
        self.input_mode = InputMode::Editing;
    }

    pub fn cancel_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input_buffer.clear();
    }

    /// Handles Enter according to the current mode.
    pub fn handle_input(&mut self) {
        match self.input_mode {
            InputMode::Adding => self.handle_adding_input(),
            InputMode::Editing => self.handle_editing_input(),
            InputMode::Reflecting => self.handle_reflect_input(),
            InputMode::Normal => {}
        }
    }

    fn handle_adding_input(&mut self) {
        match self.add_state.step {
            0 => { // Title
                if !self.input_buffer.trim().is_empty() {
                    self.add_state.title = std::mem::take(&mut self.input_buffer);
                    self.add_state.step += 1;
                }
            }
            1 => { // Description
                let text = std::mem::take(&mut self.input_buffer);
                self.add_state.description = Some(text).filter(|d| !d.trim().is_empty());
                self.add_state.step += 1;
            }
            2 => { // Weekdays, empty for a one-time task
                let schedule = if self.input_buffer.trim().is_empty() {
                    Ok(Schedule::OneTime)
                } else {
                    self.input_buffer.parse::<WeekdaySet>().map(|d| Schedule::Recurring(Recurrence::new(d)))
                };
                match schedule {
                    Ok(schedule) => {
                        let command = Command::AddTask {
                            title: self.add_state.title.clone(),
                            description: self.add_state.description.take(),
                            schedule,
                            on: self.date,
                        };
                        self.input_mode = InputMode::Normal;
                        self.input_buffer.clear();
                        self.run(command, "Task added");
                    }
                    Err(e) => self.message = Some(e.to_string()),
                }
            }
            _ => {}
        }
    }

    fn handle_editing_input(&mut self) {
        let Some(id) = self.target_id else { return; };
        let input = std::mem::take(&mut self.input_buffer);
        let command = match self.input_field {
            InputField::Title => Ok(Command::EditTask { id, title: Some(input), description: None, weekdays: None, effective: self.date }),
            InputField::Weekdays => input
                .parse::<WeekdaySet>()
                .map(|days| Command::EditTask { id, title: None, description: None, weekdays: Some(days), effective: self.date }),
            InputField::None => return,
        };
        self.input_mode = InputMode::Normal;
        match command {
            Ok(command) => self.run(command, "Task updated"),
            Err(e) => self.message = Some(e.to_string()),
        }
    }

    fn handle_reflect_input(&mut self) {
        let input = std::mem::take(&mut self.input_buffer);
        self.input_mode = InputMode::Normal;
        let rating = match input.parse::<Rating>() {
            Ok(r) => r,
            Err(e) => {
                self.message = Some(e.to_string());
                return;
            }
        };
        if !can_reflect_on(self.date, Local::now().naive_local(), self.session.config.reflection_cutoff_hour) {
            self.message = Some(AppError::ReflectionClosed(self.date).to_string());
            return;
        }
        self.run(Command::RecordReflection { date: self.date, rating }, rating.message());
    }
}

/// Weekday set as typed in the input box, e.g. `mon,wed,fri`.
fn weekday_input(days: WeekdaySet) -> String {
    if days == WeekdaySet::ALL {
        return "daily".to_string();
    }
    days.iter().map(|d| d.to_string().to_lowercase()).collect::<Vec<_>>().join(",")
}
