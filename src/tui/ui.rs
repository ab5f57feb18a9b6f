use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};
use crate::calendar::is_completed;
use crate::models::Schedule;
use super::app::{App, InputField, InputMode, ViewMode};

pub fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Summary
            Constraint::Min(0),    // Table
            Constraint::Length(3)  // Help
        ].as_ref())
        .split(f.area());

    render_summary(f, app, chunks[0]);

    let rows: Vec<Row> = app
        .tasks
        .iter()
        .map(|t| {
            let done = is_completed(t, app.date);
            let (status, style) = match app.view_mode {
                ViewMode::Skipped => ("Skipped", Style::default().fg(Color::DarkGray)),
                ViewMode::Day if done => ("Done", Style::default().fg(Color::Green)),
                ViewMode::Day => ("Pending", Style::default().fg(Color::Yellow)),
            };
            let repeats = match &t.schedule {
                Schedule::OneTime => "Once".to_string(),
                Schedule::Recurring(rec) => rec.weekdays.to_string(),
            };
            Row::new(vec![
                Cell::from(t.id.to_string()),
                Cell::from(t.title.clone()),
                Cell::from(repeats),
                Cell::from(status),
                Cell::from(t.description.clone().unwrap_or_default()),
            ]).style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(4),
        Constraint::Min(20),
        Constraint::Length(28),
        Constraint::Length(8),
        Constraint::Min(10),
    ];

    let title = match app.view_mode {
        ViewMode::Day => format!("betterday - {}", app.date.format("%A %d %B %Y")),
        ViewMode::Skipped => format!("betterday - skipped on {}", app.date.format("%A %d %B %Y")),
    };
    let table = Table::new(rows, widths)
        .header(Row::new(vec!["ID", "Title", "Repeats", "Status", "Description"])
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .bottom_margin(1))
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ");

    f.render_stateful_widget(table, chunks[1], &mut app.state);

    let help_text = match app.input_mode {
        InputMode::Normal => match app.view_mode {
            ViewMode::Day => "q: Quit | h/l: Day | t: Today | Space: Done | a: Add | e: Title | w: Weekdays | s: Skip | m: Move | d: Del | r: Reflect | i: Skipped",
            ViewMode::Skipped => "q: Quit | h/l: Day | s: Restore | i: Back to tasks",
        },
        InputMode::Editing => "Enter: Save | Esc: Cancel",
        InputMode::Adding => "Enter: Next Step | Esc: Cancel",
        InputMode::Reflecting => "better / same / worse, Enter: Save | Esc: Cancel",
    };
    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[2]);

    if app.input_mode != InputMode::Normal {
        let area = centered_rect(60, 3, f.area());
        f.render_widget(Clear, area);

        let title = match app.input_mode {
            InputMode::Adding => match app.add_state.step {
                0 => "Add Task: Enter Title",
                1 => "Add Task: Enter Description (Optional)",
                _ => "Add Task: Weekdays (mon,wed / daily / empty for once)",
            },
            InputMode::Editing => match app.input_field {
                InputField::Title => "Edit Title",
                InputField::Weekdays => "Edit Weekdays (from the shown day on)",
                InputField::None => "Edit",
            },
            InputMode::Reflecting => "How was this day compared to the one before?",
            InputMode::Normal => "",
        };

        let input = Paragraph::new(app.input_buffer.as_str())
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(input, area);
    }
}

fn render_summary(f: &mut Frame, app: &App, area: Rect) {
    let cmp = app.comparison();
    let change_color = if cmp.is_improvement() { Color::Green } else if cmp.percent_change < 0.0 { Color::Red } else { Color::Gray };
    let reflection = match app.session.state.reflection_on(app.date) {
        Some(r) => format!("Reflection: {}", r.rating),
        None => "Reflection: -".to_string(),
    };
    let line1 = format!(
        "{}/{} done ({:.1}%)   vs previous day: {}   Streak: {}",
        cmp.current.completed,
        cmp.current.available,
        cmp.current.percentage(),
        cmp.formatted_change(),
        app.streak(),
    );
    let line2 = match &app.message {
        Some(m) => format!("{}   {}", reflection, m),
        None => reflection,
    };
    let summary = Paragraph::new(format!("{}\n{}", line1, line2))
        .style(Style::default().fg(change_color))
        .block(Block::default().borders(Borders::ALL).title("Progress"));
    f.render_widget(summary, area);
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let margin = r.height.saturating_sub(height) / 2;
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(margin),
            Constraint::Length(height),
            Constraint::Length(margin),
        ].as_ref())
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ].as_ref())
        .split(popup_layout[1])[1]
}
