//! Derived statistics: daily completion, day-over-day comparison, streaks,
//! the month grid and reflection summaries.

use chrono::{Datelike, Duration, Months, NaiveDate};
use crate::calendar::{completion_count, is_available, is_completed};
use crate::models::{DailyReflection, Rating, Task};

/// Available and completed task counts for one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
    pub available: u32,
    pub completed: u32,
}

impl Stats {
    /// Completion in percent, `0.0` when nothing was available.
    pub fn percentage(&self) -> f64 {
        if self.available == 0 {
            return 0.0;
        }
        f64::from(self.completed) / f64::from(self.available) * 100.0
    }

    pub fn is_complete(&self) -> bool {
        self.available > 0 && self.completed == self.available
    }
}

pub fn completion_stats(tasks: &[Task], date: NaiveDate) -> Stats {
    tasks.iter().fold(Stats::default(), |acc, t| {
        let (available, completed) = completion_count(t, date);
        Stats { available: acc.available + available, completed: acc.completed + completed }
    })
}

pub fn completion_percentage(tasks: &[Task], date: NaiveDate) -> f64 {
    completion_stats(tasks, date).percentage()
}

/// Completion on `current` measured against `previous`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressComparison {
    pub current_date: NaiveDate,
    pub previous_date: NaiveDate,
    pub current: Stats,
    pub previous: Stats,
    /// Percentage points gained (positive) or lost (negative).
    pub percent_change: f64,
}

impl ProgressComparison {
    pub fn is_improvement(&self) -> bool {
        self.percent_change > 0.0
    }

    /// Both days had tasks and every one of them was done.
    pub fn is_perfect(&self) -> bool {
        self.current.is_complete() && self.previous.is_complete()
    }

    pub fn formatted_change(&self) -> String {
        let prefix = if self.percent_change > 0.0 { "+" } else { "" };
        format!("{}{:.1}%", prefix, self.percent_change)
    }
}

pub fn compare_progress(tasks: &[Task], current: NaiveDate, previous: NaiveDate) -> ProgressComparison {
    let current_stats = completion_stats(tasks, current);
    let previous_stats = completion_stats(tasks, previous);
    ProgressComparison {
        current_date: current,
        previous_date: previous,
        current: current_stats,
        previous: previous_stats,
        percent_change: current_stats.percentage() - previous_stats.percentage(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayStatus {
    None,
    Partial,
    Full,
}

impl DayStatus {
    pub fn description(self) -> &'static str {
        match self {
            DayStatus::None => "No tasks completed",
            DayStatus::Partial => "Some tasks completed",
            DayStatus::Full => "All tasks completed",
        }
    }
}

/// Completion status of `date`. Days after `today` are always `None`.
pub fn day_status(tasks: &[Task], date: NaiveDate, today: NaiveDate) -> DayStatus {
    if date > today {
        return DayStatus::None;
    }
    let stats = completion_stats(tasks, date);
    if stats.available == 0 || stats.completed == 0 {
        DayStatus::None
    } else if stats.completed == stats.available {
        DayStatus::Full
    } else {
        DayStatus::Partial
    }
}

/// Every day of the month containing `month` with its status.
pub fn month_grid(tasks: &[Task], month: NaiveDate, today: NaiveDate) -> Vec<(NaiveDate, DayStatus)> {
    let first = month.with_day(1).unwrap_or(month);
    let next = first + Months::new(1);
    first
        .iter_days()
        .take_while(|d| *d < next)
        .map(|d| (d, day_status(tasks, d, today)))
        .collect()
}

/// Consecutive days, ending with `today`, on which at least one available
/// task was completed.
pub fn streak(tasks: &[Task], today: NaiveDate) -> u32 {
    let Some(earliest) = tasks.iter().map(|t| t.created_on).min() else {
        return 0;
    };
    let mut count = 0;
    let mut day = today;
    while day >= earliest {
        let done = tasks.iter().any(|t| is_available(t, day) && is_completed(t, day));
        if !done {
            break;
        }
        count += 1;
        day = day - Duration::days(1);
    }
    count
}

/// Number of reflections per rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RatingCounts {
    pub better: u32,
    pub same: u32,
    pub worse: u32,
}

/// Counts ratings of reflections dated on or after `since`.
pub fn rating_counts(reflections: &[DailyReflection], since: NaiveDate) -> RatingCounts {
    reflections.iter().filter(|r| r.date >= since).fold(RatingCounts::default(), |mut acc, r| {
        match r.rating {
            Rating::Better => acc.better += 1,
            Rating::Same => acc.same += 1,
            Rating::Worse => acc.worse += 1,
        }
        acc
    })
}

pub fn weekly_counts(reflections: &[DailyReflection], today: NaiveDate) -> RatingCounts {
    rating_counts(reflections, today - Duration::days(7))
}

pub fn monthly_counts(reflections: &[DailyReflection], today: NaiveDate) -> RatingCounts {
    rating_counts(reflections, today - Months::new(1))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFrame {
    Week,
    Month,
}

impl TimeFrame {
    pub fn days(self) -> i64 {
        match self {
            TimeFrame::Week => 7,
            TimeFrame::Month => 30,
        }
    }
}

/// One day of the cumulative reflection chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub date: NaiveDate,
    /// Running sum of rating scores up to and including this day.
    pub value: i32,
    pub rating: Option<Rating>,
}

/// Cumulative score over the last week or month, oldest day first, ending `today`.
pub fn reflection_chart(reflections: &[DailyReflection], today: NaiveDate, frame: TimeFrame) -> Vec<ChartPoint> {
    let start = today - Duration::days(frame.days() - 1);
    let mut value = 0;
    start
        .iter_days()
        .take_while(|d| *d <= today)
        .map(|date| {
            let rating = reflections.iter().find(|r| r.date == date).map(|r| r.rating);
            if let Some(r) = rating {
                value += r.score();
            }
            ChartPoint { date, value, rating }
        })
        .collect()
}

/// Reflections of the last week or month, most recent first.
pub fn recent_reflections(reflections: &[DailyReflection], today: NaiveDate, frame: TimeFrame) -> Vec<DailyReflection> {
    let start = today - Duration::days(frame.days() - 1);
    let mut recent: Vec<DailyReflection> = reflections
        .iter()
        .filter(|r| r.date >= start && r.date <= today)
        .cloned()
        .collect();
    recent.sort_by(|a, b| b.date.cmp(&a.date));
    recent
}
