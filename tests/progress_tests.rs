use betterday::calendar::toggle_completion;
use betterday::models::{DailyReflection, Rating, Recurrence, Schedule, Task, WeekdaySet};
use betterday::progress::*;
use chrono::NaiveDate;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn daily(id: u64, created: NaiveDate) -> Task {
    Task::new(id, "Daily habit", None, Schedule::Recurring(Recurrence::new(WeekdaySet::ALL)), created).unwrap()
}

fn reflection(date: NaiveDate, rating: Rating) -> DailyReflection {
    DailyReflection::new(date, rating, 0, 0).unwrap()
}

#[test]
fn test_compare_with_no_tasks_is_zero() {
    let cmp = compare_progress(&[], d(2024, 1, 2), d(2024, 1, 1));
    assert_eq!(cmp.percent_change, 0.0);
    assert!(!cmp.percent_change.is_nan());
    assert!(!cmp.is_improvement());
    assert!(!cmp.is_perfect());
    assert_eq!(cmp.formatted_change(), "0.0%");
}

#[test]
fn test_compare_reports_improvement() {
    let mut tasks = vec![daily(1, d(2024, 1, 1)), daily(2, d(2024, 1, 1))];
    toggle_completion(&mut tasks[0], d(2024, 1, 1), true);
    toggle_completion(&mut tasks[0], d(2024, 1, 2), true);
    toggle_completion(&mut tasks[1], d(2024, 1, 2), true);

    let cmp = compare_progress(&tasks, d(2024, 1, 2), d(2024, 1, 1));
    assert_eq!(cmp.current, Stats { available: 2, completed: 2 });
    assert_eq!(cmp.previous, Stats { available: 2, completed: 1 });
    assert_eq!(cmp.percent_change, 50.0);
    assert!(cmp.is_improvement());
    assert!(!cmp.is_perfect());
    assert_eq!(cmp.formatted_change(), "+50.0%");

    let back = compare_progress(&tasks, d(2024, 1, 1), d(2024, 1, 2));
    assert_eq!(back.formatted_change(), "-50.0%");
}

#[test]
fn test_perfect_needs_both_days_complete() {
    let mut tasks = vec![daily(1, d(2024, 1, 1))];
    toggle_completion(&mut tasks[0], d(2024, 1, 1), true);
    toggle_completion(&mut tasks[0], d(2024, 1, 2), true);
    let cmp = compare_progress(&tasks, d(2024, 1, 2), d(2024, 1, 1));
    assert!(cmp.is_perfect());
    assert!(!cmp.is_improvement());
}

#[test]
fn test_completion_percentage_ignores_unavailable_tasks() {
    let mut tasks = vec![
        daily(1, d(2024, 1, 1)),
        Task::new(2, "Later", None, Schedule::OneTime, d(2024, 1, 9)).unwrap(),
    ];
    toggle_completion(&mut tasks[0], d(2024, 1, 3), true);
    assert_eq!(completion_percentage(&tasks, d(2024, 1, 3)), 100.0);
    assert_eq!(completion_percentage(&tasks, d(2024, 1, 9)), 0.0);
    assert_eq!(completion_stats(&tasks, d(2024, 1, 9)), Stats { available: 2, completed: 0 });
}

#[test]
fn test_day_status() {
    let mut tasks = vec![daily(1, d(2024, 1, 1)), daily(2, d(2024, 1, 1))];
    toggle_completion(&mut tasks[0], d(2024, 1, 2), true);
    toggle_completion(&mut tasks[0], d(2024, 1, 3), true);
    toggle_completion(&mut tasks[1], d(2024, 1, 3), true);
    toggle_completion(&mut tasks[0], d(2024, 1, 6), true);
    let today = d(2024, 1, 5);

    assert_eq!(day_status(&tasks, d(2024, 1, 1), today), DayStatus::None);
    assert_eq!(day_status(&tasks, d(2024, 1, 2), today), DayStatus::Partial);
    assert_eq!(day_status(&tasks, d(2024, 1, 3), today), DayStatus::Full);
    // Future days never count.
    assert_eq!(day_status(&tasks, d(2024, 1, 6), today), DayStatus::None);
}

#[test]
fn test_month_grid_covers_whole_month() {
    let tasks = vec![daily(1, d(2024, 1, 1))];
    let grid = month_grid(&tasks, d(2024, 2, 17), d(2024, 2, 20));
    assert_eq!(grid.len(), 29);
    assert_eq!(grid.first().unwrap().0, d(2024, 2, 1));
    assert_eq!(grid.last().unwrap().0, d(2024, 2, 29));
    assert_eq!(month_grid(&tasks, d(2023, 12, 1), d(2024, 2, 20)).len(), 31);
}

#[test]
fn test_streak_counts_back_from_today() {
    let mut tasks = vec![daily(1, d(2024, 1, 1))];
    for day in [3, 4, 5] {
        toggle_completion(&mut tasks[0], d(2024, 1, day), true);
    }
    assert_eq!(streak(&tasks, d(2024, 1, 5)), 3);
    assert_eq!(streak(&tasks, d(2024, 1, 4)), 2);
    assert_eq!(streak(&tasks, d(2024, 1, 6)), 0);
}

#[test]
fn test_streak_stops_at_first_task_creation() {
    let mut tasks = vec![daily(1, d(2024, 1, 10))];
    for day in 10..=12 {
        toggle_completion(&mut tasks[0], d(2024, 1, day), true);
    }
    assert_eq!(streak(&tasks, d(2024, 1, 12)), 3);
    assert_eq!(streak(&[], d(2024, 1, 12)), 0);
}

#[test]
fn test_rating_counts_by_period() {
    let reflections = vec![
        reflection(d(2024, 1, 30), Rating::Better),
        reflection(d(2024, 1, 28), Rating::Better),
        reflection(d(2024, 1, 20), Rating::Worse),
        reflection(d(2024, 1, 5), Rating::Same),
        reflection(d(2023, 12, 1), Rating::Worse),
    ];
    let today = d(2024, 1, 31);
    assert_eq!(weekly_counts(&reflections, today), RatingCounts { better: 2, same: 0, worse: 0 });
    assert_eq!(monthly_counts(&reflections, today), RatingCounts { better: 2, same: 1, worse: 1 });
}

#[test]
fn test_reflection_chart_is_cumulative() {
    let reflections = vec![
        reflection(d(2024, 1, 2), Rating::Better),
        reflection(d(2024, 1, 3), Rating::Better),
        reflection(d(2024, 1, 5), Rating::Worse),
        reflection(d(2024, 1, 6), Rating::Same),
    ];
    let chart = reflection_chart(&reflections, d(2024, 1, 7), TimeFrame::Week);
    assert_eq!(chart.len(), 7);
    assert_eq!(chart[0].date, d(2024, 1, 1));
    let values: Vec<i32> = chart.iter().map(|p| p.value).collect();
    assert_eq!(values, vec![0, 1, 2, 2, 1, 1, 1]);
    assert_eq!(chart[3].rating, None);
    assert_eq!(chart[4].rating, Some(Rating::Worse));

    assert_eq!(reflection_chart(&reflections, d(2024, 1, 7), TimeFrame::Month).len(), 30);
}

#[test]
fn test_recent_reflections_newest_first() {
    let reflections = vec![
        reflection(d(2024, 1, 2), Rating::Better),
        reflection(d(2024, 1, 6), Rating::Same),
        reflection(d(2023, 12, 1), Rating::Worse),
    ];
    let recent = recent_reflections(&reflections, d(2024, 1, 7), TimeFrame::Week);
    let dates: Vec<NaiveDate> = recent.iter().map(|r| r.date).collect();
    assert_eq!(dates, vec![d(2024, 1, 6), d(2024, 1, 2)]);
}
