use betterday::calendar::*;
use betterday::errors::AppError;
use betterday::models::{Recurrence, Revision, Schedule, Task, WeekdaySet};
use chrono::{Datelike, Duration, NaiveDate, Weekday};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn days(list: &[Weekday]) -> WeekdaySet {
    list.iter().copied().collect()
}

fn mwf() -> WeekdaySet {
    days(&[Weekday::Mon, Weekday::Wed, Weekday::Fri])
}

fn recurring(weekdays: WeekdaySet, created: NaiveDate) -> Task {
    Task::new(1, "Run", None, Schedule::Recurring(Recurrence::new(weekdays)), created).unwrap()
}

fn one_time(created: NaiveDate) -> Task {
    Task::new(1, "Call the bank", None, Schedule::OneTime, created).unwrap()
}

#[test]
fn test_one_time_task_only_on_creation_day() {
    let created = d(2024, 3, 10);
    let task = one_time(created);
    assert!(is_available(&task, created));
    for offset in [-30, -1, 1, 2, 365] {
        assert!(!is_available(&task, created + Duration::days(offset)));
    }
}

#[test]
fn test_weekday_schedule_scenario() {
    let task = recurring(mwf(), d(2024, 1, 1));
    assert!(is_available(&task, d(2024, 1, 3)));
    assert!(!is_available(&task, d(2024, 1, 2)));
    assert!(!is_available(&task, d(2023, 12, 25)));
}

#[test]
fn test_recurring_available_on_every_selected_day() {
    let created = d(2024, 1, 1);
    let task = recurring(mwf(), created);
    for date in created.iter_days().take(90) {
        assert_eq!(is_available(&task, date), mwf().contains(date.weekday()), "{}", date);
    }
}

#[test]
fn test_daily_recurrence_starts_on_creation() {
    let created = d(2024, 5, 15);
    let task = Task::new(1, "Stretch", None, Schedule::Recurring(Recurrence::daily()), created).unwrap();
    assert!(!is_available(&task, created - Duration::days(1)));
    for date in created.iter_days().take(14) {
        assert!(is_available(&task, date));
    }
}

#[test]
fn test_excluded_day_is_unavailable_until_included() {
    let mut task = recurring(WeekdaySet::ALL, d(2024, 1, 1));
    let day = d(2024, 1, 4);
    exclude(&mut task, day).unwrap();
    assert!(!is_available(&task, day));
    assert!(is_available(&task, d(2024, 1, 5)));

    include(&mut task, day).unwrap();
    assert!(is_available(&task, day));
}

#[test]
fn test_exclude_rejects_one_time_task() {
    let mut task = one_time(d(2024, 1, 1));
    assert!(matches!(exclude(&mut task, d(2024, 1, 1)), Err(AppError::NotRecurring(1))));
}

#[test]
fn test_toggle_completion_is_idempotent() {
    let mut task = recurring(WeekdaySet::ALL, d(2024, 1, 1));
    let day = d(2024, 1, 2);

    toggle_completion(&mut task, day, true);
    toggle_completion(&mut task, day, true);
    assert_eq!(task.completed_dates.len(), 1);
    assert!(is_completed(&task, day));
    assert!(task.modified_at.is_some());

    toggle_completion(&mut task, day, false);
    toggle_completion(&mut task, day, false);
    assert!(task.completed_dates.is_empty());
    assert!(!is_completed(&task, day));
}

#[test]
fn test_completion_count() {
    let mut task = recurring(mwf(), d(2024, 1, 1));
    toggle_completion(&mut task, d(2024, 1, 3), true);
    assert_eq!(completion_count(&task, d(2024, 1, 3)), (1, 1));
    assert_eq!(completion_count(&task, d(2024, 1, 5)), (1, 0));
    // Tuesday is not scheduled, even if marked done.
    toggle_completion(&mut task, d(2024, 1, 2), true);
    assert_eq!(completion_count(&task, d(2024, 1, 2)), (0, 0));
}

#[test]
fn test_reschedule_preserves_history_before_effective_date() {
    let mut task = recurring(mwf(), d(2024, 1, 1));
    toggle_completion(&mut task, d(2024, 1, 3), true);

    let tue_thu = days(&[Weekday::Tue, Weekday::Thu]);
    reschedule(&mut task, tue_thu, d(2024, 1, 15)).unwrap();

    // Before the edit: the Mon/Wed/Fri rule still applies.
    assert!(is_available(&task, d(2024, 1, 3)));
    assert!(is_completed(&task, d(2024, 1, 3)));
    assert!(!is_available(&task, d(2024, 1, 2)));
    // From the edit on: Tue/Thu only.
    assert!(is_available(&task, d(2024, 1, 16)));
    assert!(!is_available(&task, d(2024, 1, 17)));

    let rec = task.recurrence().unwrap();
    assert_eq!(rec.effective_from, Some(d(2024, 1, 15)));
    assert_eq!(rec.revisions, vec![Revision { from: d(2024, 1, 1), weekdays: mwf() }]);
}

#[test]
fn test_second_reschedule_keeps_every_period() {
    let mut task = recurring(mwf(), d(2024, 1, 1));
    reschedule(&mut task, days(&[Weekday::Tue, Weekday::Thu]), d(2024, 1, 15)).unwrap();
    reschedule(&mut task, days(&[Weekday::Sat]), d(2024, 2, 5)).unwrap();

    assert!(is_available(&task, d(2024, 1, 3)));  // Wed, first rule
    assert!(is_available(&task, d(2024, 1, 16))); // Tue, second rule
    assert!(!is_available(&task, d(2024, 2, 6))); // Tue, third rule
    assert!(is_available(&task, d(2024, 2, 10))); // Sat, third rule
    assert_eq!(task.recurrence().unwrap().revisions.len(), 2);
}

#[test]
fn test_reschedule_at_earlier_date_drops_superseded_rule() {
    let mut task = recurring(mwf(), d(2024, 1, 1));
    reschedule(&mut task, days(&[Weekday::Tue, Weekday::Thu]), d(2024, 1, 15)).unwrap();
    reschedule(&mut task, days(&[Weekday::Sat]), d(2024, 1, 10)).unwrap();

    let rec = task.recurrence().unwrap();
    assert_eq!(rec.effective_from, Some(d(2024, 1, 10)));
    assert_eq!(rec.revisions, vec![Revision { from: d(2024, 1, 1), weekdays: mwf() }]);
    assert!(is_available(&task, d(2024, 1, 8)));   // Mon, first rule
    assert!(is_available(&task, d(2024, 1, 13)));  // Sat
    assert!(!is_available(&task, d(2024, 1, 16))); // Tue rule never took effect
}

#[test]
fn test_effective_date_without_revisions_keeps_earlier_days() {
    let mut rec = Recurrence::new(days(&[Weekday::Sat]));
    rec.effective_from = Some(d(2024, 1, 15));
    let task = Task::new(1, "Legacy", None, Schedule::Recurring(rec), d(2024, 1, 1)).unwrap();

    assert!(is_available(&task, d(2024, 1, 2)));
    assert!(!is_available(&task, d(2023, 12, 30)));
    assert!(!is_available(&task, d(2024, 1, 16)));
    assert!(is_available(&task, d(2024, 1, 20)));
}

#[test]
fn test_reschedule_on_creation_day_replaces_rule() {
    let mut task = recurring(mwf(), d(2024, 1, 1));
    reschedule(&mut task, days(&[Weekday::Tue]), d(2024, 1, 1)).unwrap();
    let rec = task.recurrence().unwrap();
    assert_eq!(rec.effective_from, None);
    assert!(rec.revisions.is_empty());
    assert!(!is_available(&task, d(2024, 1, 3)));
    assert!(is_available(&task, d(2024, 1, 2)));
}

#[test]
fn test_reschedule_makes_one_time_task_recurring() {
    let mut task = one_time(d(2024, 1, 1));
    reschedule(&mut task, mwf(), d(2024, 1, 20)).unwrap();
    assert!(task.is_recurring());
    assert!(is_available(&task, d(2024, 1, 3)));
}

#[test]
fn test_reschedule_rejects_empty_weekdays() {
    let mut task = recurring(mwf(), d(2024, 1, 1));
    assert!(matches!(reschedule(&mut task, WeekdaySet::EMPTY, d(2024, 2, 1)), Err(AppError::NoWeekdays)));
    assert_eq!(task.recurrence().unwrap().weekdays, mwf());
}

#[test]
fn test_end_series_hides_later_days_only() {
    let mut task = recurring(WeekdaySet::ALL, d(2024, 1, 1));
    toggle_completion(&mut task, d(2024, 1, 5), true);
    end_series(&mut task, d(2024, 1, 10)).unwrap();

    assert!(is_available(&task, d(2024, 1, 9)));
    assert!(!is_available(&task, d(2024, 1, 10)));
    assert!(!is_available(&task, d(2024, 2, 1)));
    assert!(is_completed(&task, d(2024, 1, 5)));
}

#[test]
fn test_weekday_set_parsing() {
    assert_eq!("mon,wed,fri".parse::<WeekdaySet>().unwrap(), mwf());
    assert_eq!("Daily".parse::<WeekdaySet>().unwrap(), WeekdaySet::ALL);
    assert_eq!("weekends".parse::<WeekdaySet>().unwrap().len(), 2);
    assert!(matches!("mon,funday".parse::<WeekdaySet>(), Err(AppError::InvalidWeekday(_))));
    assert!(matches!(" , ".parse::<WeekdaySet>(), Err(AppError::NoWeekdays)));
    assert_eq!(mwf().to_string(), "Mon Wed Fri");
}
