use betterday::commands::*;
use betterday::errors::AppError;
use betterday::models::{Rating, Schedule};
use betterday::storage::Store;
use chrono::NaiveDate;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

// Use a mutex to ensure tests run serially since they modify the environment variable
static TEST_MUTEX: Mutex<()> = Mutex::new(());

fn with_test_db<F>(test_name: &str, f: F)
where
    F: FnOnce(Store),
{
    let _guard = TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

    let mut dir: PathBuf = env::temp_dir();
    dir.push(format!("betterday_test_{}", test_name));

    // Clean up before test
    if dir.exists() {
        fs::remove_dir_all(&dir).unwrap();
    }

    env::set_var("BETTERDAY_DATA_DIR", &dir);
    env::set_var("BETTERDAY_SYNC_DIR", "");

    // Run test
    f(Store::new(&dir));

    // Clean up after test
    if dir.exists() {
        fs::remove_dir_all(&dir).unwrap();
    }
    env::remove_var("BETTERDAY_DATA_DIR");
    env::remove_var("BETTERDAY_SYNC_DIR");
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

#[test]
fn test_add_and_list() {
    with_test_db("add_list", |store| {
        cmd_add("Read 20 pages".into(), Some("Fiction".into()), false, None, Some("2024-01-03".into()), true).unwrap();

        let tasks = store.load_tasks().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Read 20 pages");
        assert_eq!(tasks[0].description, Some("Fiction".into()));
        assert_eq!(tasks[0].schedule, Schedule::OneTime);
        assert_eq!(tasks[0].created_on, d(2024, 1, 3));

        cmd_list(Some("2024-01-03".into()), false).unwrap();
    });
}

#[test]
fn test_add_recurring_with_days() {
    with_test_db("add_recurring", |store| {
        cmd_add("Gym".into(), None, false, Some("mon,wed,fri".into()), Some("2024-01-01".into()), true).unwrap();
        cmd_add("Stretch".into(), None, true, None, Some("2024-01-01".into()), true).unwrap();

        let tasks = store.load_tasks().unwrap();
        assert_eq!(tasks[0].recurrence().unwrap().weekdays.len(), 3);
        assert_eq!(tasks[1].recurrence().unwrap().weekdays.len(), 7);
    });
}

#[test]
fn test_add_rejects_bad_input() {
    with_test_db("add_invalid", |store| {
        let bad_date = cmd_add("Task".into(), None, false, None, Some("03/01/2024".into()), true);
        assert!(matches!(bad_date, Err(AppError::InvalidDate(_))));
        let bad_days = cmd_add("Task".into(), None, false, Some("mon,someday".into()), None, true);
        assert!(matches!(bad_days, Err(AppError::InvalidWeekday(_))));
        let blank = cmd_add("  ".into(), None, false, None, None, true);
        assert!(matches!(blank, Err(AppError::EmptyTitle)));
        assert!(store.load_tasks().unwrap().is_empty());
    });
}

#[test]
fn test_complete_task() {
    with_test_db("complete", |store| {
        cmd_add("Task to complete".into(), None, false, None, Some("2024-01-03".into()), true).unwrap();
        let id = store.load_tasks().unwrap()[0].id;

        cmd_set_done(id, Some("2024-01-03".into()), true, true).unwrap();
        cmd_set_done(id, Some("2024-01-03".into()), true, true).unwrap();
        let tasks = store.load_tasks().unwrap();
        assert_eq!(tasks[0].completed_dates.len(), 1);
        assert!(tasks[0].modified_at.is_some());

        cmd_toggle(id, Some("2024-01-03".into()), true).unwrap();
        assert!(store.load_tasks().unwrap()[0].completed_dates.is_empty());

        let missing = cmd_set_done(99, None, true, true);
        assert!(matches!(missing, Err(AppError::TaskNotFound(99))));
    });
}

#[test]
fn test_edit_weekdays_from_date() {
    with_test_db("edit", |store| {
        cmd_add("Run".into(), None, false, Some("mon,wed,fri".into()), Some("2024-01-01".into()), true).unwrap();
        cmd_edit(1, Some("Run 5k".into()), None, Some("tue,thu".into()), Some("2024-01-15".into()), true).unwrap();

        let task = &store.load_tasks().unwrap()[0];
        assert_eq!(task.title, "Run 5k");
        let rec = task.recurrence().unwrap();
        assert_eq!(rec.effective_from, Some(d(2024, 1, 15)));
        assert_eq!(rec.revisions.len(), 1);
    });
}

#[test]
fn test_remove_and_end_series() {
    with_test_db("remove", |store| {
        cmd_add("Once".into(), None, false, None, Some("2024-01-01".into()), true).unwrap();
        cmd_add("Daily".into(), None, true, None, Some("2024-01-01".into()), true).unwrap();

        cmd_remove(1, None, true).unwrap();
        cmd_remove(2, Some("2024-02-01".into()), true).unwrap();

        let tasks = store.load_tasks().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].recurrence().unwrap().ends_on, Some(d(2024, 2, 1)));
    });
}

#[test]
fn test_ignore_and_move() {
    with_test_db("ignore_move", |store| {
        cmd_add("Walk".into(), None, true, None, Some("2024-01-01".into()), true).unwrap();
        cmd_ignore(1, Some("2024-01-02".into()), true).unwrap();
        assert!(store.load_tasks().unwrap()[0].excluded_dates.contains(&d(2024, 1, 2)));

        cmd_unignore(1, Some("2024-01-02".into()), true).unwrap();
        assert!(store.load_tasks().unwrap()[0].excluded_dates.is_empty());

        cmd_move(1, Some("2024-01-03".into()), true).unwrap();
        let tasks = store.load_tasks().unwrap();
        assert_eq!(tasks.len(), 2);
        let series = tasks.iter().find(|t| t.id == 1).unwrap().uuid;
        let copy = tasks.iter().find(|t| t.id == 2).unwrap();
        assert_eq!(copy.original_task_id, Some(series));
        assert_eq!(copy.created_on, d(2024, 1, 4));
    });
}

#[test]
fn test_reflect_today_replaces_previous_rating() {
    with_test_db("reflect", |store| {
        cmd_reflect("better".into(), None, true).unwrap();
        cmd_reflect("w".into(), None, true).unwrap();

        let reflections = store.load_reflections().unwrap();
        assert_eq!(reflections.len(), 1);
        assert_eq!(reflections[0].rating, Rating::Worse);

        let invalid = cmd_reflect("fantastic".into(), None, true);
        assert!(matches!(invalid, Err(AppError::InvalidRating(_))));
    });
}

#[test]
fn test_reflect_rejects_closed_day() {
    with_test_db("reflect_closed", |store| {
        let result = cmd_reflect("same".into(), Some("2020-01-01".into()), true);
        assert!(matches!(result, Err(AppError::ReflectionClosed(_))));
        assert!(store.load_reflections().unwrap().is_empty());
    });
}

#[test]
fn test_read_only_commands_tolerate_damaged_data() {
    with_test_db("damaged", |store| {
        fs::create_dir_all(store.root()).unwrap();
        fs::write(store.root().join("tasks.json"), "[{ broken").unwrap();

        cmd_list(None, false).unwrap();
        cmd_streak().unwrap();
        cmd_calendar(Some("2024-02".into())).unwrap();
        cmd_history(1, betterday::progress::TimeFrame::Week).unwrap();

        // Writes refuse to overwrite the damaged document.
        assert!(cmd_add("New".into(), None, false, None, None, true).is_err());
        assert_eq!(fs::read_to_string(store.root().join("tasks.json")).unwrap(), "[{ broken");
    });
}

#[test]
fn test_sync_mirrors_records() {
    with_test_db("sync", |store| {
        let mirror = store.root().join("mirror");
        env::set_var("BETTERDAY_SYNC_DIR", &mirror);

        cmd_add("Synced".into(), None, false, None, Some("2024-01-01".into()), true).unwrap();
        let uuid = store.load_tasks().unwrap()[0].uuid;
        assert!(mirror.join("Task").join(format!("{}.json", uuid)).exists());

        cmd_sync(true).unwrap();
        assert_eq!(fs::read_dir(mirror.join("Task")).unwrap().count(), 1);
    });
}

#[test]
fn test_reset_clears_sync_folder() {
    with_test_db("reset_sync", |store| {
        let mirror = store.root().join("mirror");
        env::set_var("BETTERDAY_SYNC_DIR", &mirror);

        cmd_add("Synced".into(), None, false, None, Some("2024-01-01".into()), true).unwrap();
        cmd_reflect("better".into(), None, true).unwrap();
        assert_eq!(fs::read_dir(mirror.join("Task")).unwrap().count(), 1);

        cmd_reset(true).unwrap();
        assert!(store.load_tasks().unwrap().is_empty());
        assert_eq!(fs::read_dir(mirror.join("Task")).unwrap().count(), 0);
        assert_eq!(fs::read_dir(mirror.join("DailyReflection")).unwrap().count(), 0);

        let session = Session::open().unwrap();
        assert!(session.state.tasks.is_empty());
        assert!(session.state.reflections.is_empty());
    });
}

#[test]
fn test_reset_without_sync_folder() {
    with_test_db("reset_local", |store| {
        cmd_add("Local".into(), None, false, None, None, true).unwrap();
        cmd_reset(true).unwrap();
        assert!(store.load_tasks().unwrap().is_empty());
    });
}

#[test]
fn test_sync_without_folder_fails() {
    with_test_db("sync_unset", |_store| {
        assert!(matches!(cmd_sync(true), Err(AppError::Sync(_))));
    });
}

#[test]
fn test_parse_helpers() {
    assert_eq!(parse_date("2024-02-29").unwrap(), d(2024, 2, 29));
    assert!(parse_date("2023-02-29").is_err());
    assert_eq!(parse_month("2024-02").unwrap(), d(2024, 2, 1));
    assert!(matches!(parse_month("2024-13"), Err(AppError::InvalidMonth(_))));
}
