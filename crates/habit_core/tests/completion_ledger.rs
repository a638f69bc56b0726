use chrono::NaiveDate;
use habit_core::db::open_db_in_memory;
use habit_core::{
    CompletionLedger, Habit, HabitRepository, RepoError, SqliteCompletionLedger,
    SqliteHabitRepository,
};
use rusqlite::Connection;
use uuid::Uuid;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

fn seeded_habit(conn: &Connection) -> Uuid {
    SqliteHabitRepository::try_new(conn)
        .unwrap()
        .create_habit(&Habit::new("Meditate"))
        .unwrap()
        .id
}

#[test]
fn record_then_has_completion() {
    let conn = open_db_in_memory().unwrap();
    let habit_id = seeded_habit(&conn);
    let ledger = SqliteCompletionLedger::try_new(&conn).unwrap();

    assert!(!ledger.has_completion(habit_id, day(1)).unwrap());
    let event = ledger.record_completion(habit_id, day(1)).unwrap();
    assert_eq!(event.habit_id, habit_id);
    assert_eq!(event.day, day(1));

    assert!(ledger.has_completion(habit_id, day(1)).unwrap());
    assert!(!ledger.has_completion(habit_id, day(2)).unwrap());
    assert_eq!(ledger.completion_count(habit_id).unwrap(), 1);
}

#[test]
fn duplicate_day_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let habit_id = seeded_habit(&conn);
    let ledger = SqliteCompletionLedger::try_new(&conn).unwrap();

    ledger.record_completion(habit_id, day(4)).unwrap();
    let err = ledger.record_completion(habit_id, day(4)).unwrap_err();
    match err {
        RepoError::AlreadyCompleted(event) => {
            assert_eq!(event.habit_id, habit_id);
            assert_eq!(event.day, day(4));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(ledger.completion_count(habit_id).unwrap(), 1);
}

#[test]
fn unknown_habit_is_rejected_by_foreign_key() {
    let conn = open_db_in_memory().unwrap();
    let ledger = SqliteCompletionLedger::try_new(&conn).unwrap();
    let missing = Uuid::new_v4();

    let err = ledger.record_completion(missing, day(1)).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == missing));
}

#[test]
fn retract_absent_day_is_noop() {
    let conn = open_db_in_memory().unwrap();
    let habit_id = seeded_habit(&conn);
    let ledger = SqliteCompletionLedger::try_new(&conn).unwrap();

    assert!(!ledger.retract_completion(habit_id, day(9)).unwrap());

    ledger.record_completion(habit_id, day(9)).unwrap();
    assert!(ledger.retract_completion(habit_id, day(9)).unwrap());
    assert!(!ledger.has_completion(habit_id, day(9)).unwrap());
}

#[test]
fn history_is_ascending_and_scoped_to_habit() {
    let conn = open_db_in_memory().unwrap();
    let habit_id = seeded_habit(&conn);
    let other_id = seeded_habit(&conn);
    let ledger = SqliteCompletionLedger::try_new(&conn).unwrap();

    for d in [12, 3, 7] {
        ledger.record_completion(habit_id, day(d)).unwrap();
    }
    ledger.record_completion(other_id, day(5)).unwrap();

    assert_eq!(
        ledger.history(habit_id).unwrap(),
        vec![day(3), day(7), day(12)]
    );
    assert_eq!(ledger.history(other_id).unwrap(), vec![day(5)]);
}

#[test]
fn latest_completion_before_skips_same_and_later_days() {
    let conn = open_db_in_memory().unwrap();
    let habit_id = seeded_habit(&conn);
    let ledger = SqliteCompletionLedger::try_new(&conn).unwrap();

    assert_eq!(ledger.latest_completion_before(habit_id, day(10)).unwrap(), None);
    for d in [2, 5, 10, 11] {
        ledger.record_completion(habit_id, day(d)).unwrap();
    }
    assert_eq!(
        ledger.latest_completion_before(habit_id, day(10)).unwrap(),
        Some(day(5))
    );
}

#[test]
fn day_keys_cross_year_boundary_in_order() {
    let conn = open_db_in_memory().unwrap();
    let habit_id = seeded_habit(&conn);
    let ledger = SqliteCompletionLedger::try_new(&conn).unwrap();
    let new_year = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let new_years_eve = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();

    ledger.record_completion(habit_id, new_year).unwrap();
    ledger.record_completion(habit_id, new_years_eve).unwrap();

    assert_eq!(
        ledger.history(habit_id).unwrap(),
        vec![new_years_eve, new_year]
    );
}
