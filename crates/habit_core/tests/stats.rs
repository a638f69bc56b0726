use chrono::{Days, NaiveDate};
use habit_core::db::open_db_in_memory;
use habit_core::{
    FixedClock, Habit, HabitRepository, HabitStats, SqliteHabitRepository, StatsService,
    StreakService,
};
use rusqlite::Connection;
use uuid::Uuid;

fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, day).unwrap()
}

fn today() -> NaiveDate {
    date(3, 10)
}

fn create(conn: &Connection, name: &str) -> Uuid {
    SqliteHabitRepository::try_new(conn)
        .unwrap()
        .create_habit(&Habit::new(name))
        .unwrap()
        .id
}

fn complete_on(conn: &Connection, habit_id: Uuid, days: &[NaiveDate]) {
    let clock = FixedClock::new(days[0]);
    let engine = StreakService::try_new(conn, clock.clone()).unwrap();
    for day in days {
        clock.set(*day);
        engine.complete(habit_id).unwrap();
    }
}

/// Three habits: a seven-day run ending today, a two-day run ending today,
/// and one old completion outside every window.
fn seeded(conn: &Connection) -> (Uuid, Uuid, Uuid) {
    let reading = create(conn, "Reading");
    let running = create(conn, "Running");
    let piano = create(conn, "Piano");
    let week: Vec<_> = (4..=10).map(|d| date(3, d)).collect();
    complete_on(conn, reading, &week);
    complete_on(conn, running, &[date(3, 9), date(3, 10)]);
    complete_on(conn, piano, &[date(2, 1)]);
    (reading, running, piano)
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn empty_database_reports_zeros() {
    let conn = open_db_in_memory().unwrap();
    let stats = StatsService::try_new(&conn, FixedClock::new(today())).unwrap();

    assert_eq!(
        stats.summary().unwrap(),
        HabitStats {
            total_habits: 0,
            completed_today: 0,
            total_completions: 0,
            average_streak: 0.0,
            best_streak: 0,
            completion_rate: 0.0,
        }
    );
    let daily = stats.daily_completions(7).unwrap();
    assert_eq!(daily.len(), 7);
    assert!(daily.iter().all(|d| d.completions == 0 && d.rate == 0.0));
    assert!(stats.streak_ranking().unwrap().is_empty());
}

#[test]
fn summary_aggregates_ledger_and_counters() {
    let conn = open_db_in_memory().unwrap();
    seeded(&conn);
    let stats = StatsService::try_new(&conn, FixedClock::new(today())).unwrap();

    let summary = stats.summary().unwrap();
    assert_eq!(summary.total_habits, 3);
    assert_eq!(summary.completed_today, 2);
    assert_eq!(summary.total_completions, 10);
    assert_eq!(summary.best_streak, 7);
    assert_close(summary.average_streak, 10.0 / 3.0);
    // 9 completions in 3/4..=3/10 out of 3 habits * 7 days.
    assert_close(summary.completion_rate, 9.0 / 21.0 * 100.0);
}

#[test]
fn summary_follows_the_clock() {
    let conn = open_db_in_memory().unwrap();
    seeded(&conn);
    let clock = FixedClock::new(today());
    let stats = StatsService::try_new(&conn, clock.clone()).unwrap();

    clock.advance_days(1);
    let summary = stats.summary().unwrap();
    assert_eq!(summary.completed_today, 0);
    // Window is now 3/5..=3/11: reading has 6, running has 2.
    assert_close(summary.completion_rate, 8.0 / 21.0 * 100.0);
}

#[test]
fn daily_series_fills_every_day_oldest_first() {
    let conn = open_db_in_memory().unwrap();
    seeded(&conn);
    let stats = StatsService::try_new(&conn, FixedClock::new(today())).unwrap();

    let daily = stats.daily_completions(30).unwrap();
    assert_eq!(daily.len(), 30);
    assert_eq!(
        daily[0].day,
        today().checked_sub_days(Days::new(29)).unwrap()
    );
    assert_eq!(daily[29].day, today());
    assert!(daily.windows(2).all(|pair| pair[0].day.succ_opt() == Some(pair[1].day)));

    let last = &daily[29];
    assert_eq!(last.completions, 2);
    assert_close(last.rate, 2.0 / 3.0 * 100.0);
    let march_fourth = daily.iter().find(|d| d.day == date(3, 4)).unwrap();
    assert_eq!(march_fourth.completions, 1);

    // The 2/1 completion falls outside the 30-day window.
    let in_window: u32 = daily.iter().map(|d| d.completions).sum();
    assert_eq!(in_window, 9);
}

#[test]
fn daily_series_length_is_bounded() {
    let conn = open_db_in_memory().unwrap();
    let stats = StatsService::try_new(&conn, FixedClock::new(today())).unwrap();

    assert!(stats.daily_completions(0).unwrap().is_empty());
    assert_eq!(stats.daily_completions(1).unwrap().len(), 1);
    assert_eq!(stats.daily_completions(10_000).unwrap().len(), 366);
}

#[test]
fn ranking_orders_by_current_streak() {
    let conn = open_db_in_memory().unwrap();
    let (reading, running, piano) = seeded(&conn);
    let stats = StatsService::try_new(&conn, FixedClock::new(today())).unwrap();

    let ranking = stats.streak_ranking().unwrap();
    let ids: Vec<_> = ranking.iter().map(|entry| entry.habit_id).collect();
    assert_eq!(ids, vec![reading, running, piano]);
    assert_eq!(ranking[0].name, "Reading");
    assert_eq!(ranking[0].current_streak, 7);
    assert_eq!(ranking[0].longest_streak, 7);
}

#[test]
fn report_serializes_all_sections() {
    let conn = open_db_in_memory().unwrap();
    seeded(&conn);
    let stats = StatsService::try_new(&conn, FixedClock::new(today())).unwrap();

    let report = stats.report(7).unwrap();
    assert_eq!(report.summary, stats.summary().unwrap());
    assert_eq!(report.daily, stats.daily_completions(7).unwrap());
    assert_eq!(report.streaks, stats.streak_ranking().unwrap());

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["summary"]["total_habits"], 3);
    assert_eq!(value["daily"].as_array().unwrap().len(), 7);
    assert_eq!(value["daily"][6]["day"], "2024-03-10");
    assert_eq!(value["streaks"][0]["name"], "Reading");
}

#[test]
fn stats_reject_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    assert!(StatsService::try_new(&conn, FixedClock::new(today())).is_err());
}
