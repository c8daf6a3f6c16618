use chrono::{FixedOffset, NaiveDate, TimeZone, Utc, Weekday};
use services::{AppServices, CalendarPolicy, Clock};
use storage::repository::Storage;
use wall_core::model::{ProtocolDetails, ProtocolId, UserId};
use wall_core::progress::{RankedProtocol, Timeframe};
use wall_core::time::noon_utc;

fn user() -> UserId {
    UserId::new("u1").unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn services_with(
    clock: Clock,
    policy: CalendarPolicy,
    wall: &[(&str, Vec<NaiveDate>)],
) -> AppServices {
    let storage = Storage::in_memory();
    let services = AppServices::new(&storage, clock, policy).unwrap();
    let walls = services.wall();
    for (title, days) in wall {
        let id = ProtocolId::new(title.to_lowercase()).unwrap();
        walls
            .add_custom(&user(), id.clone(), ProtocolDetails::titled(*title))
            .await
            .unwrap();
        for day in days {
            walls
                .toggle_completion(&user(), &id, Some(*day), None)
                .await
                .unwrap();
        }
    }
    services
}

fn ranked(title: &str, completion_count: u32) -> RankedProtocol {
    RankedProtocol {
        title: title.to_string(),
        completion_count,
    }
}

#[tokio::test]
async fn month_rankings_split_top_and_attention() {
    let services = services_with(
        Clock::fixed(noon_utc(2024, 1, 10)),
        CalendarPolicy::default(),
        &[
            ("A", (1..=5).map(|d| date(2024, 1, d)).collect()),
            ("B", vec![date(2024, 1, 1), date(2024, 1, 2)]),
            ("C", vec![]),
        ],
    )
    .await;

    let report = services
        .progress()
        .report_for(&user(), "month")
        .await
        .unwrap();
    assert_eq!(report.top_performing, vec![ranked("A", 5), ranked("B", 2)]);
    assert_eq!(report.needs_attention, vec![ranked("C", 0)]);
}

#[tokio::test]
async fn week_overall_progress_is_half() {
    // Saturday; the Sunday-start week is 2023-12-31 ..= 2024-01-06.
    let services = services_with(
        Clock::fixed(noon_utc(2024, 1, 6)),
        CalendarPolicy::default(),
        &[
            (
                "A",
                vec![
                    date(2023, 12, 31),
                    date(2024, 1, 1),
                    date(2024, 1, 2),
                    date(2024, 1, 3),
                ],
            ),
            ("B", vec![date(2024, 1, 1), date(2024, 1, 2), date(2024, 1, 3)]),
        ],
    )
    .await;

    let report = services
        .progress()
        .report(&user(), Timeframe::Week)
        .await
        .unwrap();
    assert_eq!(report.window.days(), 7);
    assert_eq!(report.overall_progress, 50);
    assert_eq!(report.days_applied, 4);
    assert_eq!(report.days_all_satisfied, 3);
    // Friday and Saturday missed.
    assert_eq!(report.current_streak, 0);
    assert_eq!(report.longest_streak, 3);
}

#[tokio::test]
async fn gap_day_limits_longest_streak() {
    let services = services_with(
        Clock::fixed(noon_utc(2024, 1, 3)),
        CalendarPolicy::default(),
        &[
            ("A", vec![date(2024, 1, 1), date(2024, 1, 3)]),
            ("B", vec![date(2024, 1, 1), date(2024, 1, 3)]),
        ],
    )
    .await;

    let report = services
        .progress()
        .report(&user(), Timeframe::Day)
        .await
        .unwrap();
    assert_eq!(report.longest_streak, 1);
    assert_eq!(report.current_streak, 1);
    assert_eq!(report.daily_compliance, 100);
}

#[tokio::test]
async fn local_offset_decides_which_day_is_today() {
    // 2024-01-03T23:30Z is already 2024-01-04 at UTC+02:00.
    let now = Utc.with_ymd_and_hms(2024, 1, 3, 23, 30, 0).unwrap();
    let policy = CalendarPolicy::new(
        FixedOffset::east_opt(2 * 3600).unwrap(),
        Weekday::Mon,
    );
    let services = services_with(
        Clock::fixed(now),
        policy,
        &[("A", vec![date(2024, 1, 4)])],
    )
    .await;

    let report = services
        .progress()
        .report(&user(), Timeframe::Day)
        .await
        .unwrap();
    assert_eq!(report.daily_compliance, 100);
    assert_eq!(report.window.start(), date(2024, 1, 4));
}
