// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-tenant business-hours gate.
//!
//! Pure function of the tenant's settings and the current instant. The
//! weekly schedule is interpreted in the tenant's IANA timezone and both
//! window edges are inclusive: with a `09:00`-`17:00` window, `17:00:00`
//! is in hours and `17:00:01` is not.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::Tz;

use switchboard_core::{HandoffSettings, SwitchboardError};

/// Whether handoff may proceed at `now` under the tenant's schedule.
///
/// Always `true` when the business-hours gate is disabled. A weekday with
/// no window, or with a disabled window, is out of hours.
pub fn is_within_business_hours(
    settings: &HandoffSettings,
    now: DateTime<Utc>,
) -> Result<bool, SwitchboardError> {
    if !settings.business_hours_enabled {
        return Ok(true);
    }

    let tz = parse_timezone(&settings.timezone)?;
    let local = now.with_timezone(&tz);

    let Some(window) = settings.schedule.get(weekday_key(local.weekday())) else {
        return Ok(false);
    };
    if !window.enabled {
        return Ok(false);
    }

    let start = parse_clock_time(&window.start)?;
    let end = parse_clock_time(&window.end)?;
    let current = local.num_seconds_from_midnight();

    Ok(start <= current && current <= end)
}

/// Reject settings the gate could not evaluate: unknown timezone, malformed
/// `HH:MM` strings, unknown weekday keys, windows ending before they start.
pub fn validate_schedule(settings: &HandoffSettings) -> Result<(), SwitchboardError> {
    parse_timezone(&settings.timezone)?;
    for (day, window) in &settings.schedule {
        if !WEEKDAYS.contains(&day.as_str()) {
            return Err(SwitchboardError::Config(format!(
                "unknown weekday `{day}` in business-hours schedule"
            )));
        }
        let start = parse_clock_time(&window.start)?;
        let end = parse_clock_time(&window.end)?;
        if end < start {
            return Err(SwitchboardError::Config(format!(
                "business-hours window for {day} ends ({}) before it starts ({})",
                window.end, window.start
            )));
        }
    }
    Ok(())
}

const WEEKDAYS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

fn weekday_key(day: Weekday) -> &'static str {
    WEEKDAYS[day.num_days_from_monday() as usize]
}

fn parse_timezone(name: &str) -> Result<Tz, SwitchboardError> {
    name.parse::<Tz>()
        .map_err(|_| SwitchboardError::Config(format!("unknown timezone `{name}`")))
}

/// Seconds since midnight for an `HH:MM` string.
fn parse_clock_time(value: &str) -> Result<u32, SwitchboardError> {
    let invalid = || SwitchboardError::Config(format!("invalid time `{value}`, expected HH:MM"));

    let (hours, minutes) = value.trim().split_once(':').ok_or_else(invalid)?;
    let hours: u32 = hours.parse().map_err(|_| invalid())?;
    let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }
    Ok(hours * 3600 + minutes * 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use switchboard_core::DayWindow;

    fn utc_schedule() -> HandoffSettings {
        HandoffSettings {
            business_hours_enabled: true,
            ..HandoffSettings::new("t1")
        }
    }

    // 2026-03-02 is a Monday.
    fn monday(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, s).unwrap()
    }

    #[test]
    fn disabled_gate_is_always_open() {
        let settings = HandoffSettings::new("t1");
        let sunday_night = Utc.with_ymd_and_hms(2026, 3, 8, 3, 0, 0).unwrap();
        assert!(is_within_business_hours(&settings, sunday_night).unwrap());
    }

    #[test]
    fn window_edges_are_inclusive() {
        let settings = utc_schedule();
        assert!(is_within_business_hours(&settings, monday(9, 0, 0)).unwrap());
        assert!(is_within_business_hours(&settings, monday(17, 0, 0)).unwrap());
        assert!(!is_within_business_hours(&settings, monday(8, 59, 59)).unwrap());
        assert!(!is_within_business_hours(&settings, monday(17, 0, 1)).unwrap());
    }

    #[test]
    fn missing_or_disabled_day_is_closed() {
        let mut settings = utc_schedule();
        let saturday = Utc.with_ymd_and_hms(2026, 3, 7, 12, 0, 0).unwrap();
        assert!(!is_within_business_hours(&settings, saturday).unwrap());

        if let Some(window) = settings.schedule.get_mut("monday") {
            window.enabled = false;
        }
        assert!(!is_within_business_hours(&settings, monday(12, 0, 0)).unwrap());
    }

    #[test]
    fn schedule_is_read_in_tenant_timezone() {
        let mut settings = utc_schedule();
        settings.timezone = "America/New_York".to_string();
        // 13:30 UTC is 08:30 in New York (EST, UTC-5) on 2026-03-02.
        assert!(!is_within_business_hours(&settings, monday(13, 30, 0)).unwrap());
        assert!(is_within_business_hours(&settings, monday(14, 0, 0)).unwrap());
    }

    #[test]
    fn timezone_can_shift_the_weekday() {
        let mut settings = utc_schedule();
        settings.timezone = "Asia/Tokyo".to_string();
        settings
            .schedule
            .insert("tuesday".to_string(), DayWindow::new("07:00", "08:00"));
        // Monday 22:30 UTC is Tuesday 07:30 in Tokyo.
        assert!(is_within_business_hours(&settings, monday(22, 30, 0)).unwrap());
    }

    #[test]
    fn malformed_settings_are_config_errors() {
        let mut settings = utc_schedule();
        settings.timezone = "Mars/Olympus".to_string();
        assert!(matches!(
            is_within_business_hours(&settings, monday(10, 0, 0)),
            Err(SwitchboardError::Config(_))
        ));

        let mut settings = utc_schedule();
        settings
            .schedule
            .insert("monday".to_string(), DayWindow::new("9am", "17:00"));
        assert!(is_within_business_hours(&settings, monday(10, 0, 0)).is_err());
    }

    #[test]
    fn validate_schedule_catches_bad_windows() {
        assert!(validate_schedule(&HandoffSettings::new("t1")).is_ok());

        let mut settings = HandoffSettings::new("t1");
        settings
            .schedule
            .insert("funday".to_string(), DayWindow::new("09:00", "10:00"));
        assert!(validate_schedule(&settings).is_err());

        let mut settings = HandoffSettings::new("t1");
        settings
            .schedule
            .insert("friday".to_string(), DayWindow::new("18:00", "09:00"));
        assert!(validate_schedule(&settings).is_err());

        let mut settings = HandoffSettings::new("t1");
        settings
            .schedule
            .insert("friday".to_string(), DayWindow::new("24:00", "24:30"));
        assert!(validate_schedule(&settings).is_err());
    }

    proptest! {
        #[test]
        fn disabled_gate_ignores_the_clock(secs in 0i64..4_000_000_000) {
            let settings = HandoffSettings::new("t1");
            let now = DateTime::from_timestamp(secs, 0).unwrap();
            prop_assert!(is_within_business_hours(&settings, now).unwrap());
        }

        #[test]
        fn weekday_result_matches_window(secs_of_day in 0u32..86_400) {
            let settings = utc_schedule();
            let now = monday(0, 0, 0) + chrono::Duration::seconds(i64::from(secs_of_day));
            let expected = (9 * 3600..=17 * 3600).contains(&secs_of_day);
            prop_assert_eq!(is_within_business_hours(&settings, now).unwrap(), expected);
        }
    }
}
