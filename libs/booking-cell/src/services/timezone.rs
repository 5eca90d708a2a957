// libs/booking-cell/src/services/timezone.rs
//
// Ethiopia runs on East Africa Time, a fixed UTC+3 offset with no daylight
// saving. Appointments are stored in UTC; this module is the single place
// where the local offset is applied for working-hour checks and display.

use chrono::{DateTime, FixedOffset, Timelike, Utc};

pub const ETHIOPIA_UTC_OFFSET_HOURS: i32 = 3;

fn addis_offset() -> FixedOffset {
    FixedOffset::east_opt(ETHIOPIA_UTC_OFFSET_HOURS * 3600)
        .expect("constant offset is in range")
}

/// Convert a stored UTC instant to Ethiopia local time.
pub fn to_addis_local(utc: DateTime<Utc>) -> DateTime<FixedOffset> {
    utc.with_timezone(&addis_offset())
}

/// Convert an Ethiopia local instant back to UTC.
pub fn to_utc(local: DateTime<FixedOffset>) -> DateTime<Utc> {
    local.with_timezone(&Utc)
}

/// True iff the local hour of day lies in `[start_hour, end_hour)`.
pub fn is_within_working_hours(utc: DateTime<Utc>, start_hour: u32, end_hour: u32) -> bool {
    let hour = to_addis_local(utc).hour();
    hour >= start_hour && hour < end_hour
}
