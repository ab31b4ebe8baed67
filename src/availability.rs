//! Bookable slot generation.
//!
//! Base slots come from the configured business hours. Rows in
//! `availability_slots` override them: an available row keeps its slot
//! even when a booking holds it, a blocked row removes it.

use std::collections::{HashMap, HashSet};

use chrono::{Datelike, Days, NaiveDate, NaiveTime};
use serde::Serialize;

use crate::config::BusinessHours;
use crate::error::{Error, Result};
use crate::store::Store;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

/// Widest range accepted by a single availability query, in days.
pub const MAX_RANGE_DAYS: i64 = 90;

const SEED_DAYS: u64 = 14;
const SEED_TIMES: [&str; 5] = ["14:00", "16:00", "18:00", "20:00", "22:00"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub date: String,
    pub time: String,
    pub is_available: bool,
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    if s.len() != 10 {
        return Err(Error::BadRequest(format!("invalid date '{s}', expected YYYY-MM-DD")));
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|_| Error::BadRequest(format!("invalid date '{s}', expected YYYY-MM-DD")))
}

pub fn parse_time(s: &str) -> Result<NaiveTime> {
    if s.len() != 5 {
        return Err(Error::BadRequest(format!("invalid time '{s}', expected HH:MM")));
    }
    NaiveTime::parse_from_str(s, TIME_FORMAT)
        .map_err(|_| Error::BadRequest(format!("invalid time '{s}', expected HH:MM")))
}

/// Business-hour slots for every open day in `[start, end]`, as (date, time).
#[must_use]
pub fn generate_base_slots(
    hours: &BusinessHours,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<(String, String)> {
    let step = hours.slot_duration_minutes.max(1);
    let first_minute = hours.start_hour * 60;
    let last_minute = hours.end_hour * 60;

    let times: Vec<String> = (first_minute..last_minute)
        .step_by(step as usize)
        .map(|m| format!("{:02}:{:02}", m / 60, m % 60))
        .collect();

    start
        .iter_days()
        .take_while(|date| *date <= end)
        .filter(|date| hours.days.contains(&date.weekday().num_days_from_sunday()))
        .flat_map(|date| {
            let date = date.format(DATE_FORMAT).to_string();
            times
                .iter()
                .map(move |time| (date.clone(), time.clone()))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Open slots between `start` and `end`, inclusive, ordered by date then time.
pub fn available_slots(
    store: &dyn Store,
    hours: &BusinessHours,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<Slot>> {
    if start > end {
        return Ok(Vec::new());
    }
    if (end - start).num_days() > MAX_RANGE_DAYS {
        return Err(Error::BadRequest(format!(
            "date range must not exceed {MAX_RANGE_DAYS} days"
        )));
    }

    let start_str = start.format(DATE_FORMAT).to_string();
    let end_str = end.format(DATE_FORMAT).to_string();

    let booked: HashSet<String> = store
        .list_booked_date_times(&format!("{start_str} 00:00"))?
        .into_iter()
        .collect();

    let overrides: HashMap<(String, String), bool> = store
        .list_slots(&start_str, &end_str)?
        .into_iter()
        .map(|slot| ((slot.date, slot.time), slot.is_available))
        .collect();

    let slots = generate_base_slots(hours, start, end)
        .into_iter()
        .filter(|(date, time)| {
            match overrides.get(&(date.clone(), time.clone())) {
                Some(available) => *available,
                None => !booked.contains(&format!("{date} {time}")),
            }
        })
        .map(|(date, time)| Slot {
            date,
            time,
            is_available: true,
        })
        .collect();

    Ok(slots)
}

/// Fails with [`Error::Conflict`] when `date time` is blocked or already booked.
pub fn check_slot_open(store: &dyn Store, date: &str, time: &str) -> Result<()> {
    if let Some(slot) = store.get_slot(date, time)? {
        if !slot.is_available {
            return Err(Error::Conflict(
                "Selected time slot is not available".to_string(),
            ));
        }
    }
    if store.is_date_time_booked(&format!("{date} {time}"))? {
        return Err(Error::Conflict(
            "Selected time slot is already booked".to_string(),
        ));
    }
    Ok(())
}

/// Adds the default evening slots for the fortnight after `today`.
/// Returns the number of rows created.
pub fn seed_slots(store: &dyn Store, today: NaiveDate) -> Result<usize> {
    let mut added = 0;

    for offset in 1..=SEED_DAYS {
        let Some(date) = today.checked_add_days(Days::new(offset)) else {
            break;
        };
        let date = date.format(DATE_FORMAT).to_string();
        for time in SEED_TIMES {
            if store.add_slot(&date, time)? {
                added += 1;
            }
        }
    }

    Ok(added)
}
