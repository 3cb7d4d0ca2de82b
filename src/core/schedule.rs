use crate::domain::model::ScheduleResponse;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClinicSchedule {
    pub clinic_slug: String,
    pub clinic_name: String,
    pub days: Vec<DaySlots>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySlots {
    pub date: NaiveDate,
    pub label: String,
    pub times: Vec<NaiveTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleOptions {
    pub today: NaiveDate,
    pub days_ahead: u32,
    pub hide_empty_days: bool,
}

impl ScheduleOptions {
    pub fn starting(today: NaiveDate) -> Self {
        Self {
            today,
            days_ahead: 7,
            hide_empty_days: false,
        }
    }

    pub fn days_ahead(mut self, days: u32) -> Self {
        self.days_ahead = days;
        self
    }

    pub fn hide_empty_days(mut self, hide: bool) -> Self {
        self.hide_empty_days = hide;
        self
    }

    fn last_day(&self) -> NaiveDate {
        self.today + Duration::days(i64::from(self.days_ahead.saturating_sub(1)))
    }
}

pub fn day_label(date: NaiveDate) -> String {
    let weekday = match date.weekday() {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    };
    format!("{} {}", weekday, date.format("%d.%m"))
}

fn parse_slot_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

/// Reshapes the raw schedule into per-clinic rows of available times.
///
/// Days outside `[today, today + days_ahead)` are dropped; times within a
/// day are sorted and de-duplicated. Clinics keep the backend order.
pub fn adapt_schedule(raw: &ScheduleResponse, options: &ScheduleOptions) -> Vec<ClinicSchedule> {
    if options.days_ahead == 0 {
        return Vec::new();
    }
    let last_day = options.last_day();

    raw.clinics
        .iter()
        .map(|clinic| {
            let mut days: Vec<DaySlots> = clinic
                .days
                .iter()
                .filter(|day| day.date >= options.today && day.date <= last_day)
                .map(|day| {
                    let mut times: Vec<NaiveTime> = day
                        .slots
                        .iter()
                        .filter(|slot| slot.is_available)
                        .filter_map(|slot| {
                            let parsed = parse_slot_time(&slot.time);
                            if parsed.is_none() {
                                tracing::warn!(
                                    "Skipping slot with unreadable time '{}' at {}",
                                    slot.time,
                                    clinic.clinic_slug
                                );
                            }
                            parsed
                        })
                        .collect();
                    times.sort();
                    times.dedup();

                    DaySlots {
                        date: day.date,
                        label: day_label(day.date),
                        times,
                    }
                })
                .filter(|day| !(options.hide_empty_days && day.times.is_empty()))
                .collect();
            days.sort_by_key(|day| day.date);

            ClinicSchedule {
                clinic_slug: clinic.clinic_slug.clone(),
                clinic_name: clinic.clinic_name.clone(),
                days,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearestSlot {
    pub clinic_slug: String,
    pub clinic_name: String,
    pub at: NaiveDateTime,
}

/// Earliest available slot across all clinics, if any.
pub fn nearest_slot(schedules: &[ClinicSchedule]) -> Option<NearestSlot> {
    schedules
        .iter()
        .flat_map(|clinic| {
            clinic.days.iter().flat_map(move |day| {
                day.times.iter().map(move |time| NearestSlot {
                    clinic_slug: clinic.clinic_slug.clone(),
                    clinic_name: clinic.clinic_name.clone(),
                    at: day.date.and_time(*time),
                })
            })
        })
        .min_by_key(|slot| slot.at)
}
