//! Time grid: the scheduling horizon cut into fixed-size slots.
//!
//! Slots exist only inside the daily allowed window. Each slot is tagged with
//! the day type of its date, which selects the daily work cap.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::InvalidWindowError;

/// Weekday or weekend; selects the applicable daily cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayType {
    Weekday,
    Weekend,
}

impl DayType {
    pub fn of(date: NaiveDate) -> Self {
        match date.weekday() {
            Weekday::Sat | Weekday::Sun => DayType::Weekend,
            _ => DayType::Weekday,
        }
    }
}

impl fmt::Display for DayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayType::Weekday => write!(f, "weekday"),
            DayType::Weekend => write!(f, "weekend"),
        }
    }
}

/// The part of every day in which work may be scheduled, e.g. 12:00-18:00.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyWindow {
    start: NaiveTime,
    end: NaiveTime,
}

impl DailyWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, InvalidWindowError> {
        if start >= end {
            return Err(InvalidWindowError::StartNotBeforeEnd { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parse `HH:MM` bounds.
    pub fn parse(start: &str, end: &str) -> Result<Self, InvalidWindowError> {
        Self::new(parse_time_of_day(start)?, parse_time_of_day(end)?)
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    pub fn length(&self) -> Duration {
        self.end - self.start
    }

    /// Absolute bounds of the window on `date`.
    pub fn on(&self, date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        (date.and_time(self.start), date.and_time(self.end))
    }

    /// Whether `[start, stop)` lies inside the window of a single date.
    pub fn contains(&self, start: NaiveDateTime, stop: NaiveDateTime) -> bool {
        let (open, close) = self.on(start.date());
        start >= open && stop <= close && start < stop
    }
}

impl Default for DailyWindow {
    /// 12:00-18:00
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default(),
        }
    }
}

impl fmt::Display for DailyWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

fn parse_time_of_day(raw: &str) -> Result<NaiveTime, InvalidWindowError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| InvalidWindowError::BadTimeOfDay(raw.to_string()))
}

/// Atomic schedulable unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub date: NaiveDate,
    /// Offset of the slot start from midnight of `date`
    pub start_offset: Duration,
    pub duration: Duration,
    pub day_type: DayType,
}

impl Slot {
    pub fn start(&self) -> NaiveDateTime {
        self.date.and_time(NaiveTime::MIN) + self.start_offset
    }

    pub fn end(&self) -> NaiveDateTime {
        self.start() + self.duration
    }

    /// Half-open intersection test against `[start, end)`.
    pub fn intersects(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        self.start() < end && start < self.end()
    }
}

/// Build the ordered slot sequence for `[horizon_start, horizon_end)`.
///
/// A slot is kept when it starts at or after `horizon_start` and before
/// `horizon_end`. Only whole slots fit into a window; a shorter trailing
/// remainder is left unused.
pub fn build_grid(
    horizon_start: NaiveDateTime,
    horizon_end: NaiveDateTime,
    window: DailyWindow,
    slot_size: Duration,
) -> Result<Vec<Slot>, InvalidWindowError> {
    if window.start >= window.end {
        return Err(InvalidWindowError::StartNotBeforeEnd {
            start: window.start,
            end: window.end,
        });
    }
    if slot_size <= Duration::zero() {
        return Err(InvalidWindowError::NonPositiveSlotSize {
            minutes: slot_size.num_minutes(),
        });
    }
    if horizon_end <= horizon_start {
        return Ok(Vec::new());
    }

    let window_open = window.start - NaiveTime::MIN;
    let window_close = window.end - NaiveTime::MIN;
    let last_date = horizon_end.date();

    let mut slots = Vec::new();
    for date in horizon_start.date().iter_days() {
        if date > last_date {
            break;
        }
        let day_type = DayType::of(date);
        let mut offset = window_open;
        while offset + slot_size <= window_close {
            let slot = Slot {
                date,
                start_offset: offset,
                duration: slot_size,
                day_type,
            };
            let start = slot.start();
            if start >= horizon_start && start < horizon_end {
                slots.push(slot);
            }
            offset = offset + slot_size;
        }
    }

    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn window() -> DailyWindow {
        DailyWindow::parse("12:00", "18:00").unwrap()
    }

    #[test]
    fn day_type_classification() {
        // 2025-10-20 is a Monday, 2025-10-25 a Saturday
        assert_eq!(DayType::of(ts(20, 0, 0).date()), DayType::Weekday);
        assert_eq!(DayType::of(ts(24, 0, 0).date()), DayType::Weekday);
        assert_eq!(DayType::of(ts(25, 0, 0).date()), DayType::Weekend);
        assert_eq!(DayType::of(ts(26, 0, 0).date()), DayType::Weekend);
    }

    #[test]
    fn slots_stay_inside_the_window() {
        let slots = build_grid(ts(20, 0, 0), ts(22, 0, 0), window(), Duration::minutes(30)).unwrap();
        // two full days of 12 half-hour slots
        assert_eq!(slots.len(), 24);
        assert_eq!(slots[0].start(), ts(20, 12, 0));
        assert_eq!(slots[11].end(), ts(20, 18, 0));
        assert_eq!(slots[12].start(), ts(21, 12, 0));
        assert!(slots.windows(2).all(|w| w[0].start() < w[1].start()));
    }

    #[test]
    fn horizon_clips_first_and_last_day() {
        let slots = build_grid(ts(20, 13, 10), ts(21, 13, 0), window(), Duration::hours(1)).unwrap();
        let starts: Vec<_> = slots.iter().map(|s| s.start()).collect();
        assert_eq!(
            starts,
            vec![
                ts(20, 14, 0),
                ts(20, 15, 0),
                ts(20, 16, 0),
                ts(20, 17, 0),
                ts(21, 12, 0)
            ]
        );
    }

    #[test]
    fn trailing_partial_slot_is_dropped() {
        let w = DailyWindow::parse("12:00", "13:45").unwrap();
        let slots = build_grid(ts(20, 0, 0), ts(21, 0, 0), w, Duration::minutes(30)).unwrap();
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[2].end(), ts(20, 13, 30));
    }

    #[test]
    fn inverted_window_is_rejected() {
        assert!(matches!(
            DailyWindow::parse("18:00", "12:00"),
            Err(InvalidWindowError::StartNotBeforeEnd { .. })
        ));
        assert!(matches!(
            DailyWindow::parse("12:00", "12:00"),
            Err(InvalidWindowError::StartNotBeforeEnd { .. })
        ));
        assert!(matches!(
            DailyWindow::parse("noon", "18:00"),
            Err(InvalidWindowError::BadTimeOfDay(_))
        ));
    }

    #[test]
    fn non_positive_slot_size_is_rejected() {
        let err = build_grid(ts(20, 0, 0), ts(21, 0, 0), window(), Duration::zero()).unwrap_err();
        assert_eq!(err, InvalidWindowError::NonPositiveSlotSize { minutes: 0 });
    }

    #[test]
    fn empty_horizon_yields_no_slots() {
        let slots = build_grid(ts(21, 0, 0), ts(20, 0, 0), window(), Duration::minutes(30)).unwrap();
        assert!(slots.is_empty());
    }

    #[test]
    fn window_containment() {
        let w = window();
        assert!(w.contains(ts(20, 12, 0), ts(20, 18, 0)));
        assert!(!w.contains(ts(20, 11, 30), ts(20, 13, 0)));
        assert!(!w.contains(ts(20, 17, 0), ts(20, 18, 30)));
    }
}
