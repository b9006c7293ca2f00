use crate::domain::models::{SLOT_MINUTES, TimeRange};
use chrono::{NaiveTime, Timelike};
use serde::Serialize;
use std::sync::LazyLock;

static STANDARD_GRID: LazyLock<SlotGrid> =
    LazyLock::new(|| SlotGrid::generate(GridWindow::default()));

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub index: usize,
    pub time: String,
    pub is_start_of_hour: bool,
}

/// Half-open working-day window `[day_start, day_end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridWindow {
    pub day_start: NaiveTime,
    pub day_end: NaiveTime,
}

impl Default for GridWindow {
    fn default() -> Self {
        Self {
            day_start: NaiveTime::from_hms_opt(8, 0, 0).expect("valid fixed time"),
            day_end: NaiveTime::from_hms_opt(17, 30, 0).expect("valid fixed time"),
        }
    }
}

impl GridWindow {
    pub fn parse(day_start: &str, day_end: &str) -> Result<Self, String> {
        let day_start = NaiveTime::parse_from_str(day_start.trim(), "%H:%M")
            .map_err(|_| "grid.day_start must be HH:MM".to_string())?;
        let day_end = NaiveTime::parse_from_str(day_end.trim(), "%H:%M")
            .map_err(|_| "grid.day_end must be HH:MM".to_string())?;
        let window = Self { day_start, day_end };
        window.validate()?;
        Ok(window)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.day_end <= self.day_start {
            return Err("grid.day_end must be after grid.day_start".to_string());
        }
        if minutes_of_day(self.day_start) % SLOT_MINUTES != 0 {
            return Err(format!(
                "grid.day_start must fall on a {SLOT_MINUTES}-minute boundary"
            ));
        }
        if minutes_of_day(self.day_end) % SLOT_MINUTES != 0 {
            return Err(format!(
                "grid.day_end must fall on a {SLOT_MINUTES}-minute boundary"
            ));
        }
        Ok(())
    }
}

/// The fixed sequence of slots for one working day. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct SlotGrid {
    window: GridWindow,
    slots: Vec<Slot>,
}

impl SlotGrid {
    pub fn new(window: GridWindow) -> Result<Self, String> {
        window.validate()?;
        Ok(Self::generate(window))
    }

    /// 08:00-17:30 grid shared by the whole process.
    pub fn standard() -> &'static SlotGrid {
        &STANDARD_GRID
    }

    fn generate(window: GridWindow) -> Self {
        let start = minutes_of_day(window.day_start);
        let end = minutes_of_day(window.day_end);
        let slots = (start..end)
            .step_by(SLOT_MINUTES as usize)
            .enumerate()
            .map(|(index, minute)| Slot {
                index,
                time: format_hhmm(minute),
                is_start_of_hour: minute % 60 == 0,
            })
            .collect();
        Self { window, slots }
    }

    pub fn window(&self) -> GridWindow {
        self.window
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn last_index(&self) -> Option<usize> {
        self.slots.len().checked_sub(1)
    }

    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    pub fn slot_index_of(&self, time: &str) -> Option<usize> {
        let parsed = NaiveTime::parse_from_str(time.trim(), "%H:%M").ok()?;
        let offset = minutes_of_day(parsed).checked_sub(minutes_of_day(self.window.day_start))?;
        if offset % SLOT_MINUTES != 0 {
            return None;
        }
        let index = (offset / SLOT_MINUTES) as usize;
        (index < self.slots.len()).then_some(index)
    }

    pub fn time_of(&self, index: usize) -> Option<&str> {
        self.slots.get(index).map(|slot| slot.time.as_str())
    }

    /// Inclusive slot indices covered by `range`, or why it does not fit this grid.
    pub fn span_of(&self, range: &TimeRange) -> Result<(usize, usize), String> {
        range.validate()?;
        let lo = self.slot_index_of(&range.start_time).ok_or_else(|| {
            format!(
                "range.start_time {} is not a slot boundary within {}-{}",
                range.start_time,
                self.window.day_start.format("%H:%M"),
                self.window.day_end.format("%H:%M")
            )
        })?;
        let hi = lo + range.slot_count() - 1;
        if hi >= self.slots.len() {
            return Err(format!(
                "range {}+{}m extends past the end of the day ({})",
                range.start_time,
                range.duration,
                self.window.day_end.format("%H:%M")
            ));
        }
        Ok((lo, hi))
    }
}

fn minutes_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

fn format_hhmm(minute_of_day: u32) -> String {
    format!("{:02}:{:02}", minute_of_day / 60, minute_of_day % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 16).expect("valid date")
    }

    #[test]
    fn standard_grid_covers_working_day() {
        let grid = SlotGrid::standard();
        assert_eq!(grid.len(), 38);
        assert_eq!(grid.time_of(0), Some("08:00"));
        assert_eq!(grid.last_index(), Some(37));
        assert_eq!(grid.time_of(37), Some("17:15"));
        assert_eq!(grid.time_of(38), None);
        assert!(grid.slots()[0].is_start_of_hour);
        assert!(!grid.slots()[1].is_start_of_hour);
        assert!(grid.slots()[4].is_start_of_hour);
    }

    #[test]
    fn slot_index_of_rejects_times_off_the_grid() {
        let grid = SlotGrid::standard();
        assert_eq!(grid.slot_index_of("09:00"), Some(4));
        assert_eq!(grid.slot_index_of("07:45"), None);
        assert_eq!(grid.slot_index_of("17:30"), None);
        assert_eq!(grid.slot_index_of("09:10"), None);
        assert_eq!(grid.slot_index_of("nine"), None);
    }

    #[test]
    fn span_of_rejects_ranges_past_end_of_day() {
        let grid = SlotGrid::standard();
        assert_eq!(grid.span_of(&TimeRange::new(day(), "17:00", 30)), Ok((36, 37)));
        assert!(grid.span_of(&TimeRange::new(day(), "17:00", 45)).is_err());
        assert!(grid.span_of(&TimeRange::new(day(), "07:30", 30)).is_err());
        assert!(grid.span_of(&TimeRange::new(day(), "09:05", 30)).is_err());
    }

    #[test]
    fn window_validation_rejects_inverted_or_unaligned_bounds() {
        assert!(GridWindow::parse("17:30", "08:00").is_err());
        assert!(GridWindow::parse("08:10", "17:30").is_err());
        assert!(GridWindow::parse("8am", "17:30").is_err());
        let window = GridWindow::parse("07:00", "19:00").expect("valid window");
        let grid = SlotGrid::new(window).expect("valid grid");
        assert_eq!(grid.len(), 48);
    }

    fn window_strategy() -> impl Strategy<Value = GridWindow> {
        (0u32..80u32, 1u32..16u32).prop_map(|(start_quarter, length_quarters)| {
            let start = start_quarter * SLOT_MINUTES;
            let end = (start + length_quarters * SLOT_MINUTES).min(23 * 60 + 45);
            GridWindow {
                day_start: NaiveTime::from_hms_opt(start / 60, start % 60, 0).expect("start"),
                day_end: NaiveTime::from_hms_opt(end / 60, end % 60, 0).expect("end"),
            }
        })
    }

    // Property: consecutive slots are exactly one slot length apart
    proptest! {
        #[test]
        fn property_consecutive_slots_step_by_slot_minutes(window in window_strategy()) {
            let grid = SlotGrid::new(window).expect("generated window is valid");
            for pair in grid.slots().windows(2) {
                let left = NaiveTime::parse_from_str(&pair[0].time, "%H:%M").expect("left");
                let right = NaiveTime::parse_from_str(&pair[1].time, "%H:%M").expect("right");
                prop_assert_eq!((right - left).num_minutes(), SLOT_MINUTES as i64);
                prop_assert_eq!(pair[1].index, pair[0].index + 1);
            }
        }
    }

    // Property: time_of and slot_index_of are inverses on every slot boundary
    proptest! {
        #[test]
        fn property_slot_index_roundtrips_through_time(window in window_strategy()) {
            let grid = SlotGrid::new(window).expect("generated window is valid");
            for slot in grid.slots() {
                let index = grid.slot_index_of(&slot.time);
                prop_assert_eq!(index, Some(slot.index));
                prop_assert_eq!(grid.time_of(slot.index), Some(slot.time.as_str()));
            }
        }
    }
}
