use crate::domain::models::{
    LogDetails, PlanDetails, Record, RecordDetails, RecordDraft, RecordMode,
};
use crate::domain::occupancy::DayOccupancy;
use crate::domain::slot_grid::SlotGrid;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

static NEXT_RECORD_SEQUENCE: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("no {mode} record `{id}` on {date}")]
    StaleId {
        mode: &'static str,
        date: NaiveDate,
        id: String,
    },
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

pub fn next_record_id(prefix: &str) -> String {
    let sequence = NEXT_RECORD_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{}-{sequence}", Utc::now().timestamp_micros())
}

/// Records of one kind keyed by calendar day. Each day's list is kept sorted by start
/// time and a day with no records has no key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayBook<D> {
    days: BTreeMap<NaiveDate, Vec<Record<D>>>,
}

impl<D> Default for DayBook<D> {
    fn default() -> Self {
        Self {
            days: BTreeMap::new(),
        }
    }
}

impl<D: RecordDetails> DayBook<D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_days(days: BTreeMap<NaiveDate, Vec<Record<D>>>) -> Self {
        let days = days
            .into_iter()
            .filter(|(_, records)| !records.is_empty())
            .map(|(date, mut records)| {
                sort_by_start(&mut records);
                (date, records)
            })
            .collect();
        Self { days }
    }

    pub fn day(&self, date: NaiveDate) -> &[Record<D>] {
        self.days.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days.keys().copied()
    }

    pub fn records(&self) -> impl Iterator<Item = &Record<D>> + '_ {
        self.days.values().flatten()
    }

    pub fn find(&self, date: NaiveDate, id: &str) -> Option<&Record<D>> {
        self.day(date).iter().find(|record| record.id == id)
    }

    pub fn len(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Replaces the record named by the draft id, or appends a new one under a fresh id.
    pub fn upsert(
        &mut self,
        draft: RecordDraft<D>,
        grid: &SlotGrid,
    ) -> Result<Record<D>, StoreError> {
        grid.span_of(&draft.range).map_err(StoreError::InvalidRecord)?;
        draft
            .details
            .validate()
            .map_err(StoreError::InvalidRecord)?;

        let date = draft.range.date;
        let record = match draft.normalized_id() {
            Some(id) => {
                let id = id.to_string();
                let position = self
                    .day(date)
                    .iter()
                    .position(|record| record.id == id)
                    .ok_or_else(|| stale(D::MODE, date, &id))?;
                let record = Record {
                    id,
                    range: draft.range,
                    details: draft.details,
                };
                let records = self.days.entry(date).or_default();
                records[position] = record.clone();
                sort_by_start(records);
                record
            }
            None => {
                let record = Record {
                    id: next_record_id(D::ID_PREFIX),
                    range: draft.range,
                    details: draft.details,
                };
                let records = self.days.entry(date).or_default();
                records.push(record.clone());
                sort_by_start(records);
                record
            }
        };
        Ok(record)
    }

    /// Drops records that do not fit `grid` or are filed under another day, returning one
    /// description per dropped record.
    pub fn retain_valid(&mut self, grid: &SlotGrid) -> Vec<String> {
        let mut dropped = Vec::new();
        for (date, records) in self.days.iter_mut() {
            records.retain(|record| match check_placement(record, *date, grid) {
                Ok(()) => true,
                Err(reason) => {
                    dropped.push(format!(
                        "{} `{}` on {date}: {reason}",
                        D::MODE.as_str(),
                        record.id
                    ));
                    false
                }
            });
        }
        self.days.retain(|_, records| !records.is_empty());
        dropped
    }

    pub fn remove(&mut self, date: NaiveDate, id: &str) -> Result<Record<D>, StoreError> {
        let records = self
            .days
            .get_mut(&date)
            .ok_or_else(|| stale(D::MODE, date, id))?;
        let position = records
            .iter()
            .position(|record| record.id == id)
            .ok_or_else(|| stale(D::MODE, date, id))?;
        let removed = records.remove(position);
        if records.is_empty() {
            self.days.remove(&date);
        }
        Ok(removed)
    }
}

impl<D: Serialize> Serialize for DayBook<D> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.days.serialize(serializer)
    }
}

impl<'de, D: RecordDetails> Deserialize<'de> for DayBook<D> {
    fn deserialize<De: Deserializer<'de>>(deserializer: De) -> Result<Self, De::Error> {
        let days = BTreeMap::<NaiveDate, Vec<Record<D>>>::deserialize(deserializer)?;
        Ok(Self::from_days(days))
    }
}

/// Every plan and log the user has, which is exactly what a snapshot persists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordStore {
    pub entries: DayBook<LogDetails>,
    pub plans: DayBook<PlanDetails>,
}

impl RecordStore {
    pub fn new(entries: DayBook<LogDetails>, plans: DayBook<PlanDetails>) -> Self {
        Self { entries, plans }
    }

    pub fn day_occupancy(&self, grid: &SlotGrid, date: NaiveDate) -> DayOccupancy {
        DayOccupancy::build(grid, self.plans.day(date), self.entries.day(date))
    }

    pub fn retain_valid(&mut self, grid: &SlotGrid) -> Vec<String> {
        let mut dropped = self.entries.retain_valid(grid);
        dropped.extend(self.plans.retain_valid(grid));
        dropped
    }
}

fn check_placement<D: RecordDetails>(
    record: &Record<D>,
    date: NaiveDate,
    grid: &SlotGrid,
) -> Result<(), String> {
    record.validate()?;
    grid.span_of(&record.range)?;
    if record.range.date != date {
        return Err(format!("record.date {} does not match its day", record.range.date));
    }
    Ok(())
}

fn sort_by_start<D>(records: &mut [Record<D>]) {
    records.sort_by(|left, right| left.range.start_time.cmp(&right.range.start_time));
}

fn stale(mode: RecordMode, date: NaiveDate, id: &str) -> StoreError {
    StoreError::StaleId {
        mode: mode.as_str(),
        date,
        id: id.to_string(),
    }
}
