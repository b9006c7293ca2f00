use crate::domain::models::{LogDetails, PlanDetails, Record, RecordDetails, RecordMode};
use crate::domain::slot_grid::SlotGrid;
use std::collections::BTreeSet;

/// Slot indices covered by the records of one mode on one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupancySet {
    mode: RecordMode,
    slots: BTreeSet<usize>,
}

impl OccupancySet {
    pub fn empty(mode: RecordMode) -> Self {
        Self {
            mode,
            slots: BTreeSet::new(),
        }
    }

    pub fn from_records<D: RecordDetails>(grid: &SlotGrid, records: &[Record<D>]) -> Self {
        let mut occupancy = Self::empty(D::MODE);
        for record in records {
            // Records whose start is off the grid cannot be placed, so they cover nothing.
            let Some(start) = grid.slot_index_of(&record.range.start_time) else {
                continue;
            };
            let end = start
                .saturating_add(record.range.slot_count())
                .min(grid.len());
            occupancy.slots.extend(start..end);
        }
        occupancy
    }

    pub fn mode(&self) -> RecordMode {
        self.mode
    }

    pub fn contains(&self, index: usize) -> bool {
        self.slots.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots.iter().copied()
    }

    /// True when any slot of the inclusive span `[lo, hi]` is taken.
    pub fn any_in(&self, lo: usize, hi: usize) -> bool {
        let (lo, hi) = (lo.min(hi), lo.max(hi));
        self.slots.range(lo..=hi).next().is_some()
    }

    pub fn is_free(&self, lo: usize, hi: usize) -> bool {
        !self.any_in(lo, hi)
    }
}

/// Both occupancy universes of a day; a slot may be planned and logged at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayOccupancy {
    plan: OccupancySet,
    log: OccupancySet,
}

impl DayOccupancy {
    pub fn build(
        grid: &SlotGrid,
        plans: &[Record<PlanDetails>],
        logs: &[Record<LogDetails>],
    ) -> Self {
        Self {
            plan: OccupancySet::from_records(grid, plans),
            log: OccupancySet::from_records(grid, logs),
        }
    }

    pub fn for_mode(&self, mode: RecordMode) -> &OccupancySet {
        match mode {
            RecordMode::Plan => &self.plan,
            RecordMode::Log => &self.log,
        }
    }

    pub fn plan(&self) -> &OccupancySet {
        &self.plan
    }

    pub fn log(&self) -> &OccupancySet {
        &self.log
    }
}
