use crate::domain::models::{RecordMode, SLOT_MINUTES, Selection};
use crate::domain::occupancy::DayOccupancy;
use crate::domain::slot_grid::SlotGrid;
use chrono::NaiveDate;
use serde::Serialize;

/// Where the drag gesture currently is. Committing happens inside `release`,
/// which always leaves the selector idle again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorState {
    Idle,
    Dragging { anchor: usize, cursor: usize },
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    Valid,
    Conflict,
}

/// The normalized in-progress range, re-evaluated against occupancy on every read.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Candidate {
    pub lo: usize,
    pub hi: usize,
    pub status: CandidateStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Committed {
        mode: RecordMode,
        selection: Selection,
    },
    Rejected {
        mode: RecordMode,
        lo: usize,
        hi: usize,
    },
    Ignored,
}

#[derive(Debug, Clone)]
pub struct RangeSelector {
    mode: RecordMode,
    state: SelectorState,
    slot_count: usize,
}

impl RangeSelector {
    pub fn new(grid: &SlotGrid, mode: RecordMode) -> Self {
        Self {
            mode,
            state: SelectorState::Idle,
            slot_count: grid.len(),
        }
    }

    pub fn mode(&self) -> RecordMode {
        self.mode
    }

    pub fn state(&self) -> SelectorState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, SelectorState::Dragging { .. })
    }

    /// Switching mode drops whatever gesture was in progress.
    pub fn set_mode(&mut self, mode: RecordMode) {
        self.mode = mode;
        self.state = SelectorState::Idle;
    }

    pub fn cancel(&mut self) {
        self.state = SelectorState::Idle;
    }

    /// Starts a drag on `slot`; a taken or out-of-grid slot is refused silently.
    pub fn press(&mut self, slot: usize, occupancy: &DayOccupancy) -> bool {
        if slot >= self.slot_count || occupancy.for_mode(self.mode).contains(slot) {
            return false;
        }
        self.state = SelectorState::Dragging {
            anchor: slot,
            cursor: slot,
        };
        true
    }

    pub fn drag_over(&mut self, slot: usize, occupancy: &DayOccupancy) -> Option<Candidate> {
        let SelectorState::Dragging { anchor, .. } = self.state else {
            return None;
        };
        if slot < self.slot_count {
            self.state = SelectorState::Dragging {
                anchor,
                cursor: slot,
            };
        }
        self.candidate(occupancy)
    }

    pub fn candidate(&self, occupancy: &DayOccupancy) -> Option<Candidate> {
        let SelectorState::Dragging { anchor, cursor } = self.state else {
            return None;
        };
        let lo = anchor.min(cursor);
        let hi = anchor.max(cursor);
        let status = if occupancy.for_mode(self.mode).any_in(lo, hi) {
            CandidateStatus::Conflict
        } else {
            CandidateStatus::Valid
        };
        Some(Candidate { lo, hi, status })
    }

    pub fn release(
        &mut self,
        date: NaiveDate,
        grid: &SlotGrid,
        occupancy: &DayOccupancy,
    ) -> ReleaseOutcome {
        let Some(candidate) = self.candidate(occupancy) else {
            return ReleaseOutcome::Ignored;
        };
        self.state = SelectorState::Idle;

        let rejected = ReleaseOutcome::Rejected {
            mode: self.mode,
            lo: candidate.lo,
            hi: candidate.hi,
        };
        if candidate.status == CandidateStatus::Conflict {
            return rejected;
        }
        let Some(start_time) = grid.time_of(candidate.lo) else {
            return rejected;
        };

        ReleaseOutcome::Committed {
            mode: self.mode,
            selection: Selection {
                date,
                start_time: start_time.to_string(),
                duration: (candidate.hi - candidate.lo + 1) as u32 * SLOT_MINUTES,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{
        Alignment, DelegationPotential, LogDetails, PlanDetails, Record, TimeRange,
    };

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 16).expect("valid date")
    }

    fn log(start: &str, duration: u32) -> Record<LogDetails> {
        Record {
            id: format!("log-{start}"),
            range: TimeRange::new(day(), start, duration),
            details: LogDetails {
                activity_description: "logged".to_string(),
                purpose_id: "meeting".to_string(),
                purpose_extra_info: None,
                person_id: None,
                delegation_potential: DelegationPotential::OnlyMe,
                alignment: Alignment::Aligned,
                disruption_reason: None,
            },
        }
    }

    fn plan(start: &str, duration: u32) -> Record<PlanDetails> {
        Record {
            id: format!("plan-{start}"),
            range: TimeRange::new(day(), start, duration),
            details: PlanDetails {
                activity_description: "planned".to_string(),
                purpose_id: "bau_team_support".to_string(),
            },
        }
    }

    fn occupancy(plans: &[Record<PlanDetails>], logs: &[Record<LogDetails>]) -> DayOccupancy {
        DayOccupancy::build(SlotGrid::standard(), plans, logs)
    }

    fn index(time: &str) -> usize {
        SlotGrid::standard().slot_index_of(time).expect("slot in grid")
    }

    #[test]
    fn drag_commits_normalized_selection_in_log_mode() {
        let grid = SlotGrid::standard();
        let occupancy = occupancy(&[], &[]);
        let mut selector = RangeSelector::new(grid, RecordMode::Log);

        assert!(selector.press(index("09:00"), &occupancy));
        selector.drag_over(index("09:15"), &occupancy);
        let outcome = selector.release(day(), grid, &occupancy);

        assert_eq!(
            outcome,
            ReleaseOutcome::Committed {
                mode: RecordMode::Log,
                selection: Selection {
                    date: day(),
                    start_time: "09:00".to_string(),
                    duration: 30,
                },
            }
        );
        assert_eq!(selector.state(), SelectorState::Idle);
    }

    #[test]
    fn upward_drag_is_normalized() {
        let grid = SlotGrid::standard();
        let occupancy = occupancy(&[], &[]);
        let mut selector = RangeSelector::new(grid, RecordMode::Plan);

        assert!(selector.press(index("11:00"), &occupancy));
        let candidate = selector
            .drag_over(index("10:15"), &occupancy)
            .expect("dragging");
        assert_eq!((candidate.lo, candidate.hi), (index("10:15"), index("11:00")));

        match selector.release(day(), grid, &occupancy) {
            ReleaseOutcome::Committed { selection, .. } => {
                assert_eq!(selection.start_time, "10:15");
                assert_eq!(selection.duration, 60);
            }
            other => panic!("expected committed selection, got {other:?}"),
        }
    }

    #[test]
    fn single_click_selects_one_slot() {
        let grid = SlotGrid::standard();
        let occupancy = occupancy(&[], &[]);
        let mut selector = RangeSelector::new(grid, RecordMode::Log);

        assert!(selector.press(index("17:15"), &occupancy));
        match selector.release(day(), grid, &occupancy) {
            ReleaseOutcome::Committed { selection, .. } => {
                assert_eq!(selection.start_time, "17:15");
                assert_eq!(selection.duration, 15);
            }
            other => panic!("expected committed selection, got {other:?}"),
        }
    }

    #[test]
    fn overlapping_drag_is_rejected_without_side_effects() {
        let grid = SlotGrid::standard();
        let occupancy = occupancy(&[], &[log("09:00", 30)]);
        let mut selector = RangeSelector::new(grid, RecordMode::Log);

        assert!(selector.press(index("08:45"), &occupancy));
        let candidate = selector
            .drag_over(index("09:15"), &occupancy)
            .expect("dragging");
        assert_eq!(candidate.status, CandidateStatus::Conflict);

        assert_eq!(
            selector.release(day(), grid, &occupancy),
            ReleaseOutcome::Rejected {
                mode: RecordMode::Log,
                lo: index("08:45"),
                hi: index("09:15"),
            }
        );
        assert_eq!(selector.state(), SelectorState::Idle);
    }

    #[test]
    fn candidate_status_tracks_the_pointer() {
        let grid = SlotGrid::standard();
        let occupancy = occupancy(&[], &[log("10:00", 15)]);
        let mut selector = RangeSelector::new(grid, RecordMode::Log);

        assert!(selector.press(index("09:00"), &occupancy));
        let over = selector
            .drag_over(index("10:00"), &occupancy)
            .expect("dragging");
        assert_eq!(over.status, CandidateStatus::Conflict);
        let back = selector
            .drag_over(index("09:45"), &occupancy)
            .expect("dragging");
        assert_eq!(back.status, CandidateStatus::Valid);
    }

    #[test]
    fn press_on_taken_slot_is_a_no_op() {
        let grid = SlotGrid::standard();
        let occupancy = occupancy(&[plan("13:00", 30)], &[log("09:00", 30)]);
        let mut log_selector = RangeSelector::new(grid, RecordMode::Log);
        assert!(!log_selector.press(index("09:15"), &occupancy));
        assert_eq!(log_selector.release(day(), grid, &occupancy), ReleaseOutcome::Ignored);

        let mut plan_selector = RangeSelector::new(grid, RecordMode::Plan);
        assert!(!plan_selector.press(index("13:00"), &occupancy));
        assert!(!plan_selector.press(grid.len(), &occupancy));
        assert!(!plan_selector.is_dragging());
    }

    #[test]
    fn plans_do_not_block_log_drags_and_vice_versa() {
        let grid = SlotGrid::standard();
        let occupancy = occupancy(&[plan("10:00", 60)], &[log("14:00", 30)]);

        let mut selector = RangeSelector::new(grid, RecordMode::Log);
        assert!(selector.press(index("10:00"), &occupancy));
        selector.drag_over(index("10:45"), &occupancy);
        assert!(matches!(
            selector.release(day(), grid, &occupancy),
            ReleaseOutcome::Committed { .. }
        ));

        selector.set_mode(RecordMode::Plan);
        assert!(selector.press(index("14:00"), &occupancy));
        assert!(matches!(
            selector.release(day(), grid, &occupancy),
            ReleaseOutcome::Committed {
                mode: RecordMode::Plan,
                ..
            }
        ));
    }

    #[test]
    fn mode_switch_resets_in_progress_drag() {
        let grid = SlotGrid::standard();
        let occupancy = occupancy(&[], &[]);
        let mut selector = RangeSelector::new(grid, RecordMode::Log);

        assert!(selector.press(index("09:00"), &occupancy));
        selector.set_mode(RecordMode::Plan);
        assert_eq!(selector.state(), SelectorState::Idle);
        assert_eq!(selector.mode(), RecordMode::Plan);
        assert!(selector.candidate(&occupancy).is_none());
    }

    #[test]
    fn moves_outside_the_grid_keep_the_last_cursor() {
        let grid = SlotGrid::standard();
        let occupancy = occupancy(&[], &[]);
        let mut selector = RangeSelector::new(grid, RecordMode::Log);

        assert!(selector.press(index("17:00"), &occupancy));
        selector.drag_over(index("17:15"), &occupancy);
        let candidate = selector
            .drag_over(grid.len() + 3, &occupancy)
            .expect("dragging");
        assert_eq!(candidate.hi, index("17:15"));
    }
}
