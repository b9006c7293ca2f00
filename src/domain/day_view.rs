use crate::domain::catalog::Catalog;
use crate::domain::models::{CategoryColor, LogRecord, PlanRecord, RecordMode};
use crate::domain::occupancy::DayOccupancy;
use crate::domain::overlay::visible_plans;
use crate::domain::record_store::RecordStore;
use crate::domain::selection::{Candidate, RangeSelector};
use crate::domain::slot_grid::SlotGrid;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SlotView {
    pub index: usize,
    pub time: String,
    pub is_start_of_hour: bool,
    pub planned: bool,
    pub logged: bool,
    pub in_candidate: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlacedPlan {
    #[serde(flatten)]
    pub record: PlanRecord,
    pub start_index: Option<usize>,
    pub purpose_label: String,
    pub color: CategoryColor,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlacedEntry {
    #[serde(flatten)]
    pub record: LogRecord,
    pub start_index: Option<usize>,
    pub purpose_label: String,
    pub color: CategoryColor,
    pub person_name: Option<String>,
}

/// Everything needed to draw one day of the grid.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DayView {
    pub date: NaiveDate,
    pub mode: RecordMode,
    pub slots: Vec<SlotView>,
    pub plans: Vec<PlacedPlan>,
    pub entries: Vec<PlacedEntry>,
    pub candidate: Option<Candidate>,
}

pub fn project_day(
    grid: &SlotGrid,
    store: &RecordStore,
    catalog: &Catalog,
    selector: &RangeSelector,
    date: NaiveDate,
) -> DayView {
    let plans = store.plans.day(date);
    let entries = store.entries.day(date);
    let occupancy = DayOccupancy::build(grid, plans, entries);
    let candidate = selector.candidate(&occupancy);

    let slots = grid
        .slots()
        .iter()
        .map(|slot| SlotView {
            index: slot.index,
            time: slot.time.clone(),
            is_start_of_hour: slot.is_start_of_hour,
            planned: occupancy.plan().contains(slot.index),
            logged: occupancy.log().contains(slot.index),
            in_candidate: candidate
                .is_some_and(|candidate| (candidate.lo..=candidate.hi).contains(&slot.index)),
        })
        .collect();

    let plans = visible_plans(grid, plans, occupancy.log())
        .into_iter()
        .map(|plan| PlacedPlan {
            record: plan.clone(),
            start_index: grid.slot_index_of(&plan.range.start_time),
            purpose_label: catalog.label_for(&plan.details.purpose_id).to_string(),
            color: catalog.color_for(&plan.details.purpose_id),
        })
        .collect();

    let entries = entries
        .iter()
        .map(|entry| PlacedEntry {
            record: entry.clone(),
            start_index: grid.slot_index_of(&entry.range.start_time),
            purpose_label: catalog.label_for(&entry.details.purpose_id).to_string(),
            color: catalog.color_for(&entry.details.purpose_id),
            person_name: entry
                .details
                .person_ref()
                .and_then(|id| catalog.person(id))
                .map(|person| person.name.clone()),
        })
        .collect();

    DayView {
        date,
        mode: selector.mode(),
        slots,
        plans,
        entries,
        candidate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::default_catalog;
    use crate::domain::models::{
        Alignment, DelegationPotential, LogDetails, LogDraft, PlanDetails, PlanDraft, TimeRange,
    };

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 16).expect("valid date")
    }

    fn seeded_store() -> RecordStore {
        let grid = SlotGrid::standard();
        let mut store = RecordStore::default();
        store
            .plans
            .upsert(
                PlanDraft::new(
                    TimeRange::new(day(), "10:00", 60),
                    PlanDetails {
                        activity_description: "Roadmap".to_string(),
                        purpose_id: "bigger_picture_strategy".to_string(),
                    },
                ),
                grid,
            )
            .expect("plan");
        store
            .plans
            .upsert(
                PlanDraft::new(
                    TimeRange::new(day(), "14:00", 30),
                    PlanDetails {
                        activity_description: "Inbox".to_string(),
                        purpose_id: "gone".to_string(),
                    },
                ),
                grid,
            )
            .expect("plan");
        store
            .entries
            .upsert(
                LogDraft::new(
                    TimeRange::new(day(), "10:00", 15),
                    LogDetails {
                        activity_description: "Standup".to_string(),
                        purpose_id: "meeting".to_string(),
                        purpose_extra_info: None,
                        person_id: Some("michelle".to_string()),
                        delegation_potential: DelegationPotential::OnlyMe,
                        alignment: Alignment::Aligned,
                        disruption_reason: None,
                    },
                ),
                grid,
            )
            .expect("log");
        store
    }

    #[test]
    fn logged_time_hides_overlapping_plan() {
        let grid = SlotGrid::standard();
        let selector = RangeSelector::new(grid, RecordMode::Log);
        let view = project_day(grid, &seeded_store(), &default_catalog(), &selector, day());

        assert_eq!(view.plans.len(), 1);
        assert_eq!(view.plans[0].record.details.activity_description, "Inbox");
        assert_eq!(view.plans[0].color, CategoryColor::neutral());
        assert_eq!(view.entries.len(), 1);
        assert_eq!(view.entries[0].person_name.as_deref(), Some("Michelle"));
        assert_eq!(view.entries[0].purpose_label, "Meeting");
        assert!(view.slots[8].planned && view.slots[8].logged);
        assert!(view.slots[9].planned && !view.slots[9].logged);
    }

    #[test]
    fn candidate_marks_its_slots() {
        let grid = SlotGrid::standard();
        let store = seeded_store();
        let mut selector = RangeSelector::new(grid, RecordMode::Log);
        let occupancy = store.day_occupancy(grid, day());
        assert!(selector.press(1, &occupancy));
        selector.drag_over(3, &occupancy);

        let view = project_day(grid, &store, &default_catalog(), &selector, day());
        let marked = view
            .slots
            .iter()
            .filter(|slot| slot.in_candidate)
            .map(|slot| slot.index)
            .collect::<Vec<_>>();
        assert_eq!(marked, vec![1, 2, 3]);
        assert!(view.candidate.is_some());
    }
}
