use crate::domain::models::PlanRecord;
use crate::domain::occupancy::OccupancySet;
use crate::domain::slot_grid::SlotGrid;

/// A plan is hidden once any of its slots has been logged.
pub fn is_superseded(grid: &SlotGrid, plan: &PlanRecord, log_occupancy: &OccupancySet) -> bool {
    let Some(start) = grid.slot_index_of(&plan.range.start_time) else {
        return false;
    };
    let slot_count = plan.range.slot_count();
    if slot_count == 0 {
        return false;
    }
    log_occupancy.any_in(start, start + slot_count - 1)
}

pub fn visible_plans<'a>(
    grid: &SlotGrid,
    plans: &'a [PlanRecord],
    log_occupancy: &OccupancySet,
) -> Vec<&'a PlanRecord> {
    plans
        .iter()
        .filter(|plan| !is_superseded(grid, plan, log_occupancy))
        .collect()
}
