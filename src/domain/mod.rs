pub mod catalog;
pub mod day_view;
pub mod models;
pub mod occupancy;
pub mod overlay;
pub mod record_store;
pub mod report;
pub mod selection;
pub mod slot_grid;
