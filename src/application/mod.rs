pub mod autosave;
pub mod bootstrap;
pub mod commands;
