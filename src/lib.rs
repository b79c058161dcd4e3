pub mod bunch;
pub mod complex;
pub mod config;
pub mod energy;
pub mod error;
pub mod gap;
pub mod logging;
pub mod output;
pub mod problem;
pub mod relativistic;
pub mod scan;
pub mod settings;
pub mod spectrum;
pub mod twiss;
