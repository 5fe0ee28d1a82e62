//! Animation helpers for driving growth over time

mod growth_schedule;

pub use growth_schedule::GrowthSchedule;
