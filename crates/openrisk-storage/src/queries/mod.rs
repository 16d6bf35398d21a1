//! Query modules, one per table group.

pub mod catalog;
pub mod features;
pub mod signal_events;
pub mod time_series;
pub mod weak_labels;
