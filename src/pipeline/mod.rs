// src/pipeline/mod.rs

pub mod event_bus;
pub mod metrics;
pub mod snapshot;
pub mod tick_driver;

pub use event_bus::{ControllerEvent, EventBus};
pub use snapshot::{snapshot_cell, SnapshotWriter};
pub use tick_driver::TickDriver;
