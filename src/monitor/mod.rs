//! Live class-activity monitoring: capture, classify, react.

mod classify;
mod controller;
mod counter;
mod loop_worker;
mod session;
mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use classify::ClassificationClient;
pub use controller::{MonitorController, MonitorServices};
pub use counter::{InactivityCounter, Observation, INACTIVITY_CAP};
pub use loop_worker::LoopTiming;
pub use session::SessionTracker;
pub use state::{CycleStats, MonitorPhase, MonitorStatus, INITIAL_STATUS};
