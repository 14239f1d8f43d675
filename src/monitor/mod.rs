mod decider;
mod probe;
mod scheduler;
mod state;
mod store;

pub use decider::{DecisionPolicy, Evaluation};
pub use probe::SystemctlProbe;
pub use scheduler::{Scheduler, SchedulerSettings};
pub use state::{Decision, Observation, ServiceStatus};
pub use store::JsonFileStore;

#[cfg(test)]
pub use decider::decide;
