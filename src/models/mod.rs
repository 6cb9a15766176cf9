pub mod location;
pub mod task;

pub use location::{LocationSample, StopUpdate, TrackingUpdate};
pub use task::{AgentRef, TaskStatus, VisitTask};
