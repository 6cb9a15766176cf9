pub mod commands;
pub mod controller;
pub mod state;

pub use controller::{VisitController, VisitSnapshot};
pub use state::{CompletedVisit, StopReceipt, VisitPhase, VisitState};
