pub mod reporter;

pub use reporter::TrackingReporter;
