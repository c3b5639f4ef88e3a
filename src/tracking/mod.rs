//! Fixed-size ring buffers the engine keeps its history in

pub mod nav;
pub mod violation;

pub use nav::{NavTracker, NAV_HISTORY_CAPACITY};
pub use violation::{ViolationTracker, VIOLATION_WINDOW};
