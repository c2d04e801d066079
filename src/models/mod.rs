//! Data models for Staybook

pub mod visit;

pub use visit::{NewVisit, RecordedVisit, Visit, VisitCountState, VisitCountView};
