//! Daily prayer log and qaza backlog ledger.
//!
//! [`store::Tracker`] owns the per-day Ada entries and the qaza counters,
//! [`aggregate::Aggregator`] derives day, month and trend views from it, and
//! [`attachments::AttachmentManager`] records voice notes explaining a missed
//! prayer.

pub mod aggregate;
pub mod attachments;
pub mod calendar;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod store;

pub use error::{Result, TrackerError};
