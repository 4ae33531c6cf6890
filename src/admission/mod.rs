//! Admission control
//!
//! Every inbound call is admitted or rejected against a per-caller token
//! bucket before any downstream resource is touched. A rejection is an
//! expected outcome, reported separately from failures.
//!
//! Bucket state is bounded by a periodic sweep. The default sweep discards
//! every bucket on a fixed interval; `idle-eviction` drops only callers that
//! have gone quiet.

mod bucket;
mod controller;

pub use bucket::TokenBucket;
pub use controller::{AdmissionController, SweepPolicy};
