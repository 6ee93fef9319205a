//! Core business logic for the appraisal service.
//!
//! - [`policy`]: who may see and do what
//! - [`lifecycle`]: transition tables for every status-bearing entity
//! - [`scoring`]: weighted scores, bands and rater discrepancies
//! - [`services`]: the operations the HTTP layer exposes

pub mod lifecycle;
pub mod policy;
pub mod scoring;
pub mod services;

pub use policy::Actor;
pub use services::*;
