//! Application layer containing the bundle recording logic.
//!
//! `orchestrator` decides which records a purchase needs and issues the writes
//! in order; `parameters` turns domain values into the named parameters each
//! write carries.

pub mod orchestrator;
pub mod parameters;
