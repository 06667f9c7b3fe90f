//! Contact domain model.
//!
//! # Responsibility
//! - Define the canonical contact record and its identifier.
//! - Derive filesystem-safe labels for record file names.
//!
//! # Invariants
//! - Every contact is identified by a stable `ContactId`.
//! - File-name labels are derived data; identity lives in the record body.

pub mod contact;
pub mod naming;
