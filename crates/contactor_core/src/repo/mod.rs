//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate file layout details from service orchestration.
//!
//! # Invariants
//! - Repository writes must enforce `Contact::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `DuplicateId`) in
//!   addition to I/O transport errors.

pub mod contact_repo;
