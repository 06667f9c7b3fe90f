//! In-memory projections over the record store.

pub mod contact_list;
