//! Flutter bridge for the Contactor core.

pub mod api;
