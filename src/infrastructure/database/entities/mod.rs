//! Database entities module

pub mod counter;
pub mod ticket;
