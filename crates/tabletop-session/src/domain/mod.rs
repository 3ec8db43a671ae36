//! Domain model for hosted sessions.

pub mod aggregates;
pub mod commands;
pub mod events;
pub mod invite_code;
