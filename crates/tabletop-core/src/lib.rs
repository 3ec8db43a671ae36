//! Tabletop Core — shared abstractions for the session coordinator.
//!
//! This crate defines the seams every other crate depends on: time,
//! randomness, the checkpoint store, the narration collaborator and the
//! error taxonomy. It contains no infrastructure code.

pub mod clock;
pub mod command;
pub mod error;
pub mod narration;
pub mod rng;
pub mod store;
