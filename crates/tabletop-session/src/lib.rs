//! Tabletop session coordinator.
//!
//! Owns one hosted game per invite code: the roster, the quest binding, the
//! authoritative game state, the live connection set and the checkpoint
//! discipline that lets a session survive a restart.

pub mod application;
pub mod domain;
