//! Application services: the coordinator and its collaborators.

pub mod connections;
pub mod coordinator;
pub mod narration;
pub mod registry;
