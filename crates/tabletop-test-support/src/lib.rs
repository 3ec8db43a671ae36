//! Shared test doubles for the tabletop session coordinator.

mod clock;
mod narrator;
mod rng;
mod store;

pub use clock::FixedClock;
pub use narrator::{StalledNarrator, StubNarrator};
pub use rng::{MockRng, SequenceRng};
pub use store::{FailingStateStore, InMemoryStateStore, RecordingStateStore};
