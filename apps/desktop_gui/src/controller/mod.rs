//! Controller layer: UI events, session reduction, and trigger orchestration.

pub mod events;
pub mod orchestration;
pub mod reducer;
