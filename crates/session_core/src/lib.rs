//! Session controller for a single-dataset query front-end.
//!
//! [`SessionState`] holds what the user sees and which dataset is active;
//! [`sequencer`] owns every transition of that state and guarantees that at
//! most one backend call is outstanding per session.

pub mod config;
pub mod gateway;
pub mod sequencer;
pub mod session;

pub use gateway::{CommandGateway, EngineGateway};
pub use sequencer::{Dispatch, Resolution, Sequencer, Trigger};
pub use session::{Operation, PendingCall, SessionMessage, SessionPhase, SessionState};
