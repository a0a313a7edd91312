//! Explicit state machine for a single subject's review decision.
//!
//! The design separates:
//! - **State**: the decision plus any staged verdict (`SubjectState`)
//! - **Events**: what the reviewer did (`Event`)
//! - **Effects**: what to do about it (`Effect`)
//! - **Transition**: `(State, Event) -> Result<(State, Vec<Effect>), TransitionError>`
//!
//! The engine's interpreter executes effects against the draft store.

pub mod effect;
pub mod event;
pub mod state;
pub mod transition;

pub use effect::*;
pub use event::*;
pub use state::*;
pub use transition::*;
