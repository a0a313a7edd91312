//! Effect interpreter.
//!
//! The interpreter is the boundary between the pure decision machine and
//! the draft store. It takes effects (descriptions of what to do) and
//! executes them.

use credreview_core::state_machine::{Effect, LogLevel};
use credreview_core::{Decision, LecturerId, SubjectRef};
use tracing::{debug, info};

use crate::draft_store::{DraftStore, PersistenceFailure};

/// Context needed by the interpreter to execute effects.
pub struct InterpreterContext<'a> {
    pub drafts: &'a DraftStore,
    pub lecturer_id: &'a LecturerId,
    /// The subject whose transition produced the effects.
    pub subject: &'a SubjectRef,
}

/// Execute a list of effects in order.
///
/// Every effect runs even if an earlier one fails. Returns the first
/// persistence failure, if any.
pub async fn execute_effects(
    ctx: &InterpreterContext<'_>,
    effects: Vec<Effect>,
) -> Option<PersistenceFailure> {
    let mut first_failure = None;

    for effect in effects {
        if let Err(failure) = execute_effect(ctx, effect).await {
            first_failure.get_or_insert(failure);
        }
    }

    first_failure
}

async fn execute_effect(
    ctx: &InterpreterContext<'_>,
    effect: Effect,
) -> Result<(), PersistenceFailure> {
    match effect {
        Effect::PersistDraft { decision } => execute_persist_draft(ctx, &decision).await,

        Effect::Log { level, message } => {
            match level {
                LogLevel::Debug => debug!("{}: {}", ctx.subject, message),
                LogLevel::Info => info!("{}: {}", ctx.subject, message),
            }
            Ok(())
        }
    }
}

async fn execute_persist_draft(
    ctx: &InterpreterContext<'_>,
    decision: &Decision,
) -> Result<(), PersistenceFailure> {
    ctx.drafts
        .save(ctx.lecturer_id, ctx.subject.kind, &ctx.subject.id, decision)
        .await
}
