pub mod decision;
pub mod error;
pub mod mutation;
pub mod state_machine;
pub mod subject;

pub use decision::{is_blank, Decision};
pub use error::{FailureCause, MutationFailure, ReviewError, TransitionError};
pub use mutation::{CommitPlan, Mutation, MutationAction};
pub use subject::{
    LecturerId, LecturerSubmission, ReviewStatus, SubjectId, SubjectKind, SubjectRef,
    SubmittedItem,
};
