//! formkit Runtime - builder autosave and submission resume controllers
//!
//! # Builder side
//! - `BuilderController`: working copy vs. saved snapshot, debounced
//!   autosave with a single-flight guard
//! - `Debouncer`: restartable one-shot timer
//!
//! # Respondent side
//! - `SubmissionResolver`: stable submission ids and the resume decision
//! - `SubmissionSession`: card navigation, validation, submit
//! - `ProgressSaver`: background progress saves, newest wins
//! - `ClientStore`: durable per-respondent storage (`MemoryStore`, `FileStore`)
//!
//! Controllers are plain values built from injected capabilities
//! (`FormService`, `ClientStore`, `IdGenerator`); there is no global state.

#![warn(unreachable_pub)]

pub mod builder;
pub mod debounce;
pub mod error;
pub mod progress;
pub mod resume;
pub mod session;
pub mod storage;

pub use builder::{AutosaveConfig, BuilderController, SaveOutcome, SaveStatus};
pub use debounce::Debouncer;
pub use error::{SessionError, StorageError, SubmitError};
pub use progress::ProgressSaver;
pub use resume::{
    PendingChoice, ResumeChoice, ResumeDecision, SessionOrigin, SessionStart, SubmissionResolver,
};
pub use session::{AdvanceOutcome, Completion, Direction, Navigation, SessionPhase, SubmissionSession};
pub use storage::{answers_key, submission_key, ClientStore, FileStore, MemoryStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
