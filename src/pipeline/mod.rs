//! Document Pipeline
//!
//! ## Modules
//!
//! - `orchestrator`: section state machine over the outline → theory → practice → conclusion graph
//! - `collaborator`: the external generator and its command-line implementation
//! - `editor`: grounded edits of generated sections
//! - `store`: artifact and context pack records
//! - `retry` / `timeout`: bounded, time boxed collaborator calls

mod collaborator;
mod editor;
mod orchestrator;
mod retry;
mod state;
mod store;
mod timeout;

pub use collaborator::{CommandCollaborator, GeneratedText, GenerationCollaborator, GenerationRequest};
pub use editor::{EditOutcome, GroundedEditor};
pub use orchestrator::{Orchestrator, RunReport, SectionFailure};
pub use retry::{Attempted, RetryPolicy, retry_with_backoff};
pub use state::{DocumentState, SectionState, SectionStatus};
pub use store::{Artifact, ArtifactStore, MemoryArtifactStore, RecordKey};
pub use timeout::with_timeout;
