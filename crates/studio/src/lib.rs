//! Studio services: model catalog, wizard sessions, artifact storage, and
//! the generation orchestrator that drives a try-on job end to end.

pub mod artifacts;
pub mod draft;
pub mod jobs;
pub mod models;
pub mod orchestrator;

pub use artifacts::{ArtifactStore, FsArtifactStore};
pub use draft::{DraftStore, MemoryDraftStore, StudioPrefs, WizardService};
pub use jobs::{JobStore, PgJobStore};
pub use models::{resolve_model, AiModel, AI_MODELS};
pub use orchestrator::{GenerateInput, GenerateOutcome, Orchestrator, ProviderRegistry};
