use std::sync::Arc;

use espelho_studio::artifacts::ArtifactStore;
use espelho_studio::draft::WizardService;
use espelho_studio::orchestrator::Orchestrator;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: espelho_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Generation orchestrator (providers + artifact storage + job lifecycle).
    pub orchestrator: Arc<Orchestrator>,
    /// Session-scoped wizard draft service.
    pub wizard: Arc<WizardService>,
    /// Durable image storage, shared with the orchestrator.
    pub artifacts: Arc<dyn ArtifactStore>,
}
