//! Wizard draft persistence and the session-scoped wizard service.
//!
//! Drafts are keyed by an opaque session identifier so an interrupted flow
//! resumes where the selections left off. The storage seam is a trait; the
//! in-memory implementation backs tests and single-instance deployments.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use espelho_core::error::CoreError;
use espelho_core::style::Style;
use espelho_core::types::DbId;
use espelho_core::wizard::{
    furthest_valid_step, validate_navigation, WizardDraft, WizardStep,
};

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Longer-lived per-user choices that outlive any single draft. The style
/// and model picked once keep applying to later sessions until changed.
#[derive(Debug, Clone, Default)]
pub struct StudioPrefs {
    pub style: Option<Style>,
    /// Catalog identifier of the last explicitly chosen model.
    pub model_id: Option<String>,
}

/// Session-keyed draft persistence plus the per-user preference slot.
///
/// Clearing a draft never touches the preferences; that split is what lets
/// a finished generation reset the wizard without forgetting the user's
/// style and model choices.
#[async_trait]
pub trait DraftStore: Send + Sync {
    async fn load(&self, session_id: &str) -> Result<Option<WizardDraft>, CoreError>;
    async fn save(&self, session_id: &str, draft: &WizardDraft) -> Result<(), CoreError>;
    async fn clear(&self, session_id: &str) -> Result<(), CoreError>;

    async fn load_prefs(&self, session_id: &str) -> Result<StudioPrefs, CoreError>;
    async fn save_prefs(&self, session_id: &str, prefs: &StudioPrefs) -> Result<(), CoreError>;
}

/// In-memory draft store.
#[derive(Default)]
pub struct MemoryDraftStore {
    entries: RwLock<HashMap<String, WizardDraft>>,
    prefs: RwLock<HashMap<String, StudioPrefs>>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DraftStore for MemoryDraftStore {
    async fn load(&self, session_id: &str) -> Result<Option<WizardDraft>, CoreError> {
        Ok(self.entries.read().await.get(session_id).cloned())
    }

    async fn save(&self, session_id: &str, draft: &WizardDraft) -> Result<(), CoreError> {
        self.entries
            .write()
            .await
            .insert(session_id.to_string(), draft.clone());
        Ok(())
    }

    async fn clear(&self, session_id: &str) -> Result<(), CoreError> {
        self.entries.write().await.remove(session_id);
        Ok(())
    }

    async fn load_prefs(&self, session_id: &str) -> Result<StudioPrefs, CoreError> {
        Ok(self
            .prefs
            .read()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_prefs(&self, session_id: &str, prefs: &StudioPrefs) -> Result<(), CoreError> {
        self.prefs
            .write()
            .await
            .insert(session_id.to_string(), prefs.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Session-scoped wizard operations over a [`DraftStore`].
///
/// All mutation goes through here so the step rules in
/// `espelho_core::wizard` are applied on every write, never just in the UI.
pub struct WizardService {
    store: Arc<dyn DraftStore>,
}

impl WizardService {
    pub fn new(store: Arc<dyn DraftStore>) -> Self {
        Self { store }
    }

    /// Load the session's draft, or a fresh one on step 1. A draft without a
    /// style picks up the user's saved style preference, so a cleared wizard
    /// still remembers the look chosen in an earlier session.
    pub async fn load_or_new(&self, session_id: &str) -> Result<WizardDraft, CoreError> {
        let mut draft = self
            .store
            .load(session_id)
            .await?
            .unwrap_or_else(WizardDraft::new);
        if draft.style.is_none() {
            draft.style = self.store.load_prefs(session_id).await?.style;
        }
        Ok(draft)
    }

    /// Resume an interrupted session: returns the draft restored to the
    /// furthest step its selections allow.
    pub async fn resume(&self, session_id: &str) -> Result<WizardDraft, CoreError> {
        let mut draft = self.load_or_new(session_id).await?;
        let step = furthest_valid_step(&draft);
        if draft.current_step != step.to_number() {
            draft.current_step = step.to_number();
            self.store.save(session_id, &draft).await?;
        }
        Ok(draft)
    }

    /// Record the garment selection (step 1).
    pub async fn select_garment(
        &self,
        session_id: &str,
        asset_id: DbId,
    ) -> Result<WizardDraft, CoreError> {
        let mut draft = self.load_or_new(session_id).await?;
        draft.garment_asset_id = Some(asset_id);
        self.store.save(session_id, &draft).await?;
        Ok(draft)
    }

    /// Record the model selection (step 2).
    pub async fn select_model(
        &self,
        session_id: &str,
        asset_id: DbId,
    ) -> Result<WizardDraft, CoreError> {
        let mut draft = self.load_or_new(session_id).await?;
        draft.model_asset_id = Some(asset_id);
        self.store.save(session_id, &draft).await?;
        Ok(draft)
    }

    /// Record style and instructions (step 3). Both are optional at execute
    /// time; saving them here keeps the draft resumable. A chosen style also
    /// becomes the user's saved preference for future sessions.
    pub async fn set_style_and_instructions(
        &self,
        session_id: &str,
        style: Option<Style>,
        instructions: String,
    ) -> Result<WizardDraft, CoreError> {
        let mut draft = self.load_or_new(session_id).await?;
        if let Some(style) = style {
            draft.style = Some(style);
            let mut prefs = self.store.load_prefs(session_id).await?;
            prefs.style = Some(style);
            self.store.save_prefs(session_id, &prefs).await?;
        }
        draft.instructions = instructions;
        self.store.save(session_id, &draft).await?;
        Ok(draft)
    }

    /// Move the session to another step, enforcing the entry rules.
    pub async fn navigate(
        &self,
        session_id: &str,
        target: WizardStep,
    ) -> Result<WizardDraft, CoreError> {
        let mut draft = self.load_or_new(session_id).await?;
        let current = WizardStep::from_number(draft.current_step)?;
        validate_navigation(current, target, &draft)?;
        draft.current_step = target.to_number();
        self.store.save(session_id, &draft).await?;
        Ok(draft)
    }

    /// Discard the session's draft (after a completed generation, or on an
    /// explicit restart). Saved preferences are untouched.
    pub async fn clear(&self, session_id: &str) -> Result<(), CoreError> {
        self.store.clear(session_id).await
    }

    /// The user's longer-lived style and model preferences.
    pub async fn preferences(&self, session_id: &str) -> Result<StudioPrefs, CoreError> {
        self.store.load_prefs(session_id).await
    }

    /// Remember an explicitly chosen model as the preference for future
    /// generations.
    pub async fn remember_model(
        &self,
        session_id: &str,
        model_id: &str,
    ) -> Result<(), CoreError> {
        let mut prefs = self.store.load_prefs(session_id).await?;
        prefs.model_id = Some(model_id.to_string());
        self.store.save_prefs(session_id, &prefs).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn service() -> WizardService {
        WizardService::new(Arc::new(MemoryDraftStore::new()))
    }

    #[tokio::test]
    async fn fresh_session_starts_on_step_one() {
        let svc = service();
        let draft = svc.load_or_new("s1").await.unwrap();
        assert_eq!(draft.current_step, 1);
        assert!(draft.garment_asset_id.is_none());
    }

    #[tokio::test]
    async fn selections_persist_across_loads() {
        let svc = service();
        svc.select_garment("s1", 7).await.unwrap();
        svc.select_model("s1", 9).await.unwrap();

        let draft = svc.load_or_new("s1").await.unwrap();
        assert_eq!(draft.garment_asset_id, Some(7));
        assert_eq!(draft.model_asset_id, Some(9));
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let svc = service();
        svc.select_garment("s1", 7).await.unwrap();

        let other = svc.load_or_new("s2").await.unwrap();
        assert!(other.garment_asset_id.is_none());
    }

    #[tokio::test]
    async fn forward_navigation_requires_selection() {
        let svc = service();
        let err = svc.navigate("s1", WizardStep::SelectModel).await;
        assert_matches!(err, Err(CoreError::Validation(_)));

        svc.select_garment("s1", 7).await.unwrap();
        let draft = svc.navigate("s1", WizardStep::SelectModel).await.unwrap();
        assert_eq!(draft.current_step, 2);
    }

    #[tokio::test]
    async fn backward_navigation_is_always_allowed() {
        let svc = service();
        svc.select_garment("s1", 7).await.unwrap();
        svc.navigate("s1", WizardStep::SelectModel).await.unwrap();

        let draft = svc.navigate("s1", WizardStep::SelectGarment).await.unwrap();
        assert_eq!(draft.current_step, 1);
    }

    #[tokio::test]
    async fn resume_restores_furthest_valid_step() {
        let svc = service();
        svc.select_garment("s1", 7).await.unwrap();
        svc.select_model("s1", 9).await.unwrap();

        let draft = svc.resume("s1").await.unwrap();
        assert_eq!(draft.current_step, 3);

        // And the restored step is persisted.
        let reloaded = svc.load_or_new("s1").await.unwrap();
        assert_eq!(reloaded.current_step, 3);
    }

    #[tokio::test]
    async fn clear_discards_the_draft() {
        let svc = service();
        svc.select_garment("s1", 7).await.unwrap();
        svc.clear("s1").await.unwrap();

        let draft = svc.load_or_new("s1").await.unwrap();
        assert!(draft.garment_asset_id.is_none());
        assert_eq!(draft.current_step, 1);
    }

    // -- Preferences --

    #[tokio::test]
    async fn chosen_style_survives_clearing_the_draft() {
        let svc = service();
        svc.set_style_and_instructions("s1", Some(Style::Seda), String::new())
            .await
            .unwrap();
        svc.clear("s1").await.unwrap();

        let draft = svc.load_or_new("s1").await.unwrap();
        assert!(draft.garment_asset_id.is_none());
        assert_eq!(draft.style, Some(Style::Seda));

        let prefs = svc.preferences("s1").await.unwrap();
        assert_eq!(prefs.style, Some(Style::Seda));
    }

    #[tokio::test]
    async fn omitting_style_keeps_the_saved_preference() {
        let svc = service();
        svc.set_style_and_instructions("s1", Some(Style::Casual), String::new())
            .await
            .unwrap();
        svc.set_style_and_instructions("s1", None, "mangas compridas".into())
            .await
            .unwrap();

        let prefs = svc.preferences("s1").await.unwrap();
        assert_eq!(prefs.style, Some(Style::Casual));
    }

    #[tokio::test]
    async fn remembered_model_is_returned_with_preferences() {
        let svc = service();
        assert!(svc.preferences("s1").await.unwrap().model_id.is_none());

        svc.remember_model("s1", "gemini-2.0-flash-exp").await.unwrap();
        svc.clear("s1").await.unwrap();

        let prefs = svc.preferences("s1").await.unwrap();
        assert_eq!(prefs.model_id.as_deref(), Some("gemini-2.0-flash-exp"));
    }
}
