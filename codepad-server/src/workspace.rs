//! Editor session reconciliation
//!
//! A session edits text against a *baseline*: the starter template in
//! personal mode, or the last-fetched team document in team mode. The
//! session has unsaved work when the trimmed buffer and the trimmed baseline
//! differ.
//!
//! Transitions that would throw away unsaved work are two-phase. The
//! request parks the transition and reports [`Step::NeedsConfirmation`];
//! [`Reconciler::resolve`] later runs it or drops it. Nothing about the
//! session changes until the transition actually runs.

use crate::language::Language;
use crate::store::{StoreError, WorkspaceDocument, WorkspaceStore};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Errors from reconciler operations
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("only available in team mode")]
    NotInTeamMode,

    #[error("no transition is waiting for confirmation")]
    NothingPending,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Which baseline the session edits against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Personal,
    Team,
}

impl Mode {
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "personal" => Some(Mode::Personal),
            "team" => Some(Mode::Team),
            _ => None,
        }
    }
}

/// State of one editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorSession {
    pub mode: Mode,
    pub language: Language,
    pub current_text: String,
    pub baseline_text: String,
}

impl EditorSession {
    /// Fresh personal session showing the template for `language`
    pub fn personal(language: Language) -> Self {
        let template = language.template().to_string();
        Self {
            mode: Mode::Personal,
            language,
            current_text: template.clone(),
            baseline_text: template,
        }
    }

    /// Whether the buffer differs from the baseline, ignoring surrounding whitespace
    pub fn is_diverged(&self) -> bool {
        self.current_text.trim() != self.baseline_text.trim()
    }

    fn reset_to(&mut self, text: String) {
        self.current_text = text.clone();
        self.baseline_text = text;
    }
}

/// A guarded state change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    SwitchLanguage(Language),
    SwitchMode(Mode),
}

/// Answer to a confirmation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Proceed,
    Decline,
}

/// Result of requesting or resolving a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The transition ran (or there was nothing to do)
    Applied,
    /// Unsaved work would be lost; call [`Reconciler::resolve`]
    NeedsConfirmation(Transition),
    /// The user declined; the session is unchanged
    Declined,
}

/// Whether leaving the editor is safe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveVerdict {
    Proceed,
    Warn,
}

/// Drives an [`EditorSession`] against the team document store
pub struct Reconciler {
    session: EditorSession,
    store: Arc<dyn WorkspaceStore>,
    pending: Option<Transition>,
}

impl Reconciler {
    /// Start in personal mode with the default language's template
    pub fn new(store: Arc<dyn WorkspaceStore>) -> Self {
        Self::with_session(store, EditorSession::personal(Language::DEFAULT))
    }

    pub fn with_session(store: Arc<dyn WorkspaceStore>, session: EditorSession) -> Self {
        Self {
            session,
            store,
            pending: None,
        }
    }

    pub fn session(&self) -> &EditorSession {
        &self.session
    }

    pub fn pending(&self) -> Option<Transition> {
        self.pending
    }

    pub fn is_diverged(&self) -> bool {
        self.session.is_diverged()
    }

    /// Replace the edit buffer
    pub fn edit(&mut self, text: impl Into<String>) {
        self.session.current_text = text.into();
    }

    pub async fn switch_language(&mut self, language: Language) -> Result<Step, ReconcileError> {
        self.request(Transition::SwitchLanguage(language)).await
    }

    pub async fn switch_mode(&mut self, mode: Mode) -> Result<Step, ReconcileError> {
        self.request(Transition::SwitchMode(mode)).await
    }

    /// Run a transition now, or park it if unsaved work would be lost.
    ///
    /// A parked transition replaces any earlier one.
    pub async fn request(&mut self, transition: Transition) -> Result<Step, ReconcileError> {
        if self.is_noop(transition) {
            self.pending = None;
            return Ok(Step::Applied);
        }

        if self.session.is_diverged() {
            debug!(?transition, "Unsaved changes, confirmation needed");
            self.pending = Some(transition);
            return Ok(Step::NeedsConfirmation(transition));
        }

        self.pending = None;
        self.apply(transition).await?;
        Ok(Step::Applied)
    }

    /// Finish or drop the parked transition
    pub async fn resolve(&mut self, decision: Decision) -> Result<Step, ReconcileError> {
        let transition = self.pending.take().ok_or(ReconcileError::NothingPending)?;
        match decision {
            Decision::Decline => {
                debug!(?transition, "Transition declined");
                Ok(Step::Declined)
            }
            Decision::Proceed => {
                self.apply(transition).await?;
                Ok(Step::Applied)
            }
        }
    }

    fn is_noop(&self, transition: Transition) -> bool {
        match transition {
            Transition::SwitchLanguage(language) => language == self.session.language,
            Transition::SwitchMode(mode) => mode == self.session.mode,
        }
    }

    async fn apply(&mut self, transition: Transition) -> Result<(), ReconcileError> {
        match transition {
            Transition::SwitchLanguage(language) => {
                // Team mode too: there is one team document, its language is informational
                self.session.language = language;
                self.session.reset_to(language.template().to_string());
            }
            Transition::SwitchMode(Mode::Team) => {
                let doc = self.store.get().await?;
                self.load_team(doc);
            }
            Transition::SwitchMode(Mode::Personal) => {
                self.session.mode = Mode::Personal;
                let template = self.session.language.template().to_string();
                self.session.reset_to(template);
            }
        }
        info!(
            mode = ?self.session.mode,
            language = %self.session.language,
            "Session switched"
        );
        Ok(())
    }

    fn load_team(&mut self, doc: WorkspaceDocument) {
        self.session.mode = Mode::Team;
        self.session.language = doc.language;
        self.session.reset_to(doc.content);
    }

    /// Overwrite the team document with the buffer, then refresh the baseline.
    ///
    /// There is no version check: a concurrent save by someone else is
    /// silently replaced, or replaces this one.
    pub async fn save_team(&mut self, editor: Option<String>) -> Result<(), ReconcileError> {
        self.require_team()?;
        let doc = WorkspaceDocument::edited(
            self.session.current_text.clone(),
            self.session.language,
            editor,
        );
        self.store.set(doc).await?;

        let saved = self.store.get().await?;
        self.session.baseline_text = saved.content;
        Ok(())
    }

    /// Reset the team document to its default and load it.
    ///
    /// Always destructive. Callers must confirm with the user first.
    pub async fn delete_team(&mut self) -> Result<(), ReconcileError> {
        self.require_team()?;
        self.store.reset().await?;
        let doc = self.store.get().await?;
        self.pending = None;
        self.load_team(doc);
        Ok(())
    }

    /// Check whether closing the editor would lose work. Never mutates.
    pub fn leave(&self) -> LeaveVerdict {
        if self.session.is_diverged() {
            LeaveVerdict::Warn
        } else {
            LeaveVerdict::Proceed
        }
    }

    fn require_team(&self) -> Result<(), ReconcileError> {
        if self.session.mode == Mode::Team {
            Ok(())
        } else {
            Err(ReconcileError::NotInTeamMode)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DEFAULT_TEAM_CONTENT, MemoryStore};

    fn reconciler() -> (Reconciler, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Reconciler::new(store.clone()), store)
    }

    #[test]
    fn test_initial_session() {
        let (r, _) = reconciler();
        let s = r.session();
        assert_eq!(s.mode, Mode::Personal);
        assert_eq!(s.language, Language::Python);
        assert_eq!(s.current_text, Language::Python.template());
        assert!(!r.is_diverged());
    }

    #[test]
    fn test_divergence_ignores_surrounding_whitespace() {
        let mut s = EditorSession::personal(Language::C);
        s.current_text = format!("\n  {}\n\n", s.baseline_text);
        assert!(!s.is_diverged());
        s.current_text.push_str("x");
        assert!(s.is_diverged());
    }

    #[test]
    fn test_divergence_is_reflexive() {
        let mut s = EditorSession::personal(Language::Java);
        s.current_text = "anything".to_string();
        s.baseline_text = s.current_text.clone();
        assert!(!s.is_diverged());
    }

    #[tokio::test]
    async fn test_clean_language_switch() {
        let (mut r, _) = reconciler();
        let step = r.switch_language(Language::Cpp).await.unwrap();
        assert_eq!(step, Step::Applied);
        assert_eq!(r.session().language, Language::Cpp);
        assert_eq!(r.session().current_text, Language::Cpp.template());
        assert!(!r.is_diverged());
    }

    #[tokio::test]
    async fn test_dirty_language_switch_declined_is_noop() {
        let (mut r, _) = reconciler();
        r.edit("print('mine')");
        let before = r.session().clone();

        let step = r.switch_language(Language::Java).await.unwrap();
        assert_eq!(
            step,
            Step::NeedsConfirmation(Transition::SwitchLanguage(Language::Java))
        );
        assert_eq!(r.session(), &before);

        assert_eq!(r.resolve(Decision::Decline).await.unwrap(), Step::Declined);
        assert_eq!(r.session(), &before);
        assert!(r.pending().is_none());
    }

    #[tokio::test]
    async fn test_dirty_language_switch_confirmed() {
        let (mut r, _) = reconciler();
        r.edit("print('mine')");
        r.switch_language(Language::JavaScript).await.unwrap();

        assert_eq!(r.resolve(Decision::Proceed).await.unwrap(), Step::Applied);
        assert_eq!(r.session().language, Language::JavaScript);
        assert_eq!(r.session().current_text, Language::JavaScript.template());
    }

    #[tokio::test]
    async fn test_resolve_without_pending() {
        let (mut r, _) = reconciler();
        assert!(matches!(
            r.resolve(Decision::Proceed).await,
            Err(ReconcileError::NothingPending)
        ));
    }

    #[tokio::test]
    async fn test_newer_request_replaces_pending() {
        let (mut r, _) = reconciler();
        r.edit("dirty");
        r.switch_language(Language::C).await.unwrap();
        r.switch_mode(Mode::Team).await.unwrap();
        assert_eq!(r.pending(), Some(Transition::SwitchMode(Mode::Team)));
    }

    #[tokio::test]
    async fn test_enter_team_loads_document() {
        let (mut r, store) = reconciler();
        store
            .set(WorkspaceDocument::edited("int x;", Language::C, Some("a".into())))
            .await
            .unwrap();

        assert_eq!(r.switch_mode(Mode::Team).await.unwrap(), Step::Applied);
        let s = r.session();
        assert_eq!(s.mode, Mode::Team);
        assert_eq!(s.language, Language::C);
        assert_eq!(s.current_text, "int x;");
        assert_eq!(s.baseline_text, "int x;");
    }

    #[tokio::test]
    async fn test_enter_team_with_unsaved_personal_work() {
        let (mut r, _) = reconciler();
        r.edit("print('draft')");
        let step = r.switch_mode(Mode::Team).await.unwrap();
        assert_eq!(step, Step::NeedsConfirmation(Transition::SwitchMode(Mode::Team)));
        assert_eq!(r.session().mode, Mode::Personal);

        r.resolve(Decision::Proceed).await.unwrap();
        assert_eq!(r.session().mode, Mode::Team);
        assert_eq!(r.session().current_text, DEFAULT_TEAM_CONTENT);
    }

    #[tokio::test]
    async fn test_leave_team_with_unsaved_edits() {
        let (mut r, store) = reconciler();
        r.switch_mode(Mode::Team).await.unwrap();
        r.edit("// team draft");

        let step = r.switch_mode(Mode::Personal).await.unwrap();
        assert_eq!(
            step,
            Step::NeedsConfirmation(Transition::SwitchMode(Mode::Personal))
        );
        r.resolve(Decision::Proceed).await.unwrap();

        let s = r.session();
        assert_eq!(s.mode, Mode::Personal);
        assert_eq!(s.language, Language::JavaScript);
        assert_eq!(s.current_text, Language::JavaScript.template());
        // Unsaved team edits are dropped, not written back
        assert_eq!(store.get().await.unwrap().content, DEFAULT_TEAM_CONTENT);
    }

    #[tokio::test]
    async fn test_dirty_team_exit_declined_is_noop() {
        let (mut r, store) = reconciler();
        r.switch_mode(Mode::Team).await.unwrap();
        r.edit("// team draft");
        let before = r.session().clone();

        let step = r.switch_mode(Mode::Personal).await.unwrap();
        assert_eq!(
            step,
            Step::NeedsConfirmation(Transition::SwitchMode(Mode::Personal))
        );
        assert_eq!(r.resolve(Decision::Decline).await.unwrap(), Step::Declined);

        assert_eq!(r.session(), &before);
        assert!(r.is_diverged());
        assert!(r.pending().is_none());
        assert_eq!(store.get().await.unwrap(), WorkspaceDocument::default());
    }

    #[tokio::test]
    async fn test_dirty_team_entry_declined_is_noop() {
        let (mut r, store) = reconciler();
        store
            .set(WorkspaceDocument::edited("int x;", Language::C, None))
            .await
            .unwrap();
        r.edit("print('draft')");
        let before = r.session().clone();

        r.switch_mode(Mode::Team).await.unwrap();
        assert_eq!(r.resolve(Decision::Decline).await.unwrap(), Step::Declined);

        assert_eq!(r.session(), &before);
        assert_eq!(r.session().mode, Mode::Personal);
    }

    #[tokio::test]
    async fn test_dirty_language_switch_in_team_mode_needs_confirmation() {
        let (mut r, store) = reconciler();
        r.switch_mode(Mode::Team).await.unwrap();
        r.edit("console.log('unsaved')");
        let before = r.session().clone();

        let step = r.switch_language(Language::Python).await.unwrap();
        assert_eq!(
            step,
            Step::NeedsConfirmation(Transition::SwitchLanguage(Language::Python))
        );
        assert_eq!(r.session(), &before);

        assert_eq!(r.resolve(Decision::Decline).await.unwrap(), Step::Declined);
        assert_eq!(r.session(), &before);

        r.switch_language(Language::Python).await.unwrap();
        assert_eq!(r.resolve(Decision::Proceed).await.unwrap(), Step::Applied);
        let s = r.session();
        assert_eq!(s.mode, Mode::Team);
        assert_eq!(s.language, Language::Python);
        assert_eq!(s.current_text, Language::Python.template());
        assert_eq!(store.get().await.unwrap(), WorkspaceDocument::default());
    }

    #[tokio::test]
    async fn test_language_switch_in_team_mode_uses_template() {
        let (mut r, store) = reconciler();
        r.switch_mode(Mode::Team).await.unwrap();
        r.switch_language(Language::Python).await.unwrap();

        let s = r.session();
        assert_eq!(s.mode, Mode::Team);
        assert_eq!(s.current_text, Language::Python.template());
        assert_eq!(store.get().await.unwrap(), WorkspaceDocument::default());
    }

    #[tokio::test]
    async fn test_save_team_clears_divergence() {
        let (mut r, store) = reconciler();
        r.switch_mode(Mode::Team).await.unwrap();
        r.edit("console.log('shared')");
        assert!(r.is_diverged());

        r.save_team(Some("ana".into())).await.unwrap();
        assert!(!r.is_diverged());

        let doc = store.get().await.unwrap();
        assert_eq!(doc.content, "console.log('shared')");
        assert_eq!(doc.language, Language::JavaScript);
        assert_eq!(doc.last_editor.as_deref(), Some("ana"));
        assert!(doc.last_edited_at.is_some());
    }

    #[tokio::test]
    async fn test_team_operations_require_team_mode() {
        let (mut r, _) = reconciler();
        assert!(matches!(
            r.save_team(None).await,
            Err(ReconcileError::NotInTeamMode)
        ));
        assert!(matches!(
            r.delete_team().await,
            Err(ReconcileError::NotInTeamMode)
        ));
    }

    #[tokio::test]
    async fn test_delete_team_restores_default() {
        let (mut r, store) = reconciler();
        r.switch_mode(Mode::Team).await.unwrap();
        r.edit("something");
        r.save_team(Some("x".into())).await.unwrap();

        r.delete_team().await.unwrap();
        assert_eq!(store.get().await.unwrap(), WorkspaceDocument::default());
        assert_eq!(r.session().current_text, DEFAULT_TEAM_CONTENT);
        assert!(!r.is_diverged());
    }

    #[tokio::test]
    async fn test_two_sessions_last_save_wins() {
        let store = Arc::new(MemoryStore::new());
        let mut first = Reconciler::new(store.clone());
        let mut second = Reconciler::new(store.clone());
        first.switch_mode(Mode::Team).await.unwrap();
        second.switch_mode(Mode::Team).await.unwrap();

        first.edit("from first");
        second.edit("from second");
        first.save_team(Some("first".into())).await.unwrap();
        second.save_team(Some("second".into())).await.unwrap();

        let doc = store.get().await.unwrap();
        assert_eq!(doc.content, "from second");
        assert_eq!(doc.last_editor.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_leave_never_mutates() {
        let (mut r, _) = reconciler();
        assert_eq!(r.leave(), LeaveVerdict::Proceed);

        r.edit("unsaved");
        let before = r.session().clone();
        assert_eq!(r.leave(), LeaveVerdict::Warn);
        assert_eq!(r.session(), &before);
    }

    #[tokio::test]
    async fn test_same_mode_or_language_is_noop() {
        let (mut r, _) = reconciler();
        r.edit("dirty");
        assert_eq!(r.switch_mode(Mode::Personal).await.unwrap(), Step::Applied);
        assert_eq!(
            r.switch_language(Language::Python).await.unwrap(),
            Step::Applied
        );
        assert_eq!(r.session().current_text, "dirty");
    }
}
