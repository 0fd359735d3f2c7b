//! Reactive bridge (C9, §4.9): projects session state into editor
//! decorations, drives autoscroll, and forwards editor edits into the
//! session.
//!
//! The editor itself is an external collaborator (§1 Non-goals: "driving a
//! specific text editor's UI"); this module defines the narrow
//! [`EditorHandle`] boundary C9 needs and implements the projection and
//! forwarding logic against it.

use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::chunk::Edit;
use crate::session::ActiveSession;

/// Decoration ranges pushed to the active editor (§4.9). `None` clears
/// decorations (playback stopped, or the active editor changed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub playing_before: Range<usize>,
    pub playing_now: Range<usize>,
    pub playing_after: Range<usize>,
}

/// The narrow editor boundary C9 needs (§6 Editor bridge). A host
/// implements this once per editor instance it wants synced.
#[async_trait]
pub trait EditorHandle: Send + Sync {
    /// Stable identity used to tell editors apart when the active editor
    /// changes.
    fn id(&self) -> &str;

    /// Push new decoration state, or `None` to clear it.
    async fn push_view_state(&self, state: Option<ViewState>);

    /// Scroll `range` into view, centering it if `center` is set.
    async fn scroll_into_view(&self, range: Range<usize>, center: bool);
}

/// Drives one [`ActiveSession`]'s view projection and edit forwarding
/// against whichever editor is currently active.
pub struct ReactiveBridge {
    active_editor: Mutex<Option<Arc<dyn EditorHandle>>>,
    autoscroll_enabled: AtomicBool,
}

impl ReactiveBridge {
    pub fn new() -> Self {
        Self {
            active_editor: Mutex::new(None),
            autoscroll_enabled: AtomicBool::new(true),
        }
    }

    /// Switch the editor the bridge projects into. The previously active
    /// editor (if any) gets an empty `ViewState` to clear its decorations
    /// (§4.9 "When the active editor changes").
    pub async fn set_active_editor(&self, editor: Option<Arc<dyn EditorHandle>>) {
        let mut guard = self.active_editor.lock().await;
        if let Some(previous) = guard.take() {
            previous.push_view_state(None).await;
        }
        *guard = editor;
    }

    /// Recompute and push the current `ViewState`, then autoscroll if
    /// enabled. Call this whenever `session`'s position, chunks, or
    /// playing state may have changed.
    pub async fn sync(&self, session: &ActiveSession) {
        let Some(editor) = self.active_editor.lock().await.clone() else {
            return;
        };

        let ranges = session.view_ranges().await;
        let state = ranges.as_ref().map(|(before, now, after)| ViewState {
            playing_before: before.clone(),
            playing_now: now.clone(),
            playing_after: after.clone(),
        });
        editor.push_view_state(state).await;

        if self.autoscroll_enabled.load(Ordering::SeqCst) {
            if let Some((_, now, _)) = ranges {
                editor.scroll_into_view(now, true).await;
            }
        }
    }

    /// Report a viewport-affecting editor transaction. Purely-selection or
    /// input-driven transactions don't disturb autoscroll; anything else
    /// (manual scrolling, folding, etc.) disables it until explicitly
    /// re-enabled (§4.9).
    pub fn note_viewport_transaction(&self, is_selection_or_input: bool) {
        if !is_selection_or_input {
            self.autoscroll_enabled.store(false, Ordering::SeqCst);
        }
    }

    pub fn enable_autoscroll(&self) {
        self.autoscroll_enabled.store(true, Ordering::SeqCst);
    }

    pub fn autoscroll_enabled(&self) -> bool {
        self.autoscroll_enabled.load(Ordering::SeqCst)
    }

    /// Forward one editor document change into the session as a `remove`
    /// (if any text was removed) followed by an `add` (if any text was
    /// inserted), both at `position` (§4.9). Callers must dispatch this
    /// after the editor's own transaction has settled, to avoid re-entering
    /// it.
    pub async fn forward_document_change(
        &self,
        session: &ActiveSession,
        position: usize,
        removed_text: &str,
        inserted_text: &str,
    ) {
        let mut edits = Vec::with_capacity(2);
        if !removed_text.is_empty() {
            edits.push(Edit::remove(position, removed_text.to_string()));
        }
        if !inserted_text.is_empty() {
            edits.push(Edit::add(position, inserted_text.to_string()));
        }
        if edits.is_empty() {
            return;
        }
        session.on_multi_text_changed(&edits).await;
    }
}

impl Default for ReactiveBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct RecordingEditor {
        id: String,
        states: StdMutex<Vec<Option<ViewState>>>,
        scrolls: StdMutex<Vec<Range<usize>>>,
    }

    impl RecordingEditor {
        fn new(id: &str) -> Self {
            Self {
                id: id.to_string(),
                states: StdMutex::new(Vec::new()),
                scrolls: StdMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl EditorHandle for RecordingEditor {
        fn id(&self) -> &str {
            &self.id
        }
        async fn push_view_state(&self, state: Option<ViewState>) {
            self.states.lock().unwrap().push(state);
        }
        async fn scroll_into_view(&self, range: Range<usize>, _center: bool) {
            self.scrolls.lock().unwrap().push(range);
        }
    }

    #[tokio::test]
    async fn switching_active_editor_clears_the_previous_one() {
        let bridge = ReactiveBridge::new();
        let a = Arc::new(RecordingEditor::new("a"));
        let b = Arc::new(RecordingEditor::new("b"));

        bridge.set_active_editor(Some(a.clone())).await;
        bridge.set_active_editor(Some(b.clone())).await;

        let a_states = a.states.lock().unwrap();
        assert_eq!(a_states.last().unwrap(), &None);
    }

    #[test]
    fn non_selection_transaction_disables_autoscroll() {
        let bridge = ReactiveBridge::new();
        assert!(bridge.autoscroll_enabled());
        bridge.note_viewport_transaction(true);
        assert!(bridge.autoscroll_enabled());
        bridge.note_viewport_transaction(false);
        assert!(!bridge.autoscroll_enabled());
        bridge.enable_autoscroll();
        assert!(bridge.autoscroll_enabled());
    }
}
