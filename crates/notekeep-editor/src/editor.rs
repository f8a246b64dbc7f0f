//! Editor view controller.
//!
//! Owns the text buffer, the tag list, and the view mode of one open note.
//! Every edit to title, content, or tags notifies the autosave scheduler;
//! switching view mode never does.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use uuid::Uuid;

use notekeep_core::{
    normalize_tag_name, parse_tag_list, validate_tag_name, AutosaveEvent, AutosaveResult,
    Draft, Note, ViewMode,
};

use crate::config::AutosaveConfig;
use crate::identity::{DraftIdentity, IdentityState};
use crate::scheduler::{AutosaveContext, AutosaveScheduler, DraftFields};

/// Returned when `autosave` receives a draft for a note this editor is not
/// bound to.
pub const FOREIGN_DRAFT_MESSAGE: &str = "Draft belongs to a different note";

/// Controller for one open editor.
pub struct EditorController {
    buffer: watch::Sender<DraftFields>,
    view_mode: ViewMode,
    scheduler: AutosaveScheduler,
}

impl EditorController {
    /// Open a blank editor for a new note.
    pub fn new(ctx: AutosaveContext, config: &AutosaveConfig) -> Self {
        Self::start(
            ctx,
            config,
            DraftFields::default(),
            DraftIdentity::unassigned(),
            None,
        )
    }

    /// Open an editor on an existing note.
    pub fn open(ctx: AutosaveContext, config: &AutosaveConfig, note: &Note) -> Self {
        let draft = Draft::from_note(note);
        Self::start(
            ctx,
            config,
            draft.into(),
            DraftIdentity::assigned(note.id),
            Some(note.version),
        )
    }

    fn start(
        ctx: AutosaveContext,
        config: &AutosaveConfig,
        fields: DraftFields,
        identity: DraftIdentity,
        version: Option<i64>,
    ) -> Self {
        let (buffer, rx) = watch::channel(fields);
        let scheduler = AutosaveScheduler::spawn(ctx, config, rx, Arc::new(identity), version);
        Self {
            buffer,
            view_mode: ViewMode::default(),
            scheduler,
        }
    }

    // =========================================================================
    // Buffer
    // =========================================================================

    /// Snapshot of the current draft, including its identity.
    pub fn draft(&self) -> Draft {
        let fields = self.buffer.borrow();
        Draft {
            identity: self.scheduler.identity(),
            title: fields.title.clone(),
            content: fields.content.clone(),
            tags: fields.tags.clone(),
        }
    }

    pub fn title(&self) -> String {
        self.buffer.borrow().title.clone()
    }

    pub fn content(&self) -> String {
        self.buffer.borrow().content.clone()
    }

    pub fn tags(&self) -> Vec<String> {
        self.buffer.borrow().tags.clone()
    }

    pub fn set_title(&self, title: impl Into<String>) {
        let title = title.into();
        self.edit(|fields| {
            if fields.title == title {
                return false;
            }
            fields.title = title;
            true
        });
    }

    pub fn set_content(&self, content: impl Into<String>) {
        let content = content.into();
        self.edit(|fields| {
            if fields.content == content {
                return false;
            }
            fields.content = content;
            true
        });
    }

    /// Append text at the end of the content (typing).
    pub fn append_content(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.edit(|fields| {
            fields.content.push_str(text);
            true
        });
    }

    // =========================================================================
    // Tags
    // =========================================================================

    /// Add a tag from user input. Returns `false` if the input was blank,
    /// invalid, or already present.
    pub fn add_tag(&self, raw: &str) -> bool {
        let Some(name) = normalize_tag_name(raw) else {
            return false;
        };
        if validate_tag_name(&name).is_err() {
            return false;
        }
        self.edit(|fields| {
            if fields.tags.contains(&name) {
                return false;
            }
            fields.tags.push(name);
            true
        })
    }

    /// Remove a tag by name (case-insensitive).
    pub fn remove_tag(&self, name: &str) -> bool {
        let Some(name) = normalize_tag_name(name) else {
            return false;
        };
        self.edit(|fields| {
            let before = fields.tags.len();
            fields.tags.retain(|t| *t != name);
            fields.tags.len() != before
        })
    }

    /// Remove the most recently added tag (backspace on an empty input).
    pub fn remove_last_tag(&self) -> Option<String> {
        let mut removed = None;
        self.edit(|fields| {
            removed = fields.tags.pop();
            removed.is_some()
        });
        removed
    }

    /// Replace the tag list from a comma-separated line.
    pub fn set_tags_from_line(&self, line: &str) {
        let tags: Vec<String> = parse_tag_list(line)
            .into_iter()
            .filter(|t| validate_tag_name(t).is_ok())
            .collect();
        self.edit(|fields| {
            if fields.tags == tags {
                return false;
            }
            fields.tags = tags;
            true
        });
    }

    // =========================================================================
    // View mode
    // =========================================================================

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    /// Change layout. Does not touch the draft or schedule a save.
    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
    }

    /// Advance editor → split → preview → editor.
    pub fn cycle_view_mode(&mut self) -> ViewMode {
        self.view_mode = self.view_mode.cycle();
        self.view_mode
    }

    // =========================================================================
    // Saving
    // =========================================================================

    /// Save the current buffer now.
    pub async fn save_now(&self) -> AutosaveResult {
        self.scheduler.save_now().await
    }

    /// Replace the buffer with `draft` and save it now.
    ///
    /// A draft carrying an identity is accepted only when it matches this
    /// editor's note. An unsaved editor never takes its identity from a
    /// draft; existing notes are opened with [`NoteService::edit_note`].
    ///
    /// [`NoteService::edit_note`]: crate::service::NoteService::edit_note
    pub async fn autosave(&self, draft: Draft) -> AutosaveResult {
        let current = self.scheduler.identity();
        if let Some(incoming) = draft.identity {
            if current != Some(incoming) {
                return AutosaveResult {
                    success: false,
                    identity: current,
                    error: Some(FOREIGN_DRAFT_MESSAGE.to_string()),
                };
            }
        }

        self.buffer.send_replace(DraftFields::from(draft));
        self.scheduler.save_now().await
    }

    /// Save the current buffer over whatever is stored, skipping the version
    /// check once. Recovers an editor whose last save hit a conflict.
    pub async fn overwrite(&self) -> AutosaveResult {
        self.scheduler.overwrite().await
    }

    // =========================================================================
    // Observation and lifecycle
    // =========================================================================

    pub fn identity(&self) -> Option<Uuid> {
        self.scheduler.identity()
    }

    /// Observe the `Unassigned → Assigned` transition.
    pub fn subscribe_identity(&self) -> watch::Receiver<IdentityState> {
        self.scheduler.identity_tracker().subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<AutosaveEvent> {
        self.scheduler.events()
    }

    /// Unmount: cancel the pending timer and wait for any in-flight flush.
    pub async fn close(self) {
        self.scheduler.shutdown().await;
    }

    fn edit<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut DraftFields) -> bool,
    {
        let changed = self.buffer.send_if_modified(f);
        if changed {
            self.scheduler.notify_changed();
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notekeep_core::User;
    use notekeep_db::MemoryStore;

    use crate::gateway::NoteGateway;
    use crate::notify::TracingNotifier;
    use crate::session::StaticSession;

    fn editor() -> EditorController {
        let store = MemoryStore::new();
        let ctx = AutosaveContext {
            gateway: NoteGateway::new(Arc::new(store.clone()), Arc::new(store)),
            session: Arc::new(StaticSession::signed_in(User {
                id: "user1".to_string(),
                email: "user1@example.com".to_string(),
                name: None,
            })),
            notifier: Arc::new(TracingNotifier),
        };
        EditorController::new(ctx, &AutosaveConfig::default())
    }

    #[tokio::test]
    async fn test_tag_input_operations() {
        let editor = editor();

        assert!(editor.add_tag("  Work "));
        assert!(!editor.add_tag("WORK"));
        assert!(!editor.add_tag("   "));
        assert!(editor.add_tag("urgent"));
        assert_eq!(editor.tags(), vec!["work".to_string(), "urgent".to_string()]);

        assert_eq!(editor.remove_last_tag(), Some("urgent".to_string()));
        assert!(editor.remove_tag("Work"));
        assert!(editor.tags().is_empty());
        assert_eq!(editor.remove_last_tag(), None);

        editor.set_tags_from_line("a, B ,,a");
        assert_eq!(editor.tags(), vec!["a".to_string(), "b".to_string()]);

        editor.close().await;
    }

    #[tokio::test]
    async fn test_view_mode_cycles_without_touching_draft() {
        let mut editor = editor();
        editor.set_title("Title");
        let before = editor.draft();

        assert_eq!(editor.view_mode(), ViewMode::Split);
        assert_eq!(editor.cycle_view_mode(), ViewMode::PreviewOnly);
        assert_eq!(editor.cycle_view_mode(), ViewMode::EditorOnly);
        editor.set_view_mode(ViewMode::Split);

        assert_eq!(editor.draft(), before);
        editor.close().await;
    }

    #[tokio::test]
    async fn test_append_content() {
        let editor = editor();
        editor.append_content("Hel");
        editor.append_content("lo");
        assert_eq!(editor.content(), "Hello");
        editor.close().await;
    }
}
