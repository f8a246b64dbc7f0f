//! Data models for notes, tags, drafts, and autosave outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

// =============================================================================
// USERS
// =============================================================================

/// Authenticated user as reported by the session service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

// =============================================================================
// NOTES
// =============================================================================

/// A persisted note with its tag names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub owner_id: String,
    pub title: String,
    /// Markdown source.
    pub content: String,
    /// Incremented on every title/content write.
    pub version: i64,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
    /// Normalized tag names, sorted.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Request for creating a new note row.
#[derive(Debug, Clone)]
pub struct CreateNoteRequest {
    pub owner_id: String,
    pub title: String,
    pub content: String,
}

/// Request for overwriting a note's title and content.
#[derive(Debug, Clone)]
pub struct UpdateNoteRequest {
    pub id: Uuid,
    pub owner_id: String,
    pub title: String,
    pub content: String,
    /// When set, the write only applies if the stored version matches.
    pub expected_version: Option<i64>,
}

/// Identity and version of a note after a title/content write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRevision {
    pub id: Uuid,
    pub version: i64,
}

/// Outcome of a successful gateway save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedNote {
    pub id: Uuid,
    pub version: i64,
    /// True when this save created the note.
    pub created: bool,
}

// =============================================================================
// TAGS
// =============================================================================

/// A tag owned by one user. Names are unique per owner after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub owner_id: String,
    pub name: String,
    pub created_at_utc: DateTime<Utc>,
}

/// Tag name with the number of notes it is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSummary {
    pub name: String,
    pub note_count: i64,
}

// =============================================================================
// DRAFTS
// =============================================================================

/// Client-side note being edited, possibly not yet persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<Uuid>,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Draft {
    /// Draft seeded from a stored note, for the edit view.
    pub fn from_note(note: &Note) -> Self {
        Self {
            identity: Some(note.id),
            title: note.title.clone(),
            content: note.content.clone(),
            tags: note.tags.clone(),
        }
    }
}

/// How the editor lays out source and rendered preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewMode {
    EditorOnly,
    #[default]
    Split,
    PreviewOnly,
}

impl ViewMode {
    /// Next mode in editor → split → preview → editor order.
    pub fn cycle(self) -> Self {
        match self {
            Self::EditorOnly => Self::Split,
            Self::Split => Self::PreviewOnly,
            Self::PreviewOnly => Self::EditorOnly,
        }
    }

    pub fn shows_editor(self) -> bool {
        !matches!(self, Self::PreviewOnly)
    }

    pub fn shows_preview(self) -> bool {
        !matches!(self, Self::EditorOnly)
    }
}

impl std::fmt::Display for ViewMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EditorOnly => write!(f, "editor-only"),
            Self::Split => write!(f, "split"),
            Self::PreviewOnly => write!(f, "preview-only"),
        }
    }
}

impl std::str::FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "editor-only" | "editor" => Ok(Self::EditorOnly),
            "split" => Ok(Self::Split),
            "preview-only" | "preview" => Ok(Self::PreviewOnly),
            _ => Err(format!("Invalid view mode: {}", s)),
        }
    }
}

// =============================================================================
// AUTOSAVE RESULT
// =============================================================================

/// Result object every flush resolves to. Serializes as
/// `{"success": bool, "identity"?: string, "error"?: string}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutosaveResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AutosaveResult {
    pub fn saved(identity: Uuid) -> Self {
        Self {
            success: true,
            identity: Some(identity),
            error: None,
        }
    }

    pub fn failed(identity: Option<Uuid>, error: &Error) -> Self {
        Self {
            success: false,
            identity,
            error: Some(error.to_string()),
        }
    }

    /// Flush that was not attempted; no error is surfaced.
    pub fn skipped(identity: Option<Uuid>) -> Self {
        Self {
            success: false,
            identity,
            error: None,
        }
    }
}
