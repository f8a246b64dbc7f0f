//! # notekeep-editor
//!
//! Autosave and editor synchronization for notekeep.
//!
//! This crate provides:
//! - A per-editor autosave scheduler: debounced flushes, at most one write
//!   in flight, and a draft identity that is assigned exactly once
//! - The note gateway: create-or-update with ownership checks, followed by
//!   tag reconciliation
//! - The editor view controller: text buffer, tag input, view mode
//! - Session-scoped listing, lookup, search, and deletion
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use notekeep_db::MemoryStore;
//! use notekeep_editor::{AutosaveConfig, NoteService, StaticSession, TracingNotifier};
//!
//! let session = Arc::new(StaticSession::signed_in(user));
//! let service = NoteService::in_memory(MemoryStore::new(), session, AutosaveConfig::from_env());
//!
//! let editor = service.new_editor(Arc::new(TracingNotifier));
//! editor.set_title("Groceries");
//! editor.set_content("- milk");
//! editor.add_tag("Home");
//! // ...750ms later the note is created; later edits update it.
//! editor.close().await;
//! ```

pub mod config;
pub mod editor;
pub mod gateway;
pub mod identity;
pub mod notify;
pub mod reconciler;
pub mod scheduler;
pub mod service;
pub mod session;

pub use config::AutosaveConfig;
pub use editor::{EditorController, FOREIGN_DRAFT_MESSAGE};
pub use gateway::{NoteGateway, SaveRequest};
pub use identity::{DraftIdentity, IdentityState};
pub use notify::{Toast, ToastNotifier, TracingNotifier};
pub use reconciler::{ReconcileReport, TagReconciler};
pub use scheduler::{AutosaveContext, AutosaveScheduler, DraftFields, EDITOR_CLOSED_MESSAGE};
pub use service::NoteService;
pub use session::StaticSession;

// Re-export core types
pub use notekeep_core::*;
