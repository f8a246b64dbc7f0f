//! # notekeep-core
//!
//! Core types, traits, and abstractions for the notekeep notes application.
//!
//! This crate provides the data model (notes, tags, drafts), the error
//! taxonomy shared by every layer, and the trait seams the autosave core
//! talks through: storage repositories, the session service, and the
//! notification channel.

pub mod defaults;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod tags;
pub mod traits;
pub mod uuid_utils;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use events::{AutosaveEvent, EventBus, FlushTrigger};
pub use models::*;
pub use tags::{normalize_tag_name, normalize_tag_set, parse_tag_list, validate_tag_name};
pub use traits::*;
pub use uuid_utils::new_v7;
