//! # quill-core
//!
//! Core types, traits, and abstractions for the quill notes service.
//!
//! This crate provides the domain models, the error taxonomy, and the
//! repository trait definitions that the other quill crates depend on.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use defaults::{DEFAULT_NOTE_COLOR, SHORT_BODY_LEN};
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
