//! Default values shared across quill crates.
//!
//! Centralizing these prevents drift between the service layer, the
//! database layer, and the API surface.

/// Color assigned to a note when a create request does not provide one.
pub const DEFAULT_NOTE_COLOR: &str = "CFD2CF";

/// Maximum length, in characters, of a note's derived preview body.
///
/// Truncation counts characters, not bytes, so a multi-byte code point is
/// never split.
pub const SHORT_BODY_LEN: usize = 255;

/// Lifetime of an issued access token when `TOKEN_TTL_SECS` is unset.
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 86_400;

/// Default port for the HTTP server.
pub const DEFAULT_PORT: u16 = 8080;
