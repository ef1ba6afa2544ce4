//! Purpose: JSON byte boundary shared by record streams and the CLI.
//! Exports: `Json` (the intermediate value), `parse` module with encode/decode helpers.
//! Role: Single seam between the `Json` algebra and its byte encoding.
//! Invariants: Encoding preserves object key order exactly as the codec emitted it.
//! Invariants: Helper APIs stay small and deterministic (no hidden global state).

pub mod parse;

/// The intermediate value every codec produces and consumes.
pub type Json = serde_json::Value;
