//! Stable exit codes for deckgen CLI commands.

/// Command succeeded, including delivery with unresolved visual warnings.
pub const OK: i32 = 0;
/// Command failed: invalid input, config, or a fatal collaborator error.
pub const INVALID: i32 = 1;
/// Generation exhausted its retry budget without producing any deck.
pub const EXHAUSTED: i32 = 2;
