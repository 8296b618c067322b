//! Pure, deterministic pipeline logic (no I/O).

pub mod binding;
pub mod context;
pub mod deck;
pub mod machine;
pub mod profile;
pub mod state;
