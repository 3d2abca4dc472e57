//! Persistent scan state.

mod atomic;
mod store;

pub use atomic::{atomic_read_json, atomic_write_json, backup_path};
pub use store::{modified_secs, state_key, StateStore};
