//! Core state types: the variable registry and evaluation inputs.

pub mod feed;
pub mod var_store;

pub use feed::Feed;
pub use var_store::{Marker, StoreError, VarId, VarStore};
