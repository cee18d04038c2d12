//! Training-loop drivers.

pub mod update_loop;

pub use update_loop::{
    run_ppo_updates, run_update_loop, ConfigError, UpdateLoopConfig, UpdateStats, UPDATE_TERMS,
};
