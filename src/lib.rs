//! # collective_rl: synchronous data-parallel policy-gradient training
//!
//! Coordinates policy-gradient training across a fixed group of workers
//! using blocking collective communication. Each worker computes gradients
//! on its own rollout data; every update step applies the group-averaged
//! gradient, so worker parameters stay numerically aligned without a
//! central coordinator.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  Worker 0 (root)        Worker 1               Worker N-1        │
//! │  ┌─────────────┐        ┌─────────────┐        ┌─────────────┐   │
//! │  │ VarStore    │        │ VarStore    │        │ VarStore    │   │
//! │  │ Objective   │        │ Objective   │        │ Objective   │   │
//! │  │ Collective  │        │ Collective  │        │ Collective  │   │
//! │  │ Optimizer   │        │ Optimizer   │        │ Optimizer   │   │
//! │  └──────┬──────┘        └──────┬──────┘        └──────┬──────┘   │
//! │         │                      │                      │          │
//! │         └──────── allreduce(grads), allreduce(terms) ─┘          │
//! │         ┌──────── broadcast(params from rank 0) ──────┐          │
//! │         ▼                      ▼                      ▼          │
//! │              identical averaged update on every worker           │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Protocol
//!
//! Every collective call is a group-wide barrier: all workers must issue
//! the same operations, the same number of times, in the same order, or
//! the group blocks forever. The outer loop's job is to keep that call
//! order identical on every worker; see the lockstep contract on
//! [`Communicator`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use collective_rl::{
//!     CollectiveOptimizer, GaeEstimator, Sgd, UpdateLoopConfig, VarStore,
//!     local_group, run_ppo_updates,
//! };
//!
//! // On each worker thread, with its own store/objective and rank handle:
//! let mut opt = CollectiveOptimizer::new(&mut store, objective, Sgd::new(3e-4), comm)?;
//! opt.sync_from_root(&mut store)?;
//! let stats = run_ppo_updates(
//!     &mut opt, &mut store, &rollouts,
//!     &GaeEstimator::new(0.99, 0.95),
//!     &UpdateLoopConfig::default(), &mut rng, Some(log),
//! )?;
//! ```

pub mod algorithms;
pub mod buffers;
pub mod comm;
pub mod core;
pub mod metrics;
pub mod optim;
pub mod runners;

pub use crate::comm::{local_group, CommError, Communicator, LocalComm, SoloComm};
pub use crate::core::{Feed, Marker, StoreError, VarId, VarStore};

pub use crate::algorithms::{
    compute_gae, normalize_advantages, AdvantageEstimate, EvalError, Evaluation, GaeEstimator,
    Objective,
};

pub use crate::buffers::{feed_keys, RolloutBuffer};

pub use crate::optim::{
    CollectiveOptimizer, LocalOptimizer, MomentumSgd, ParamSynchronizer, Sgd, TrainError,
};

pub use crate::runners::{
    run_ppo_updates, run_update_loop, ConfigError, UpdateLoopConfig, UpdateStats, UPDATE_TERMS,
};

pub use crate::metrics::{ConsoleLogger, CsvLogger, JsonlLogger, MultiLogger, UpdateLogger};
