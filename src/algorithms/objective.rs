//! The differentiable-objective interface.
//!
//! Models and loss functions enter the training core only through
//! [`Objective`]: one batched evaluation that produces the requested
//! diagnostic scalars together with the local gradient for every trainable
//! variable. How the gradients are obtained (autodiff, closed form,
//! finite differences) is the implementor's business.

use std::fmt;

use crate::core::{Feed, VarId, VarStore};

/// Result of one objective evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Requested auxiliary scalar values, aligned with the `terms` slice
    /// passed to [`Objective::evaluate`].
    pub terms: Vec<f64>,
    /// Local gradients, aligned with [`Objective::grad_vars`].
    pub grads: Vec<Vec<f32>>,
}

/// Error raised by an objective evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// A requested auxiliary term is not known to this objective.
    UnknownTerm(String),
    /// A required feed binding is missing.
    MissingInput(String),
    /// The evaluation returned the wrong number of gradients or terms.
    Arity { expected: usize, got: usize },
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::UnknownTerm(name) => write!(f, "unknown auxiliary term '{}'", name),
            EvalError::MissingInput(name) => write!(f, "missing feed input '{}'", name),
            EvalError::Arity { expected, got } => {
                write!(f, "evaluation arity mismatch: expected {}, got {}", expected, got)
            }
        }
    }
}

impl std::error::Error for EvalError {}

/// A training objective over variables in a [`VarStore`].
///
/// The variable set is fixed at construction time: `grad_vars` must return
/// the same ids, in the same order, for the lifetime of the objective.
pub trait Objective {
    /// The trainable variables this objective produces gradients for,
    /// excluding any variable whose gradient is identically null.
    fn grad_vars(&self) -> &[VarId];

    /// Evaluate the requested auxiliary terms and the local gradients in
    /// one pass over the feed.
    ///
    /// `Evaluation::terms[i]` answers `terms[i]`; `Evaluation::grads[i]`
    /// pairs with `grad_vars()[i]` and has that variable's element count.
    fn evaluate(
        &mut self,
        store: &VarStore,
        feed: &Feed,
        terms: &[&str],
    ) -> Result<Evaluation, EvalError>;
}
