//! The wrapped local-optimizer interface.

use crate::core::{StoreError, VarId, VarStore};

/// A local optimizer that applies externally supplied gradient values.
///
/// The collective wrapper computes the gradients (locally, via the
/// objective) and averages them across the group; the local optimizer's
/// only job is the update rule. Internal state the rule needs (momentum
/// buffers, adaptive moments) is registered in the shared [`VarStore`]
/// during [`prepare`](LocalOptimizer::prepare) so it participates in
/// parameter synchronization like any model variable.
pub trait LocalOptimizer {
    /// Register internal state for `vars`. Called once, before the first
    /// [`apply`](LocalOptimizer::apply), with the final variable order.
    fn prepare(&mut self, store: &mut VarStore, vars: &[VarId]) -> Result<(), StoreError>;

    /// Perform one update step; `grads[i]` pairs with `vars[i]` and has
    /// that variable's element count.
    fn apply(
        &mut self,
        store: &mut VarStore,
        vars: &[VarId],
        grads: &[Vec<f32>],
    ) -> Result<(), StoreError>;
}
