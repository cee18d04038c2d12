//! The collective gradient optimizer.

use std::fmt;
use std::mem;

use crate::algorithms::objective::{EvalError, Objective};
use crate::comm::{CommError, Communicator};
use crate::core::{Feed, StoreError, VarId, VarStore};

use super::optimizer::LocalOptimizer;
use super::sync::ParamSynchronizer;

/// Error raised by a training step.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainError {
    /// A collective operation failed.
    Comm(CommError),
    /// The objective evaluation failed.
    Eval(EvalError),
    /// A variable-store operation failed.
    Store(StoreError),
}

impl fmt::Display for TrainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainError::Comm(e) => write!(f, "collective error: {}", e),
            TrainError::Eval(e) => write!(f, "evaluation error: {}", e),
            TrainError::Store(e) => write!(f, "variable store error: {}", e),
        }
    }
}

impl std::error::Error for TrainError {}

impl From<CommError> for TrainError {
    fn from(e: CommError) -> Self {
        TrainError::Comm(e)
    }
}

impl From<EvalError> for TrainError {
    fn from(e: EvalError) -> Self {
        TrainError::Eval(e)
    }
}

impl From<StoreError> for TrainError {
    fn from(e: StoreError) -> Self {
        TrainError::Store(e)
    }
}

/// Wraps a local optimizer so that every update step applies the
/// group-averaged gradient instead of the locally computed one.
///
/// Each `minimize` call evaluates the objective once (auxiliary terms and
/// local gradients in a single pass), allreduce-averages every gradient
/// buffer and every scalar term across the group, and applies the averaged
/// gradients through the local optimizer. All workers therefore take
/// identical update steps and their variables stay numerically aligned,
/// up to the reduction's floating-point associativity.
///
/// Gradients exchange in a fixed order derived from variable names at
/// construction time, so workers agree on pairing without relying on
/// incidental registration order.
///
/// `minimize` and `sync_from_root` are group-synchronous: every worker
/// must call them the same number of times, in the same order (see the
/// lockstep contract on [`Communicator`]).
pub struct CollectiveOptimizer<O, P, C>
where
    O: Objective,
    P: LocalOptimizer,
    C: Communicator,
{
    objective: O,
    optimizer: P,
    comm: C,
    /// Indices into the objective's declared gradient order, name-sorted.
    order: Vec<usize>,
    /// Gradient variables in exchange (name-sorted) order.
    grad_vars: Vec<VarId>,
    synchronizer: ParamSynchronizer<C>,
}

impl<O, P, C> CollectiveOptimizer<O, P, C>
where
    O: Objective,
    P: LocalOptimizer,
    C: Communicator,
{
    /// Wrap `optimizer` for collective training of `objective`'s variables.
    ///
    /// Prepares the local optimizer (registering any internal state in the
    /// store) and builds the embedded synchronizer over the gradient
    /// variables plus everything the optimizer registered.
    pub fn new(
        store: &mut VarStore,
        objective: O,
        mut optimizer: P,
        comm: C,
    ) -> Result<Self, TrainError> {
        let marker = store.marker();

        let declared = objective.grad_vars().to_vec();
        let mut order: Vec<usize> = (0..declared.len()).collect();
        order.sort_by(|&a, &b| store.name(declared[a]).cmp(store.name(declared[b])));
        let grad_vars: Vec<VarId> = order.iter().map(|&i| declared[i]).collect();

        optimizer.prepare(store, &grad_vars)?;

        let mut sync_vars = grad_vars.clone();
        sync_vars.extend(store.registered_since(marker));
        let synchronizer = ParamSynchronizer::sorted_by_name(store, sync_vars, comm.clone());

        Ok(Self {
            objective,
            optimizer,
            comm,
            order,
            grad_vars,
            synchronizer,
        })
    }

    /// The group this optimizer trains with.
    pub fn comm(&self) -> &C {
        &self.comm
    }

    /// The wrapped objective.
    pub fn objective(&self) -> &O {
        &self.objective
    }

    /// Gradient variables in exchange order.
    pub fn grad_vars(&self) -> &[VarId] {
        &self.grad_vars
    }

    /// Every variable covered by [`sync_from_root`](Self::sync_from_root):
    /// gradient variables plus optimizer-internal state.
    pub fn synchronized_vars(&self) -> &[VarId] {
        self.synchronizer.vars()
    }

    /// Compute gradients, average them across the group, and apply them.
    ///
    /// `terms` names auxiliary scalars to evaluate alongside the gradients;
    /// the returned values are their group means, in request order.
    pub fn minimize(
        &mut self,
        store: &mut VarStore,
        feed: &Feed,
        terms: &[&str],
    ) -> Result<Vec<f64>, TrainError> {
        let evaluation = self.objective.evaluate(store, feed, terms)?;
        if evaluation.terms.len() != terms.len() {
            return Err(EvalError::Arity {
                expected: terms.len(),
                got: evaluation.terms.len(),
            }
            .into());
        }
        if evaluation.grads.len() != self.order.len() {
            return Err(EvalError::Arity {
                expected: self.order.len(),
                got: evaluation.grads.len(),
            }
            .into());
        }

        // Reorder from the objective's declared order to exchange order.
        let mut declared = evaluation.grads;
        let mut grads: Vec<Vec<f32>> = self
            .order
            .iter()
            .map(|&i| mem::take(&mut declared[i]))
            .collect();

        let world = self.comm.size();
        let scale = 1.0 / world as f32;
        for grad in &mut grads {
            self.comm.allreduce_sum(grad)?;
            for g in grad.iter_mut() {
                *g *= scale;
            }
        }

        self.optimizer.apply(store, &self.grad_vars, &grads)?;

        let mut means = Vec::with_capacity(evaluation.terms.len());
        for term in evaluation.terms {
            means.push(self.comm.allreduce_scalar(term)? / world as f64);
        }
        Ok(means)
    }

    /// Broadcast the root worker's parameters (and optimizer state) to
    /// every other worker, overwriting their local values.
    pub fn sync_from_root(&self, store: &mut VarStore) -> Result<(), CommError> {
        self.synchronizer.sync(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::objective::Evaluation;
    use crate::comm::SoloComm;
    use crate::optim::sgd::{MomentumSgd, Sgd};

    /// Objective with fixed gradients and term values.
    struct FixedObjective {
        vars: Vec<VarId>,
        grads: Vec<Vec<f32>>,
        term_value: f64,
    }

    impl Objective for FixedObjective {
        fn grad_vars(&self) -> &[VarId] {
            &self.vars
        }

        fn evaluate(
            &mut self,
            _store: &VarStore,
            _feed: &Feed,
            terms: &[&str],
        ) -> Result<Evaluation, EvalError> {
            Ok(Evaluation {
                terms: terms.iter().map(|_| self.term_value).collect(),
                grads: self.grads.clone(),
            })
        }
    }

    #[test]
    fn solo_minimize_matches_local_sgd() {
        let mut store = VarStore::new();
        let w = store.register("w", &[2], vec![1.0, 1.0]).unwrap();

        let objective = FixedObjective {
            vars: vec![w],
            grads: vec![vec![2.0, -2.0]],
            term_value: 0.5,
        };
        let mut opt =
            CollectiveOptimizer::new(&mut store, objective, Sgd::new(0.5), SoloComm).unwrap();

        let terms = opt.minimize(&mut store, &Feed::new(), &["loss"]).unwrap();
        assert_eq!(terms, vec![0.5]);
        assert_eq!(store.value(w), &[0.0, 2.0]);
    }

    #[test]
    fn gradient_exchange_order_is_name_sorted() {
        let mut store = VarStore::new();
        // Register in an order that differs from the name sort.
        let z = store.register("z", &[1], vec![0.0]).unwrap();
        let a = store.register("a", &[1], vec![0.0]).unwrap();

        let objective = FixedObjective {
            vars: vec![z, a],
            grads: vec![vec![1.0], vec![2.0]],
            term_value: 0.0,
        };
        let mut opt =
            CollectiveOptimizer::new(&mut store, objective, Sgd::new(1.0), SoloComm).unwrap();

        assert_eq!(opt.grad_vars(), &[a, z]);

        // The declared gradients must follow their variables through the
        // reorder: z's gradient is 1.0, a's is 2.0.
        opt.minimize(&mut store, &Feed::new(), &[]).unwrap();
        assert_eq!(store.value(z), &[-1.0]);
        assert_eq!(store.value(a), &[-2.0]);
    }

    #[test]
    fn optimizer_slots_join_the_sync_set() {
        let mut store = VarStore::new();
        let w = store.register("w", &[1], vec![0.0]).unwrap();

        let objective = FixedObjective {
            vars: vec![w],
            grads: vec![vec![1.0]],
            term_value: 0.0,
        };
        let opt = CollectiveOptimizer::new(
            &mut store,
            objective,
            MomentumSgd::new(0.1, 0.9),
            SoloComm,
        )
        .unwrap();

        let slot = store.lookup("w/momentum").unwrap();
        let synced = opt.synchronized_vars();
        assert!(synced.contains(&w));
        assert!(synced.contains(&slot));
        assert_eq!(synced.len(), 2);
    }

    #[test]
    fn gradient_count_mismatch_is_an_error() {
        let mut store = VarStore::new();
        let w = store.register("w", &[1], vec![0.0]).unwrap();

        let objective = FixedObjective {
            vars: vec![w],
            grads: vec![],
            term_value: 0.0,
        };
        let mut opt =
            CollectiveOptimizer::new(&mut store, objective, Sgd::new(0.1), SoloComm).unwrap();

        let result = opt.minimize(&mut store, &Feed::new(), &[]);
        assert_eq!(
            result,
            Err(TrainError::Eval(EvalError::Arity { expected: 1, got: 0 }))
        );
    }

    #[test]
    fn term_values_are_returned_in_request_order() {
        let mut store = VarStore::new();
        let w = store.register("w", &[1], vec![0.0]).unwrap();

        let objective = FixedObjective {
            vars: vec![w],
            grads: vec![vec![0.0]],
            term_value: 3.0,
        };
        let mut opt =
            CollectiveOptimizer::new(&mut store, objective, Sgd::new(0.1), SoloComm).unwrap();

        let terms = opt
            .minimize(&mut store, &Feed::new(), &["a", "b", "c"])
            .unwrap();
        assert_eq!(terms, vec![3.0, 3.0, 3.0]);
    }
}
