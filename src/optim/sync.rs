//! Parameter synchronization from the root worker.

use crate::comm::{CommError, Communicator};
use crate::core::{VarId, VarStore};

/// Broadcasts the root worker's variable snapshots to the rest of the
/// group, overwriting their local values.
///
/// Broadcasts pair positionally: every worker must construct its
/// synchronizer over the same variables in the same order, or values are
/// silently cross-wired. [`sorted_by_name`](ParamSynchronizer::sorted_by_name)
/// derives that order from the variables' registered names, which is the
/// recommended construction.
///
/// `sync` aligns all workers exactly: it is the mechanism for initial
/// parameter alignment at startup and for correcting floating-point drift
/// accumulated over many averaged update steps.
pub struct ParamSynchronizer<C: Communicator> {
    vars: Vec<VarId>,
    comm: C,
}

/// Synchronization source rank.
const ROOT: usize = 0;

impl<C: Communicator> ParamSynchronizer<C> {
    /// Synchronize `vars` in the given order on every worker.
    pub fn new(vars: Vec<VarId>, comm: C) -> Self {
        Self { vars, comm }
    }

    /// Synchronize `vars` ordered by their registered names, deduplicated.
    pub fn sorted_by_name(store: &VarStore, mut vars: Vec<VarId>, comm: C) -> Self {
        vars.sort_by(|&a, &b| store.name(a).cmp(store.name(b)));
        vars.dedup();
        Self::new(vars, comm)
    }

    /// The synchronized variable set, in broadcast order.
    pub fn vars(&self) -> &[VarId] {
        &self.vars
    }

    /// Overwrite every non-root worker's values with the root's.
    ///
    /// Group-synchronous: all workers must call `sync` together.
    pub fn sync(&self, store: &mut VarStore) -> Result<(), CommError> {
        for &id in &self.vars {
            let mut snapshot = store.value(id).to_vec();
            self.comm.broadcast(ROOT, &mut snapshot)?;
            if !self.comm.is_root() {
                // Lengths already matched at the broadcast.
                store.value_mut(id).copy_from_slice(&snapshot);
            }
        }
        Ok(())
    }
}
