//! Gradient-descent local optimizers.

use crate::core::{StoreError, VarId, VarStore};

use super::optimizer::LocalOptimizer;

fn check_len(store: &VarStore, id: VarId, grad: &[f32]) -> Result<(), StoreError> {
    let expected = store.value(id).len();
    if grad.len() != expected {
        return Err(StoreError::LengthMismatch {
            name: store.name(id).to_string(),
            expected,
            got: grad.len(),
        });
    }
    Ok(())
}

/// Plain stochastic gradient descent: `w -= lr * g`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sgd {
    learning_rate: f32,
}

impl Sgd {
    /// Create an SGD optimizer with the given learning rate.
    pub fn new(learning_rate: f32) -> Self {
        Self { learning_rate }
    }

    /// The configured learning rate.
    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }
}

impl LocalOptimizer for Sgd {
    fn prepare(&mut self, _store: &mut VarStore, _vars: &[VarId]) -> Result<(), StoreError> {
        Ok(())
    }

    fn apply(
        &mut self,
        store: &mut VarStore,
        vars: &[VarId],
        grads: &[Vec<f32>],
    ) -> Result<(), StoreError> {
        for (&id, grad) in vars.iter().zip(grads.iter()) {
            check_len(store, id, grad)?;
            let lr = self.learning_rate;
            for (w, g) in store.value_mut(id).iter_mut().zip(grad.iter()) {
                *w -= lr * g;
            }
        }
        Ok(())
    }
}

/// SGD with momentum: `v = momentum * v + g; w -= lr * v`.
///
/// One velocity buffer per variable, registered in the store under
/// `<name>/momentum` so it is synchronized across workers alongside the
/// variable itself.
#[derive(Debug, Clone)]
pub struct MomentumSgd {
    learning_rate: f32,
    momentum: f32,
    slots: Vec<VarId>,
}

impl MomentumSgd {
    /// Create a momentum optimizer with the given learning rate and decay.
    pub fn new(learning_rate: f32, momentum: f32) -> Self {
        Self {
            learning_rate,
            momentum,
            slots: Vec::new(),
        }
    }

    /// Velocity-slot variables, aligned with the prepared variable order.
    pub fn slots(&self) -> &[VarId] {
        &self.slots
    }
}

impl LocalOptimizer for MomentumSgd {
    fn prepare(&mut self, store: &mut VarStore, vars: &[VarId]) -> Result<(), StoreError> {
        self.slots = Vec::with_capacity(vars.len());
        for &id in vars {
            let name = format!("{}/momentum", store.name(id));
            let shape = store.shape(id).to_vec();
            let zeros = vec![0.0; store.value(id).len()];
            let slot = store.register(name, &shape, zeros)?;
            self.slots.push(slot);
        }
        Ok(())
    }

    fn apply(
        &mut self,
        store: &mut VarStore,
        vars: &[VarId],
        grads: &[Vec<f32>],
    ) -> Result<(), StoreError> {
        debug_assert_eq!(self.slots.len(), vars.len());
        for ((&id, &slot), grad) in vars.iter().zip(self.slots.iter()).zip(grads.iter()) {
            check_len(store, id, grad)?;
            let momentum = self.momentum;
            let lr = self.learning_rate;

            let velocity = store.value_mut(slot);
            for (v, g) in velocity.iter_mut().zip(grad.iter()) {
                *v = momentum * *v + g;
            }
            let velocity = velocity.to_vec();

            for (w, v) in store.value_mut(id).iter_mut().zip(velocity.iter()) {
                *w -= lr * v;
            }
        }
        Ok(())
    }
}
