//! Ordered registry of named training variables.
//!
//! Every unit of state subject to gradient exchange or synchronization
//! lives here: model parameters and optimizer-internal accumulators alike,
//! each a named f32 buffer with a fixed shape. Registration order is
//! stable, and a [`Marker`] captures a point in the registration sequence
//! so that state created later (optimizer slots) can be enumerated
//! explicitly instead of diffing a global registry.

use std::collections::HashMap;
use std::fmt;

/// Handle to a variable registered in a [`VarStore`].
///
/// Handles are only meaningful for the store that issued them; ids order
/// the same way as registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(usize);

/// A point in a store's registration sequence.
///
/// `registered_since(marker)` returns exactly the variables registered
/// after the marker was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker(usize);

/// Error raised by variable registration or assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A variable with this name is already registered.
    DuplicateName(String),
    /// Supplied data length does not match the variable's shape.
    LengthMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::DuplicateName(name) => {
                write!(f, "variable '{}' already registered", name)
            }
            StoreError::LengthMismatch { name, expected, got } => {
                write!(
                    f,
                    "variable '{}' expects {} elements, got {}",
                    name, expected, got
                )
            }
        }
    }
}

impl std::error::Error for StoreError {}

struct Entry {
    name: String,
    shape: Vec<usize>,
    data: Vec<f32>,
}

/// Ordered, name-indexed storage for f32 variables.
#[derive(Default)]
pub struct VarStore {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl VarStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a variable with the given shape and initial value.
    ///
    /// `init` must contain exactly the product of `shape` elements.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        shape: &[usize],
        init: Vec<f32>,
    ) -> Result<VarId, StoreError> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(StoreError::DuplicateName(name));
        }
        let expected: usize = shape.iter().product();
        if init.len() != expected {
            return Err(StoreError::LengthMismatch {
                name,
                expected,
                got: init.len(),
            });
        }
        let id = VarId(self.entries.len());
        self.index.insert(name.clone(), id.0);
        self.entries.push(Entry {
            name,
            shape: shape.to_vec(),
            data: init,
        });
        Ok(id)
    }

    /// Capture the current registration point.
    pub fn marker(&self) -> Marker {
        Marker(self.entries.len())
    }

    /// Variables registered after `marker` was taken, in registration order.
    pub fn registered_since(&self, marker: Marker) -> Vec<VarId> {
        (marker.0..self.entries.len()).map(VarId).collect()
    }

    /// Number of registered variables.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All variable ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = VarId> {
        (0..self.entries.len()).map(VarId)
    }

    /// Look up a variable by name.
    pub fn lookup(&self, name: &str) -> Option<VarId> {
        self.index.get(name).copied().map(VarId)
    }

    /// The variable's registered name.
    pub fn name(&self, id: VarId) -> &str {
        &self.entries[id.0].name
    }

    /// The variable's shape.
    pub fn shape(&self, id: VarId) -> &[usize] {
        &self.entries[id.0].shape
    }

    /// The variable's current value.
    pub fn value(&self, id: VarId) -> &[f32] {
        &self.entries[id.0].data
    }

    /// Mutable access to the variable's value. The length is fixed.
    pub fn value_mut(&mut self, id: VarId) -> &mut [f32] {
        &mut self.entries[id.0].data
    }

    /// Overwrite the variable's value.
    pub fn set_value(&mut self, id: VarId, data: &[f32]) -> Result<(), StoreError> {
        let entry = &mut self.entries[id.0];
        if data.len() != entry.data.len() {
            return Err(StoreError::LengthMismatch {
                name: entry.name.clone(),
                expected: entry.data.len(),
                got: data.len(),
            });
        }
        entry.data.copy_from_slice(data);
        Ok(())
    }
}

impl fmt::Debug for VarStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|e| (&e.name, &e.shape)))
            .finish()
    }
}
