//! Named input bindings for one objective evaluation.

use std::collections::HashMap;

/// A set of named f32 buffers fed to an objective for a single
/// loss/gradient evaluation: minibatch observations, actions, advantage
/// estimates, and whatever else the objective's inputs require.
#[derive(Debug, Clone, Default)]
pub struct Feed {
    inputs: HashMap<String, Vec<f32>>,
}

impl Feed {
    /// Create an empty feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, values: Vec<f32>) -> Self {
        self.insert(name, values);
        self
    }

    /// Bind `name` to `values`, replacing any previous binding.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f32>) {
        self.inputs.insert(name.into(), values);
    }

    /// Look up a binding.
    pub fn get(&self, name: &str) -> Option<&[f32]> {
        self.inputs.get(name).map(Vec::as_slice)
    }

    /// Merge every binding from `other` into this feed, overwriting
    /// duplicates. Used to layer caller-supplied extra inputs over the
    /// minibatch bindings.
    pub fn extend(&mut self, other: Feed) {
        self.inputs.extend(other.inputs);
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Whether the feed has no bindings.
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let feed = Feed::new().with("observations", vec![1.0, 2.0]);
        assert_eq!(feed.get("observations"), Some(&[1.0, 2.0][..]));
        assert_eq!(feed.get("actions"), None);
        assert_eq!(feed.len(), 1);
    }

    #[test]
    fn extend_overwrites_duplicates() {
        let mut base = Feed::new().with("a", vec![1.0]).with("b", vec![2.0]);
        let extra = Feed::new().with("b", vec![9.0]).with("c", vec![3.0]);
        base.extend(extra);
        assert_eq!(base.get("a"), Some(&[1.0][..]));
        assert_eq!(base.get("b"), Some(&[9.0][..]));
        assert_eq!(base.get("c"), Some(&[3.0][..]));
    }
}
