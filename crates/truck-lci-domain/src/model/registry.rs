//! Activity registry: dense, collision-free index assignment

use std::collections::HashMap;

use truck_lci_types::{Error, Result};

use super::activity::{ActivityKey, ProceduralActivity, Selector};

/// Bijective mapping between activity keys and matrix indices.
///
/// Owned by one calculation context. Indices are never reassigned; the
/// registry length is the dimension of the technology matrix.
#[derive(Debug, Clone, Default)]
pub struct ActivityRegistry {
    keys: Vec<Option<ActivityKey>>,
    index: HashMap<ActivityKey, usize>,
    procedural: HashMap<ProceduralActivity, usize>,
}

impl ActivityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Assign the next free index to `key`, or return its existing index
    pub fn register(&mut self, key: ActivityKey) -> usize {
        if let Some(&existing) = self.index.get(&key) {
            return existing;
        }
        let idx = self.keys.len();
        self.keys.push(Some(key.clone()));
        self.index.insert(key, idx);
        idx
    }

    /// Place `key` at an explicit index, as read from a label dictionary.
    ///
    /// Re-inserting a key at its own index is a no-op. A key already placed
    /// elsewhere, or an index held by another key, is a collision.
    pub fn insert(&mut self, key: ActivityKey, idx: usize) -> Result<()> {
        if let Some(&existing) = self.index.get(&key) {
            if existing == idx {
                return Ok(());
            }
            return Err(Error::DuplicateActivity {
                key: key.to_string(),
                existing,
                requested: idx,
            });
        }
        if let Some(Some(holder)) = self.keys.get(idx) {
            return Err(Error::DuplicateActivity {
                key: holder.to_string(),
                existing: idx,
                requested: idx,
            });
        }
        if idx >= self.keys.len() {
            self.keys.resize(idx + 1, None);
        }
        self.keys[idx] = Some(key.clone());
        self.index.insert(key, idx);
        Ok(())
    }

    /// Check that indices `0..len` are all assigned
    pub fn ensure_dense(&self) -> Result<()> {
        match self.keys.iter().position(Option::is_none) {
            Some(gap) => Err(Error::ReferenceData(format!(
                "activity index {} is unassigned ({} activities declared)",
                gap,
                self.keys.len()
            ))),
            None => Ok(()),
        }
    }

    /// Register a scope-generated activity located in `location`
    pub fn register_procedural(&mut self, activity: ProceduralActivity, location: &str) -> usize {
        if let Some(&idx) = self.procedural.get(&activity) {
            return idx;
        }
        let idx = self.register(activity.key(location));
        self.procedural.insert(activity, idx);
        idx
    }

    pub fn procedural(&self, activity: &ProceduralActivity) -> Option<usize> {
        self.procedural.get(activity).copied()
    }

    pub fn require_procedural(&self, activity: &ProceduralActivity) -> Result<usize> {
        self.procedural(activity)
            .ok_or_else(|| Error::UnknownActivity(format!("{:?}", activity)))
    }

    /// Procedural activities with their indices
    pub fn procedural_activities(&self) -> impl Iterator<Item = (&ProceduralActivity, usize)> {
        self.procedural.iter().map(|(a, &i)| (a, i))
    }

    pub fn key(&self, idx: usize) -> Option<&ActivityKey> {
        self.keys.get(idx).and_then(Option::as_ref)
    }

    pub fn index_of(&self, key: &ActivityKey) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn require(&self, key: &ActivityKey) -> Result<usize> {
        self.index_of(key)
            .ok_or_else(|| Error::UnknownActivity(key.to_string()))
    }

    /// All indices whose key satisfies `selector`, ascending
    pub fn resolve(&self, selector: &Selector) -> Vec<usize> {
        self.keys
            .iter()
            .enumerate()
            .filter_map(|(i, k)| match k {
                Some(key) if selector.matches(key) => Some(i),
                _ => None,
            })
            .collect()
    }

    /// Lowest index matching `selector`
    pub fn resolve_first(&self, selector: &Selector) -> Option<usize> {
        self.keys.iter().position(|k| match k {
            Some(key) => selector.matches(key),
            None => false,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &ActivityKey)> {
        self.keys
            .iter()
            .enumerate()
            .filter_map(|(i, k)| k.as_ref().map(|key| (i, key)))
    }
}
