//! Person name interning.
//!
//! Maps roster names to dense integer indices in roster order so the search
//! can work with `Vec`-indexed state instead of string keys.

use rustc_hash::FxHashMap;

/// Interned person index (position in the roster).
pub type PersonIdx = u32;

/// Bidirectional mapping between person names and roster indices.
#[derive(Debug, Clone)]
pub struct PersonInterner {
    to_idx: FxHashMap<String, PersonIdx>,
    from_idx: Vec<String>,
}

impl PersonInterner {
    /// Create a new interner with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            to_idx: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            from_idx: Vec::with_capacity(capacity),
        }
    }

    /// Intern a name, returning its index and whether it was newly added.
    pub fn intern(&mut self, name: &str) -> (PersonIdx, bool) {
        if let Some(&idx) = self.to_idx.get(name) {
            return (idx, false);
        }
        let idx = self.from_idx.len() as PersonIdx;
        self.from_idx.push(name.to_string());
        self.to_idx.insert(name.to_string(), idx);
        (idx, true)
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<PersonIdx> {
        self.to_idx.get(name).copied()
    }

    #[inline]
    pub fn resolve(&self, idx: PersonIdx) -> Option<&str> {
        self.from_idx.get(idx as usize).map(|s| s.as_str())
    }

    /// Names in roster order.
    pub fn names(&self) -> &[String] {
        &self.from_idx
    }

    pub fn len(&self) -> usize {
        self.from_idx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.from_idx.is_empty()
    }
}

impl Default for PersonInterner {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}
