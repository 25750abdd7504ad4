//! Small growable index lists.
//!
//! Stands in for `list_t` from the original implementation: a `Vec<usize>`
//! would do almost all of this, but `ext[]`'s "add if new" semantics and the
//! planner's choice stack read more clearly as named operations than as
//! `Vec` boilerplate repeated at every call site.

/// An ordered, duplicate-free-on-demand list of indices.
///
/// Used for a vertex's external destination partitions (`ext[v]`), a tile's
/// outgoing boundary states (`out`), and a tile's ghost replicas.
#[derive(Debug, Clone, Default)]
pub struct IndexList {
    values: Vec<usize>,
}

impl IndexList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            values: Vec::with_capacity(cap),
        }
    }

    /// Append `value` unconditionally, returning the index it now occupies.
    pub fn add(&mut self, value: usize) -> usize {
        self.values.push(value);
        self.values.len() - 1
    }

    /// Append `value` only if not already present. Returns `true` if it was
    /// newly inserted.
    pub fn add_new(&mut self, value: usize) -> bool {
        if self.values.contains(&value) {
            return false;
        }
        self.values.push(value);
        true
    }

    /// Replace every occurrence of `origin` with `current`. Returns `true`
    /// if at least one occurrence was found.
    pub fn change(&mut self, origin: usize, current: usize) -> bool {
        let mut found = false;
        for v in self.values.iter_mut() {
            if *v == origin {
                *v = current;
                found = true;
            }
        }
        found
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.values
    }

    pub fn iter(&self) -> std::slice::Iter<'_, usize> {
        self.values.iter()
    }

    /// Pop `n` values off the tail, most-recently-added first. Used when
    /// redistributing a tile's outgoing/incoming states over duplicates.
    pub fn pop_tail(&mut self, n: usize) -> Vec<usize> {
        let start = self.values.len().saturating_sub(n);
        self.values.split_off(start)
    }

    pub fn truncate(&mut self, len: usize) {
        self.values.truncate(len);
    }

    pub fn extend_from(&mut self, other: &IndexList) {
        self.values.extend_from_slice(&other.values);
    }
}

impl FromIterator<usize> for IndexList {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// One alternative `(npart, tailsize)` partition shape the planner kept in
/// case its first choice fails allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionChoice {
    pub npart: usize,
    pub tailsize: usize,
}

/// LIFO stack of partition alternatives, popped by the coordinator on
/// allocation failure.
#[derive(Debug, Clone, Default)]
pub struct ChoiceList {
    choices: Vec<PartitionChoice>,
}

impl ChoiceList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, npart: usize, tailsize: usize) {
        self.choices.push(PartitionChoice { npart, tailsize });
    }

    pub fn pop(&mut self) -> Option<PartitionChoice> {
        self.choices.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.choices.len()
    }

    pub fn clear(&mut self) {
        self.choices.clear();
    }
}
