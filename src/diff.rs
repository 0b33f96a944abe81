//! Classification of desired values against persisted ones.
//!
//! [`Diff`] compares two keyed collections and splits the desired side into
//! values that are *missing* from the existing side, values that are *updated*
//! and values that are *unchanged*. Keys only present on the existing side
//! are not reported at all; nothing is ever deleted.

use std::hash::Hash;

use indexmap::IndexMap;

/// The difference between existing values `E` and desired values `A`, both keyed by `K`.
///
/// All outputs follow the iteration order of the desired collection. Both
/// sides are [`IndexMap`]s: collecting duplicate keys into one overwrites the
/// value in place, so the last value wins at the position of the first
/// occurrence. Duplicate keys within one reconciliation are resolved this way
/// on purpose.
///
/// # Examples
///
/// ```
/// use indexmap::IndexMap;
/// use sqlx_upsert::diff::Diff;
///
/// let existing: IndexMap<_, _> = [("a", 1), ("b", 2), ("x", 9)].into_iter().collect();
/// let desired: IndexMap<_, _> = [("a", 1), ("b", 3), ("c", 4)].into_iter().collect();
///
/// let diff = Diff::of(existing, desired);
/// let eq = |e: &i32, a: &i32| e == a;
/// assert_eq!(diff.missing(), [&4]);
/// assert_eq!(diff.updated(eq), [(&2, &3)]);
/// assert_eq!(diff.unchanged(eq), [&1]);
/// ```
#[derive(Debug, Clone)]
pub struct Diff<K, E, A> {
    existing: IndexMap<K, E>,
    desired: IndexMap<K, A>,
}

impl<K, E, A> Diff<K, E, A>
where
    K: Eq + Hash,
{
    pub fn of(existing: IndexMap<K, E>, desired: IndexMap<K, A>) -> Self {
        Self { existing, desired }
    }

    /// Desired values whose key has no existing entry.
    pub fn missing(&self) -> Vec<&A> {
        self.desired
            .iter()
            .filter(|&(key, _)| !self.existing.contains_key(key))
            .map(|(_, value)| value)
            .collect()
    }

    /// `(existing, desired)` pairs for keys on both sides which `equals` considers different.
    pub fn updated<F>(&self, equals: F) -> Vec<(&E, &A)>
    where
        F: Fn(&E, &A) -> bool,
    {
        self.common()
            .filter(|&(e, a)| !equals(e, a))
            .collect()
    }

    /// Existing values for keys on both sides which `equals` considers equal.
    pub fn unchanged<F>(&self, equals: F) -> Vec<&E>
    where
        F: Fn(&E, &A) -> bool,
    {
        self.common()
            .filter(|&(e, a)| equals(e, a))
            .map(|(e, _)| e)
            .collect()
    }

    fn common(&self) -> impl Iterator<Item = (&E, &A)> {
        self.desired
            .iter()
            .filter_map(|(key, a)| self.existing.get(key).map(|e| (e, a)))
    }
}
