use core::fmt;
use core::hash::{Hash, Hasher};
use indexmap::IndexMap as _IndexMap;
use rustc_hash::{FxBuildHasher, FxHasher};
use std::collections::{HashMap as _HashMap, HashSet as _HashSet};

/// Unique identifier of a task, derived from its human-readable name.
///
/// Within one graph, identifiers of distinct registered names are assumed to
/// be pairwise distinct. The scheduler does not detect hash collisions
/// between names; a collision silently merges two tasks into one table slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TaskId(u64);

impl TaskId {
    /// Raw 64-bit value of the identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaskId({:#018x})", self.0)
    }
}

/// Derive the identifier for a task name.
///
/// Pure and stateless: the same name maps to the same identifier on every
/// call, on every thread. A fresh hasher value is constructed per call, so
/// there is no shared hasher state. The hash is well-distributed but not
/// cryptographic.
///
/// Exposed so that callers can declare a dependency on a task that has not
/// been registered yet.
#[must_use]
pub fn task_id(name: &str) -> TaskId {
    let mut hasher = FxHasher::default();
    name.hash(&mut hasher);
    TaskId(hasher.finish())
}

pub(crate) type HashMap<K, V> = _HashMap<K, V, FxBuildHasher>;
pub(crate) type HashSet<T> = _HashSet<T, FxBuildHasher>;
pub(crate) type IndexMap<K, V> = _IndexMap<K, V, FxBuildHasher>;

#[cfg(test)]
mod tests {
    use super::task_id;

    #[test]
    fn identifiers_are_stable() {
        assert_eq!(task_id("upload"), task_id("upload"));
        assert_eq!(task_id(""), task_id(""));
    }

    #[test]
    fn fixture_names_are_pairwise_distinct() {
        let names = ["start", "hello", "goodbye", "exit", "upload", "compress"];
        for (i, a) in names.iter().enumerate() {
            for b in &names[i + 1..] {
                assert_ne!(task_id(a), task_id(b), "{a} vs {b}");
            }
        }
    }
}
