use crate::data_structures::Key;
use crate::error::SetError;
use crate::worker::Worker;

/// Values shown by [`OrderedSet::preview`].
pub const PREVIEW_LEN: usize = 20;

/// Contract shared by every synchronization strategy.
///
/// A concurrent set of [`Key`]s kept in ascending order in a singly linked
/// list between a head and a tail sentinel. Threads register once and pass
/// their [`Worker`] to every operation.
///
/// The sentinel values (`Key::MIN`, `Key::MAX`) can never be stored: `add`,
/// `remove` and `contains` return `false` for them.
///
/// # Panics
/// Operations panic when given a worker registered with a different set.
///
pub trait OrderedSet: Send + Sync {
    /// Strategy name, as accepted by `Strategy::from_str`.
    fn name(&self) -> &'static str;

    /// Claims a worker slot for the calling thread.
    fn register(&self) -> Result<Worker<'_>, SetError>;

    /// Inserts `value`; `false` if it was already present.
    fn add(&self, worker: &Worker<'_>, value: Key) -> bool;

    /// Removes `value`; `false` if it was absent.
    fn remove(&self, worker: &Worker<'_>, value: Key) -> bool;

    fn contains(&self, worker: &Worker<'_>, value: Key) -> bool;

    /// Empties the set and frees every node, including those held back for
    /// deferred reclamation.
    ///
    /// Requires `&mut self`, so no worker can be alive.
    fn clear(&mut self);

    /// Up to `limit` values in ascending order.
    ///
    /// Diagnostic only: not linearizable with concurrent mutations.
    fn snapshot(&self, worker: &Worker<'_>, limit: usize) -> Vec<Key>;

    /// The first [`PREVIEW_LEN`] values, space separated.
    fn preview(&self, worker: &Worker<'_>) -> String {
        self.snapshot(worker, PREVIEW_LEN)
            .iter()
            .map(|value| value.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
