//! Operation histories and the final-state consistency check.
//!
//! Each worker appends `(op, value, result)` for every call it makes. Once
//! all workers have joined, the histories are folded into a per-value tally
//! of successful adds minus successful removes:
//!
//! ```text
//! tally(v) = #add(v) -> true  -  #remove(v) -> true
//!
//! tally < 0   a remove succeeded on an absent value
//! tally > 1   an add succeeded on a present value
//! tally == 0  contains(v) must be false
//! tally == 1  contains(v) must be true
//! ```

use std::collections::BTreeMap;
use std::ops::Range;

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::data_structures::{Key, OrderedSet};
use crate::error::ConsistencyError;
use crate::worker::Worker;

/// Value range of the default workload.
pub const DEFAULT_RANGE: Key = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Add,
    Remove,
    Contains,
}

impl OpKind {
    pub fn apply<S: OrderedSet + ?Sized>(self, set: &S, worker: &Worker<'_>, value: Key) -> bool {
        match self {
            OpKind::Add => set.add(worker, value),
            OpKind::Remove => set.remove(worker, value),
            OpKind::Contains => set.contains(worker, value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryRecord {
    pub op: OpKind,
    pub value: Key,
    pub result: bool,
}

/// Append-only log of one worker's calls, in call order.
#[derive(Debug, Clone, Default)]
pub struct History {
    records: Vec<HistoryRecord>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        History {
            records: Vec::with_capacity(capacity),
        }
    }

    pub fn record(&mut self, op: OpKind, value: Key, result: bool) {
        self.records.push(HistoryRecord { op, value, result });
    }

    /// Runs `op` on the set and records its result.
    pub fn apply<S: OrderedSet + ?Sized>(
        &mut self,
        set: &S,
        worker: &Worker<'_>,
        op: OpKind,
        value: Key,
    ) -> bool {
        let result = op.apply(set, worker, value);
        self.record(op, value, result);
        result
    }

    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Seeded random mix of add, remove and contains (one third each) over
/// `0..range`.
pub struct Workload {
    rng: StdRng,
    range: Key,
}

impl Workload {
    pub fn new(seed: u64, range: Key) -> Self {
        assert!(range > 0, "workload range must be positive");
        Workload {
            rng: StdRng::seed_from_u64(seed),
            range,
        }
    }

    pub fn next_op(&mut self) -> (OpKind, Key) {
        let op = match self.rng.gen_range(0..3) {
            0 => OpKind::Add,
            1 => OpKind::Remove,
            _ => OpKind::Contains,
        };
        (op, self.rng.gen_range(0..self.range))
    }

    /// Applies `ops` operations and returns their history.
    pub fn run<S: OrderedSet + ?Sized>(
        &mut self,
        set: &S,
        worker: &Worker<'_>,
        ops: usize,
    ) -> History {
        let mut history = History::with_capacity(ops);
        for _ in 0..ops {
            let (op, value) = self.next_op();
            history.apply(set, worker, op, value);
        }
        history
    }
}

/// Summary of a passed consistency check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConsistencyReport {
    /// Values cross-checked against `contains`.
    pub checked: usize,
    /// Values expected (and found) in the set.
    pub present: usize,
    pub successful_adds: usize,
    pub successful_removes: usize,
}

/// Cross-checks the final set against the recorded histories.
///
/// Every value in `domain` and every value with a recorded successful add
/// or remove is checked. Must run after all recording workers have joined.
///
pub fn check_consistency<S: OrderedSet + ?Sized>(
    set: &S,
    worker: &Worker<'_>,
    histories: &[History],
    domain: Range<Key>,
) -> Result<ConsistencyReport, ConsistencyError> {
    let mut report = ConsistencyReport::default();
    let mut tallies: BTreeMap<Key, i64> = BTreeMap::new();

    for record in histories.iter().flat_map(History::records) {
        match (record.op, record.result) {
            (OpKind::Add, true) => {
                *tallies.entry(record.value).or_default() += 1;
                report.successful_adds += 1;
            }
            (OpKind::Remove, true) => {
                *tallies.entry(record.value).or_default() -= 1;
                report.successful_removes += 1;
            }
            _ => {}
        }
    }

    for (&value, &tally) in &tallies {
        if tally < 0 {
            return Err(ConsistencyError::RemovedWhileAbsent { value, tally });
        }
        if tally > 1 {
            return Err(ConsistencyError::AddedWhilePresent { value, tally });
        }
    }

    let outside = tallies.keys().copied().filter(|value| !domain.contains(value));
    for value in domain.clone().chain(outside) {
        let expected = tallies.get(&value).copied().unwrap_or(0) == 1;
        let actual = set.contains(worker, value);

        match (expected, actual) {
            (false, true) => return Err(ConsistencyError::WronglyPresent { value }),
            (true, false) => return Err(ConsistencyError::WronglyAbsent { value }),
            _ => {}
        }

        report.checked += 1;
        if expected {
            report.present += 1;
        }
    }

    debug!(
        "{} consistent: {} values checked, {} present, {} adds, {} removes",
        set.name(),
        report.checked,
        report.present,
        report.successful_adds,
        report.successful_removes
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::CoarseSet;

    #[test]
    fn test_workload_is_deterministic() {
        let mut first = Workload::new(7, DEFAULT_RANGE);
        let mut second = Workload::new(7, DEFAULT_RANGE);
        for _ in 0..100 {
            let (op, value) = first.next_op();
            assert_eq!((op, value), second.next_op());
            assert!((0..DEFAULT_RANGE).contains(&value));
        }
    }

    #[test]
    fn test_sequential_history_is_consistent() {
        let set = CoarseSet::new();
        let worker = set.register().unwrap();

        let history = Workload::new(1, 50).run(&set, &worker, 2000);
        assert_eq!(history.len(), 2000);

        let report = check_consistency(&set, &worker, &[history], 0..50).unwrap();
        assert_eq!(report.checked, 50);
        assert_eq!(report.present, set.snapshot(&worker, usize::MAX).len());
    }

    #[test]
    fn test_forged_histories_are_rejected() {
        let set = CoarseSet::new();
        let worker = set.register().unwrap();

        let mut history = History::new();
        history.record(OpKind::Remove, 3, true);
        assert_eq!(
            check_consistency(&set, &worker, &[history], 0..10),
            Err(ConsistencyError::RemovedWhileAbsent { value: 3, tally: -1 })
        );

        let mut first = History::new();
        let mut second = History::new();
        first.record(OpKind::Add, 4, true);
        second.record(OpKind::Add, 4, true);
        assert_eq!(
            check_consistency(&set, &worker, &[first, second], 0..10),
            Err(ConsistencyError::AddedWhilePresent { value: 4, tally: 2 })
        );

        let mut history = History::new();
        history.record(OpKind::Add, 5, true);
        assert_eq!(
            check_consistency(&set, &worker, &[history], 0..10),
            Err(ConsistencyError::WronglyAbsent { value: 5 })
        );

        set.add(&worker, 6);
        assert_eq!(
            check_consistency(&set, &worker, &[], 0..10),
            Err(ConsistencyError::WronglyPresent { value: 6 })
        );
    }

    #[test]
    fn test_values_outside_domain_are_checked() {
        let set = CoarseSet::new();
        let worker = set.register().unwrap();

        let mut history = History::new();
        history.apply(&set, &worker, OpKind::Add, 500);
        history.apply(&set, &worker, OpKind::Contains, 500);

        let report = check_consistency(&set, &worker, &[history], 0..10).unwrap();
        assert_eq!(report.checked, 11);
        assert_eq!(report.present, 1);
    }
}
