use std::cell::{Cell, UnsafeCell};
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering, fence};

use crossbeam::utils::CachePadded;
use log::debug;

/// Local epoch of a worker that is not inside an operation.
///
pub const IDLE_EPOCH: u64 = u64::MAX;

/// A node that can be parked in an epoch free list.
///
/// The retired epoch is written once when the node is unlinked and read by
/// the owning worker when it decides whether the node can be handed out
/// again.
///
pub trait Reclaimable: Sized {
    /// Epoch stamped when the node was retired.
    fn retired_epoch(&self) -> u64;

    fn set_retired_epoch(&self, epoch: u64);

    /// Overwrites the payload with a recognizable value.
    ///
    /// Called in debug builds on nodes certified unreachable, right before
    /// they are reused or deallocated.
    ///
    fn poison(&self) {}

    /// Deallocate the node.
    ///
    /// # Safety
    /// - The pointer must have been allocated with `Box::new`
    /// - Must only be called once, when no worker can observe the node
    ///
    unsafe fn dealloc(ptr: *mut Self) {
        unsafe { drop(Box::from_raw(ptr)) };
    }
}

struct WorkerEpoch<N> {
    // Epoch observed when the current operation started, IDLE_EPOCH otherwise.
    //
    local_epoch: AtomicU64,

    // Nodes retired by this worker, oldest first.
    //
    free_list: UnsafeCell<VecDeque<NonNull<N>>>,
}

impl<N> WorkerEpoch<N> {
    fn new() -> Self {
        WorkerEpoch {
            local_epoch: AtomicU64::new(IDLE_EPOCH),
            free_list: UnsafeCell::new(VecDeque::new()),
        }
    }
}

/// Epoch based reclaimer with per-worker free lists.
///
/// Slots are addressed by index. The caller is responsible for handing each
/// slot to at most one thread at a time (see [`EpochReclaimer::pin`]).
///
pub struct EpochReclaimer<N: Reclaimable> {
    global_epoch: CachePadded<AtomicU64>,
    workers: Box<[CachePadded<WorkerEpoch<N>>]>,
    free_list_limit: usize,
    reused: AtomicUsize,
    freed: AtomicUsize,
}

// Safety: a free list is only touched through the EpochGuard of its slot,
// and slots are handed to one thread at a time by contract of `pin`.
unsafe impl<N: Reclaimable + Send> Send for EpochReclaimer<N> {}
unsafe impl<N: Reclaimable + Send> Sync for EpochReclaimer<N> {}

impl<N: Reclaimable> EpochReclaimer<N> {
    pub fn new(worker_count: usize, free_list_limit: usize) -> Self {
        EpochReclaimer {
            global_epoch: CachePadded::new(AtomicU64::new(0)),
            workers: (0..worker_count)
                .map(|_| CachePadded::new(WorkerEpoch::new()))
                .collect(),
            free_list_limit,
            reused: AtomicUsize::new(0),
            freed: AtomicUsize::new(0),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn current_epoch(&self) -> u64 {
        self.global_epoch.load(Ordering::SeqCst)
    }

    /// Local epoch of the given slot, `IDLE_EPOCH` when not pinned.
    pub fn local_epoch(&self, slot: usize) -> u64 {
        self.workers[slot].local_epoch.load(Ordering::SeqCst)
    }

    /// Number of nodes handed out again through [`EpochGuard::reuse`].
    pub fn reused_count(&self) -> usize {
        self.reused.load(Ordering::Relaxed)
    }

    /// Number of nodes deallocated while the reclaimer was in use.
    pub fn freed_count(&self) -> usize {
        self.freed.load(Ordering::Relaxed)
    }

    /// Number of nodes parked in all free lists.
    pub fn pending(&mut self) -> usize {
        self.workers
            .iter_mut()
            .map(|worker| worker.free_list.get_mut().len())
            .sum()
    }

    /// Starts an operation on `slot`.
    ///
    /// # Safety
    /// - `slot` must be owned by the calling thread for the lifetime of the guard
    /// - The slot must not already be pinned
    ///
    pub unsafe fn pin(&self, slot: usize) -> EpochGuard<'_, N> {
        let worker = &self.workers[slot];
        debug_assert_eq!(
            worker.local_epoch.load(Ordering::Relaxed),
            IDLE_EPOCH,
            "epoch slot {slot} pinned twice"
        );

        let epoch = self.global_epoch.fetch_add(1, Ordering::SeqCst);
        worker.local_epoch.store(epoch, Ordering::SeqCst);
        // Link loads of the operation must not move above the announcement.
        fence(Ordering::SeqCst);

        EpochGuard {
            reclaimer: self,
            slot,
            _unsync: PhantomData,
        }
    }

    // A node stamped with `retired_epoch` is unreachable for every worker
    // except `owner` when all of them are idle or started after the stamp.
    //
    fn is_reusable(&self, retired_epoch: u64, owner: usize) -> bool {
        // Pairs with the fence in `pin`: either the scan sees the pin, or the
        // pinned worker sees the unlink.
        fence(Ordering::SeqCst);
        self.workers
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != owner)
            .all(|(_, worker)| worker.local_epoch.load(Ordering::SeqCst) > retired_epoch)
    }

    /// Deallocates every parked node.
    ///
    pub fn recycle(&mut self) {
        let mut released = 0;
        for worker in self.workers.iter_mut() {
            for node in worker.free_list.get_mut().drain(..) {
                unsafe {
                    #[cfg(debug_assertions)]
                    node.as_ref().poison();
                    N::dealloc(node.as_ptr());
                }
                released += 1;
            }
        }

        debug!(
            "epoch reclaimer recycled {} nodes (reused {}, freed {}, epoch {})",
            released,
            self.reused_count(),
            self.freed_count(),
            self.current_epoch()
        );
    }
}

impl<N: Reclaimable> Drop for EpochReclaimer<N> {
    fn drop(&mut self) {
        self.recycle();
    }
}

/// Keeps a worker slot pinned at the epoch observed in [`EpochReclaimer::pin`].
///
/// Dropping the guard ends the operation (the slot becomes idle).
///
pub struct EpochGuard<'a, N: Reclaimable> {
    reclaimer: &'a EpochReclaimer<N>,
    slot: usize,
    _unsync: PhantomData<Cell<()>>,
}

impl<N: Reclaimable> EpochGuard<'_, N> {
    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn epoch(&self) -> u64 {
        self.reclaimer.local_epoch(self.slot)
    }

    fn with_free_list<R>(&self, f: impl FnOnce(&mut VecDeque<NonNull<N>>) -> R) -> R {
        // Safety: the slot belongs to this guard (contract of `pin`) and the
        // closure never re-enters the guard.
        let free_list = unsafe { &mut *self.reclaimer.workers[self.slot].free_list.get() };
        f(free_list)
    }

    /// Parks an unlinked node in this worker's free list.
    ///
    /// # Safety
    /// - `node` must no longer be reachable from the shared structure
    /// - `node` must not be retired twice
    ///
    pub unsafe fn retire(&self, node: NonNull<N>) {
        let stamp = self.reclaimer.global_epoch.load(Ordering::SeqCst);
        unsafe { node.as_ref().set_retired_epoch(stamp) };

        let over_limit = self.with_free_list(|free_list| {
            free_list.push_back(node);
            free_list.len() > self.reclaimer.free_list_limit
        });

        if over_limit {
            self.release_surplus();
        }
    }

    /// Takes the oldest parked node if no other worker can still observe it.
    ///
    pub fn reuse(&self) -> Option<NonNull<N>> {
        let node = self.with_free_list(|free_list| {
            let front = *free_list.front()?;
            let retired_epoch = unsafe { front.as_ref().retired_epoch() };
            if self.reclaimer.is_reusable(retired_epoch, self.slot) {
                free_list.pop_front()
            } else {
                None
            }
        })?;

        #[cfg(debug_assertions)]
        unsafe {
            node.as_ref().poison()
        };

        self.reclaimer.reused.fetch_add(1, Ordering::Relaxed);
        Some(node)
    }

    // Deallocates certified nodes from the front until the list is back
    // under the limit. Stops at the first node some worker may still see.
    //
    fn release_surplus(&self) {
        let limit = self.reclaimer.free_list_limit;
        let mut released = 0;

        loop {
            let node = self.with_free_list(|free_list| {
                if free_list.len() <= limit {
                    return None;
                }
                let front = *free_list.front()?;
                let retired_epoch = unsafe { front.as_ref().retired_epoch() };
                if self.reclaimer.is_reusable(retired_epoch, self.slot) {
                    free_list.pop_front()
                } else {
                    None
                }
            });

            let Some(node) = node else {
                break;
            };

            unsafe {
                #[cfg(debug_assertions)]
                node.as_ref().poison();
                N::dealloc(node.as_ptr());
            }
            released += 1;
        }

        if released > 0 {
            self.reclaimer.freed.fetch_add(released, Ordering::Relaxed);
        }
    }
}

impl<N: Reclaimable> Drop for EpochGuard<'_, N> {
    fn drop(&mut self) {
        self.reclaimer.workers[self.slot]
            .local_epoch
            .store(IDLE_EPOCH, Ordering::SeqCst);
    }
}
