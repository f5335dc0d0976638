// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! A shared Theta sketch fed by many per-thread local buffers.
//!
//! [`ConcurrentThetaSketch`] is the "gadget": one update sketch that many
//! writer threads feed indirectly through their own [`ConcurrentThetaBuffer`].
//! A local buffer is small (`local_lg_k << shared_lg_k`) and absorbs updates
//! with no synchronization at all; it only touches the shared gadget when it
//! fills up (or is explicitly [`sync`](ConcurrentThetaBuffer::sync)ed),
//! propagating its retained hashes under a single-propagator latch.
//! Readers call [`get_estimation_snapshot`](ConcurrentThetaSketch::get_estimation_snapshot)
//! and never block on the latch: they load an atomically published estimate
//! that reflects every propagation completed before the call.

use std::hash::Hash;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use crate::common::NumStdDev;
use crate::common::ResizeFactor;
use crate::common::binomial_bounds;
use crate::hash::DEFAULT_UPDATE_SEED;
use crate::hash::compute_seed_hash;
use crate::theta::CompactThetaSketch;
use crate::theta::hash_table::MAX_LG_K;
use crate::theta::hash_table::MAX_THETA;
use crate::theta::hash_table::MIN_LG_K;
use crate::theta::hash_table::ThetaHashTable;

/// Default log2 nominal size of the shared gadget (`k_s = 2^12`).
const DEFAULT_SHARED_LG_K: u8 = 12;

/// Default log2 nominal size of each thread-local buffer (`k_l = 2^4`).
const DEFAULT_LOCAL_LG_K: u8 = 4;

/// The shared, concurrently-readable Theta sketch.
///
/// Writers never touch this directly; they go through a
/// [`ConcurrentThetaBuffer`] obtained from [`local_buffer`](Self::local_buffer).
/// The only state mutated under contention is guarded by a single-propagator
/// latch (`propagation_in_progress`); everything a reader needs
/// ([`get_estimation_snapshot`](Self::get_estimation_snapshot),
/// [`is_empty`](Self::is_empty), the error bounds) is republished to plain
/// atomics after every propagation, so reads never contend with the latch.
#[derive(Debug)]
pub struct ConcurrentThetaSketch {
    table: Mutex<ThetaHashTable>,
    propagation_in_progress: AtomicBool,
    // Bit pattern of the most recently published `f64` cardinality estimate.
    snapshot_bits: AtomicU64,
    // Theta and retained count as of the most recently completed
    // propagation; local buffers and readers consult these without locking.
    observed_theta: AtomicU64,
    observed_count: AtomicU64,
    observed_is_empty: AtomicBool,
    lg_nom_size: u8,
    local_lg_k: u8,
    cache_limit: usize,
    propagate_ordered_compact: bool,
    seed: u64,
}

impl ConcurrentThetaSketch {
    /// Creates a new builder for `ConcurrentThetaSketch`.
    pub fn builder() -> ConcurrentThetaSketchBuilder {
        ConcurrentThetaSketchBuilder::default()
    }

    /// Creates a new per-thread local buffer feeding this shared sketch.
    ///
    /// # Examples
    ///
    /// ```
    /// # use theta_sketch::theta::ConcurrentThetaSketch;
    /// let shared = ConcurrentThetaSketch::builder().shared_lg_k(10).build();
    /// let mut buffer = shared.local_buffer();
    /// buffer.update("apple");
    /// buffer.sync();
    /// assert!(shared.get_estimation_snapshot() >= 1.0);
    /// ```
    pub fn local_buffer(self: &Arc<Self>) -> ConcurrentThetaBuffer {
        let local = ThetaHashTable::new(self.local_lg_k, ResizeFactor::X1, 1.0, self.seed);
        ConcurrentThetaBuffer {
            shared: Arc::clone(self),
            local,
            theta_ceiling: self.observed_theta.load(Ordering::Acquire),
        }
    }

    /// The most recently published cardinality estimate.
    ///
    /// Lock-free: reflects every propagation that completed before this
    /// call, with no ordering guarantee relative to propagations still in
    /// flight.
    pub fn get_estimation_snapshot(&self) -> f64 {
        f64::from_bits(self.snapshot_bits.load(Ordering::Acquire))
    }

    /// Whether the shared sketch has absorbed any non-empty source.
    pub fn is_empty(&self) -> bool {
        self.observed_is_empty.load(Ordering::Acquire)
    }

    /// Log2 of the shared gadget's nominal size.
    pub fn lg_k(&self) -> u8 {
        self.lg_nom_size
    }

    /// 16-bit hash of this sketch's configured seed.
    pub fn seed_hash(&self) -> u16 {
        compute_seed_hash(self.seed)
    }

    /// Approximate lower error bound on [`get_estimation_snapshot`](Self::get_estimation_snapshot),
    /// computed from the most recently published snapshot without locking.
    pub fn lower_bound(&self, num_std_dev: NumStdDev) -> f64 {
        let count = self.observed_count.load(Ordering::Acquire);
        let theta = self.observed_theta.load(Ordering::Acquire);
        if theta >= MAX_THETA {
            return count as f64;
        }
        binomial_bounds::lower_bound(count, theta as f64 / MAX_THETA as f64, num_std_dev)
            .expect("theta should always be valid")
    }

    /// Approximate upper error bound on [`get_estimation_snapshot`](Self::get_estimation_snapshot).
    pub fn upper_bound(&self, num_std_dev: NumStdDev) -> f64 {
        let count = self.observed_count.load(Ordering::Acquire);
        let theta = self.observed_theta.load(Ordering::Acquire);
        let is_empty = self.observed_is_empty.load(Ordering::Acquire);
        if theta >= MAX_THETA {
            return count as f64;
        }
        binomial_bounds::upper_bound(count, theta as f64 / MAX_THETA as f64, num_std_dev, is_empty)
            .expect("theta should always be valid")
    }

    /// Snapshots the shared gadget as an immutable [`CompactThetaSketch`].
    ///
    /// Spin-waits for any in-flight propagation to finish first (the
    /// "final drain" from the termination contract), so the result reflects
    /// every update any local buffer has propagated by the time this
    /// returns.
    ///
    /// # Examples
    ///
    /// ```
    /// # use theta_sketch::theta::ConcurrentThetaSketch;
    /// let shared = ConcurrentThetaSketch::builder().shared_lg_k(10).build();
    /// let mut buffer = shared.local_buffer();
    /// buffer.update("apple");
    /// buffer.sync();
    /// let compact = shared.compact(true);
    /// assert_eq!(compact.estimate(), 1.0);
    /// ```
    pub fn compact(&self, ordered: bool) -> CompactThetaSketch {
        self.spin_until_drained();
        let table = self.lock_table();
        let k = 1u64 << table.lg_nom_size();
        let mut entries: Vec<u64> = table.iter().collect();
        let mut theta = table.theta();
        if entries.len() as u64 > k {
            let (_, &mut kth, _) = entries.select_nth_unstable(k as usize);
            theta = kth;
            entries.retain(|&h| h < theta);
        }
        if ordered {
            entries.sort_unstable();
        }
        let is_empty = table.is_empty();
        let seed_hash = table.seed_hash();
        drop(table);
        CompactThetaSketch::from_parts(entries, theta, seed_hash, ordered, is_empty)
    }

    fn lock_table(&self) -> std::sync::MutexGuard<'_, ThetaHashTable> {
        self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn spin_until_drained(&self) {
        while self.propagation_in_progress.load(Ordering::Acquire) {
            std::hint::spin_loop();
            std::thread::yield_now();
        }
    }

    /// Acquires the single-propagator latch, spin-yielding if another
    /// propagation is already in flight. Released unconditionally when the
    /// returned guard is dropped, including on an unwinding panic.
    fn acquire_latch(&self) -> LatchGuard<'_> {
        loop {
            if self
                .propagation_in_progress
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return LatchGuard {
                    flag: &self.propagation_in_progress,
                };
            }
            std::hint::spin_loop();
            std::thread::yield_now();
        }
    }

    /// Merges a local buffer's retained hashes into the gadget under the
    /// latch, then republishes the snapshot atomics.
    ///
    /// `hashes` is already screened to the local buffer's own theta; this
    /// re-screens against the shared gadget's current theta (which may have
    /// tightened since the local buffer last observed it) before inserting.
    fn propagate(&self, hashes: impl Iterator<Item = u64>, source_is_empty: bool) {
        let _guard = self.acquire_latch();
        let (cur_count, theta, is_empty) = {
            let mut table = self.lock_table();
            if !source_is_empty {
                table.set_empty(false);
            }
            for hash in hashes {
                if hash < table.theta() {
                    table.try_insert_hash(hash);
                }
            }
            (table.num_retained() as u64, table.theta(), table.is_empty())
        };
        self.publish_snapshot(cur_count, theta, is_empty);
    }

    fn publish_snapshot(&self, cur_count: u64, theta: u64, is_empty: bool) {
        let estimate = if is_empty {
            0.0
        } else if theta >= MAX_THETA {
            cur_count as f64
        } else {
            cur_count as f64 / (theta as f64 / MAX_THETA as f64)
        };
        self.snapshot_bits.store(estimate.to_bits(), Ordering::Release);
        self.observed_theta.store(theta, Ordering::Release);
        self.observed_count.store(cur_count, Ordering::Release);
        self.observed_is_empty.store(is_empty, Ordering::Release);
    }
}

/// Releases the single-propagator latch on drop, on every exit path.
struct LatchGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for LatchGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// A thread-local buffer feeding a [`ConcurrentThetaSketch`].
///
/// Updates never touch shared state: they land in a small, thread-owned
/// update sketch. Once that buffer's retained count reaches the configured
/// cache limit, or [`sync`](Self::sync) is called explicitly, its hashes are
/// propagated into the shared gadget and the buffer is reset to empty.
/// Dropping a buffer flushes any remaining retained hashes first, so a
/// writer thread that exits without calling `sync` doesn't lose updates.
#[derive(Debug)]
pub struct ConcurrentThetaBuffer {
    shared: Arc<ConcurrentThetaSketch>,
    local: ThetaHashTable,
    // Cached copy of the shared gadget's theta as of the last propagation;
    // lets `update` elide hashes that are already doomed before they ever
    // touch the local table.
    theta_ceiling: u64,
}

impl ConcurrentThetaBuffer {
    /// Update the local buffer with a hashable value.
    ///
    /// # Examples
    ///
    /// ```
    /// # use theta_sketch::theta::ConcurrentThetaSketch;
    /// let shared = ConcurrentThetaSketch::builder().build();
    /// let mut buffer = shared.local_buffer();
    /// buffer.update("apple");
    /// ```
    pub fn update<T: Hash>(&mut self, value: T) {
        let hash = self.local.hash(value);
        self.update_hash(hash);
    }

    fn update_hash(&mut self, hash: u64) {
        if hash == 0 || hash >= self.theta_ceiling {
            return;
        }
        self.local.try_insert_hash(hash);
        if self.local.num_retained() >= self.shared.cache_limit {
            self.propagate();
        }
    }

    /// Cardinality estimate of this buffer's own retained hashes, ignoring
    /// anything already propagated to the shared gadget.
    pub fn local_estimate(&self) -> f64 {
        if self.local.is_empty() {
            return 0.0;
        }
        let theta = self.local.theta() as f64 / MAX_THETA as f64;
        self.local.num_retained() as f64 / theta
    }

    /// Forces propagation of the buffer's retained hashes into the shared
    /// gadget now, rather than waiting for the cache limit.
    ///
    /// # Examples
    ///
    /// ```
    /// # use theta_sketch::theta::ConcurrentThetaSketch;
    /// let shared = ConcurrentThetaSketch::builder().build();
    /// let mut buffer = shared.local_buffer();
    /// buffer.update("apple");
    /// buffer.sync();
    /// assert_eq!(shared.get_estimation_snapshot(), 1.0);
    /// ```
    pub fn sync(&mut self) {
        self.propagate();
    }

    fn propagate(&mut self) {
        if self.local.num_retained() == 0 {
            return;
        }
        let is_empty = self.local.is_empty();
        let mut hashes: Vec<u64> = self.local.iter().collect();
        if self.shared.propagate_ordered_compact {
            hashes.sort_unstable();
        }
        self.shared.propagate(hashes.into_iter(), is_empty);
        self.local.reset();
        self.theta_ceiling = self.shared.observed_theta.load(Ordering::Acquire);
    }
}

impl Drop for ConcurrentThetaBuffer {
    fn drop(&mut self) {
        self.propagate();
    }
}

/// Builder for [`ConcurrentThetaSketch`].
#[derive(Debug)]
pub struct ConcurrentThetaSketchBuilder {
    shared_lg_k: u8,
    local_lg_k: u8,
    cache_limit: Option<usize>,
    resize_factor: ResizeFactor,
    propagate_ordered_compact: bool,
    seed: u64,
}

impl Default for ConcurrentThetaSketchBuilder {
    fn default() -> Self {
        Self {
            shared_lg_k: DEFAULT_SHARED_LG_K,
            local_lg_k: DEFAULT_LOCAL_LG_K,
            cache_limit: None,
            resize_factor: ResizeFactor::X8,
            propagate_ordered_compact: false,
            seed: DEFAULT_UPDATE_SEED,
        }
    }
}

impl ConcurrentThetaSketchBuilder {
    /// Set lg_k (log2 nominal size) of the shared gadget sketch.
    ///
    /// # Panics
    ///
    /// If `lg_k` is not in range `[5, 26]`.
    pub fn shared_lg_k(mut self, lg_k: u8) -> Self {
        assert!(
            (MIN_LG_K..=MAX_LG_K).contains(&lg_k),
            "shared_lg_k must be in [{MIN_LG_K}, {MAX_LG_K}], got {lg_k}"
        );
        self.shared_lg_k = lg_k;
        self
    }

    /// Set lg_k (log2 nominal size) of each thread-local buffer.
    ///
    /// Should be much smaller than `shared_lg_k`; defaults to `4` (`k_l =
    /// 16`), matching the reference concurrent sketch's default.
    ///
    /// # Panics
    ///
    /// If `lg_k` is `0` or greater than [`MAX_LG_K`].
    pub fn local_lg_k(mut self, lg_k: u8) -> Self {
        assert!(
            (1..=MAX_LG_K).contains(&lg_k),
            "local_lg_k must be in [1, {MAX_LG_K}], got {lg_k}"
        );
        self.local_lg_k = lg_k;
        self
    }

    /// Override the number of retained local hashes that triggers
    /// propagation. Defaults to `2^local_lg_k`.
    pub fn cache_limit(mut self, limit: usize) -> Self {
        self.cache_limit = Some(limit);
        self
    }

    /// Set the resize factor of the shared gadget sketch.
    pub fn resize_factor(mut self, factor: ResizeFactor) -> Self {
        self.resize_factor = factor;
        self
    }

    /// Propagate local buffers as an ordered (sorted) batch rather than in
    /// arbitrary hash-table iteration order.
    ///
    /// An ordered merge into the shared table exhibits better cache
    /// locality; the resulting sketch is identical either way.
    pub fn propagate_ordered_compact(mut self, enabled: bool) -> Self {
        self.propagate_ordered_compact = enabled;
        self
    }

    /// Set the hash seed shared by the gadget and every local buffer it
    /// creates.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Build the shared sketch, wrapped in an [`Arc`] for sharing across
    /// threads.
    pub fn build(self) -> Arc<ConcurrentThetaSketch> {
        let table = ThetaHashTable::new(self.shared_lg_k, self.resize_factor, 1.0, self.seed);
        let cache_limit = self.cache_limit.unwrap_or(1usize << self.local_lg_k);
        Arc::new(ConcurrentThetaSketch {
            table: Mutex::new(table),
            propagation_in_progress: AtomicBool::new(false),
            snapshot_bits: AtomicU64::new(0.0f64.to_bits()),
            observed_theta: AtomicU64::new(MAX_THETA),
            observed_count: AtomicU64::new(0),
            observed_is_empty: AtomicBool::new(true),
            lg_nom_size: self.shared_lg_k,
            local_lg_k: self.local_lg_k,
            cache_limit,
            propagate_ordered_compact: self.propagate_ordered_compact,
            seed: self.seed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_buffer_exact_mode() {
        let shared = ConcurrentThetaSketch::builder().shared_lg_k(12).build();
        let mut buffer = shared.local_buffer();
        for i in 0..500 {
            buffer.update(i);
        }
        buffer.sync();
        assert_eq!(shared.get_estimation_snapshot(), 500.0);
        assert!(!shared.is_empty());
    }

    #[test]
    fn auto_flush_on_drop() {
        let shared = ConcurrentThetaSketch::builder().shared_lg_k(12).build();
        {
            let mut buffer = shared.local_buffer();
            for i in 0..10 {
                buffer.update(i);
            }
            // buffer drops here without an explicit sync()
        }
        assert_eq!(shared.get_estimation_snapshot(), 10.0);
    }

    #[test]
    fn cache_limit_triggers_automatic_propagation() {
        let shared = ConcurrentThetaSketch::builder()
            .shared_lg_k(12)
            .local_lg_k(4)
            .build();
        let mut buffer = shared.local_buffer();
        // Cache limit defaults to 2^4 = 16; insert enough to force at least
        // one automatic propagation before the buffer is dropped.
        for i in 0..40 {
            buffer.update(i);
        }
        assert!(shared.get_estimation_snapshot() > 0.0);
        buffer.sync();
        assert_eq!(shared.get_estimation_snapshot(), 40.0);
    }

    #[test]
    fn duplicate_updates_across_buffers_are_not_double_counted() {
        let shared = ConcurrentThetaSketch::builder().shared_lg_k(12).build();
        let mut a = shared.local_buffer();
        let mut b = shared.local_buffer();
        for i in 0..200 {
            a.update(i);
            b.update(i);
        }
        a.sync();
        b.sync();
        assert_eq!(shared.get_estimation_snapshot(), 200.0);
    }

    #[test]
    fn compact_snapshot_matches_published_estimate() {
        let shared = ConcurrentThetaSketch::builder().shared_lg_k(12).build();
        let mut buffer = shared.local_buffer();
        for i in 0..300 {
            buffer.update(i);
        }
        buffer.sync();
        let compact = shared.compact(true);
        assert_eq!(compact.estimate(), shared.get_estimation_snapshot());
        assert!(compact.is_ordered());
    }

    #[test]
    fn bounds_bracket_the_estimate_in_estimation_mode() {
        let shared = ConcurrentThetaSketch::builder().shared_lg_k(10).build();
        let mut buffer = shared.local_buffer();
        for i in 0..20_000u64 {
            buffer.update(i);
        }
        buffer.sync();
        let estimate = shared.get_estimation_snapshot();
        let lower = shared.lower_bound(NumStdDev::Two);
        let upper = shared.upper_bound(NumStdDev::Two);
        assert!(lower <= estimate);
        assert!(estimate <= upper);
    }

    #[test]
    fn ordered_propagation_matches_unordered() {
        let ordered = ConcurrentThetaSketch::builder()
            .shared_lg_k(12)
            .propagate_ordered_compact(true)
            .build();
        let unordered = ConcurrentThetaSketch::builder().shared_lg_k(12).build();

        for i in 0..800u64 {
            ordered.local_buffer().update(i);
            unordered.local_buffer().update(i);
        }
        assert_eq!(
            ordered.compact(true).estimate(),
            unordered.compact(true).estimate()
        );
    }

    #[test]
    #[should_panic(expected = "shared_lg_k")]
    fn rejects_out_of_range_shared_lg_k() {
        ConcurrentThetaSketch::builder().shared_lg_k(200).build();
    }

    #[test]
    fn concurrent_writers_disjoint_ranges_estimate_within_tolerance() {
        let shared = ConcurrentThetaSketch::builder().shared_lg_k(12).build();
        let total: u64 = 100_000;
        let num_writers: u64 = 4;
        let per_writer = total / num_writers;

        let writers: Vec<_> = (0..num_writers)
            .map(|w| {
                let shared = Arc::clone(&shared);
                std::thread::spawn(move || {
                    let mut buffer = shared.local_buffer();
                    for i in 0..per_writer {
                        buffer.update(w * per_writer + i);
                    }
                })
            })
            .collect();

        let reader_shared = Arc::clone(&shared);
        let reader = std::thread::spawn(move || {
            for _ in 0..2000 {
                let snapshot = reader_shared.get_estimation_snapshot();
                assert!(snapshot >= 0.0);
            }
        });

        for writer in writers {
            writer.join().unwrap();
        }
        reader.join().unwrap();

        let estimate = shared.compact(true).estimate();
        let k = 1u64 << 12;
        let tolerance = 3.0 / ((k - 1) as f64).sqrt();
        let rel_err = (estimate - total as f64).abs() / total as f64;
        assert!(
            rel_err <= tolerance,
            "estimate {estimate} vs {total} (rel_err {rel_err} > tolerance {tolerance})"
        );
    }
}
