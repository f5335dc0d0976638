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

//! Common read-only view shared by every sketch shape that can act as a set
//! operation operand.

/// A read-only view over a Theta sketch's retained hashes.
///
/// [`ThetaSketch`](super::ThetaSketch) and [`CompactThetaSketch`](super::CompactThetaSketch)
/// both implement this so that [`ThetaUnion`](super::ThetaUnion),
/// [`ThetaIntersection`](super::ThetaIntersection), and
/// [`theta_a_not_b`](super::theta_a_not_b) can accept either as an operand.
///
/// Set operations only ever need this boundary view, never the concrete
/// type, so they stay generic over it instead of dispatching dynamically in
/// the hot per-hash path; the one place a trait object is convenient (the
/// `iter` method here) is confined to this boundary.
pub trait ThetaSketchView {
    /// Whether the source set is logically empty.
    ///
    /// Can be `false` even when [`num_retained`](Self::num_retained) is 0
    /// (e.g. a sampling sketch every one of whose updates was screened out
    /// by `p`).
    fn is_empty(&self) -> bool;

    /// Theta encoded as a 64-bit fraction of `2^63 - 1`.
    fn theta64(&self) -> u64;

    /// 16-bit hash of the seed this sketch's hashes were computed with.
    fn seed_hash(&self) -> u16;

    /// Number of distinct hashes currently retained.
    fn num_retained(&self) -> usize;

    /// Whether [`iter`](Self::iter) yields hashes in strictly ascending order.
    fn is_ordered(&self) -> bool;

    /// Iterate the retained hashes.
    fn iter(&self) -> Box<dyn Iterator<Item = u64> + '_>;
}
