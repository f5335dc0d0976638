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

//! Theta sketch implementation for cardinality estimation.
//!
//! A Theta sketch hashes every incoming item and retains only the smallest
//! unique hashes under a threshold theta; the retained count together with
//! theta gives an unbiased cardinality estimate. The implementation here
//! supports:
//!
//! - [`ThetaSketch`] — mutable QuickSelect update sketch.
//! - [`CompactThetaSketch`] — immutable, serializable summary, the form used
//!   for transport and as a set-operation operand.
//! - [`ThetaUnion`], [`ThetaIntersection`], [`theta_a_not_b`] — set
//!   operations over sketch summaries, generic over [`ThetaSketchView`] so
//!   they accept either sketch shape as an operand.
//! - [`ConcurrentThetaSketch`] — a shared sketch fed by many per-thread
//!   [`ConcurrentThetaBuffer`]s, for lock-free, eventually-consistent reads
//!   under concurrent writers.

mod anotb;
mod compact;
mod concurrent;
mod hash_table;
mod intersection;
mod serialization;
mod sketch;
mod union;
mod view;

pub use self::anotb::theta_a_not_b;
pub use self::anotb::theta_a_not_b_with_ordered;
pub use self::compact::CompactThetaSketch;
pub use self::concurrent::ConcurrentThetaBuffer;
pub use self::concurrent::ConcurrentThetaSketch;
pub use self::concurrent::ConcurrentThetaSketchBuilder;
pub use self::intersection::ThetaIntersection;
pub use self::sketch::ThetaSketch;
pub use self::sketch::ThetaSketchBuilder;
pub use self::union::ThetaUnion;
pub use self::union::ThetaUnionBuilder;
pub use self::view::ThetaSketchView;
