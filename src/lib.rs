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

//! Theta sketches: mergeable, fixed-size summaries for cardinality estimation.
//!
//! A theta sketch hashes every incoming item to a 64-bit value and retains
//! only the smallest unique hashes under a threshold θ. The k-th smallest
//! retained hash and the retained count together give an unbiased
//! cardinality estimate with relative standard error ≈ 1/√(k−1).
//!
//! - [`theta::ThetaSketch`] — mutable QuickSelect update sketch.
//! - [`theta::CompactThetaSketch`] — immutable, serializable summary.
//! - [`theta::ThetaUnion`], [`theta::ThetaIntersection`], [`theta::theta_a_not_b`]
//!   — set operations over sketch summaries.
//! - [`theta::ConcurrentThetaSketch`] — a shared sketch fed by per-thread
//!   local buffers for lock-free, eventually-consistent reads.

pub mod codec;
pub mod common;
pub mod error;
pub mod hash;
pub mod theta;
