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

//! Utilities shared across sketch families: resize policy, canonicalization
//! of floating point inputs, and confidence bounds on the estimate.

pub mod binomial_bounds;
mod canonical;
mod resize_factor;

pub use canonical::canonical_double;
pub use resize_factor::ResizeFactor;

/// Number of standard deviations used for an error bound.
///
/// Only 1, 2, and 3 are supported, matching the relative-error tables the
/// DataSketches family publishes for theta sketches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NumStdDev {
    /// ~68% confidence interval.
    One,
    /// ~95% confidence interval.
    Two,
    /// ~99.7% confidence interval.
    Three,
}

impl NumStdDev {
    pub(crate) fn as_f64(self) -> f64 {
        match self {
            NumStdDev::One => 1.0,
            NumStdDev::Two => 2.0,
            NumStdDev::Three => 3.0,
        }
    }
}
