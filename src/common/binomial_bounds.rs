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

//! Approximate confidence bounds on a theta sketch's cardinality estimate.
//!
//! The retained count is modeled as a Binomial(N, theta) draw, so its
//! variance is `N * theta * (1 - theta)`; propagating that through
//! `estimate = retained / theta` gives the standard error used below. This
//! is the same normal approximation the wider DataSketches family uses for
//! theta sketches (as opposed to HLL, which needs a dedicated table).

use crate::common::NumStdDev;
use crate::error::Error;

/// Approximate lower bound on the cardinality estimate at `num_std_dev`
/// confidence.
///
/// `theta` is expected in `(0.0, 1.0]`; sketches built through
/// [`ThetaSketchBuilder`](crate::theta::ThetaSketchBuilder) always satisfy
/// this, so the `Err` path is unreachable from public API misuse and exists
/// to keep the signature honest about what would otherwise be a domain
/// error.
pub fn lower_bound(num_retained: u64, theta: f64, num_std_dev: NumStdDev) -> Result<f64, Error> {
    if !(theta > 0.0 && theta <= 1.0) {
        return Err(Error::invalid_argument(format!(
            "theta must be in (0.0, 1.0], got {theta}"
        )));
    }
    let estimate = num_retained as f64 / theta;
    let std_dev = standard_deviation(num_retained, theta);
    let bound = estimate - num_std_dev.as_f64() * std_dev;
    Ok(bound.max(num_retained as f64).max(0.0))
}

/// Approximate upper bound on the cardinality estimate at `num_std_dev`
/// confidence.
///
/// `is_empty` short-circuits to `0.0`: an empty sketch's upper bound is not
/// "no estimate", it is a certain zero.
pub fn upper_bound(
    num_retained: u64,
    theta: f64,
    num_std_dev: NumStdDev,
    is_empty: bool,
) -> Result<f64, Error> {
    if is_empty {
        return Ok(0.0);
    }
    if !(theta > 0.0 && theta <= 1.0) {
        return Err(Error::invalid_argument(format!(
            "theta must be in (0.0, 1.0], got {theta}"
        )));
    }
    let estimate = num_retained as f64 / theta;
    let std_dev = standard_deviation(num_retained, theta);
    Ok(estimate + num_std_dev.as_f64() * std_dev)
}

fn standard_deviation(num_retained: u64, theta: f64) -> f64 {
    let variance = num_retained as f64 * (1.0 - theta) / (theta * theta);
    variance.max(0.0).sqrt()
}
