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

//! Canonicalization of floating point inputs before hashing.
//!
//! Two bit-distinct doubles that compare equal under IEEE 754 (`-0.0` and
//! `0.0`) or are both NaN must hash identically, or duplicate floating
//! point items would silently inflate the cardinality estimate.

/// Collapses `-0.0` to `0.0` and normalizes every NaN bit pattern to one
/// canonical NaN, leaving every other value untouched.
pub fn canonical_double(value: f64) -> f64 {
    if value == 0.0 {
        0.0
    } else if value.is_nan() {
        f64::NAN
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_zero_collapses_to_positive_zero() {
        assert_eq!(canonical_double(-0.0).to_bits(), 0.0f64.to_bits());
    }

    #[test]
    fn nan_bit_patterns_normalize() {
        let a = canonical_double(f64::NAN);
        let b = canonical_double(f64::from_bits(0x7ff8_0000_0000_0001));
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn ordinary_values_are_unchanged() {
        assert_eq!(canonical_double(1.5), 1.5);
        assert_eq!(canonical_double(-1.5), -1.5);
    }
}
