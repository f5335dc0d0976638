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

use theta_sketch::theta::ThetaSketch;
use theta_sketch::theta::ThetaUnion;

fn sketch_with_range(lg_k: u8, start: u64, count: u64) -> ThetaSketch {
    let mut sketch = ThetaSketch::builder().lg_k(lg_k).build();
    for i in start..start + count {
        sketch.update(i);
    }
    sketch
}

#[test]
fn test_union_of_empties_is_empty() {
    let mut union = ThetaUnion::builder().lg_k(12).build();
    let a = ThetaSketch::builder().lg_k(12).build();
    let b = ThetaSketch::builder().lg_k(12).build();
    union.update(&a).unwrap();
    union.update(&b).unwrap();
    assert!(union.is_empty());
    assert_eq!(union.estimate(), 0.0);
}

#[test]
fn test_union_exact_mode_matches_sum_of_disjoint_sets() {
    let mut union = ThetaUnion::builder().lg_k(12).build();
    let a = sketch_with_range(12, 0, 2000);
    let b = sketch_with_range(12, 2000, 2000);
    union.update(&a).unwrap();
    union.update(&b).unwrap();
    let result = union.get_result(true);
    assert_eq!(result.estimate(), 4000.0);
    assert!(!result.is_estimation_mode());
    assert!(result.is_ordered());
}

#[test]
fn test_union_of_compact_ordered_matches_source_estimate() {
    let mut union = ThetaUnion::builder().lg_k(12).build();
    let sketch = sketch_with_range(12, 0, 500);
    let compact = sketch.compact(true);
    union.update(&compact).unwrap();
    assert_eq!(union.estimate(), sketch.estimate());
}

#[test]
fn test_union_estimation_mode_overlapping_sets() {
    let mut union = ThetaUnion::builder().lg_k(12).build();
    let a = sketch_with_range(12, 0, 10_000);
    let b = sketch_with_range(12, 5_000, 10_000);
    union.update(&a).unwrap();
    union.update(&b).unwrap();
    let result = union.get_result(true);
    assert!(result.is_estimation_mode());
    assert!((result.estimate() - 15_000.0).abs() <= 15_000.0 * 0.05);
}

#[test]
fn test_rejects_mismatched_seed_hash() {
    let mut union = ThetaUnion::builder().lg_k(12).seed(1).build();
    let other = sketch_with_range(12, 0, 10);
    assert!(union.update(&other).is_err());
}

#[test]
fn test_update_serialized_matches_update() {
    let mut union_a = ThetaUnion::builder().lg_k(12).build();
    let mut union_b = ThetaUnion::builder().lg_k(12).build();
    let sketch = sketch_with_range(12, 0, 500);

    union_a.update(&sketch).unwrap();
    union_b.update_serialized(&sketch.compact(true).serialize()).unwrap();

    assert_eq!(union_a.estimate(), union_b.estimate());
}

#[test]
fn test_serialize_deserialize_round_trip() {
    let mut union = ThetaUnion::builder().lg_k(12).build();
    let a = sketch_with_range(12, 0, 2000);
    let b = sketch_with_range(12, 2000, 2000);
    union.update(&a).unwrap();
    union.update(&b).unwrap();

    let bytes = union.serialize();
    let restored = ThetaUnion::deserialize(&bytes).unwrap();
    assert_eq!(union.estimate(), restored.estimate());
    assert_eq!(union.is_empty(), restored.is_empty());
}

#[test]
fn test_reset_returns_union_to_empty() {
    let mut union = ThetaUnion::builder().lg_k(12).build();
    let a = sketch_with_range(12, 0, 1000);
    union.update(&a).unwrap();
    assert!(!union.is_empty());

    union.reset();
    assert!(union.is_empty());
    assert_eq!(union.estimate(), 0.0);
}
