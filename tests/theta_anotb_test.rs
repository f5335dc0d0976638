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
use theta_sketch::theta::theta_a_not_b;
use theta_sketch::theta::theta_a_not_b_with_ordered;

fn sketch_with_range(lg_k: u8, start: u64, count: u64) -> ThetaSketch {
    let mut sketch = ThetaSketch::builder().lg_k(lg_k).build();
    for i in start..start + count {
        sketch.update(i);
    }
    sketch
}

#[test]
fn test_no_overlap_keeps_all_of_a() {
    let a = sketch_with_range(9, 0, 256);
    let b = sketch_with_range(9, 256, 256);
    let result = theta_a_not_b(&a, &b).unwrap();
    assert_eq!(result.estimate(), 256.0);
    assert!(!result.is_empty());
}

#[test]
fn test_full_overlap_yields_empty_result() {
    let a = sketch_with_range(9, 0, 256);
    let b = sketch_with_range(9, 0, 256);
    let result = theta_a_not_b(&a, &b).unwrap();
    assert_eq!(result.num_retained(), 0);
}

#[test]
fn test_iterated_a_not_b_not_c() {
    let a = sketch_with_range(10, 0, 1024);
    let b = sketch_with_range(10, 0, 512);
    let c = sketch_with_range(10, 512, 256);

    let r1 = theta_a_not_b(&a, &b).unwrap();
    let r2 = theta_a_not_b(&r1, &c).unwrap();
    assert_eq!(r2.estimate(), 256.0);
}

#[test]
fn test_empty_a_yields_empty_result() {
    let a = ThetaSketch::builder().lg_k(9).build();
    let b = sketch_with_range(9, 0, 10);
    let result = theta_a_not_b(&a, &b).unwrap();
    assert!(result.is_empty());
}

#[test]
fn test_a_not_b_with_empty_b_preserves_a() {
    let a = sketch_with_range(9, 0, 100);
    let b = ThetaSketch::builder().lg_k(9).build();
    let result = theta_a_not_b(&a, &b).unwrap();
    assert_eq!(result.estimate(), a.estimate());
}

#[test]
fn test_unordered_result_reports_not_ordered() {
    let a = sketch_with_range(9, 0, 200);
    let b = sketch_with_range(9, 100, 50);
    let result = theta_a_not_b_with_ordered(&a, &b, false).unwrap();
    assert!(!result.is_ordered());
}

#[test]
fn test_compact_operands_use_merge_join_and_match_update_operands() {
    let a = sketch_with_range(10, 0, 2000);
    let b = sketch_with_range(10, 1000, 2000);

    let from_update_sketches = theta_a_not_b(&a, &b).unwrap();
    let from_compact = theta_a_not_b(&a.compact(true), &b.compact(true)).unwrap();

    assert_eq!(from_update_sketches.estimate(), from_compact.estimate());
}

#[test]
fn test_rejects_mismatched_seed_hash() {
    let mut a = ThetaSketch::builder().seed(1).lg_k(9).build();
    a.update("a");
    let mut b = ThetaSketch::builder().seed(2).lg_k(9).build();
    b.update("x");
    assert!(theta_a_not_b(&a, &b).is_err());
}
