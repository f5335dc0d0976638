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

use theta_sketch::theta::CompactThetaSketch;
use theta_sketch::theta::ThetaSketch;

#[test]
fn test_empty_sketch_round_trips() {
    let sketch = ThetaSketch::builder().lg_k(10).build();
    let bytes = sketch.serialize();
    let restored = ThetaSketch::deserialize(&bytes).unwrap();
    assert!(restored.is_empty());
    assert_eq!(restored.estimate(), 0.0);
}

#[test]
fn test_single_item_compact_round_trips() {
    let mut sketch = ThetaSketch::builder().build();
    sketch.update("only-item");
    let compact = sketch.compact(true);
    let bytes = compact.serialize();

    // Single-item sketches compress to the 8-byte preamble plus one hash.
    assert_eq!(bytes.len(), 8 + 8);

    let restored = CompactThetaSketch::deserialize(&bytes).unwrap();
    assert_eq!(restored.num_retained(), 1);
    assert_eq!(restored.estimate(), 1.0);
}

#[test]
fn test_exact_mode_compact_round_trips() {
    let mut sketch = ThetaSketch::builder().lg_k(12).build();
    for i in 0..2000u64 {
        sketch.update(i);
    }
    let compact = sketch.compact(true);
    let bytes = compact.serialize();
    let restored = CompactThetaSketch::deserialize(&bytes).unwrap();

    assert!(!restored.is_estimation_mode());
    assert_eq!(compact.num_retained(), restored.num_retained());
    assert_eq!(compact.estimate(), restored.estimate());

    let original_entries: Vec<u64> = compact.iter().collect();
    let restored_entries: Vec<u64> = restored.iter().collect();
    assert_eq!(original_entries, restored_entries);
}

#[test]
fn test_estimation_mode_compact_round_trips() {
    let mut sketch = ThetaSketch::builder().lg_k(10).build();
    for i in 0..50_000u64 {
        sketch.update(i);
    }
    let compact = sketch.compact(true);
    let bytes = compact.serialize();
    let restored = CompactThetaSketch::deserialize(&bytes).unwrap();

    assert!(restored.is_estimation_mode());
    assert_eq!(compact.theta64(), restored.theta64());
    assert_eq!(compact.estimate(), restored.estimate());
}

#[test]
fn test_deserialize_rejects_wrong_seed() {
    let mut sketch = ThetaSketch::builder().seed(42).build();
    sketch.update("value");
    let bytes = sketch.serialize();

    let result = ThetaSketch::deserialize_with_seed(&bytes, 99);
    assert!(result.is_err());
}

#[test]
fn test_deserialize_rejects_truncated_input() {
    let mut sketch = ThetaSketch::builder().lg_k(12).build();
    for i in 0..100u64 {
        sketch.update(i);
    }
    let mut bytes = sketch.serialize();
    bytes.truncate(bytes.len() - 4);

    assert!(ThetaSketch::deserialize(&bytes).is_err());
}

#[test]
fn test_unordered_compact_still_round_trips() {
    let mut sketch = ThetaSketch::builder().lg_k(12).build();
    for i in 0..256u64 {
        sketch.update(i);
    }
    let compact = sketch.compact(false);
    assert!(!compact.is_ordered());

    let bytes = compact.serialize();
    let restored = CompactThetaSketch::deserialize(&bytes).unwrap();
    assert_eq!(compact.estimate(), restored.estimate());
}
