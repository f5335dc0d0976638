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

use std::sync::Arc;
use std::thread;

use theta_sketch::theta::ConcurrentThetaSketch;

#[test]
fn test_single_buffer_exact_mode() {
    let shared = ConcurrentThetaSketch::builder().shared_lg_k(12).build();
    let mut buffer = shared.local_buffer();
    for i in 0..500u64 {
        buffer.update(i);
    }
    buffer.sync();
    assert_eq!(shared.get_estimation_snapshot(), 500.0);
}

#[test]
fn test_buffer_auto_flushes_on_drop() {
    let shared = ConcurrentThetaSketch::builder().shared_lg_k(12).build();
    {
        let mut buffer = shared.local_buffer();
        for i in 0..10u64 {
            buffer.update(i);
        }
    }
    assert_eq!(shared.get_estimation_snapshot(), 10.0);
}

#[test]
fn test_four_writers_hundred_thousand_items_concurrent_correctness() {
    let shared = ConcurrentThetaSketch::builder().shared_lg_k(12).build();
    let total: u64 = 100_000;
    let num_writers: u64 = 4;
    let per_writer = total / num_writers;

    let writers: Vec<_> = (0..num_writers)
        .map(|w| {
            let shared = Arc::clone(&shared);
            thread::spawn(move || {
                let mut buffer = shared.local_buffer();
                for i in 0..per_writer {
                    buffer.update(w * per_writer + i);
                }
            })
        })
        .collect();

    let reader_shared = Arc::clone(&shared);
    let reader = thread::spawn(move || {
        for _ in 0..5000 {
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

#[test]
fn test_compact_snapshot_is_consistent_with_published_estimate() {
    let shared = ConcurrentThetaSketch::builder().shared_lg_k(12).build();
    let mut buffer = shared.local_buffer();
    for i in 0..300u64 {
        buffer.update(i);
    }
    buffer.sync();

    let compact = shared.compact(true);
    assert_eq!(compact.estimate(), shared.get_estimation_snapshot());
}

#[test]
fn test_duplicate_updates_across_buffers_not_double_counted() {
    let shared = ConcurrentThetaSketch::builder().shared_lg_k(12).build();
    let mut a = shared.local_buffer();
    let mut b = shared.local_buffer();
    for i in 0..200u64 {
        a.update(i);
        b.update(i);
    }
    a.sync();
    b.sync();
    assert_eq!(shared.get_estimation_snapshot(), 200.0);
}
