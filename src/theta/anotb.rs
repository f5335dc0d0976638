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

use std::collections::HashSet;

use crate::error::Error;
use crate::theta::CompactThetaSketch;
use crate::theta::ThetaSketchView;

/// Computes the set difference `a \ b` (items in `a` but not `b`) as a
/// compact, ordered sketch.
///
/// This is a stateless, one-shot operator, unlike [`ThetaUnion`](super::ThetaUnion)
/// and [`ThetaIntersection`](super::ThetaIntersection): repeated differences
/// are expressed by feeding the previous result back in as `a`
/// (`theta_a_not_b(&theta_a_not_b(a, b)?, c)`), matching scenario 4 of the
/// iterated A-not-B-not-C pattern.
///
/// # Errors
///
/// Returns an error if both operands are non-empty and their seed hashes
/// don't match.
pub fn theta_a_not_b<A, B>(a: &A, b: &B) -> Result<CompactThetaSketch, Error>
where
    A: ThetaSketchView,
    B: ThetaSketchView,
{
    theta_a_not_b_with_ordered(a, b, true)
}

/// Same as [`theta_a_not_b`], with explicit control over whether the result
/// is returned sorted ascending.
pub fn theta_a_not_b_with_ordered<A, B>(
    a: &A,
    b: &B,
    ordered: bool,
) -> Result<CompactThetaSketch, Error>
where
    A: ThetaSketchView,
    B: ThetaSketchView,
{
    if !a.is_empty() && !b.is_empty() && a.seed_hash() != b.seed_hash() {
        return Err(Error::invalid_argument(format!(
            "incompatible seed hash: expected {}, got {}",
            a.seed_hash(),
            b.seed_hash()
        )));
    }

    let theta = a.theta64().min(b.theta64());
    let is_empty = a.is_empty();

    let mut entries = if a.is_ordered() && b.is_ordered() {
        merge_join_diff(a, b, theta)
    } else {
        hash_set_diff(a, b, theta)
    };

    if ordered {
        entries.sort_unstable();
    }

    let seed_hash = if a.is_empty() { b.seed_hash() } else { a.seed_hash() };
    Ok(CompactThetaSketch::from_parts(
        entries, theta, seed_hash, ordered, is_empty,
    ))
}

/// Merge-join fast path for two operands whose `iter()` yields ascending
/// hashes: walk both streams in lockstep, emitting `a`'s hash whenever it is
/// strictly less than `b`'s current hash.
fn merge_join_diff<A: ThetaSketchView, B: ThetaSketchView>(a: &A, b: &B, theta: u64) -> Vec<u64> {
    let mut result = Vec::new();
    let mut a_iter = a.iter().take_while(|&h| h < theta).peekable();
    let mut b_iter = b.iter().take_while(|&h| h < theta).peekable();

    loop {
        match (a_iter.peek(), b_iter.peek()) {
            (None, _) => break,
            (Some(_), None) => {
                result.extend(a_iter);
                break;
            }
            (Some(&ah), Some(&bh)) => {
                if ah < bh {
                    result.push(ah);
                    a_iter.next();
                } else if ah > bh {
                    b_iter.next();
                } else {
                    a_iter.next();
                    b_iter.next();
                }
            }
        }
    }
    result
}

/// Hash-set based fallback for operands that aren't both ordered.
fn hash_set_diff<A: ThetaSketchView, B: ThetaSketchView>(a: &A, b: &B, theta: u64) -> Vec<u64> {
    let b_set: HashSet<u64> = b.iter().filter(|&h| h < theta).collect();
    a.iter()
        .filter(|&h| h < theta && !b_set.contains(&h))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theta::ThetaSketch;

    fn sketch_with_range(lg_k: u8, start: u64, count: u64) -> ThetaSketch {
        let mut sketch = ThetaSketch::builder().lg_k(lg_k).build();
        for i in start..start + count {
            sketch.update(i);
        }
        sketch
    }

    #[test]
    fn no_overlap_keeps_all_of_a() {
        let a = sketch_with_range(9, 0, 256);
        let b = sketch_with_range(9, 256, 256);
        let result = theta_a_not_b(&a, &b).unwrap();
        assert_eq!(result.estimate(), 256.0);
        assert!(!result.is_empty());
    }

    #[test]
    fn full_overlap_yields_empty_ish_result() {
        let a = sketch_with_range(9, 0, 256);
        let b = sketch_with_range(9, 0, 256);
        let result = theta_a_not_b(&a, &b).unwrap();
        assert_eq!(result.num_retained(), 0);
    }

    #[test]
    fn iterated_a_not_b_not_c() {
        let a = sketch_with_range(10, 0, 1024);
        let b = sketch_with_range(10, 0, 512);
        let c = sketch_with_range(10, 512, 256);

        let r1 = theta_a_not_b(&a, &b).unwrap();
        let r2 = theta_a_not_b(&r1, &c).unwrap();
        assert_eq!(r2.estimate(), 256.0);
    }

    #[test]
    fn empty_a_yields_empty_result() {
        let a = ThetaSketch::builder().lg_k(9).build();
        let b = sketch_with_range(9, 0, 10);
        let result = theta_a_not_b(&a, &b).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn a_not_b_with_empty_b_preserves_a() {
        let a = sketch_with_range(9, 0, 100);
        let b = ThetaSketch::builder().lg_k(9).build();
        let result = theta_a_not_b(&a, &b).unwrap();
        assert_eq!(result.estimate(), a.estimate());
    }

    #[test]
    fn merge_join_matches_hash_set_diff() {
        let a = sketch_with_range(10, 0, 2000).compact(true);
        let b = sketch_with_range(10, 1000, 2000).compact(true);
        let theta = a.theta64().min(b.theta64());

        let merge_result = merge_join_diff(&a, &b, theta);
        let set_result = hash_set_diff(&a, &b, theta);

        let mut merge_sorted = merge_result.clone();
        merge_sorted.sort_unstable();
        let mut set_sorted = set_result.clone();
        set_sorted.sort_unstable();
        assert_eq!(merge_sorted, set_sorted);
    }

    #[test]
    fn rejects_mismatched_seed_hash() {
        let mut a = ThetaSketch::builder().seed(1).lg_k(9).build();
        a.update("a");
        let mut b = ThetaSketch::builder().seed(2).lg_k(9).build();
        b.update("x");
        assert!(theta_a_not_b(&a, &b).is_err());
    }
}
