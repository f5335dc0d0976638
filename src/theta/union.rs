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

use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::common::ResizeFactor;
use crate::error::Error;
use crate::hash::DEFAULT_UPDATE_SEED;
use crate::hash::compute_seed_hash;
use crate::theta::CompactThetaSketch;
use crate::theta::ThetaSketchView;
use crate::theta::hash_table::DEFAULT_LG_K;
use crate::theta::hash_table::MAX_LG_K;
use crate::theta::hash_table::MAX_THETA;
use crate::theta::hash_table::MIN_LG_K;
use crate::theta::hash_table::ThetaHashTable;
use crate::theta::serialization::FLAG_IS_COMPACT;
use crate::theta::serialization::FLAG_IS_EMPTY;
use crate::theta::serialization::FLAG_IS_ORDERED;
use crate::theta::serialization::FLAG_IS_READ_ONLY;
use crate::theta::serialization::HASH_SIZE_BYTES;
use crate::theta::serialization::PREAMBLE_LONGS_EMPTY;
use crate::theta::serialization::PREAMBLE_LONGS_ESTIMATION;
use crate::theta::serialization::PREAMBLE_LONGS_EXACT;
use crate::theta::serialization::SERIAL_VERSION;
use crate::theta::serialization::UNION_FAMILY_ID;

/// Accumulates sketches into their union, following the same "internal
/// gadget" shape as an HLL union: an ordinary update sketch absorbs every
/// operand's retained hashes, while a running `min_theta` records the
/// tightest threshold seen across all operands so the gadget's own,
/// rebuild-driven theta and the union-wide theta can be reconciled lazily
/// at [`get_result`](Self::get_result) time.
#[derive(Debug)]
pub struct ThetaUnion {
    gadget: ThetaHashTable,
    min_theta: u64,
    is_empty: bool,
}

impl ThetaUnion {
    /// Creates a new builder for `ThetaUnion`.
    pub fn builder() -> ThetaUnionBuilder {
        ThetaUnionBuilder::default()
    }

    /// Merge a sketch into the union.
    ///
    /// `seed_hash` mismatches are rejected unless `sketch` is empty, matching
    /// [`ThetaIntersection::update`](super::ThetaIntersection::update).
    pub fn update<S: ThetaSketchView>(&mut self, sketch: &S) -> Result<(), Error> {
        if !sketch.is_empty() && sketch.seed_hash() != self.gadget.seed_hash() {
            return Err(Error::invalid_argument(format!(
                "incompatible seed hash: expected {}, got {}",
                self.gadget.seed_hash(),
                sketch.seed_hash()
            )));
        }

        self.is_empty = self.is_empty && sketch.is_empty();

        let new_min_theta = self.min_theta.min(sketch.theta64());
        for hash in sketch.iter() {
            if hash >= new_min_theta {
                if sketch.is_ordered() {
                    break;
                }
                continue;
            }
            self.gadget.try_insert_hash(hash);
        }
        self.min_theta = new_min_theta;
        let gadget_theta = self.gadget.theta();
        self.gadget.set_theta(gadget_theta.min(self.min_theta));

        Ok(())
    }

    /// Merge a serialized compact sketch into the union without the caller
    /// having to heapify it first.
    pub fn update_serialized(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let sketch = CompactThetaSketch::deserialize_with_seed(bytes, self.gadget.hash_seed())?;
        self.update(&sketch)
    }

    /// Returns the union's accumulated result as a compact sketch.
    ///
    /// Reconciles the gadget's own theta (tightened by its own rebuilds)
    /// with `min_theta` (the tightest theta observed across all operands),
    /// then trims to nominal size if the combined threshold still leaves
    /// more than k entries retained.
    pub fn get_result(&self, ordered: bool) -> CompactThetaSketch {
        let mut theta = self.gadget.theta().min(self.min_theta);
        let mut entries: Vec<u64> = self.gadget.iter().filter(|&h| h < theta).collect();

        let k = 1u64 << self.gadget.lg_nom_size();
        if entries.len() as u64 > k {
            let (_, &mut kth, _) = entries.select_nth_unstable(k as usize);
            theta = kth;
            entries.retain(|&h| h < theta);
        }
        if ordered {
            entries.sort_unstable();
        }

        CompactThetaSketch::from_parts(
            entries,
            theta,
            self.gadget.seed_hash(),
            ordered,
            self.is_empty,
        )
    }

    /// Whether the union has not yet absorbed a non-empty operand.
    pub fn is_empty(&self) -> bool {
        self.is_empty
    }

    /// Cardinality estimate of the union as accumulated so far.
    pub fn estimate(&self) -> f64 {
        self.get_result(false).estimate()
    }

    /// Reset the union to its initial, empty state.
    pub fn reset(&mut self) {
        self.gadget.reset();
        self.min_theta = MAX_THETA;
        self.is_empty = true;
    }

    /// Serialize the union's internal state (not its extracted result).
    ///
    /// Unlike [`get_result`](Self::get_result), which always emits a
    /// [`CompactThetaSketch`] under `THETA_FAMILY_ID`, this preserves
    /// `min_theta` separately from the gadget's own theta so a union can be
    /// suspended and resumed exactly.
    pub fn serialize(&self) -> Vec<u8> {
        let is_empty = self.is_empty;
        let gadget_entries: Vec<u64> = self.gadget.iter().collect();
        let num_entries = gadget_entries.len();

        let preamble_longs = if is_empty {
            PREAMBLE_LONGS_EMPTY
        } else {
            PREAMBLE_LONGS_ESTIMATION
        };
        let preamble_bytes = (preamble_longs as usize) * 8;
        // One extra long to carry min_theta alongside the gadget's own theta.
        let extra_bytes = if is_empty { 0 } else { 8 };
        let total_bytes = preamble_bytes + extra_bytes + num_entries * HASH_SIZE_BYTES;

        let mut bytes = SketchBytes::with_capacity(total_bytes);
        let mut flags = FLAG_IS_READ_ONLY;
        if is_empty {
            flags |= FLAG_IS_EMPTY;
        }

        bytes.write_u8(preamble_longs);
        bytes.write_u8(SERIAL_VERSION);
        bytes.write_u8(UNION_FAMILY_ID);
        bytes.write_u8(self.gadget.lg_nom_size());
        bytes.write_u8(self.gadget.lg_nom_size());
        bytes.write_u8(flags);
        bytes.write_u16_le(self.gadget.seed_hash());

        if is_empty {
            return bytes.into_bytes();
        }

        bytes.write_u32_le(num_entries as u32);
        bytes.write_u32_le(0);
        bytes.write_u64_le(self.gadget.theta());
        bytes.write_u64_le(self.min_theta);
        for entry in gadget_entries {
            bytes.write_u64_le(entry);
        }

        bytes.into_bytes()
    }

    /// Deserialize a previously-[`serialize`](Self::serialize)d union state.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        Self::deserialize_with_seed(bytes, DEFAULT_UPDATE_SEED)
    }

    /// Deserialize a union state produced with a specific hash seed.
    pub fn deserialize_with_seed(bytes: &[u8], seed: u64) -> Result<Self, Error> {
        fn make_error(tag: &'static str) -> impl FnOnce(std::io::Error) -> Error {
            move |_| Error::insufficient_data(tag)
        }

        let mut cursor = SketchSlice::new(bytes);
        let preamble_longs = cursor.read_u8().map_err(make_error("preamble_longs"))?;
        let serial_version = cursor.read_u8().map_err(make_error("serial_version"))?;
        let family_id = cursor.read_u8().map_err(make_error("family_id"))?;
        let lg_k = cursor.read_u8().map_err(make_error("lg_k"))?;
        let _lg_arr = cursor.read_u8().map_err(make_error("lg_arr"))?;
        let flags = cursor.read_u8().map_err(make_error("flags"))?;
        let stored_seed_hash = cursor.read_u16_le().map_err(make_error("seed_hash"))?;

        if family_id != UNION_FAMILY_ID {
            return Err(Error::invalid_family(UNION_FAMILY_ID, family_id, "ThetaUnion"));
        }
        if serial_version != SERIAL_VERSION {
            return Err(Error::unsupported_serial_version(
                SERIAL_VERSION,
                serial_version,
            ));
        }
        if !(MIN_LG_K..=MAX_LG_K).contains(&lg_k) {
            return Err(Error::deserial(format!(
                "lg_k {lg_k} is out of range [{MIN_LG_K}, {MAX_LG_K}]"
            )));
        }
        let expected_seed_hash = compute_seed_hash(seed);
        if stored_seed_hash != expected_seed_hash {
            return Err(Error::deserial(format!(
                "seed hash mismatch: expected 0x{expected_seed_hash:04X}, got 0x{stored_seed_hash:04X}"
            )));
        }

        let is_empty = (flags & FLAG_IS_EMPTY) != 0;
        if is_empty {
            return Ok(ThetaUnion::builder().lg_k(lg_k).seed(seed).build());
        }

        if preamble_longs < PREAMBLE_LONGS_ESTIMATION {
            return Err(Error::invalid_preamble_longs(
                PREAMBLE_LONGS_ESTIMATION,
                preamble_longs,
            ));
        }

        let num_entries = cursor.read_u32_le().map_err(make_error("num_entries"))? as usize;
        let _padding = cursor.read_u32_le().map_err(make_error("padding"))?;
        let gadget_theta = cursor.read_u64_le().map_err(make_error("gadget_theta"))?;
        let min_theta = cursor.read_u64_le().map_err(make_error("min_theta"))?;

        let mut entries = Vec::with_capacity(num_entries);
        for _ in 0..num_entries {
            entries.push(cursor.read_u64_le().map_err(make_error("hash_entry"))?);
        }

        let gadget = ThetaHashTable::from_entries(lg_k, seed, gadget_theta, entries);
        Ok(ThetaUnion {
            gadget,
            min_theta,
            is_empty: false,
        })
    }
}

/// Builder for [`ThetaUnion`].
#[derive(Debug)]
pub struct ThetaUnionBuilder {
    lg_k: u8,
    resize_factor: ResizeFactor,
    seed: u64,
}

impl Default for ThetaUnionBuilder {
    fn default() -> Self {
        Self {
            lg_k: DEFAULT_LG_K,
            resize_factor: ResizeFactor::X8,
            seed: DEFAULT_UPDATE_SEED,
        }
    }
}

impl ThetaUnionBuilder {
    /// Set the nominal size (log2) of the internal gadget sketch.
    ///
    /// # Panics
    ///
    /// If `lg_k` is not in range `[5, 26]`.
    pub fn lg_k(mut self, lg_k: u8) -> Self {
        assert!(
            (MIN_LG_K..=MAX_LG_K).contains(&lg_k),
            "lg_k must be in [{}, {}], got {}",
            MIN_LG_K,
            MAX_LG_K,
            lg_k
        );
        self.lg_k = lg_k;
        self
    }

    /// Set the resize factor of the internal gadget sketch.
    pub fn resize_factor(mut self, factor: ResizeFactor) -> Self {
        self.resize_factor = factor;
        self
    }

    /// Set hash seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Build the union.
    pub fn build(self) -> ThetaUnion {
        let gadget = ThetaHashTable::new(self.lg_k, self.resize_factor, 1.0, self.seed);
        ThetaUnion {
            gadget,
            min_theta: MAX_THETA,
            is_empty: true,
        }
    }
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
    fn union_of_empties_is_empty() {
        let mut union = ThetaUnion::builder().lg_k(12).build();
        let a = ThetaSketch::builder().lg_k(12).build();
        let b = ThetaSketch::builder().lg_k(12).build();
        union.update(&a).unwrap();
        union.update(&b).unwrap();
        assert!(union.is_empty());
        assert_eq!(union.estimate(), 0.0);
    }

    #[test]
    fn union_exact_mode_matches_sum_of_disjoint_sets() {
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
    fn union_of_compact_ordered_matches_source_in_exact_mode() {
        let mut union = ThetaUnion::builder().lg_k(12).build();
        let sketch = sketch_with_range(12, 0, 500);
        let compact = sketch.compact(true);
        union.update(&compact).unwrap();
        assert_eq!(union.estimate(), sketch.estimate());
    }

    #[test]
    fn rejects_mismatched_seed_hash() {
        let mut union = ThetaUnion::builder().lg_k(12).seed(1).build();
        let other = sketch_with_range(12, 0, 10);
        assert!(union.update(&other).is_err());
    }

    #[test]
    fn serialize_deserialize_round_trip() {
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
}
