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

//! Hash primitives shared by the sketch implementations.
//!
//! The core algorithms in this crate treat the hash function as an external
//! collaborator: they only assume a good 128-bit hash whose first 64 bits,
//! right-shifted by one to clear the sign bit, are consumed. This module
//! supplies one such hash (a 128-bit MurmurHash3 variant) rather than
//! dynamically choosing between several.

mod murmur3;

pub use murmur3::MurmurHash3X64128;

/// Default seed used by sketches unless the caller configures another.
///
/// Matches the conventional default seed used across DataSketches language
/// ports so that sketches built with default settings are comparable.
pub const DEFAULT_UPDATE_SEED: u64 = 9001;

/// Reads a little-endian `u64` from a byte slice that may be shorter than 8
/// bytes, zero-padding the missing high bytes.
pub(crate) fn read_u64_le(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf[..bytes.len()].copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}

/// Computes the 16-bit seed hash stored in every serialized sketch and
/// validated whenever two sketches are combined by a set operation.
///
/// The seed itself is hashed with the same primitive used for items so that
/// two sketches built with different seeds are virtually certain to produce
/// different seed hashes; a zero result (vanishingly unlikely) is mapped to
/// `1` so that `0` can be reserved to mean "legacy, unchecked" on the wire.
pub fn compute_seed_hash(seed: u64) -> u16 {
    let mut hasher = MurmurHash3X64128::with_seed(0);
    std::hash::Hasher::write_u64(&mut hasher, seed);
    let (h1, _h2) = hasher.finish128();
    let seed_hash = (h1 & 0xFFFF) as u16;
    if seed_hash == 0 { 1 } else { seed_hash }
}
