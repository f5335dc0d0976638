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

//! Growth policy for the update sketch's hash table.

/// How aggressively the hash table grows before it hits its nominal size.
///
/// `X1` never grows before rebuilding (jumps straight to max size); `X8` is
/// the common default, doubling `lg_cur_size` by 3 each resize.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ResizeFactor {
    /// No pre-growth; the table is allocated at its maximum size up front.
    X1,
    /// Double `lg_cur_size` by 1 per resize (table size x2).
    X2,
    /// Double `lg_cur_size` by 2 per resize (table size x4).
    X4,
    /// Double `lg_cur_size` by 3 per resize (table size x8).
    #[default]
    X8,
}

impl ResizeFactor {
    /// The number added to `lg_cur_size` at each resize step.
    pub fn lg_value(self) -> u8 {
        match self {
            ResizeFactor::X1 => 0,
            ResizeFactor::X2 => 1,
            ResizeFactor::X4 => 2,
            ResizeFactor::X8 => 3,
        }
    }
}
