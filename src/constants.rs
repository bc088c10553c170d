/*
 * Licensed to the Apache Software Foundation (ASF) under one
 * or more contributor license agreements.  See the NOTICE file
 * distributed with this work for additional information
 * regarding copyright ownership.  The ASF licenses this file
 * to you under the Apache License, Version 2.0 (the
 * "License"); you may not use this file except in compliance
 * with the License.  You may obtain a copy of the License at
 *
 *   http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing,
 * software distributed under the License is distributed on an
 * "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
 * KIND, either express or implied.  See the License for the
 * specific language governing permissions and limitations
 * under the License.
 */

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RouteError};

/// Datapath id of a switch, the colon-hex string read as one big-endian integer.
pub type SwitchId = u64;
/// MAC address of a host, the colon-hex string read as one big-endian integer.
pub type HostId = u64;
pub type PortNo = u32;
pub type Weight = f64;

pub const WEIGHT_MAX: Weight = std::f64::INFINITY;
pub const WEIGHT_ZERO: Weight = 0.0;

/// Fixed-point edge weight the planner searches with. Sums are exact, so paths of
/// equal cost compare equal and fall through to the node sequence tie-break.
pub type SearchWeight = u64;
/// Search weight units per unit of additive weight, i.e. a resolution of 1e-9.
pub const SEARCH_WEIGHT_SCALE: f64 = 1e9;
pub const SEARCH_WEIGHT_ZERO: SearchWeight = 0;

/// Rounds a non-negative additive weight to the search grid. Weights beyond the
/// range saturate at `SearchWeight::max_value()`.
pub fn to_fixed_point(weight: Weight) -> SearchWeight {
    (weight * SEARCH_WEIGHT_SCALE).round() as SearchWeight
}

/// Whether the controller saw the link in one or both directions.
#[derive(Eq, PartialEq, Clone, Copy, Deserialize, Serialize, Debug)]
pub enum LinkDirection {
    Bidirectional,
    Unidirectional,
}

impl LinkDirection {
    pub fn is_bidirectional(&self) -> bool {
        match self {
            LinkDirection::Bidirectional => true,
            LinkDirection::Unidirectional => false,
        }
    }

    /// Reads the controller's direction string. Anything that is not explicitly
    /// unidirectional is treated as bidirectional.
    pub fn from_controller(direction: Option<&str>) -> LinkDirection {
        match direction {
            Some(d) if d.trim().eq_ignore_ascii_case("unidirectional") => {
                LinkDirection::Unidirectional
            }
            _ => LinkDirection::Bidirectional,
        }
    }
}

/// The switch and port where the controller last observed a host.
#[derive(Eq, PartialEq, Clone, Copy, Deserialize, Serialize, Debug, Hash)]
pub struct AttachmentPoint {
    pub switch: SwitchId,
    pub port: PortNo,
}

impl AttachmentPoint {
    pub fn new(switch: SwitchId, port: PortNo) -> Self {
        AttachmentPoint { switch, port }
    }
}

impl fmt::Display for AttachmentPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}-eth{}", self.switch, self.port)
    }
}

/// Parses a colon separated hex identifier like `00:00:00:00:00:00:00:01`
/// (datapath ids and MAC addresses) into a single integer.
pub fn parse_colon_hex(id: &str) -> Result<u64> {
    let mut digits = String::with_capacity(16);
    for group in id.trim().split(':') {
        if group.is_empty() || !group.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(RouteError::MalformedRecord(format!(
                "invalid colon-hex identifier '{}'",
                id
            )));
        }
        digits.push_str(group);
    }
    let significant = digits.trim_start_matches('0');
    if significant.len() > 16 {
        return Err(RouteError::MalformedRecord(format!(
            "identifier '{}' does not fit into 64 bits",
            id
        )));
    }
    if significant.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(significant, 16).map_err(|e| {
        RouteError::MalformedRecord(format!("invalid colon-hex identifier '{}': {}", id, e))
    })
}
