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

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::constants::{SwitchId, Weight, WEIGHT_ZERO};

/// A loopless switch path and its cost under the criterion it was planned with.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Route {
    source: SwitchId,
    target: SwitchId,
    cost: Weight,
    nodes: Vec<SwitchId>,
}

impl Route {
    pub fn new(source: SwitchId, target: SwitchId, cost: Weight, nodes: Vec<SwitchId>) -> Self {
        Route {
            source,
            target,
            cost,
            nodes,
        }
    }

    /// The zero cost route from a switch to itself.
    pub fn singular(node: SwitchId) -> Self {
        Route::new(node, node, WEIGHT_ZERO, vec![node])
    }

    pub fn get_source(&self) -> SwitchId {
        self.source
    }

    pub fn get_target(&self) -> SwitchId {
        self.target
    }

    pub fn get_cost(&self) -> Weight {
        self.cost
    }

    pub fn get_nodes(&self) -> &Vec<SwitchId> {
        &self.nodes
    }

    pub fn num_hops(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }

    /// Consecutive node pairs.
    pub fn hops(&self) -> impl Iterator<Item = (SwitchId, SwitchId)> + '_ {
        self.nodes.windows(2).map(|w| (w[0], w[1]))
    }

    pub fn is_simple(&self) -> bool {
        let mut seen = HashSet::with_capacity(self.nodes.len());
        self.nodes.iter().all(|n| seen.insert(*n))
    }
}
