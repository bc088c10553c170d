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

use std::cmp::Ordering;

use crate::constants::{SearchWeight, SwitchId};

/// A partial path ranked by its cost, ties are broken by the lexicographically
/// smaller node sequence. The ordering is reversed so that max-heaps hand out
/// the cheapest item first.
#[derive(Debug, Clone)]
pub struct HeapItem {
    pub weight: SearchWeight,
    pub nodes: Vec<SwitchId>,
}

impl HeapItem {
    pub fn new(weight: SearchWeight, nodes: Vec<SwitchId>) -> HeapItem {
        HeapItem { weight, nodes }
    }

    pub fn last_node(&self) -> Option<SwitchId> {
        self.nodes.last().cloned()
    }

    /// True if this item should be handed out before `other`.
    pub fn precedes(&self, other: &HeapItem) -> bool {
        self.cmp(other) == Ordering::Greater
    }
}

impl Ord for HeapItem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.weight
            .cmp(&other.weight)
            .then_with(|| self.nodes.cmp(&other.nodes))
            .reverse()
    }
}

impl PartialOrd for HeapItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HeapItem {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapItem {}
