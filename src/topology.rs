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

use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::debug;

use crate::constants::{PortNo, SwitchId};
use crate::error::{Result, RouteError};
use crate::snapshot::LinkRecord;

/// Undirected switch graph of one topology snapshot. Parallel links between the
/// same two switches collapse into a single edge.
#[derive(Clone, Debug)]
pub struct TopologyGraph {
    adjacency: BTreeMap<SwitchId, BTreeSet<SwitchId>>,
    // (src, dst) -> (port at src, port at dst), as reported by the controller
    ports: HashMap<(SwitchId, SwitchId), (PortNo, PortNo)>,
    num_edges: usize,
}

impl TopologyGraph {
    /// Builds the graph over the given switches. Every link endpoint must be one
    /// of `switches`, switches without links stay isolated nodes.
    pub fn build<I>(links: &[LinkRecord], switches: I) -> Result<TopologyGraph>
    where
        I: IntoIterator<Item = SwitchId>,
    {
        let mut graph = TopologyGraph {
            adjacency: switches.into_iter().map(|s| (s, BTreeSet::new())).collect(),
            ports: HashMap::new(),
            num_edges: 0,
        };
        for link in links {
            graph.add_link(link)?;
        }
        debug!(
            "built topology graph, nodes: {}, edges: {}, port pairs: {}",
            graph.num_nodes(),
            graph.num_edges(),
            graph.ports.len()
        );
        Ok(graph)
    }

    fn add_link(&mut self, link: &LinkRecord) -> Result<()> {
        let (src, dst) = (link.src_switch, link.dst_switch);
        for s in &[src, dst] {
            if !self.contains(*s) {
                return Err(RouteError::MalformedRecord(format!(
                    "link s{}-eth{} -> s{}-eth{} references unknown switch s{}",
                    src, link.src_port, dst, link.dst_port, s
                )));
            }
        }
        if src == dst {
            return Err(RouteError::MalformedRecord(format!(
                "link s{}-eth{} -> s{}-eth{} is a self loop",
                src, link.src_port, dst, link.dst_port
            )));
        }
        // the first record for an ordered pair wins
        self.ports
            .entry((src, dst))
            .or_insert((link.src_port, link.dst_port));
        if link.direction.is_bidirectional() {
            self.ports
                .entry((dst, src))
                .or_insert((link.dst_port, link.src_port));
        }
        let inserted = self.adjacency.entry(src).or_default().insert(dst);
        self.adjacency.entry(dst).or_default().insert(src);
        if inserted {
            self.num_edges += 1;
        }
        Ok(())
    }

    pub fn contains(&self, node: SwitchId) -> bool {
        self.adjacency.contains_key(&node)
    }

    pub fn num_nodes(&self) -> usize {
        self.adjacency.len()
    }

    pub fn num_edges(&self) -> usize {
        self.num_edges
    }

    /// Nodes in ascending order.
    pub fn nodes(&self) -> impl Iterator<Item = SwitchId> + '_ {
        self.adjacency.keys().cloned()
    }

    /// Neighbors in ascending order, empty for unknown nodes.
    pub fn neighbors(&self, node: SwitchId) -> impl Iterator<Item = SwitchId> + '_ {
        self.adjacency
            .get(&node)
            .into_iter()
            .flat_map(|n| n.iter().cloned())
    }

    /// Every undirected edge once, as `(smaller id, larger id)`.
    pub fn edges(&self) -> impl Iterator<Item = (SwitchId, SwitchId)> + '_ {
        self.adjacency
            .iter()
            .flat_map(|(a, ns)| ns.iter().filter(move |b| *b > a).map(move |b| (*a, *b)))
    }

    /// The ports exactly as registered for the ordered pair, `(port at src, port at dst)`.
    pub fn ports_of(&self, src: SwitchId, dst: SwitchId) -> Option<(PortNo, PortNo)> {
        self.ports.get(&(src, dst)).cloned()
    }

    /// Egress port at `from` and ingress port at `to` for the hop `from -> to`.
    /// Falls back to the record of the opposite direction when the controller
    /// only reported `to -> from`, links are physically bidirectional.
    pub fn hop_ports(&self, from: SwitchId, to: SwitchId) -> Option<(PortNo, PortNo)> {
        self.ports_of(from, to)
            .or_else(|| self.ports_of(to, from).map(|(to_port, from_port)| (from_port, to_port)))
    }
}
