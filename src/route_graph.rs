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

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::constants::{to_fixed_point, SearchWeight, SwitchId, Weight, SEARCH_WEIGHT_ZERO, WEIGHT_ZERO};
use crate::error::{Result, RouteError};
use crate::params::MissingTelemetryPolicy;
use crate::quality::{Combine, QualityModel};
use crate::topology::TopologyGraph;

/// One direction of an edge. `weight` is what the planner compares, `exact` is
/// the additive weight it was rounded from and is only used to report costs.
#[derive(PartialEq, Clone, Copy, Debug)]
pub struct Neighbor {
    pub node: SwitchId,
    pub weight: SearchWeight,
    pub exact: Weight,
}

/// The graph the planner searches: every usable edge of a `TopologyGraph` with a
/// non-negative additive search weight.
#[derive(Clone, Debug)]
pub struct RouteGraph {
    // neighbors are kept sorted by id
    adjacency: BTreeMap<SwitchId, Vec<Neighbor>>,
    combine: Combine,
    num_edges: usize,
}

impl RouteGraph {
    /// Every edge weighs one.
    pub fn hop_count(topology: &TopologyGraph) -> RouteGraph {
        let mut graph = RouteGraph::with_nodes(topology.nodes(), Combine::Additive);
        for (a, b) in topology.edges() {
            graph.add_edge(a, b, 1.0);
        }
        graph
    }

    /// Weighs the edges of `topology` with `model`. Edges that cannot carry
    /// traffic are left out, edges without telemetry are handled per `policy`.
    pub fn new(
        topology: &TopologyGraph,
        model: &QualityModel,
        policy: MissingTelemetryPolicy,
    ) -> Result<RouteGraph> {
        let combine = model.combine();
        let mut graph = RouteGraph::with_nodes(topology.nodes(), combine);
        let mut excluded = 0;
        for (a, b) in topology.edges() {
            let (port_a, port_b) = topology.hop_ports(a, b).ok_or_else(|| {
                RouteError::MalformedRecord(format!("no ports for link s{} - s{}", a, b))
            })?;
            let weight = match model.weight(a, port_a, b, port_b) {
                Ok(w) => w,
                Err(e @ RouteError::MissingTelemetry { .. }) => match policy {
                    MissingTelemetryPolicy::Abort => return Err(e),
                    MissingTelemetryPolicy::ExcludeEdge => {
                        warn!("excluding link s{}-eth{} - s{}-eth{}: {}", a, port_a, b, port_b, e);
                        excluded += 1;
                        continue;
                    }
                },
                Err(e) => return Err(e),
            };
            match combine.to_search_weight(weight) {
                Some(w) => graph.add_edge(a, b, w),
                None => {
                    debug!("link s{} - s{} with weight {} cannot carry traffic", a, b, weight);
                    excluded += 1;
                }
            }
        }
        debug!(
            "route graph for criterion {}, nodes: {}, edges: {}, excluded: {}",
            model.criterion(),
            graph.num_nodes(),
            graph.num_edges(),
            excluded
        );
        Ok(graph)
    }

    /// Builds a graph directly from `(a, b, weight)` triples, weights are given in
    /// the unit of `combine` and may not be negative.
    pub fn from_weighted_edges(
        nodes: &[SwitchId],
        edges: &[(SwitchId, SwitchId, Weight)],
        combine: Combine,
    ) -> Result<RouteGraph> {
        let mut graph = RouteGraph::with_nodes(nodes.iter().cloned(), combine);
        for &(a, b, weight) in edges {
            if !graph.contains(a) || !graph.contains(b) || a == b {
                return Err(RouteError::MalformedRecord(format!(
                    "edge s{} - s{} does not connect two distinct known switches",
                    a, b
                )));
            }
            let w = combine.to_search_weight(weight).ok_or_else(|| {
                RouteError::InvalidArgument(format!("unusable weight {} for s{} - s{}", weight, a, b))
            })?;
            graph.add_edge(a, b, w);
        }
        Ok(graph)
    }

    fn with_nodes<I: Iterator<Item = SwitchId>>(nodes: I, combine: Combine) -> RouteGraph {
        RouteGraph {
            adjacency: nodes.map(|n| (n, Vec::new())).collect(),
            combine,
            num_edges: 0,
        }
    }

    fn add_edge(&mut self, a: SwitchId, b: SwitchId, search_weight: Weight) {
        if self.search_weight(a, b).is_some() {
            return;
        }
        for (from, to) in &[(a, b), (b, a)] {
            let neighbors = self.adjacency.entry(*from).or_default();
            let pos = neighbors
                .binary_search_by(|n| n.node.cmp(to))
                .unwrap_or_else(|p| p);
            neighbors.insert(
                pos,
                Neighbor {
                    node: *to,
                    weight: to_fixed_point(search_weight),
                    exact: search_weight,
                },
            );
        }
        self.num_edges += 1;
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

    pub fn combine(&self) -> Combine {
        self.combine
    }

    pub fn nodes(&self) -> impl Iterator<Item = SwitchId> + '_ {
        self.adjacency.keys().cloned()
    }

    /// Neighbors sorted by id.
    pub fn neighbors(&self, node: SwitchId) -> &[Neighbor] {
        self.adjacency.get(&node).map(|n| n.as_slice()).unwrap_or(&[])
    }

    fn edge(&self, a: SwitchId, b: SwitchId) -> Option<&Neighbor> {
        let neighbors = self.neighbors(a);
        neighbors
            .binary_search_by(|n| n.node.cmp(&b))
            .ok()
            .map(|i| &neighbors[i])
    }

    /// The exact additive weight of the edge between `a` and `b`.
    pub fn search_weight(&self, a: SwitchId, b: SwitchId) -> Option<Weight> {
        self.edge(a, b).map(|n| n.exact)
    }

    /// Summed exact weight of a node sequence, `None` if two consecutive nodes
    /// are not connected.
    pub fn search_cost(&self, nodes: &[SwitchId]) -> Option<Weight> {
        let mut cost = WEIGHT_ZERO;
        for w in nodes.windows(2) {
            cost += self.search_weight(w[0], w[1])?;
        }
        Some(cost)
    }

    /// Summed fixed-point weight of a node sequence, the value paths are ranked by.
    pub fn fixed_point_cost(&self, nodes: &[SwitchId]) -> Option<SearchWeight> {
        let mut cost = SEARCH_WEIGHT_ZERO;
        for w in nodes.windows(2) {
            cost = cost.saturating_add(self.edge(w[0], w[1])?.weight);
        }
        Some(cost)
    }

    /// Converts a summed search weight into the criterion's unit.
    pub fn cost(&self, search_cost: Weight) -> Weight {
        self.combine.from_search_cost(search_cost)
    }
}
