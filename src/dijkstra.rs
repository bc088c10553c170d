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

use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet};

use crate::constants::{SwitchId, SEARCH_WEIGHT_ZERO, WEIGHT_MAX};
use crate::heap_item::HeapItem;
use crate::route::Route;
use crate::route_graph::RouteGraph;

/// Dijkstra on a `RouteGraph`. Labels carry the full node sequence so that among
/// equally cheap paths the lexicographically smallest one is kept. Costs are
/// compared on the fixed-point search weights.
/// Nodes and edges can be blocked, which is what Yen's spur searches need.
pub struct Dijkstra<'a> {
    graph: &'a RouteGraph,
    blocked_nodes: HashSet<SwitchId>,
    blocked_edges: HashSet<(SwitchId, SwitchId)>,
}

impl<'a> Dijkstra<'a> {
    pub fn new(graph: &'a RouteGraph) -> Self {
        Dijkstra {
            graph,
            blocked_nodes: HashSet::new(),
            blocked_edges: HashSet::new(),
        }
    }

    pub fn block_node(&mut self, node: SwitchId) {
        self.blocked_nodes.insert(node);
    }

    /// Blocks the edge in both directions.
    pub fn block_edge(&mut self, a: SwitchId, b: SwitchId) {
        self.blocked_edges.insert((a, b));
        self.blocked_edges.insert((b, a));
    }

    /// Cheapest path from `source` to `target`, `None` if there is none or one of
    /// the two is unknown or blocked. The returned weight is the summed fixed-point
    /// search weight.
    pub fn calc_path(&self, source: SwitchId, target: SwitchId) -> Option<HeapItem> {
        if !self.usable(source) || !self.usable(target) {
            return None;
        }
        self.run(source, Some(target)).remove(&target)
    }

    /// Cheapest paths from `source` to every reachable node, including itself.
    pub fn calc_tree(&self, source: SwitchId) -> HashMap<SwitchId, HeapItem> {
        if !self.usable(source) {
            return HashMap::new();
        }
        self.run(source, None)
    }

    fn usable(&self, node: SwitchId) -> bool {
        self.graph.contains(node) && !self.blocked_nodes.contains(&node)
    }

    fn run(&self, source: SwitchId, target: Option<SwitchId>) -> HashMap<SwitchId, HeapItem> {
        let mut best: HashMap<SwitchId, HeapItem> = HashMap::new();
        let mut settled: HashMap<SwitchId, HeapItem> = HashMap::new();
        let mut heap = BinaryHeap::new();
        let start = HeapItem::new(SEARCH_WEIGHT_ZERO, vec![source]);
        best.insert(source, start.clone());
        heap.push(start);
        while let Some(curr) = heap.pop() {
            let node = match curr.last_node() {
                Some(n) => n,
                None => continue,
            };
            if settled.contains_key(&node) {
                continue;
            }
            // stale heap entries are skipped, only the best label per node counts
            if best.get(&node).map_or(false, |b| b.precedes(&curr)) {
                continue;
            }
            for n in self.graph.neighbors(node) {
                let adj = n.node;
                if settled.contains_key(&adj)
                    || self.blocked_nodes.contains(&adj)
                    || self.blocked_edges.contains(&(node, adj))
                {
                    continue;
                }
                let mut nodes = Vec::with_capacity(curr.nodes.len() + 1);
                nodes.extend_from_slice(&curr.nodes);
                nodes.push(adj);
                let candidate = HeapItem::new(curr.weight.saturating_add(n.weight), nodes);
                let improves = best.get(&adj).map_or(true, |b| candidate.precedes(b));
                if improves {
                    best.insert(adj, candidate.clone());
                    heap.push(candidate);
                }
            }
            settled.insert(node, curr);
            if target == Some(node) {
                break;
            }
        }
        settled
    }
}

/// Turns a search result into a `Route` with its cost in the criterion's unit,
/// summed from the exact edge weights along the path.
pub fn to_route(graph: &RouteGraph, item: HeapItem) -> Route {
    let source = item.nodes.first().cloned().unwrap_or_default();
    let target = item.nodes.last().cloned().unwrap_or_default();
    let exact = graph.search_cost(&item.nodes).unwrap_or(WEIGHT_MAX);
    Route::new(source, target, graph.cost(exact), item.nodes)
}

/// Single-source Dijkstra from every node. Pairs without a path are missing.
pub fn all_pairs(graph: &RouteGraph) -> BTreeMap<(SwitchId, SwitchId), Route> {
    let dijkstra = Dijkstra::new(graph);
    let mut routes = BTreeMap::new();
    for source in graph.nodes() {
        for (target, item) in dijkstra.calc_tree(source) {
            routes.insert((source, target), to_route(graph, item));
        }
    }
    routes
}
