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

use log::debug;
use priority_queue::PriorityQueue;

use crate::constants::SwitchId;
use crate::dijkstra::Dijkstra;
use crate::heap_item::HeapItem;
use crate::route_graph::RouteGraph;

/// Yen's algorithm: up to `k` loopless paths from `source` to `target` in
/// non-decreasing cost order. Fewer are returned if the graph has fewer.
pub fn k_shortest(graph: &RouteGraph, source: SwitchId, target: SwitchId, k: usize) -> Vec<HeapItem> {
    let mut accepted: Vec<HeapItem> = Vec::with_capacity(k);
    if k == 0 {
        return accepted;
    }
    match Dijkstra::new(graph).calc_path(source, target) {
        Some(first) => accepted.push(first),
        None => return accepted,
    }
    // candidates are keyed by their node sequence, so a path is only queued once
    let mut candidates: PriorityQueue<Vec<SwitchId>, HeapItem> = PriorityQueue::new();
    while accepted.len() < k {
        let previous = accepted[accepted.len() - 1].nodes.clone();
        for spur_index in 0..previous.len() - 1 {
            let spur_node = previous[spur_index];
            let root = &previous[..=spur_index];
            let mut dijkstra = Dijkstra::new(graph);
            for path in &accepted {
                if path.nodes.len() > spur_index + 1 && &path.nodes[..=spur_index] == root {
                    dijkstra.block_edge(path.nodes[spur_index], path.nodes[spur_index + 1]);
                }
            }
            for node in &root[..spur_index] {
                dijkstra.block_node(*node);
            }
            let spur = match dijkstra.calc_path(spur_node, target) {
                Some(s) => s,
                None => continue,
            };
            let mut nodes = root[..spur_index].to_vec();
            nodes.extend_from_slice(&spur.nodes);
            if accepted.iter().any(|p| p.nodes == nodes) {
                continue;
            }
            if let Some(weight) = graph.fixed_point_cost(&nodes) {
                candidates.push(nodes.clone(), HeapItem::new(weight, nodes));
            }
        }
        match candidates.pop() {
            Some((_, best)) => accepted.push(best),
            None => break,
        }
    }
    debug!(
        "k shortest paths s{} -> s{}, requested: {}, found: {}",
        source,
        target,
        k,
        accepted.len()
    );
    accepted
}
