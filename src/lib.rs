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

//! Route computation for software-defined networks. A topology snapshot (switch
//! links, host attachments and per-port telemetry) is turned into a weighted
//! switch graph, searched for shortest, k shortest or quality optimal paths, and
//! the resulting switch paths are translated into the ports they traverse.

use std::collections::BTreeMap;

use crate::dijkstra::Dijkstra;

pub use crate::constants::*;
pub use crate::engine::{all_routes, plan, time_route, RouteEngine, RouteResponse, TimedRoute};
pub use crate::error::{Result, RouteError};
pub use crate::params::{MissingTelemetryPolicy, Params};
pub use crate::port_path::{translate, PortPath, PortToken, ResolvedEndpoint};
pub use crate::quality::{Combine, CompositeWeights, Criterion, QosSample, QualityModel};
pub use crate::query::{Endpoint, HostDirectory, QueryKind, RouteQuery};
pub use crate::route::Route;
pub use crate::route_graph::{Neighbor, RouteGraph};
pub use crate::snapshot::{DeviceRecord, LinkRecord, QosRecord, Snapshot, SnapshotSource, StaticSource};
pub use crate::topology::TopologyGraph;

mod constants;
mod dijkstra;
mod engine;
mod error;
mod heap_item;
mod params;
mod port_path;
mod quality;
mod query;
mod route;
mod route_graph;
mod snapshot;
mod topology;
mod units;
mod yen;

/// Cheapest route from `source` to `target`. Among routes of equal cost the one
/// with the lexicographically smallest node sequence is returned. A node that is
/// not part of the graph cannot be reached, which is reported as `NoRoute`.
pub fn shortest_path(graph: &RouteGraph, source: SwitchId, target: SwitchId) -> Result<Route> {
    Dijkstra::new(graph)
        .calc_path(source, target)
        .map(|item| dijkstra::to_route(graph, item))
        .ok_or_else(|| no_route(source, target))
}

/// Up to `k` loopless routes in non-decreasing cost order, all of them if there
/// are fewer than `k`.
pub fn k_shortest_paths(graph: &RouteGraph, source: SwitchId, target: SwitchId, k: usize) -> Result<Vec<Route>> {
    if k == 0 {
        return Err(RouteError::InvalidArgument("k must be positive, got 0".to_string()));
    }
    let routes: Vec<Route> = yen::k_shortest(graph, source, target, k)
        .into_iter()
        .map(|item| dijkstra::to_route(graph, item))
        .collect();
    if routes.is_empty() {
        return Err(no_route(source, target));
    }
    Ok(routes)
}

/// The shortest route for every ordered pair of nodes, including every node to
/// itself. Unreachable pairs are missing.
pub fn all_pairs_shortest_paths(graph: &RouteGraph) -> BTreeMap<(SwitchId, SwitchId), Route> {
    dijkstra::all_pairs(graph)
}

fn no_route(source: SwitchId, target: SwitchId) -> RouteError {
    RouteError::no_route(format!("s{}", source), format!("s{}", target))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::rngs::StdRng;
    use rand::Rng;
    use rand::SeedableRng;

    use super::*;

    fn random_edges(rng: &mut StdRng, num_nodes: u64, mean_degree: f64) -> Vec<(SwitchId, SwitchId, f64)> {
        let num_edges = (mean_degree * num_nodes as f64 / 2.0) as usize;
        let mut seen = HashSet::new();
        let mut edges = Vec::new();
        for _ in 0..num_edges {
            let a = rng.gen_range(1, num_nodes + 1);
            let b = rng.gen_range(1, num_nodes + 1);
            if a == b || !seen.insert((a.min(b), a.max(b))) {
                continue;
            }
            // integral weights keep the sums exact
            edges.push((a, b, rng.gen_range(1, 6) as f64));
        }
        edges
    }

    fn random_graph(rng: &mut StdRng) -> RouteGraph {
        let num_nodes = rng.gen_range(2, 12);
        let nodes: Vec<SwitchId> = (1..=num_nodes).collect();
        let edges = random_edges(rng, num_nodes, 3.0);
        RouteGraph::from_weighted_edges(&nodes, &edges, Combine::Additive).unwrap()
    }

    #[test]
    fn k_shortest_agrees_with_shortest_on_random_graphs() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let g = random_graph(&mut rng);
            let n = g.num_nodes() as u64;
            let source = rng.gen_range(1, n + 1);
            let target = rng.gen_range(1, n + 1);
            let k = rng.gen_range(1, 6);
            match (shortest_path(&g, source, target), k_shortest_paths(&g, source, target, k)) {
                (Ok(shortest), Ok(routes)) => {
                    assert!(!routes.is_empty() && routes.len() <= k);
                    assert_eq!(shortest, routes[0]);
                    for r in &routes {
                        assert!(shortest.get_cost() <= r.get_cost());
                        assert!(r.is_simple());
                        assert_eq!(source, r.get_source());
                        assert_eq!(target, r.get_target());
                    }
                    for w in routes.windows(2) {
                        assert!(w[0].get_cost() <= w[1].get_cost());
                    }
                    let distinct: HashSet<&Vec<SwitchId>> = routes.iter().map(|r| r.get_nodes()).collect();
                    assert_eq!(routes.len(), distinct.len());
                }
                (Err(RouteError::NoRoute { .. }), Err(RouteError::NoRoute { .. })) => {}
                other => panic!("shortest and k shortest disagree: {:?}", other),
            }
        }
    }

    #[test]
    fn all_pairs_match_single_pair_on_random_graphs() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..30 {
            let g = random_graph(&mut rng);
            let routes = all_pairs_shortest_paths(&g);
            for s in g.nodes() {
                for t in g.nodes() {
                    match shortest_path(&g, s, t) {
                        Ok(route) => assert_eq!(Some(&route), routes.get(&(s, t))),
                        Err(_) => assert!(routes.get(&(s, t)).is_none()),
                    }
                }
            }
        }
    }

    #[test]
    fn port_paths_round_trip_on_random_topologies() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..30 {
            let num_nodes = rng.gen_range(2, 10);
            let mut next_port = vec![1u32; num_nodes as usize + 1];
            let mut links = Vec::new();
            for (a, b, _) in random_edges(&mut rng, num_nodes, 3.0) {
                let pa = next_port[a as usize];
                let pb = next_port[b as usize];
                next_port[a as usize] += 1;
                next_port[b as usize] += 1;
                if rng.gen::<bool>() {
                    links.push(LinkRecord::bidirectional(a, pa, b, pb));
                } else {
                    links.push(LinkRecord::unidirectional(a, pa, b, pb));
                }
            }
            let topology = TopologyGraph::build(&links, 1..=num_nodes).unwrap();
            let g = RouteGraph::hop_count(&topology);
            for (&(s, t), route) in &all_pairs_shortest_paths(&g) {
                let source = ResolvedEndpoint::Switch(s);
                let target = ResolvedEndpoint::Switch(t);
                let path = translate(route, &topology, &source, &target).unwrap();
                let hops = path.hops(false, false);
                assert_eq!(route.num_hops(), hops.len());
                for (a, pa, b, pb) in hops {
                    assert_eq!(Some((pa, pb)), topology.hop_ports(a, b));
                }
            }
        }
    }

    #[test]
    fn three_switch_line() {
        let topology = TopologyGraph::build(
            &[
                LinkRecord::bidirectional(1, 1, 2, 1),
                LinkRecord::bidirectional(2, 2, 3, 1),
            ],
            vec![1, 2, 3],
        )
        .unwrap();
        let g = RouteGraph::hop_count(&topology);
        let route = shortest_path(&g, 1, 3).unwrap();
        assert_eq!(&vec![1, 2, 3], route.get_nodes());
        assert_eq!(2.0, route.get_cost());
        let path = translate(&route, &topology, &ResolvedEndpoint::Switch(1), &ResolvedEndpoint::Switch(3)).unwrap();
        assert_eq!(vec!["s1-eth1", "s2-eth1", "s2-eth2", "s3-eth1"], path.to_strings());
    }

    #[test]
    fn loss_of_a_single_link() {
        let mut snapshot = Snapshot::new();
        snapshot
            .add_link(LinkRecord::bidirectional(1, 1, 2, 1))
            .add_qos(QosRecord::new(1, 1).with_loss("2%"))
            .add_qos(QosRecord::new(2, 1).with_loss("3%"));
        let query = RouteQuery::optimal("s1", "s2", Some("loss")).unwrap();
        let paths = plan(&snapshot, &query, &Params::default()).unwrap();
        assert_eq!(1, paths.len());
        assert!((paths[0].get_cost() - 0.06).abs() < 1e-12);
    }

    #[test]
    fn four_cycle() {
        let g = RouteGraph::from_weighted_edges(
            &[1, 2, 3, 4],
            &[(1, 2, 1.0), (2, 3, 1.0), (3, 4, 1.0), (4, 1, 1.0)],
            Combine::Additive,
        )
        .unwrap();
        let routes = k_shortest_paths(&g, 1, 3, 2).unwrap();
        assert_eq!(2, routes.len());
        assert_ne!(routes[0].get_nodes(), routes[1].get_nodes());
        assert_eq!(routes[0].get_cost(), routes[1].get_cost());

        let line = RouteGraph::from_weighted_edges(&[1, 2, 3], &[(1, 2, 1.0), (2, 3, 1.0)], Combine::Additive).unwrap();
        assert_eq!(1, k_shortest_paths(&line, 1, 3, 2).unwrap().len());
    }

    #[test]
    fn equal_fractional_costs_tie_lexicographically() {
        let g = RouteGraph::from_weighted_edges(
            &[1, 2, 3, 5, 6, 9],
            &[(1, 2, 0.1), (2, 3, 0.2), (3, 9, 0.3), (1, 5, 0.2), (5, 6, 0.3), (6, 9, 0.1)],
            Combine::Additive,
        )
        .unwrap();
        let route = shortest_path(&g, 1, 9).unwrap();
        assert_eq!(&vec![1, 2, 3, 9], route.get_nodes());
        assert!((route.get_cost() - 0.6).abs() < 1e-12);
        let routes = k_shortest_paths(&g, 1, 9, 2).unwrap();
        assert_eq!(&vec![1, 2, 3, 9], routes[0].get_nodes());
        assert_eq!(&vec![1, 5, 6, 9], routes[1].get_nodes());
    }

    #[test]
    fn disjoint_components() {
        let g = RouteGraph::from_weighted_edges(&[1, 2, 3, 4], &[(1, 2, 1.0), (3, 4, 1.0)], Combine::Additive).unwrap();
        match shortest_path(&g, 1, 4) {
            Err(e @ RouteError::NoRoute { .. }) => assert_eq!("s1 to s4 unreachable", e.to_string()),
            other => panic!("unexpected {:?}", other),
        }
        match k_shortest_paths(&g, 1, 4, 3) {
            Err(RouteError::NoRoute { .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unknown_nodes_are_unreachable_and_bad_k() {
        let g = RouteGraph::from_weighted_edges(&[1, 2], &[(1, 2, 1.0)], Combine::Additive).unwrap();
        match shortest_path(&g, 1, 9) {
            Err(e @ RouteError::NoRoute { .. }) => assert_eq!("s1 to s9 unreachable", e.to_string()),
            other => panic!("unexpected {:?}", other),
        }
        match k_shortest_paths(&g, 5, 2, 1) {
            Err(e @ RouteError::NoRoute { .. }) => assert_eq!("s5 to s2 unreachable", e.to_string()),
            other => panic!("unexpected {:?}", other),
        }
        match k_shortest_paths(&g, 1, 2, 0) {
            Err(RouteError::InvalidArgument(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn same_source_and_target() {
        let g = RouteGraph::from_weighted_edges(&[1, 2], &[(1, 2, 1.0)], Combine::Additive).unwrap();
        let route = shortest_path(&g, 2, 2).unwrap();
        assert_eq!(&vec![2], route.get_nodes());
        assert_eq!(0.0, route.get_cost());
        let mut snapshot = Snapshot::new();
        snapshot.add_link(LinkRecord::bidirectional(1, 1, 2, 1));
        let paths = plan(&snapshot, &RouteQuery::shortest("s2", "s2").unwrap(), &Params::default()).unwrap();
        assert_eq!(vec![vec!["s2"]], paths.iter().map(|p| p.to_strings()).collect::<Vec<_>>());
    }
}
