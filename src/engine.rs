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

use std::collections::BTreeSet;
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use stopwatch::Stopwatch;

use crate::constants::SwitchId;
use crate::error::{Result, RouteError};
use crate::params::Params;
use crate::port_path::{translate, PortPath, ResolvedEndpoint};
use crate::quality::{Criterion, QualityModel};
use crate::query::{Endpoint, HostDirectory, QueryKind, RouteQuery};
use crate::route_graph::RouteGraph;
use crate::snapshot::{LinkRecord, Snapshot, SnapshotSource};
use crate::topology::TopologyGraph;

/// The answer to a route query, either the port paths or the reasons there are none.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RouteResponse {
    Success { paths: Vec<Vec<String>> },
    /// Never empty.
    Failure { errors: Vec<String> },
}

impl RouteResponse {
    pub fn from_result(result: Result<Vec<PortPath>>) -> RouteResponse {
        match result {
            Ok(paths) if paths.is_empty() => RouteResponse::Failure {
                errors: vec!["unknown error".to_string()],
            },
            Ok(paths) => RouteResponse::Success {
                paths: paths.iter().map(|p| p.to_strings()).collect(),
            },
            Err(e) => RouteResponse::Failure {
                errors: vec![e.to_string()],
            },
        }
    }

    pub fn is_success(&self) -> bool {
        match self {
            RouteResponse::Success { .. } => true,
            RouteResponse::Failure { .. } => false,
        }
    }
}

/// How long the different planners took for one query.
#[derive(Clone, Debug)]
pub struct TimedRoute {
    pub path: PortPath,
    pub dijkstra: Duration,
    pub all_pairs: Duration,
    pub k_shortest: Duration,
}

/// Answers one query against one snapshot: resolve the endpoints, build and weigh
/// the graph, plan and translate to port paths.
pub fn plan(snapshot: &Snapshot, query: &RouteQuery, params: &Params) -> Result<Vec<PortPath>> {
    let topology = build_topology(snapshot)?;
    let directory = HostDirectory::from_devices(&snapshot.devices);
    let source = directory.resolve(&query.source, &topology)?;
    let target = directory.resolve(&query.target, &topology)?;
    let criterion = match query.kind {
        QueryKind::Shortest | QueryKind::KShortest(_) => params.planning_criterion,
        QueryKind::Optimal(c) => c.unwrap_or(params.criterion),
    };
    let graph = build_route_graph(&topology, snapshot, criterion, params)?;
    let routes = match query.kind {
        QueryKind::KShortest(k) => {
            crate::k_shortest_paths(&graph, source.switch(), target.switch(), k)
        }
        QueryKind::Shortest | QueryKind::Optimal(_) => {
            crate::shortest_path(&graph, source.switch(), target.switch()).map(|r| vec![r])
        }
    }
    .map_err(|e| e.with_endpoints(&query.source.to_string(), &query.target.to_string()))?;
    debug!(
        "{} -> {} ({:?}, criterion {}): {} route(s)",
        query.source,
        query.target,
        query.kind,
        criterion,
        routes.len()
    );
    routes
        .iter()
        .map(|r| translate(r, &topology, &source, &target))
        .collect()
}

/// Port paths between every ordered pair of distinct hosts and every ordered
/// pair of switches, under `Params::planning_criterion`. Unreachable pairs are
/// left out, a switch paired with itself yields the single token `s<N>`.
pub fn all_routes(snapshot: &Snapshot, params: &Params) -> Result<Vec<PortPath>> {
    let topology = build_topology(snapshot)?;
    let directory = HostDirectory::from_devices(&snapshot.devices);
    let graph = build_route_graph(&topology, snapshot, params.planning_criterion, params)?;
    let routes = crate::all_pairs_shortest_paths(&graph);

    let mut hosts = Vec::new();
    for h in directory.hosts() {
        match directory.resolve(&Endpoint::Host(h), &topology) {
            Ok(r) => hosts.push(r),
            Err(e) => warn!("skipping host: {}", e),
        }
    }
    let switches: Vec<ResolvedEndpoint> = topology.nodes().map(ResolvedEndpoint::Switch).collect();

    let mut paths = Vec::new();
    for (endpoints, skip_self) in &[(&hosts, true), (&switches, false)] {
        for src in endpoints.iter() {
            for dst in endpoints.iter() {
                if *skip_self && src == dst {
                    continue;
                }
                if let Some(route) = routes.get(&(src.switch(), dst.switch())) {
                    paths.push(translate(route, &topology, src, dst)?);
                }
            }
        }
    }
    info!(
        "computed {} port paths for {} hosts and {} switches",
        paths.len(),
        hosts.len(),
        switches.len()
    );
    Ok(paths)
}

/// Plans the shortest port path of `query` and measures single pair Dijkstra,
/// all pairs and k shortest paths on the same graph.
pub fn time_route(snapshot: &Snapshot, query: &RouteQuery, params: &Params) -> Result<TimedRoute> {
    let topology = build_topology(snapshot)?;
    let directory = HostDirectory::from_devices(&snapshot.devices);
    let source = directory.resolve(&query.source, &topology)?;
    let target = directory.resolve(&query.target, &topology)?;
    let graph = build_route_graph(&topology, snapshot, params.planning_criterion, params)?;
    let with_endpoints =
        |e: RouteError| e.with_endpoints(&query.source.to_string(), &query.target.to_string());

    let sw = Stopwatch::start_new();
    let route = crate::shortest_path(&graph, source.switch(), target.switch()).map_err(with_endpoints)?;
    let dijkstra = sw.elapsed();

    let sw = Stopwatch::start_new();
    let all_pairs = crate::all_pairs_shortest_paths(&graph);
    let all_pairs_time = sw.elapsed();
    debug!("all pairs: {} routes", all_pairs.len());

    let sw = Stopwatch::start_new();
    crate::k_shortest_paths(&graph, source.switch(), target.switch(), params.timing_k.max(1))
        .map_err(with_endpoints)?;
    let k_shortest = sw.elapsed();

    info!(
        "{} -> {}: dijkstra {:?}, all pairs {:?}, k shortest {:?}",
        query.source, query.target, dijkstra, all_pairs_time, k_shortest
    );
    Ok(TimedRoute {
        path: translate(&route, &topology, &source, &target)?,
        dijkstra,
        all_pairs: all_pairs_time,
        k_shortest,
    })
}

fn build_topology(snapshot: &Snapshot) -> Result<TopologyGraph> {
    let switches = snapshot.switch_ids();
    TopologyGraph::build(&snapshot.links, switches.iter().cloned()).map_err(|e| {
        match inconsistent_link(&snapshot.links, &switches) {
            Some((link, switch)) => {
                warn!(
                    "inconsistent topology snapshot, link s{}-eth{} -> s{}-eth{}: {}",
                    link.src_switch, link.src_port, link.dst_switch, link.dst_port, e
                );
                RouteError::UnknownSwitch(switch)
            }
            None => e,
        }
    })
}

/// The first link the topology cannot be built from, together with the switch
/// it is blamed on: an endpoint missing from `switches`, or the switch of a
/// self loop.
fn inconsistent_link<'a>(
    links: &'a [LinkRecord],
    switches: &BTreeSet<SwitchId>,
) -> Option<(&'a LinkRecord, SwitchId)> {
    links.iter().find_map(|l| {
        if !switches.contains(&l.src_switch) {
            Some((l, l.src_switch))
        } else if !switches.contains(&l.dst_switch) {
            Some((l, l.dst_switch))
        } else if l.src_switch == l.dst_switch {
            Some((l, l.src_switch))
        } else {
            None
        }
    })
}

fn build_route_graph(
    topology: &TopologyGraph,
    snapshot: &Snapshot,
    criterion: Criterion,
    params: &Params,
) -> Result<RouteGraph> {
    if !criterion.needs_telemetry() {
        return Ok(RouteGraph::hop_count(topology));
    }
    let model = QualityModel::new(&snapshot.qos, criterion, params.composite)?;
    RouteGraph::new(topology, &model, params.missing_telemetry)
}

/// Runs route queries against snapshots fetched from a `SnapshotSource`. Holds no
/// state between queries, every query reads its own snapshot exactly once.
pub struct RouteEngine<S> {
    source: S,
    params: Params,
}

impl<S: SnapshotSource> RouteEngine<S> {
    pub fn new(source: S, params: Params) -> Self {
        RouteEngine { source, params }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    fn snapshot(&self) -> Result<Snapshot> {
        self.source.fetch(self.params.fetch_timeout()).map_err(|e| match e {
            RouteError::Collaborator(_) => e,
            other => RouteError::Collaborator(other.to_string()),
        })
    }

    pub fn route(&self, query: &RouteQuery) -> Result<Vec<PortPath>> {
        let snapshot = self.snapshot()?;
        plan(&snapshot, query, &self.params)
    }

    pub fn handle(&self, query: &RouteQuery) -> RouteResponse {
        let result = self.route(query);
        if let Err(e) = &result {
            info!("{} -> {} failed: {}", query.source, query.target, e);
        }
        RouteResponse::from_result(result)
    }

    pub fn all_routes(&self) -> RouteResponse {
        let result = self
            .snapshot()
            .and_then(|snapshot| all_routes(&snapshot, &self.params));
        RouteResponse::from_result(result)
    }

    pub fn time_route(&self, query: &RouteQuery) -> Result<TimedRoute> {
        let snapshot = self.snapshot()?;
        time_route(&snapshot, query, &self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::MissingTelemetryPolicy;
    use crate::snapshot::{DeviceRecord, QosRecord, StaticSource};
    use std::sync::Arc;
    use std::thread;

    /// Two hosts on s1 and s4, two ways through the square:
    ///
    /// ```text
    ///        s2
    ///  h1   /  \   h2
    ///   \ s1    s4 /
    ///       \  /
    ///        s3
    /// ```
    fn square() -> Snapshot {
        let mut s = Snapshot::new();
        s.add_link(LinkRecord::bidirectional(1, 1, 2, 1))
            .add_link(LinkRecord::bidirectional(2, 2, 4, 1))
            .add_link(LinkRecord::bidirectional(1, 2, 3, 1))
            .add_link(LinkRecord::bidirectional(3, 2, 4, 2))
            .add_device(DeviceRecord::attached(1, 1, 3))
            .add_device(DeviceRecord::attached(2, 4, 3));
        // the upper way loses more packets
        for (switch, port, loss) in &[
            (1, 1, "5%"),
            (2, 1, "5%"),
            (2, 2, "5%"),
            (4, 1, "5%"),
            (1, 2, "1%"),
            (3, 1, "1%"),
            (3, 2, "1%"),
            (4, 2, "1%"),
        ] {
            s.add_qos(
                QosRecord::new(*switch, *port)
                    .with_loss(loss)
                    .with_delay("1ms")
                    .with_bandwidth("100Mbit"),
            );
        }
        s
    }

    fn paths(result: Result<Vec<PortPath>>) -> Vec<Vec<String>> {
        result.unwrap().iter().map(|p| p.to_strings()).collect()
    }

    #[test]
    fn shortest_host_to_host() {
        let q = RouteQuery::shortest("h1", "h2").unwrap();
        assert_eq!(
            vec![vec!["h1", "s1-eth3", "s1-eth1", "s2-eth1", "s2-eth2", "s4-eth1", "s4-eth3", "h2"]],
            paths(plan(&square(), &q, &Params::default()))
        );
    }

    #[test]
    fn optimal_route_avoids_lossy_links() {
        let q = RouteQuery::optimal("h1", "h2", None).unwrap();
        let result = plan(&square(), &q, &Params::default()).unwrap();
        assert_eq!(
            vec!["h1", "s1-eth3", "s1-eth2", "s3-eth1", "s3-eth2", "s4-eth2", "s4-eth3", "h2"],
            result[0].to_strings()
        );
        // two edges with 0.01% joint loss each
        let expected = 100.0 * (1.0 - (1.0 - 0.0001f64).powi(2));
        assert!((result[0].get_cost() - expected).abs() < 1e-9);
    }

    #[test]
    fn loss_compounds_along_a_detour() {
        // direct s1 - s2 loses 50%, the detour via s3 loses 26% per link, which is
        // 45.24% end to end although the percentages add up to 52
        let mut s = Snapshot::new();
        s.add_link(LinkRecord::bidirectional(1, 1, 2, 1))
            .add_link(LinkRecord::bidirectional(1, 2, 3, 1))
            .add_link(LinkRecord::bidirectional(3, 2, 2, 2));
        for (switch, port, loss) in &[
            (1, 1, "50%"),
            (2, 1, "100%"),
            (1, 2, "26%"),
            (3, 1, "100%"),
            (3, 2, "100%"),
            (2, 2, "26%"),
        ] {
            s.add_qos(QosRecord::new(*switch, *port).with_loss(loss));
        }
        let q = RouteQuery::optimal("s1", "s2", Some("loss")).unwrap();
        let result = plan(&s, &q, &Params::default()).unwrap();
        assert_eq!(vec!["s1-eth2", "s3-eth1", "s3-eth2", "s2-eth2"], result[0].to_strings());
        assert!((result[0].get_cost() - 45.24).abs() < 1e-9);
        // counting hops the direct link wins
        let q = RouteQuery::shortest("s1", "s2").unwrap();
        assert_eq!(vec![vec!["s1-eth1", "s2-eth1"]], paths(plan(&s, &q, &Params::default())));
    }

    #[test]
    fn k_shortest_switch_to_switch() {
        let q = RouteQuery::k_shortest("s1", "s4", 2).unwrap();
        assert_eq!(
            vec![
                vec!["s1-eth1", "s2-eth1", "s2-eth2", "s4-eth1"],
                vec!["s1-eth2", "s3-eth1", "s3-eth2", "s4-eth2"]
            ],
            paths(plan(&square(), &q, &Params::default()))
        );
    }

    #[test]
    fn same_switch_is_a_single_token() {
        let q = RouteQuery::shortest("s3", "s3").unwrap();
        assert_eq!(vec![vec!["s3"]], paths(plan(&square(), &q, &Params::default())));
    }

    #[test]
    fn errors_use_caller_tokens() {
        let mut snapshot = square();
        snapshot.add_switch(9);
        snapshot.add_device(DeviceRecord::attached(7, 9, 1));
        let q = RouteQuery::shortest("h1", "h7").unwrap();
        match plan(&snapshot, &q, &Params::default()) {
            Err(e @ RouteError::NoRoute { .. }) => assert_eq!("h1 to h7 unreachable", e.to_string()),
            other => panic!("unexpected {:?}", other),
        }
        let q = RouteQuery::shortest("h1", "h8").unwrap();
        match plan(&snapshot, &q, &Params::default()) {
            Err(RouteError::UnknownHost(8)) => {}
            other => panic!("unexpected {:?}", other),
        }
        let q = RouteQuery::shortest("s1", "s5").unwrap();
        match plan(&snapshot, &q, &Params::default()) {
            Err(RouteError::UnknownSwitch(5)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn missing_telemetry_policy() {
        let mut snapshot = square();
        snapshot.qos.retain(|q| !(q.switch == 3 && q.port == 2));
        let q = RouteQuery::optimal("h1", "h2", Some("loss")).unwrap();
        match plan(&snapshot, &q, &Params::default()) {
            Err(RouteError::MissingTelemetry { switch: 3, port: 2 }) => {}
            other => panic!("unexpected {:?}", other),
        }
        // a missing sample off the chosen path aborts just the same
        let mut off_path = square();
        off_path.qos.retain(|q| !(q.switch == 2 && q.port == 1));
        match plan(&off_path, &q, &Params::default()) {
            Err(RouteError::MissingTelemetry { switch: 2, port: 1 }) => {}
            other => panic!("unexpected {:?}", other),
        }
        let lenient = Params::new(Criterion::Loss, MissingTelemetryPolicy::ExcludeEdge);
        let result = paths(plan(&snapshot, &q, &lenient));
        assert_eq!("s2-eth1", result[0][3]);
        // hop count queries do not care about telemetry at all
        let q = RouteQuery::shortest("h1", "h2").unwrap();
        assert!(plan(&snapshot, &q, &Params::default()).is_ok());
    }

    #[test]
    fn self_loop_surfaces_as_unknown_switch() {
        let mut snapshot = square();
        snapshot.add_link(LinkRecord::bidirectional(2, 7, 2, 8));
        let q = RouteQuery::shortest("h1", "h2").unwrap();
        match plan(&snapshot, &q, &Params::default()) {
            Err(RouteError::UnknownSwitch(2)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn inconsistent_links_name_the_right_switch() {
        let switches: BTreeSet<SwitchId> = vec![1, 2, 3].into_iter().collect();
        let links = vec![
            LinkRecord::bidirectional(1, 1, 2, 1),
            LinkRecord::bidirectional(3, 4, 3, 5),
            LinkRecord::bidirectional(1, 2, 8, 1),
        ];
        let (link, switch) = inconsistent_link(&links, &switches).unwrap();
        assert_eq!(3, switch);
        assert_eq!(4, link.src_port);
        let (link, switch) = inconsistent_link(&links[2..], &switches).unwrap();
        assert_eq!(8, switch);
        assert_eq!(2, link.src_port);
        assert!(inconsistent_link(&links[..1], &switches).is_none());
    }

    #[test]
    fn all_routes_covers_hosts_and_switches() {
        let routes = all_routes(&square(), &Params::default()).unwrap();
        // 2 host pairs + 16 switch pairs
        assert_eq!(18, routes.len());
        let strings: Vec<Vec<String>> = routes.iter().map(|p| p.to_strings()).collect();
        assert_eq!(
            vec!["h2", "s4-eth3", "s4-eth1", "s2-eth2", "s2-eth1", "s1-eth1", "s1-eth3", "h1"],
            strings[1]
        );
        assert!(strings.contains(&vec!["s2".to_string()]));
        assert!(strings.contains(&vec![
            "s2-eth1".to_string(),
            "s1-eth1".to_string(),
            "s1-eth2".to_string(),
            "s3-eth1".to_string()
        ]));
    }

    #[test]
    fn time_route_reports_the_shortest_path() {
        let q = RouteQuery::shortest("h1", "s4").unwrap();
        let timed = time_route(&square(), &q, &Params::default()).unwrap();
        assert_eq!(
            vec!["h1", "s1-eth3", "s1-eth1", "s2-eth1", "s2-eth2", "s4-eth1"],
            timed.path.to_strings()
        );
        assert!(timed.all_pairs >= Duration::from_secs(0));
    }

    #[test]
    fn engine_wraps_results() {
        let engine = RouteEngine::new(StaticSource::new(square()), Params::default());
        let ok = engine.handle(&RouteQuery::shortest("s1", "s2").unwrap());
        assert_eq!(
            RouteResponse::Success {
                paths: vec![vec!["s1-eth1".to_string(), "s2-eth1".to_string()]]
            },
            ok
        );
        let failed = engine.handle(&RouteQuery::shortest("h1", "h9").unwrap());
        assert_eq!(
            RouteResponse::Failure {
                errors: vec!["h9 is nonexistent".to_string()]
            },
            failed
        );
        assert!(!failed.is_success());
        assert!(engine.all_routes().is_success());
        assert!(engine.time_route(&RouteQuery::shortest("h1", "h2").unwrap()).is_ok());
    }

    #[test]
    fn response_json_is_tagged() {
        let ok = RouteResponse::Success {
            paths: vec![vec!["s1".to_string()]],
        };
        assert_eq!(
            r#"{"status":"success","paths":[["s1"]]}"#,
            serde_json::to_string(&ok).unwrap()
        );
        let failed = RouteResponse::Failure {
            errors: vec!["h1 to h2 unreachable".to_string()],
        };
        assert_eq!(
            r#"{"status":"failure","errors":["h1 to h2 unreachable"]}"#,
            serde_json::to_string(&failed).unwrap()
        );
    }

    struct FailingSource;

    impl SnapshotSource for FailingSource {
        fn fetch(&self, timeout: Duration) -> Result<Snapshot> {
            Err(RouteError::Collaborator(format!("timed out after {:?}", timeout)))
        }
    }

    #[test]
    fn fetch_failure_is_a_collaborator_error() {
        let params = Params::default().with_fetch_timeout(Duration::from_millis(20));
        let engine = RouteEngine::new(FailingSource, params);
        match engine.route(&RouteQuery::shortest("h1", "h2").unwrap()) {
            Err(RouteError::Collaborator(msg)) => assert!(msg.contains("20ms")),
            other => panic!("unexpected {:?}", other),
        }
        assert!(!engine.handle(&RouteQuery::shortest("h1", "h2").unwrap()).is_success());
    }

    #[test]
    fn queries_run_in_parallel() {
        let engine = Arc::new(RouteEngine::new(StaticSource::new(square()), Params::default()));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    let q = if i % 2 == 0 {
                        RouteQuery::optimal("h1", "h2", None).unwrap()
                    } else {
                        RouteQuery::k_shortest("s1", "s4", 3).unwrap()
                    };
                    engine.handle(&q)
                })
            })
            .collect();
        for h in handles {
            assert!(h.join().unwrap().is_success());
        }
    }
}
