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

use crate::constants::{AttachmentPoint, HostId, PortNo, SwitchId, Weight};
use crate::error::{Result, RouteError};
use crate::route::Route;
use crate::topology::TopologyGraph;

/// One element of a port path.
#[derive(Eq, PartialEq, Clone, Copy, Deserialize, Serialize, Debug, Hash)]
pub enum PortToken {
    /// `h<N>`
    Host(HostId),
    /// `s<N>-eth<P>`
    SwitchPort { switch: SwitchId, port: PortNo },
    /// `s<N>`, only used for the route from a switch to itself
    Switch(SwitchId),
}

impl fmt::Display for PortToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortToken::Host(h) => write!(f, "h{}", h),
            PortToken::SwitchPort { switch, port } => write!(f, "s{}-eth{}", switch, port),
            PortToken::Switch(s) => write!(f, "s{}", s),
        }
    }
}

/// A query endpoint after name resolution: either a switch, or a host together
/// with the switch port it is attached to.
#[derive(Eq, PartialEq, Clone, Copy, Debug)]
pub enum ResolvedEndpoint {
    Switch(SwitchId),
    Host {
        host: HostId,
        attachment: AttachmentPoint,
    },
}

impl ResolvedEndpoint {
    /// The switch the path search starts or ends at.
    pub fn switch(&self) -> SwitchId {
        match self {
            ResolvedEndpoint::Switch(s) => *s,
            ResolvedEndpoint::Host { attachment, .. } => attachment.switch,
        }
    }

    pub fn is_host(&self) -> bool {
        match self {
            ResolvedEndpoint::Switch(_) => false,
            ResolvedEndpoint::Host { .. } => true,
        }
    }
}

/// The physical interfaces a route traverses, in order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortPath {
    tokens: Vec<PortToken>,
    cost: Weight,
}

impl PortPath {
    pub fn get_tokens(&self) -> &Vec<PortToken> {
        &self.tokens
    }

    /// Cost of the underlying switch route.
    pub fn get_cost(&self) -> Weight {
        self.cost
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.tokens.iter().map(|t| t.to_string()).collect()
    }

    /// The switch ports of the path, host tokens left out.
    pub fn switch_ports(&self) -> Vec<AttachmentPoint> {
        self.tokens
            .iter()
            .filter_map(|t| match t {
                PortToken::SwitchPort { switch, port } => Some(AttachmentPoint::new(*switch, *port)),
                _ => None,
            })
            .collect()
    }

    /// Reads the inter-switch hops back as `(src, src port, dst, dst port)`,
    /// skipping the attachment ports of host endpoints.
    pub fn hops(&self, source_is_host: bool, target_is_host: bool) -> Vec<(SwitchId, PortNo, SwitchId, PortNo)> {
        let ports = self.switch_ports();
        let start = if source_is_host { 1 } else { 0 };
        let end = if target_is_host {
            ports.len().saturating_sub(1)
        } else {
            ports.len()
        };
        if start >= end {
            return Vec::new();
        }
        ports[start..end]
            .chunks(2)
            .filter(|c| c.len() == 2)
            .map(|c| (c[0].switch, c[0].port, c[1].switch, c[1].port))
            .collect()
    }
}

impl fmt::Display for PortPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_strings().join("->"))
    }
}

/// Translates a switch route into the interfaces it traverses:
/// `[h_src, s_src-eth<attach>]? (s_a-eth<egress>, s_b-eth<ingress>)* [s_dst-eth<attach>, h_dst]?`
pub fn translate(
    route: &Route,
    topology: &TopologyGraph,
    source: &ResolvedEndpoint,
    target: &ResolvedEndpoint,
) -> Result<PortPath> {
    let nodes = route.get_nodes();
    if nodes.first() != Some(&source.switch()) || nodes.last() != Some(&target.switch()) {
        return Err(RouteError::InvalidArgument(format!(
            "route {:?} does not connect s{} and s{}",
            nodes,
            source.switch(),
            target.switch()
        )));
    }
    let mut tokens = Vec::with_capacity(2 * nodes.len() + 2);
    if let ResolvedEndpoint::Host { host, attachment } = source {
        tokens.push(PortToken::Host(*host));
        tokens.push(PortToken::SwitchPort {
            switch: attachment.switch,
            port: attachment.port,
        });
    }
    for (from, to) in route.hops() {
        let (egress, ingress) = topology
            .hop_ports(from, to)
            .ok_or_else(|| RouteError::no_route(format!("s{}", from), format!("s{}", to)))?;
        tokens.push(PortToken::SwitchPort {
            switch: from,
            port: egress,
        });
        tokens.push(PortToken::SwitchPort {
            switch: to,
            port: ingress,
        });
    }
    if let ResolvedEndpoint::Host { host, attachment } = target {
        tokens.push(PortToken::SwitchPort {
            switch: attachment.switch,
            port: attachment.port,
        });
        tokens.push(PortToken::Host(*host));
    }
    if tokens.is_empty() {
        // switch to the same switch
        tokens.push(PortToken::Switch(source.switch()));
    }
    Ok(PortPath {
        tokens,
        cost: route.get_cost(),
    })
}
