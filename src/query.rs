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

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use log::warn;

use crate::constants::{AttachmentPoint, HostId, SwitchId};
use crate::error::{Result, RouteError};
use crate::port_path::ResolvedEndpoint;
use crate::quality::Criterion;
use crate::snapshot::DeviceRecord;
use crate::topology::TopologyGraph;

/// An endpoint as named by the caller: `h<N>` or `s<N>`.
#[derive(Eq, PartialEq, Clone, Copy, Debug, Hash)]
pub enum Endpoint {
    Host(HostId),
    Switch(SwitchId),
}

impl Endpoint {
    pub fn parse(token: &str) -> Result<Endpoint> {
        let token = token.trim();
        let invalid = || RouteError::InvalidArgument(format!("invalid endpoint '{}', expected h<N> or s<N>", token));
        let (kind, number) = match token.char_indices().nth(1) {
            Some((i, _)) => token.split_at(i),
            None => return Err(invalid()),
        };
        if !number.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let id: u64 = number.parse().map_err(|_| invalid())?;
        match kind {
            "h" | "H" => Ok(Endpoint::Host(id)),
            "s" | "S" => Ok(Endpoint::Switch(id)),
            _ => Err(invalid()),
        }
    }
}

impl FromStr for Endpoint {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Endpoint> {
        Endpoint::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Host(h) => write!(f, "h{}", h),
            Endpoint::Switch(s) => write!(f, "s{}", s),
        }
    }
}

/// Host to attachment point lookup built from the device list.
#[derive(Clone, Debug, Default)]
pub struct HostDirectory {
    hosts: HashMap<HostId, AttachmentPoint>,
}

impl HostDirectory {
    pub fn from_devices(devices: &[DeviceRecord]) -> HostDirectory {
        let mut hosts = HashMap::with_capacity(devices.len());
        for d in devices {
            if let Some(a) = d.attachment {
                // the first attachment reported for a host wins
                hosts.entry(d.host).or_insert(a);
            }
        }
        HostDirectory { hosts }
    }

    pub fn attachment(&self, host: HostId) -> Option<AttachmentPoint> {
        self.hosts.get(&host).cloned()
    }

    /// Hosts in ascending order.
    pub fn hosts(&self) -> Vec<HostId> {
        let mut hosts: Vec<HostId> = self.hosts.keys().cloned().collect();
        hosts.sort();
        hosts
    }

    pub fn resolve(&self, endpoint: &Endpoint, topology: &TopologyGraph) -> Result<ResolvedEndpoint> {
        match *endpoint {
            Endpoint::Switch(s) => {
                if topology.contains(s) {
                    Ok(ResolvedEndpoint::Switch(s))
                } else {
                    Err(RouteError::UnknownSwitch(s))
                }
            }
            Endpoint::Host(h) => {
                let attachment = self.attachment(h).ok_or(RouteError::UnknownHost(h))?;
                if !topology.contains(attachment.switch) {
                    warn!(
                        "h{} is attached to s{} which is not part of the topology",
                        h, attachment.switch
                    );
                    return Err(RouteError::UnknownHost(h));
                }
                Ok(ResolvedEndpoint::Host { host: h, attachment })
            }
        }
    }
}

#[derive(Eq, PartialEq, Clone, Copy, Debug)]
pub enum QueryKind {
    /// Single shortest path under `Params::planning_criterion`.
    Shortest,
    /// Up to k shortest loopless paths under `Params::planning_criterion`.
    KShortest(usize),
    /// Best path under the given criterion, `Params::criterion` if `None`.
    Optimal(Option<Criterion>),
}

#[derive(Eq, PartialEq, Clone, Copy, Debug)]
pub struct RouteQuery {
    pub source: Endpoint,
    pub target: Endpoint,
    pub kind: QueryKind,
}

impl RouteQuery {
    pub fn new(source: Endpoint, target: Endpoint, kind: QueryKind) -> Self {
        RouteQuery { source, target, kind }
    }

    pub fn shortest(source: &str, target: &str) -> Result<RouteQuery> {
        Ok(RouteQuery::new(
            Endpoint::parse(source)?,
            Endpoint::parse(target)?,
            QueryKind::Shortest,
        ))
    }

    pub fn k_shortest(source: &str, target: &str, k: i64) -> Result<RouteQuery> {
        if k <= 0 {
            return Err(RouteError::InvalidArgument(format!("k must be positive, got {}", k)));
        }
        Ok(RouteQuery::new(
            Endpoint::parse(source)?,
            Endpoint::parse(target)?,
            QueryKind::KShortest(k as usize),
        ))
    }

    /// `criterion` is a name like `loss` or `delay`, `None` uses the configured one.
    pub fn optimal(source: &str, target: &str, criterion: Option<&str>) -> Result<RouteQuery> {
        let criterion = match criterion {
            Some(c) => Some(c.parse::<Criterion>()?),
            None => None,
        };
        Ok(RouteQuery::new(
            Endpoint::parse(source)?,
            Endpoint::parse(target)?,
            QueryKind::Optimal(criterion),
        ))
    }
}
