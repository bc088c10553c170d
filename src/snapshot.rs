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
use std::fs::File;
use std::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};

use crate::constants::{AttachmentPoint, HostId, LinkDirection, PortNo, SwitchId};
use crate::error::{Result, RouteError};

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct DeviceRecord {
    pub host: HostId,
    pub attachment: Option<AttachmentPoint>,
}

impl DeviceRecord {
    pub fn attached(host: HostId, switch: SwitchId, port: PortNo) -> Self {
        DeviceRecord {
            host,
            attachment: Some(AttachmentPoint::new(switch, port)),
        }
    }

    pub fn detached(host: HostId) -> Self {
        DeviceRecord {
            host,
            attachment: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct LinkRecord {
    pub src_switch: SwitchId,
    pub src_port: PortNo,
    pub dst_switch: SwitchId,
    pub dst_port: PortNo,
    pub direction: LinkDirection,
}

impl LinkRecord {
    pub fn bidirectional(
        src_switch: SwitchId,
        src_port: PortNo,
        dst_switch: SwitchId,
        dst_port: PortNo,
    ) -> Self {
        LinkRecord {
            src_switch,
            src_port,
            dst_switch,
            dst_port,
            direction: LinkDirection::Bidirectional,
        }
    }

    pub fn unidirectional(
        src_switch: SwitchId,
        src_port: PortNo,
        dst_switch: SwitchId,
        dst_port: PortNo,
    ) -> Self {
        LinkRecord {
            direction: LinkDirection::Unidirectional,
            ..LinkRecord::bidirectional(src_switch, src_port, dst_switch, dst_port)
        }
    }
}

/// Raw telemetry of one switch port, values still carry their unit suffixes.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct QosRecord {
    pub switch: SwitchId,
    pub port: PortNo,
    pub bandwidth: String,
    pub delay: String,
    pub jitter: String,
    pub loss: String,
    pub latency: Option<String>,
}

impl QosRecord {
    pub fn new(switch: SwitchId, port: PortNo) -> Self {
        QosRecord {
            switch,
            port,
            bandwidth: "0bit".to_string(),
            delay: "0us".to_string(),
            jitter: "0us".to_string(),
            loss: "0%".to_string(),
            latency: None,
        }
    }

    pub fn with_bandwidth(mut self, bandwidth: &str) -> Self {
        self.bandwidth = bandwidth.to_string();
        self
    }

    pub fn with_delay(mut self, delay: &str) -> Self {
        self.delay = delay.to_string();
        self
    }

    pub fn with_jitter(mut self, jitter: &str) -> Self {
        self.jitter = jitter.to_string();
        self
    }

    pub fn with_loss(mut self, loss: &str) -> Self {
        self.loss = loss.to_string();
        self
    }

    pub fn with_latency(mut self, latency: &str) -> Self {
        self.latency = Some(latency.to_string());
        self
    }
}

/// A consistent read of everything a route query needs, taken once at the
/// start of the query.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Snapshot {
    /// Switches known to the controller. May be empty, link endpoints and host
    /// attachment switches are always part of the topology.
    pub switches: Vec<SwitchId>,
    pub devices: Vec<DeviceRecord>,
    pub links: Vec<LinkRecord>,
    pub qos: Vec<QosRecord>,
}

impl Snapshot {
    pub fn new() -> Self {
        Snapshot::default()
    }

    pub fn add_switch(&mut self, switch: SwitchId) -> &mut Self {
        self.switches.push(switch);
        self
    }

    pub fn add_link(&mut self, link: LinkRecord) -> &mut Self {
        self.links.push(link);
        self
    }

    pub fn add_device(&mut self, device: DeviceRecord) -> &mut Self {
        self.devices.push(device);
        self
    }

    pub fn add_qos(&mut self, qos: QosRecord) -> &mut Self {
        self.qos.push(qos);
        self
    }

    pub fn switch_ids(&self) -> BTreeSet<SwitchId> {
        let mut ids: BTreeSet<SwitchId> = self.switches.iter().cloned().collect();
        for l in &self.links {
            ids.insert(l.src_switch);
            ids.insert(l.dst_switch);
        }
        for d in &self.devices {
            if let Some(a) = d.attachment {
                ids.insert(a.switch);
            }
        }
        ids
    }

    /// Builds a snapshot from the controller's JSON documents: the device list
    /// (`{"devices": [...]}`), the link list and the optional per-port QoS list.
    pub fn from_controller_json(devices: &str, links: &str, qos: Option<&str>) -> Result<Snapshot> {
        let devices: wire::DeviceList = decode(devices, "device list")?;
        let links: Vec<wire::Link> = decode(links, "link list")?;
        let qos: Vec<wire::Qos> = match qos {
            Some(q) => decode(q, "qos list")?,
            None => Vec::new(),
        };
        let mut snapshot = Snapshot::new();
        for d in devices.devices {
            snapshot.devices.push(d.into_record()?);
        }
        for l in links {
            snapshot.links.push(l.into_record()?);
        }
        for q in qos {
            snapshot.qos.push(q.into_record()?);
        }
        Ok(snapshot)
    }

    pub fn save_to_disk(&self, file_name: &str) -> Result<()> {
        let file = File::create(file_name)?;
        bincode::serialize_into(file, self)?;
        info!(
            "saved snapshot with {} links, {} devices to {}",
            self.links.len(),
            self.devices.len(),
            file_name
        );
        Ok(())
    }

    pub fn load_from_disk(file_name: &str) -> Result<Snapshot> {
        let file = File::open(file_name)?;
        let snapshot: Snapshot = bincode::deserialize_from(file)?;
        info!(
            "loaded snapshot with {} links, {} devices from {}",
            snapshot.links.len(),
            snapshot.devices.len(),
            file_name
        );
        Ok(snapshot)
    }
}

fn decode<'a, T: Deserialize<'a>>(json: &'a str, what: &str) -> Result<T> {
    serde_json::from_str(json)
        .map_err(|e| RouteError::MalformedRecord(format!("cannot read {}: {}", what, e)))
}

/// The controller that owns the topology. Implementations fetch a complete
/// snapshot or fail, they must not retry on their own.
pub trait SnapshotSource {
    fn fetch(&self, timeout: Duration) -> Result<Snapshot>;
}

/// A source that always hands out the same snapshot.
#[derive(Clone, Debug)]
pub struct StaticSource {
    snapshot: Snapshot,
}

impl StaticSource {
    pub fn new(snapshot: Snapshot) -> Self {
        StaticSource { snapshot }
    }
}

impl SnapshotSource for StaticSource {
    fn fetch(&self, _timeout: Duration) -> Result<Snapshot> {
        Ok(self.snapshot.clone())
    }
}

/// The JSON shapes served by the controller's REST API.
mod wire {
    use serde::Deserialize;

    use super::{DeviceRecord, LinkRecord, QosRecord};
    use crate::constants::{parse_colon_hex, AttachmentPoint, LinkDirection, PortNo};
    use crate::error::{Result, RouteError};

    /// Ports and ids are numbers in some controller versions and strings in others.
    #[derive(Deserialize)]
    #[serde(untagged)]
    pub enum Number {
        Int(u64),
        Text(String),
    }

    impl Number {
        pub fn port(&self) -> Result<PortNo> {
            let value = match self {
                Number::Int(i) => *i,
                Number::Text(t) => t.trim().parse::<u64>().map_err(|_| {
                    RouteError::MalformedRecord(format!("invalid port number '{}'", t))
                })?,
            };
            if value > u64::from(std::u32::MAX) {
                return Err(RouteError::MalformedRecord(format!(
                    "port number {} out of range",
                    value
                )));
            }
            Ok(value as PortNo)
        }
    }

    #[derive(Deserialize)]
    pub struct DeviceList {
        pub devices: Vec<Device>,
    }

    #[derive(Deserialize)]
    pub struct Device {
        #[serde(default)]
        pub mac: Vec<Option<String>>,
        #[serde(rename = "attachmentPoint", default)]
        pub attachment_point: Vec<Option<Attachment>>,
    }

    #[derive(Deserialize)]
    pub struct Attachment {
        pub switch: String,
        pub port: Number,
    }

    impl Device {
        pub fn into_record(self) -> Result<DeviceRecord> {
            let mac = self
                .mac
                .iter()
                .filter_map(|m| m.as_ref())
                .last()
                .ok_or_else(|| RouteError::MalformedRecord("device without mac".to_string()))?;
            let host = parse_colon_hex(mac)?;
            let attachment = match self.attachment_point.iter().filter_map(|a| a.as_ref()).next() {
                Some(a) => Some(AttachmentPoint::new(parse_colon_hex(&a.switch)?, a.port.port()?)),
                None => None,
            };
            Ok(DeviceRecord { host, attachment })
        }
    }

    #[derive(Deserialize)]
    pub struct Link {
        #[serde(rename = "src-switch")]
        pub src_switch: String,
        #[serde(rename = "src-port")]
        pub src_port: Number,
        #[serde(rename = "dst-switch")]
        pub dst_switch: String,
        #[serde(rename = "dst-port")]
        pub dst_port: Number,
        #[serde(default)]
        pub direction: Option<String>,
    }

    impl Link {
        pub fn into_record(self) -> Result<LinkRecord> {
            Ok(LinkRecord {
                src_switch: parse_colon_hex(&self.src_switch)?,
                src_port: self.src_port.port()?,
                dst_switch: parse_colon_hex(&self.dst_switch)?,
                dst_port: self.dst_port.port()?,
                direction: LinkDirection::from_controller(self.direction.as_deref()),
            })
        }
    }

    #[derive(Deserialize)]
    pub struct Qos {
        pub switchid: String,
        pub portid: Number,
        pub bandwidth: String,
        pub delay: String,
        pub jitter: String,
        pub loss: String,
        #[serde(default)]
        pub latency: Option<String>,
    }

    impl Qos {
        pub fn into_record(self) -> Result<QosRecord> {
            Ok(QosRecord {
                switch: parse_colon_hex(&self.switchid)?,
                port: self.portid.port()?,
                bandwidth: self.bandwidth,
                delay: self.delay,
                jitter: self.jitter,
                loss: self.loss,
                latency: self.latency,
            })
        }
    }
}
