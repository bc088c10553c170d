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

use log::debug;
use serde::{Deserialize, Serialize};

use crate::constants::{PortNo, SwitchId, Weight, WEIGHT_MAX, WEIGHT_ZERO};
use crate::error::{Result, RouteError};
use crate::snapshot::QosRecord;
use crate::units::{parse_expecting, Dimension};

/// The metric edges are weighted by.
#[derive(Eq, PartialEq, Clone, Copy, Deserialize, Serialize, Debug, Hash)]
pub enum Criterion {
    #[serde(rename = "hop")]
    HopCount,
    #[serde(rename = "loss")]
    Loss,
    #[serde(rename = "delay")]
    Delay,
    #[serde(rename = "jitter")]
    Jitter,
    #[serde(rename = "latency")]
    Latency,
    #[serde(rename = "bandwidth")]
    Bandwidth,
    #[serde(rename = "total")]
    Composite,
}

impl Criterion {
    pub fn name(&self) -> &'static str {
        match self {
            Criterion::HopCount => "hop",
            Criterion::Loss => "loss",
            Criterion::Delay => "delay",
            Criterion::Jitter => "jitter",
            Criterion::Latency => "latency",
            Criterion::Bandwidth => "bandwidth",
            Criterion::Composite => "total",
        }
    }

    /// How edge weights add up along a path.
    pub fn combine(&self) -> Combine {
        match self {
            Criterion::Loss => Combine::Multiplicative,
            _ => Combine::Additive,
        }
    }

    pub fn needs_telemetry(&self) -> bool {
        *self != Criterion::HopCount
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Criterion {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Criterion> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hop" | "hopcount" | "shortest" => Ok(Criterion::HopCount),
            "loss" => Ok(Criterion::Loss),
            "delay" => Ok(Criterion::Delay),
            "jitter" => Ok(Criterion::Jitter),
            "latency" => Ok(Criterion::Latency),
            "bandwidth" => Ok(Criterion::Bandwidth),
            "total" | "composite" => Ok(Criterion::Composite),
            other => Err(RouteError::InvalidArgument(format!(
                "unknown optimization criterion '{}'",
                other
            ))),
        }
    }
}

/// Path cost combination. Searches always run on non-negative additive weights,
/// multiplicative weights are mapped there and back.
#[derive(Eq, PartialEq, Clone, Copy, Debug)]
pub enum Combine {
    Additive,
    /// Edge weights are loss percentages, a path delivers a packet only if every
    /// edge does: `path loss = 1 - prod(1 - edge loss)`.
    Multiplicative,
}

impl Combine {
    /// The additive weight used during search, `None` if the edge can never carry
    /// traffic and has to be left out.
    pub fn to_search_weight(&self, weight: Weight) -> Option<Weight> {
        if !weight.is_finite() || weight < WEIGHT_ZERO {
            return None;
        }
        match self {
            Combine::Additive => Some(weight),
            Combine::Multiplicative => {
                let fraction = weight / 100.0;
                if fraction >= 1.0 {
                    None
                } else {
                    Some(-(-fraction).ln_1p())
                }
            }
        }
    }

    /// Maps a summed search weight back to a cost in the criterion's unit.
    pub fn from_search_cost(&self, cost: Weight) -> Weight {
        match self {
            Combine::Additive => cost,
            Combine::Multiplicative => -100.0 * (-cost).exp_m1(),
        }
    }
}

/// Coefficients of the composite criterion, see `QualityModel::weight`.
#[derive(PartialEq, Clone, Copy, Deserialize, Serialize, Debug)]
pub struct CompositeWeights {
    /// per microsecond of delay
    pub delay: f64,
    /// per microsecond of jitter
    pub jitter: f64,
    /// per percent of loss
    pub loss: f64,
    /// per unit of inverse bottleneck bandwidth (`1000 / Mbit`)
    pub bandwidth: f64,
}

impl Default for CompositeWeights {
    fn default() -> Self {
        CompositeWeights {
            delay: 1.0,
            jitter: 1.0,
            loss: 1000.0,
            bandwidth: 1.0,
        }
    }
}

/// Parsed telemetry of one switch port.
#[derive(PartialEq, Clone, Copy, Debug)]
pub struct QosSample {
    pub bandwidth_mbit: f64,
    pub delay_us: f64,
    pub jitter_us: f64,
    pub loss_percent: f64,
    pub latency_us: Option<f64>,
}

impl QosSample {
    pub fn parse(record: &QosRecord) -> Result<QosSample> {
        let loss_percent = parse_expecting(&record.loss, Dimension::Percent)?;
        if loss_percent > 100.0 {
            return Err(RouteError::InvalidTelemetry(format!(
                "loss '{}' of s{}-eth{} exceeds 100%",
                record.loss, record.switch, record.port
            )));
        }
        let latency_us = match &record.latency {
            Some(l) => Some(parse_expecting(l, Dimension::Time)?),
            None => None,
        };
        Ok(QosSample {
            bandwidth_mbit: parse_expecting(&record.bandwidth, Dimension::Bandwidth)?,
            delay_us: parse_expecting(&record.delay, Dimension::Time)?,
            jitter_us: parse_expecting(&record.jitter, Dimension::Time)?,
            loss_percent,
            latency_us,
        })
    }

    fn latency_or_delay(&self) -> f64 {
        self.latency_us.unwrap_or(self.delay_us)
    }
}

/// Turns per-port telemetry into edge weights for one criterion.
#[derive(Clone, Debug)]
pub struct QualityModel {
    criterion: Criterion,
    composite: CompositeWeights,
    samples: HashMap<(SwitchId, PortNo), QosSample>,
}

impl QualityModel {
    pub fn new(
        records: &[QosRecord],
        criterion: Criterion,
        composite: CompositeWeights,
    ) -> Result<QualityModel> {
        let mut samples = HashMap::with_capacity(records.len());
        if criterion.needs_telemetry() {
            for r in records {
                let sample = QosSample::parse(r)?;
                // the first sample reported for a port wins
                samples.entry((r.switch, r.port)).or_insert(sample);
            }
        }
        debug!(
            "quality model for criterion {} with {} port samples",
            criterion,
            samples.len()
        );
        Ok(QualityModel {
            criterion,
            composite,
            samples,
        })
    }

    /// Every edge weighs one, no telemetry involved.
    pub fn hop_count() -> QualityModel {
        QualityModel {
            criterion: Criterion::HopCount,
            composite: CompositeWeights::default(),
            samples: HashMap::new(),
        }
    }

    pub fn criterion(&self) -> Criterion {
        self.criterion
    }

    pub fn combine(&self) -> Combine {
        self.criterion.combine()
    }

    pub fn sample(&self, switch: SwitchId, port: PortNo) -> Option<&QosSample> {
        self.samples.get(&(switch, port))
    }

    fn sample_or_missing(&self, switch: SwitchId, port: PortNo) -> Result<&QosSample> {
        self.sample(switch, port)
            .ok_or(RouteError::MissingTelemetry { switch, port })
    }

    /// Weight of the edge between `src_port` of `src` and `dst_port` of `dst`.
    /// `WEIGHT_MAX` means the edge cannot carry traffic (zero bandwidth).
    pub fn weight(
        &self,
        src: SwitchId,
        src_port: PortNo,
        dst: SwitchId,
        dst_port: PortNo,
    ) -> Result<Weight> {
        if !self.criterion.needs_telemetry() {
            return Ok(1.0);
        }
        let a = self.sample_or_missing(src, src_port)?;
        let b = self.sample_or_missing(dst, dst_port)?;
        let weight = match self.criterion {
            Criterion::HopCount => 1.0,
            // joint loss in percent: 2% and 3% give 0.06%
            Criterion::Loss => a.loss_percent * b.loss_percent / 100.0,
            Criterion::Delay => a.delay_us + b.delay_us,
            Criterion::Jitter => a.jitter_us + b.jitter_us,
            Criterion::Latency => a.latency_or_delay() + b.latency_or_delay(),
            Criterion::Bandwidth => inverse_bandwidth(a, b),
            Criterion::Composite => {
                let c = &self.composite;
                let bandwidth = if c.bandwidth == 0.0 {
                    WEIGHT_ZERO
                } else {
                    c.bandwidth * inverse_bandwidth(a, b)
                };
                c.delay * (a.delay_us + b.delay_us)
                    + c.jitter * (a.jitter_us + b.jitter_us)
                    + c.loss * (a.loss_percent + b.loss_percent)
                    + bandwidth
            }
        };
        if weight.is_nan() || weight < WEIGHT_ZERO {
            return Err(RouteError::InvalidTelemetry(format!(
                "weight {} of edge s{}-eth{} -> s{}-eth{}",
                weight, src, src_port, dst, dst_port
            )));
        }
        Ok(weight)
    }
}

fn inverse_bandwidth(a: &QosSample, b: &QosSample) -> Weight {
    let bottleneck = a.bandwidth_mbit.min(b.bandwidth_mbit);
    if bottleneck <= 0.0 {
        WEIGHT_MAX
    } else {
        1000.0 / bottleneck
    }
}
