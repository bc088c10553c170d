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

use std::convert::TryFrom;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RouteError};
use crate::quality::{CompositeWeights, Criterion};

/// What to do with a link when one of its ports has no telemetry sample.
#[derive(Eq, PartialEq, Clone, Copy, Deserialize, Serialize, Debug)]
#[serde(rename_all = "snake_case")]
pub enum MissingTelemetryPolicy {
    /// Fail the whole query with `MissingTelemetry`. Every link of the snapshot
    /// is weighed before the search starts, so a gap anywhere aborts, not only
    /// on the ports the route would traverse.
    Abort,
    /// Leave the link out of the search.
    ExcludeEdge,
}

#[derive(PartialEq, Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Params {
    /// Used by optimal-route queries that do not name a criterion.
    pub criterion: Criterion,
    /// Used by shortest and k-shortest queries.
    pub planning_criterion: Criterion,
    pub missing_telemetry: MissingTelemetryPolicy,
    pub composite: CompositeWeights,
    pub fetch_timeout_ms: u64,
    /// k of the k-shortest run measured by `time_route`
    pub timing_k: usize,
}

impl Params {
    pub fn new(criterion: Criterion, missing_telemetry: MissingTelemetryPolicy) -> Self {
        Params {
            criterion,
            missing_telemetry,
            ..Params::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Params> {
        serde_json::from_str(json)
            .map_err(|e| RouteError::InvalidArgument(format!("cannot read params: {}", e)))
    }

    pub fn with_planning_criterion(mut self, criterion: Criterion) -> Self {
        self.planning_criterion = criterion;
        self
    }

    pub fn with_composite(mut self, composite: CompositeWeights) -> Self {
        self.composite = composite;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::max_value());
        self
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

impl Default for Params {
    fn default() -> Self {
        Params {
            criterion: Criterion::Loss,
            planning_criterion: Criterion::HopCount,
            missing_telemetry: MissingTelemetryPolicy::Abort,
            composite: CompositeWeights::default(),
            fetch_timeout_ms: 5000,
            timing_k: 1,
        }
    }
}
