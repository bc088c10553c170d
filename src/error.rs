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

use thiserror::Error;

use crate::constants::{HostId, PortNo, SwitchId};

pub type Result<T> = std::result::Result<T, RouteError>;

/// Everything that can go wrong while answering a route query. All of these are
/// reported back to the caller, none of them is retried.
#[derive(Error, Debug)]
pub enum RouteError {
    #[error("h{0} is nonexistent")]
    UnknownHost(HostId),

    #[error("s{0} is nonexistent")]
    UnknownSwitch(SwitchId),

    /// `from` and `to` are the endpoint tokens as the caller wrote them.
    #[error("{from} to {to} unreachable")]
    NoRoute { from: String, to: String },

    #[error("no telemetry sample for s{switch}-eth{port}")]
    MissingTelemetry { switch: SwitchId, port: PortNo },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid telemetry value: {0}")]
    InvalidTelemetry(String),

    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("snapshot fetch failed: {0}")]
    Collaborator(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),
}

impl RouteError {
    pub(crate) fn no_route(from: impl ToString, to: impl ToString) -> Self {
        RouteError::NoRoute {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Replaces the switch ids of a `NoRoute` error with the caller's endpoint
    /// tokens, e.g. `h1 to h4 unreachable` instead of `s1 to s3 unreachable`.
    pub(crate) fn with_endpoints(self, from: &str, to: &str) -> Self {
        match self {
            RouteError::NoRoute { .. } => RouteError::no_route(from, to),
            other => other,
        }
    }
}
