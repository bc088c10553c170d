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

//! Parsing of the unit-suffixed telemetry strings reported by the controller,
//! e.g. `"100Mbit"`, `"900us"`, `"12ms"` or `"0.01%"`.

use crate::error::{Result, RouteError};

#[derive(Eq, PartialEq, Clone, Copy, Debug)]
pub enum Dimension {
    /// Normalized to Mbit/s.
    Bandwidth,
    /// Normalized to microseconds.
    Time,
    Percent,
    /// A bare number without unit.
    Scalar,
}

#[derive(PartialEq, Clone, Copy, Debug)]
pub struct Quantity {
    pub value: f64,
    pub dimension: Dimension,
}

// Longer suffixes first, "Mbit" must not be read as "bit" and "ms" not as "s".
const UNITS: [(&str, Dimension, f64); 8] = [
    ("Gbit", Dimension::Bandwidth, 1000.0),
    ("Mbit", Dimension::Bandwidth, 1.0),
    ("Kbit", Dimension::Bandwidth, 0.001),
    ("bit", Dimension::Bandwidth, 0.000_001),
    ("us", Dimension::Time, 1.0),
    ("ms", Dimension::Time, 1000.0),
    ("s", Dimension::Time, 1_000_000.0),
    ("%", Dimension::Percent, 1.0),
];

pub fn parse_quantity(raw: &str) -> Result<Quantity> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(RouteError::InvalidTelemetry("empty value".to_string()));
    }
    let (number, dimension, factor) = split_unit(raw)?;
    let value: f64 = number.trim().parse().map_err(|_| {
        RouteError::InvalidTelemetry(format!("'{}' is not a number with a known unit", raw))
    })?;
    if !value.is_finite() || value < 0.0 {
        return Err(RouteError::InvalidTelemetry(format!(
            "'{}' must be a finite non-negative number",
            raw
        )));
    }
    Ok(Quantity {
        value: value * factor,
        dimension,
    })
}

/// Parses a value that must have the given dimension. Bare numbers are accepted
/// and taken to already be in the normalized unit.
pub fn parse_expecting(raw: &str, expected: Dimension) -> Result<f64> {
    let quantity = parse_quantity(raw)?;
    if quantity.dimension == expected || quantity.dimension == Dimension::Scalar {
        Ok(quantity.value)
    } else {
        Err(RouteError::InvalidTelemetry(format!(
            "'{}' has unit {:?}, expected {:?}",
            raw, quantity.dimension, expected
        )))
    }
}

fn split_unit(raw: &str) -> Result<(&str, Dimension, f64)> {
    let unit_start = raw
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '.' || *c == '-' || *c == '+' || *c == 'e'))
        .map(|(i, _)| i);
    let unit_start = match unit_start {
        None => return Ok((raw, Dimension::Scalar, 1.0)),
        Some(i) => i,
    };
    let (number, unit) = raw.split_at(unit_start);
    let unit = unit.trim();
    for (suffix, dimension, factor) in UNITS.iter() {
        if unit == *suffix {
            return Ok((number, *dimension, *factor));
        }
    }
    Err(RouteError::InvalidTelemetry(format!(
        "unknown unit '{}' in '{}'",
        unit, raw
    )))
}
