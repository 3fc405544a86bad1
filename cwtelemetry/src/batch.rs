// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Grouping of one flush chunk into [`FlushBatch`]es.

use cwtelemetry_core::{
    FlushBatch, FlushGroup, RawPoint, TimedValue, Unit,
    datapoint::{KEY_SEPARATOR, sorted_dimension_values},
};
use hashbrown::HashMap;

/// Identity of a flush group: metric name plus sorted dimension values.
///
/// Dimension names are not part of the key.
pub fn group_key(name: &str, dimensions: &cwtelemetry_core::Dimensions) -> String {
    format!(
        "{name}{KEY_SEPARATOR}{}",
        sorted_dimension_values(dimensions)
    )
}

/// Group `chunk` by [`group_key`], preserving first-seen group order and the
/// arrival order of points inside each group.
///
/// A group takes its dimensions and unit from the first point seen for its
/// key; a missing unit becomes [`Unit::None`]. Timestamps are kept exactly as
/// stamped by the collector.
pub fn group_chunk(namespace: &str, chunk: Vec<RawPoint>) -> FlushBatch {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(chunk.len());
    let mut groups: Vec<FlushGroup> = Vec::new();

    for point in chunk {
        let RawPoint {
            name,
            dimensions,
            value,
            unit,
            timestamp,
            ..
        } = point;
        let key = group_key(&name, &dimensions);
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(FlushGroup {
                dimensions,
                points: Vec::new(),
                name,
                namespace: namespace.to_owned(),
                unit: unit.unwrap_or(Unit::None),
            });
            groups.len() - 1
        });
        groups[slot].points.push(TimedValue { timestamp, value });
    }

    FlushBatch { datapoints: groups }
}
