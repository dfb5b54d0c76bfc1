//! Discovery-set harvesting from successful task results (spec §4.6.3).

use crate::results::TaskResult;
use gaf_core::{DiscoveryAxis, DiscoverySets};
use serde_json::Value;

/// Walk each successful task's `data.search_results.results` rows and
/// accumulate values under the three canonical discovery axes.
pub fn harvest(tasks: &[TaskResult], sets: &mut DiscoverySets) {
    for task in tasks.iter().filter(|t| t.success) {
        let Some(results) = task
            .data
            .get("search_results")
            .and_then(|v| v.get("results"))
            .and_then(Value::as_array)
        else {
            continue;
        };
        for row in results {
            let Some(record) = row.as_object() else {
                continue;
            };
            for axis in DiscoveryAxis::ALL {
                if let Some(value) = record.get(axis.record_key()).and_then(Value::as_str) {
                    sets.insert(axis, value);
                }
            }
        }
    }
}
