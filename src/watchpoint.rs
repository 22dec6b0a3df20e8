use crate::{beamline::Beamline, element::ElementId, schema::SchemaCatalog};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

pub const WATCHPOINT_REPORT_PREFIX: &str = "watchpointReport";
const INITIAL_INTENSITY_REPORT: &str = "initialIntensityReport";

/// Name of the report model owned by the watch element with the given id.
pub fn watchpoint_report_name(id: ElementId) -> String {
    format!("{WATCHPOINT_REPORT_PREFIX}{id}")
}

pub fn is_watchpoint_report_name(name: &str) -> bool {
    name.contains(WATCHPOINT_REPORT_PREFIX)
}

/// Report configuration for a freshly dropped watch element: the working
/// initial-intensity report when one exists (so the new report inherits the
/// user's display choices), else that model's schema defaults, overlaid with
/// the watchpoint-report defaults for fields the base does not carry.
pub fn new_watchpoint_report(
    named_models: &HashMap<String, Value>,
    catalog: &SchemaCatalog,
) -> Value {
    let mut report = match named_models.get(INITIAL_INTENSITY_REPORT) {
        Some(Value::Object(base)) => base.clone(),
        _ => catalog.model_defaults(INITIAL_INTENSITY_REPORT),
    };
    for (name, default) in catalog.model_defaults(WATCHPOINT_REPORT_PREFIX) {
        report.entry(name).or_insert(default);
    }
    Value::Object(report)
}

/// Orphan pruning: drop every watchpoint report whose watch element has left
/// the sequence. Creation is eager at insert time, so reconciliation never
/// creates entries; it runs exactly once per commit, never mid-edit.
pub fn reconcile(beamline: &Beamline, named_models: &mut HashMap<String, Value>) {
    let live: HashSet<String> = beamline
        .watch_items()
        .filter_map(|item| item.id)
        .map(watchpoint_report_name)
        .collect();
    named_models.retain(|name, _| !is_watchpoint_report_name(name) || live.contains(name));
}
