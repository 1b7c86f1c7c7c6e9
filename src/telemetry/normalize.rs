//! Raw telemetry normalizer
//!
//! Turns loosely-shaped telemetry JSON (live API dumps, ZHA exports, static
//! fixtures) into the canonical records in `records.rs`.
//!
//! Key lookup is tolerant: `entity_id`, `entityId` and `EntityID` all match.
//! Records without an identifier are skipped without producing a finding,
//! and out-of-range radio values are clamped.

use super::records::*;
use super::TelemetryError;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

const LQI_RANGE: (f64, f64) = (0.0, 255.0);
const RSSI_RANGE: (f64, f64) = (-127.0, 0.0);

const ENTITY_REFERENCE_KEYS: [&str; 3] = ["entityid", "entity", "entities"];

/// Normalize a full raw snapshot.
///
/// Fails only when the root is not a JSON object; every nested problem is
/// handled by skipping or clamping.
pub fn normalize_snapshot(raw: &Value) -> Result<Snapshot, TelemetryError> {
    let root = raw
        .as_object()
        .ok_or_else(|| TelemetryError::NotAnObject(json_kind(raw)))?;
    let fields = Fields(root);

    let entities = dedupe_entities(
        fields
            .records(&["entities", "states"])
            .into_iter()
            .filter_map(|(_, v)| normalize_entity(v))
            .collect(),
    );

    let devices: Vec<DeviceRecord> = fields
        .records(&["devices", "device_registry"])
        .into_iter()
        .filter_map(|(key, v)| normalize_device(key, v))
        .collect();

    let neighbor_links = fields
        .get(&["neighbor_links", "neighbors", "neighbor_table", "zigbee_neighbors", "mesh"])
        .filter(|v| !v.is_null())
        .map(normalize_links);

    let (automations, scripts, dashboards) = {
        let known: HashSet<&str> = entities.iter().map(|e| e.entity_id.as_str()).collect();

        let automations: Vec<AutomationRecord> = fields
            .records(&["automations"])
            .into_iter()
            .filter_map(|(key, v)| normalize_automation(key, v, &known))
            .collect();

        let scripts: Vec<ScriptRecord> = fields
            .records(&["scripts"])
            .into_iter()
            .filter_map(|(key, v)| {
                let id = record_id(key, v, "script", &["entity_id", "id", "alias"])?;
                Some(ScriptRecord {
                    id,
                    referenced_entities: collect_entity_references(v, &known),
                })
            })
            .collect();

        let dashboards: Vec<DashboardRecord> = fields
            .records(&["dashboards", "lovelace"])
            .into_iter()
            .filter_map(|(key, v)| {
                let id = record_id(key, v, "", &["id", "url_path", "title"])?;
                Some(DashboardRecord {
                    id,
                    referenced_entities: collect_entity_references(v, &known),
                })
            })
            .collect();

        (automations, scripts, dashboards)
    };

    let energy_samples: Option<Vec<EnergySample>> = fields
        .get(&["energy_samples", "energy"])
        .filter(|v| !v.is_null())
        .map(|v| as_list(v).into_iter().filter_map(normalize_energy_sample).collect());

    let error_log = fields
        .get(&["error_log", "errors", "logs"])
        .filter(|v| !v.is_null())
        .map(normalize_log);

    let updates = fields
        .get(&["updates", "update_status"])
        .filter(|v| !v.is_null())
        .map(|v| as_list(v).into_iter().filter_map(normalize_update).collect());

    let repairs = fields
        .get(&["repairs", "repair_items"])
        .filter(|v| !v.is_null())
        .map(normalize_repairs);

    let captured_at = fields
        .get(&["captured_at", "timestamp", "generated_at"])
        .and_then(parse_timestamp)
        .unwrap_or_else(|| derive_capture_time(&entities, energy_samples.as_deref()));

    let snapshot = Snapshot {
        captured_at,
        entities,
        devices,
        neighbor_links,
        automations,
        scripts,
        dashboards,
        energy_samples,
        error_log,
        updates,
        repairs,
    };

    debug!(
        "Normalized snapshot: {} entities, {} devices, {} automations, {} scripts, {} dashboards",
        snapshot.entities.len(),
        snapshot.devices.len(),
        snapshot.automations.len(),
        snapshot.scripts.len(),
        snapshot.dashboards.len()
    );

    Ok(snapshot)
}

/// Case- and separator-insensitive view over a JSON object
struct Fields<'a>(&'a Map<String, Value>);

impl<'a> Fields<'a> {
    fn get(&self, keys: &[&str]) -> Option<&'a Value> {
        for key in keys {
            if let Some(v) = self.0.get(*key) {
                return Some(v);
            }
        }
        for key in keys {
            let wanted = canonical_key(key);
            if let Some((_, v)) = self.0.iter().find(|(k, _)| canonical_key(k) == wanted) {
                return Some(v);
            }
        }
        None
    }

    fn string(&self, keys: &[&str]) -> Option<String> {
        self.get(keys).and_then(scalar_string)
    }

    fn number(&self, keys: &[&str]) -> Option<f64> {
        self.get(keys).and_then(scalar_number)
    }

    fn object(&self, keys: &[&str]) -> Option<Fields<'a>> {
        self.get(keys).and_then(Value::as_object).map(Fields)
    }

    /// Items of a collection that may be a list or a keyed map
    fn records(&self, keys: &[&str]) -> Vec<(Option<&'a str>, &'a Value)> {
        match self.get(keys) {
            Some(Value::Array(items)) => items.iter().map(|v| (None, v)).collect(),
            Some(Value::Object(map)) => map.iter().map(|(k, v)| (Some(k.as_str()), v)).collect(),
            _ => Vec::new(),
        }
    }
}

fn canonical_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn scalar_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

fn as_list(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

/// Strings, or lists of strings
fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_string).collect(),
        Some(v) => scalar_string(v)
            .map(|s| {
                s.split(',')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect()
            })
            .unwrap_or_default(),
        None => Vec::new(),
    }
}

/// Resolve a record identifier from its fields, or from the map key it was
/// stored under (prefixed with `domain.` when the key is a bare object id).
fn record_id(map_key: Option<&str>, value: &Value, domain: &str, keys: &[&str]) -> Option<String> {
    let from_fields = value.as_object().and_then(|o| Fields(o).string(keys));
    from_fields.or_else(|| {
        let key = map_key?.trim();
        if key.is_empty() {
            None
        } else if domain.is_empty() || key.contains('.') {
            Some(key.to_string())
        } else {
            Some(format!("{}.{}", domain, key))
        }
    })
}

/// Parse RFC 3339, naive `YYYY-MM-DD HH:MM:SS`, or Unix seconds/millis
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
                if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                    return Some(naive.and_utc());
                }
            }
            s.parse::<f64>().ok().and_then(timestamp_from_number)
        }
        Value::Number(n) => n.as_f64().and_then(timestamp_from_number),
        _ => None,
    }
}

fn timestamp_from_number(n: f64) -> Option<DateTime<Utc>> {
    if !n.is_finite() || n < 0.0 {
        return None;
    }
    let secs = if n > 1e12 { n / 1000.0 } else { n };
    let whole = secs.trunc();
    let nanos = ((secs - whole) * 1e9) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
}

fn derive_capture_time(entities: &[EntityRecord], energy: Option<&[EnergySample]>) -> DateTime<Utc> {
    let latest_entity = entities.iter().filter_map(|e| e.last_updated).max();
    let latest_sample = energy.and_then(|s| s.iter().map(|x| x.timestamp).max());
    latest_entity
        .into_iter()
        .chain(latest_sample)
        .max()
        .unwrap_or_default()
}

fn normalize_entity(value: &Value) -> Option<EntityRecord> {
    let fields = Fields(value.as_object()?);
    let entity_id = fields.string(&["entity_id", "entity"])?;

    let mut attributes = Attributes::new();
    if let Some(raw_attrs) = fields.get(&["attributes"]).and_then(Value::as_object) {
        for (key, raw) in raw_attrs {
            let value = match raw {
                Value::Bool(b) => AttributeValue::Bool(*b),
                Value::Number(n) => match n.as_f64() {
                    Some(f) => AttributeValue::Number(f),
                    None => continue,
                },
                Value::String(s) => AttributeValue::Text(s.clone()),
                _ => continue,
            };
            attributes.insert(key.clone(), value);
        }
    }

    Some(EntityRecord {
        entity_id,
        state: fields.string(&["state"]).unwrap_or_else(|| "unknown".to_string()),
        last_updated: fields
            .get(&["last_updated", "last_changed", "last_reported"])
            .and_then(parse_timestamp),
        device_id: fields.string(&["device_id", "device"]),
        attributes,
    })
}

fn dedupe_entities(entities: Vec<EntityRecord>) -> Vec<EntityRecord> {
    let mut seen = HashSet::new();
    let before = entities.len();
    let unique: Vec<EntityRecord> = entities
        .into_iter()
        .filter(|e| seen.insert(e.entity_id.clone()))
        .collect();
    if unique.len() < before {
        debug!("Dropped {} duplicate entity records", before - unique.len());
    }
    unique
}

fn parse_power_source(raw: &str) -> PowerSource {
    let lower = raw.to_lowercase();
    if lower.contains("mains") {
        PowerSource::Mains
    } else if lower.contains("battery") {
        PowerSource::Battery
    } else {
        PowerSource::Unknown
    }
}

pub(crate) fn parse_role(raw: &str) -> Option<DeviceRole> {
    let key = canonical_key(raw);
    if key.contains("coordinator") {
        Some(DeviceRole::Coordinator)
    } else if key.contains("router") {
        Some(DeviceRole::Router)
    } else if key.contains("end") {
        Some(DeviceRole::EndDevice)
    } else {
        None
    }
}

fn normalize_device(map_key: Option<&str>, value: &Value) -> Option<DeviceRecord> {
    let obj = value.as_object()?;
    let fields = Fields(obj);
    let id = record_id(map_key, value, "", &["id", "device_id", "ieee"])?;

    let entity_ids = match fields.get(&["entities", "entity_ids"]) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(o) => Fields(o).string(&["entity_id"]),
                other => scalar_string(other),
            })
            .collect(),
        other => string_list(other),
    };

    Some(DeviceRecord {
        id,
        name: fields.string(&["name_by_user", "name", "user_given_name"]),
        manufacturer: fields.string(&["manufacturer"]),
        model: fields.string(&["model"]),
        power_source: fields
            .string(&["power_source"])
            .map(|s| parse_power_source(&s))
            .unwrap_or_default(),
        mesh_role: fields
            .string(&["mesh_role", "zigbee_role", "device_type", "role"])
            .and_then(|s| parse_role(&s)),
        entity_ids,
    })
}

fn clamp_radio(raw: f64, (min, max): (f64, f64), what: &str) -> f64 {
    let clamped = raw.round().clamp(min, max);
    if clamped != raw.round() {
        debug!("Clamped {} value {} to {}", what, raw, clamped);
    }
    clamped
}

fn build_link(
    source: String,
    target: String,
    lqi: Option<f64>,
    rssi: Option<f64>,
    source_role: Option<DeviceRole>,
    target_role: Option<DeviceRole>,
) -> Option<NeighborLink> {
    if source == target {
        return None;
    }
    let lqi = clamp_radio(lqi?, LQI_RANGE, "LQI") as u8;
    let rssi = rssi.map(|r| clamp_radio(r, RSSI_RANGE, "RSSI") as i16);
    Some(NeighborLink {
        source,
        target,
        lqi,
        rssi,
        source_role,
        target_role,
    })
}

/// Accepts a flat link list or per-device neighbor tables (ZHA style:
/// `{ieee, device_type, neighbors: [{ieee, lqi, ...}]}`).
fn normalize_links(value: &Value) -> Vec<NeighborLink> {
    let items = match value {
        Value::Object(o) => Fields(o)
            .get(&["links", "devices"])
            .map(as_list)
            .unwrap_or_default(),
        other => as_list(other),
    };

    let mut links = Vec::new();
    for item in items {
        let Some(obj) = item.as_object() else { continue };
        let fields = Fields(obj);

        if let Some(neighbors) = fields.get(&["neighbors"]).and_then(Value::as_array) {
            let Some(source) = fields.string(&["ieee", "id", "device_id", "source"]) else {
                continue;
            };
            let source_role = fields
                .string(&["device_type", "role", "mesh_role"])
                .and_then(|s| parse_role(&s));
            for neighbor in neighbors.iter().filter_map(Value::as_object) {
                let n = Fields(neighbor);
                let Some(target) = n.string(&["ieee", "id", "device_id", "target"]) else {
                    continue;
                };
                links.extend(build_link(
                    source.clone(),
                    target,
                    n.number(&["lqi", "link_quality"]),
                    n.number(&["rssi"]),
                    source_role,
                    n.string(&["device_type", "role"]).and_then(|s| parse_role(&s)),
                ));
            }
        } else {
            let (Some(source), Some(target)) = (
                fields.string(&["source", "device_a", "from", "source_ieee"]),
                fields.string(&["target", "device_b", "to", "neighbor", "target_ieee"]),
            ) else {
                continue;
            };
            links.extend(build_link(
                source,
                target,
                fields.number(&["lqi", "link_quality"]),
                fields.number(&["rssi"]),
                fields
                    .string(&["source_role", "role_a"])
                    .and_then(|s| parse_role(&s)),
                fields
                    .string(&["target_role", "role_b"])
                    .and_then(|s| parse_role(&s)),
            ));
        }
    }
    links
}

fn parse_platform(raw: &str) -> TriggerPlatform {
    match canonical_key(raw).as_str() {
        "state" => TriggerPlatform::State,
        "numericstate" => TriggerPlatform::NumericState,
        "time" => TriggerPlatform::Time,
        "event" => TriggerPlatform::Event,
        _ => TriggerPlatform::Other(raw.to_lowercase()),
    }
}

fn normalize_trigger(value: &Value) -> Option<Trigger> {
    let fields = Fields(value.as_object()?);
    let platform = fields
        .string(&["platform", "trigger"])
        .map(|p| parse_platform(&p))
        .unwrap_or(TriggerPlatform::State);
    Some(Trigger {
        platform,
        entity_ids: string_list(fields.get(&["entity_id"])),
        from: string_list(fields.get(&["from"])),
        to: string_list(fields.get(&["to"])),
        above: fields.number(&["above"]),
        below: fields.number(&["below"]),
        at: fields.string(&["at", "event_type"]),
    })
}

fn normalize_condition(value: &Value) -> Option<Condition> {
    let fields = Fields(value.as_object()?);
    Some(Condition {
        kind: fields
            .string(&["condition"])
            .unwrap_or_else(|| "unknown".to_string()),
        entity_ids: string_list(fields.get(&["entity_id"])),
        state: fields.string(&["state"]),
    })
}

/// Parse a `delay` value: seconds, `HH:MM:SS`, or `{hours, minutes, seconds}`
fn parse_delay(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| *v > 0.0).map(|v| v as u64).unwrap_or(0),
        Value::String(s) => {
            let parts: Vec<f64> = s
                .trim()
                .split(':')
                .map(|p| p.trim().parse::<f64>())
                .collect::<Result<_, _>>()
                .unwrap_or_default();
            parts
                .iter()
                .rev()
                .zip([1.0, 60.0, 3600.0])
                .map(|(v, mult)| v * mult)
                .sum::<f64>()
                .max(0.0) as u64
        }
        Value::Object(o) => {
            let f = Fields(o);
            let total = f.number(&["hours"]).unwrap_or(0.0) * 3600.0
                + f.number(&["minutes"]).unwrap_or(0.0) * 60.0
                + f.number(&["seconds"]).unwrap_or(0.0)
                + f.number(&["milliseconds"]).unwrap_or(0.0) / 1000.0;
            total.max(0.0) as u64
        }
        _ => 0,
    }
}

fn action_targets(fields: &Fields<'_>) -> Vec<String> {
    let mut targets = string_list(fields.get(&["entity_id"]));
    for container in [&["target"][..], &["data", "service_data"][..]] {
        if let Some(inner) = fields.object(container) {
            targets.extend(string_list(inner.get(&["entity_id"])));
        }
    }
    let mut seen = HashSet::new();
    targets.retain(|t| seen.insert(t.clone()));
    targets
}

/// Flatten an action sequence into service calls, tracking `delay` offsets
fn collect_actions(steps: &[&Value], offset: &mut u64, out: &mut Vec<Action>) {
    for step in steps {
        let Some(obj) = step.as_object() else { continue };
        let fields = Fields(obj);

        if let Some(delay) = fields.get(&["delay"]) {
            *offset = offset.saturating_add(parse_delay(delay));
        }

        let service = fields
            .string(&["service", "action"])
            .filter(|s| s.contains('.'));
        if let Some(service) = service {
            let value = fields
                .object(&["data", "service_data"])
                .and_then(|d| d.string(&["option", "state", "value"]))
                .or_else(|| fields.string(&["option"]));
            out.push(Action {
                service,
                targets: action_targets(&fields),
                value,
                offset_secs: *offset,
            });
        }

        for nested_key in ["sequence", "then", "else", "default", "parallel"] {
            if let Some(nested) = obj.get(nested_key) {
                collect_actions(&as_list(nested), offset, out);
            }
        }
        if let Some(choices) = obj.get("choose") {
            for choice in as_list(choices) {
                if let Some(seq) = choice.get("sequence") {
                    collect_actions(&as_list(seq), offset, out);
                }
            }
        }
    }
}

fn normalize_automation(
    map_key: Option<&str>,
    value: &Value,
    known: &HashSet<&str>,
) -> Option<AutomationRecord> {
    let obj = value.as_object()?;
    let fields = Fields(obj);
    let id = record_id(map_key, value, "automation", &["entity_id", "id", "alias"])?;

    // State-object form keeps the config under `attributes`
    let alias = fields.string(&["alias", "friendly_name"]).or_else(|| {
        fields
            .object(&["attributes"])
            .and_then(|a| a.string(&["friendly_name"]))
    });

    let triggers = fields
        .get(&["triggers", "trigger"])
        .map(|v| as_list(v).into_iter().filter_map(normalize_trigger).collect())
        .unwrap_or_default();
    let conditions = fields
        .get(&["conditions", "condition"])
        .map(|v| as_list(v).into_iter().filter_map(normalize_condition).collect())
        .unwrap_or_default();
    let mut actions = Vec::new();
    if let Some(steps) = fields.get(&["actions", "action", "sequence"]).filter(|v| !v.is_string()) {
        let mut offset = 0;
        collect_actions(&as_list(steps), &mut offset, &mut actions);
    }

    let mut referenced_entities = collect_entity_references(value, known);
    referenced_entities.remove(&id);

    Some(AutomationRecord {
        id,
        alias,
        triggers,
        conditions,
        actions,
        referenced_entities,
    })
}

fn looks_like_entity_id(s: &str) -> bool {
    match s.split_once('.') {
        Some((domain, object_id)) => {
            !domain.is_empty()
                && !object_id.is_empty()
                && domain.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
                && !object_id.chars().any(char::is_whitespace)
                && !s.contains("{{")
        }
        None => false,
    }
}

/// Entity identifiers a definition mentions: every string stored under an
/// `entity_id` / `entity` / `entities` key, plus any other string value
/// equal to a known entity (`camera_image`, `service_data` fields, ...).
/// Matching is exact and case-sensitive; templates are not expanded.
pub fn collect_entity_references(value: &Value, known: &HashSet<&str>) -> BTreeSet<String> {
    fn push_strings(value: &Value, out: &mut BTreeSet<String>) {
        match value {
            Value::String(s) => {
                for part in s.split(',').map(str::trim) {
                    if looks_like_entity_id(part) {
                        out.insert(part.to_string());
                    }
                }
            }
            Value::Array(items) => {
                for item in items {
                    push_strings(item, out);
                }
            }
            _ => {}
        }
    }

    fn walk(value: &Value, known: &HashSet<&str>, out: &mut BTreeSet<String>) {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    if ENTITY_REFERENCE_KEYS.contains(&canonical_key(key).as_str()) {
                        push_strings(child, out);
                    }
                    walk(child, known, out);
                }
            }
            Value::Array(items) => {
                for item in items {
                    walk(item, known, out);
                }
            }
            Value::String(s) if known.contains(s.as_str()) => {
                out.insert(s.clone());
            }
            _ => {}
        }
    }

    let mut out = BTreeSet::new();
    walk(value, known, &mut out);
    out
}

fn normalize_energy_sample(value: &Value) -> Option<EnergySample> {
    let fields = Fields(value.as_object()?);
    let entity_id = fields.string(&["entity_id", "device_id", "device", "statistic_id", "stat_id"])?;
    let timestamp = fields
        .get(&["timestamp", "start", "time", "period_start"])
        .and_then(parse_timestamp)?;
    let mut kwh = fields.number(&["kwh", "value", "energy", "consumption", "change"])?;

    if let Some(unit) = fields.string(&["unit", "unit_of_measurement"]) {
        if unit.eq_ignore_ascii_case("wh") {
            kwh /= 1000.0;
        }
    }
    if kwh < 0.0 {
        debug!("Clamped negative energy sample for {} to 0", entity_id);
        kwh = 0.0;
    }

    Some(EnergySample {
        entity_id,
        timestamp,
        kwh,
    })
}

/// Log lines from a text blob, a list of lines, or system-log entries
/// (`{name, level, message, timestamp}`), rendered in the standard
/// `<date> <time> <LEVEL> (<thread>) [<logger>] <message>` layout.
fn normalize_log(value: &Value) -> Vec<String> {
    let mut lines = Vec::new();
    for item in as_list(value) {
        match item {
            Value::String(text) => lines.extend(
                text.lines()
                    .map(str::trim_end)
                    .filter(|l| !l.trim().is_empty())
                    .map(str::to_string),
            ),
            Value::Object(o) => {
                let f = Fields(o);
                let message = match f.get(&["message"]) {
                    Some(Value::Array(parts)) => parts
                        .iter()
                        .filter_map(scalar_string)
                        .collect::<Vec<_>>()
                        .join(" "),
                    Some(other) => scalar_string(other).unwrap_or_default(),
                    None => continue,
                };
                let level = f
                    .string(&["level"])
                    .unwrap_or_else(|| "ERROR".to_string())
                    .to_uppercase();
                let logger = f
                    .string(&["name", "logger", "source"])
                    .unwrap_or_else(|| "unknown".to_string());
                let when = f
                    .get(&["timestamp", "time"])
                    .and_then(parse_timestamp)
                    .unwrap_or_default();
                lines.push(format!(
                    "{} {} (MainThread) [{}] {}",
                    when.format("%Y-%m-%d %H:%M:%S%.3f"),
                    level,
                    logger,
                    message
                ));
            }
            _ => {}
        }
    }
    lines
}

fn normalize_update(value: &Value) -> Option<UpdateRecord> {
    let fields = Fields(value.as_object()?);
    let entity_id = fields.string(&["entity_id", "id", "name"])?;
    let attrs = fields.object(&["attributes"]);
    let lookup = |keys: &[&str]| {
        fields
            .string(keys)
            .or_else(|| attrs.as_ref().and_then(|a| a.string(keys)))
    };
    Some(UpdateRecord {
        title: lookup(&["title", "friendly_name"]),
        installed_version: lookup(&["installed_version", "current_version", "installed"]),
        latest_version: lookup(&["latest_version", "available_version", "latest"]),
        entity_id,
    })
}

/// Repair issues as a list, or wrapped the way the repairs API returns
/// them (`{"issues": [...]}`)
fn normalize_repairs(value: &Value) -> Vec<RepairRecord> {
    let items = match value {
        Value::Object(o) => Fields(o).get(&["issues", "items"]).map(as_list).unwrap_or_default(),
        other => as_list(other),
    };
    items.into_iter().filter_map(normalize_repair).collect()
}

fn normalize_repair(value: &Value) -> Option<RepairRecord> {
    let fields = Fields(value.as_object()?);
    let issue_id = fields.string(&["issue_id", "id", "translation_key"])?;
    let flag = |keys: &[&str]| fields.get(keys).and_then(Value::as_bool).unwrap_or(false);
    let dismissed = fields
        .get(&["dismissed_version"])
        .is_some_and(|v| !v.is_null());
    Some(RepairRecord {
        domain: fields.string(&["domain", "integration"]),
        severity: fields
            .string(&["severity"])
            .map(|s| s.to_lowercase())
            .unwrap_or_else(|| "warning".to_string()),
        ignored: flag(&["ignored"]) || dismissed,
        is_fixable: flag(&["is_fixable", "fixable"]),
        breaks_in_version: fields.string(&["breaks_in_ha_version", "breaks_in_version"]),
        issue_id,
    })
}
