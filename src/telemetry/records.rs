//! Canonical telemetry records
//!
//! Every analyzer works on these types only; raw JSON never leaves the
//! normalizer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Scalar attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            AttributeValue::Text(s) => s.trim().parse().ok(),
            AttributeValue::Bool(_) => None,
        }
    }
}

pub type Attributes = BTreeMap<String, AttributeValue>;

/// Return the `domain` part of a `domain.object_id` identifier
pub fn entity_domain(entity_id: &str) -> &str {
    entity_id.split_once('.').map(|(d, _)| d).unwrap_or(entity_id)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub entity_id: String,
    pub state: String,
    pub last_updated: Option<DateTime<Utc>>,
    /// Non-owning back-reference to the owning device
    pub device_id: Option<String>,
    pub attributes: Attributes,
}

impl EntityRecord {
    pub fn domain(&self) -> &str {
        entity_domain(&self.entity_id)
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attribute(key).and_then(AttributeValue::as_str)
    }

    /// Display name, falling back to the identifier
    pub fn friendly_name(&self) -> &str {
        self.attribute_str("friendly_name").unwrap_or(&self.entity_id)
    }

    /// Numeric state, if the state parses as a number
    pub fn numeric_state(&self) -> Option<f64> {
        self.state.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerSource {
    Mains,
    Battery,
    #[default]
    Unknown,
}

/// Zigbee routing role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceRole {
    Coordinator,
    Router,
    EndDevice,
}

impl std::fmt::Display for DeviceRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceRole::Coordinator => write!(f, "coordinator"),
            DeviceRole::Router => write!(f, "router"),
            DeviceRole::EndDevice => write!(f, "end_device"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub id: String,
    pub name: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub power_source: PowerSource,
    /// Set for devices that take part in the Zigbee mesh
    pub mesh_role: Option<DeviceRole>,
    /// Owned entities; the device is the authoritative side of this relation
    pub entity_ids: Vec<String>,
}

impl DeviceRecord {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// One reported radio link between two mesh devices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborLink {
    pub source: String,
    pub target: String,
    /// Link quality indicator, 0-255
    pub lqi: u8,
    /// Received signal strength, dBm; many coordinators only report LQI
    pub rssi: Option<i16>,
    pub source_role: Option<DeviceRole>,
    pub target_role: Option<DeviceRole>,
}

impl NeighborLink {
    /// Unordered endpoint pair, used to merge reports from both ends
    pub fn pair_key(&self) -> (&str, &str) {
        if self.source <= self.target {
            (self.source.as_str(), self.target.as_str())
        } else {
            (self.target.as_str(), self.source.as_str())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerPlatform {
    State,
    NumericState,
    Time,
    Event,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub platform: TriggerPlatform,
    pub entity_ids: Vec<String>,
    /// Accepted previous states; empty matches any
    pub from: Vec<String>,
    /// Accepted new states; empty matches any
    pub to: Vec<String>,
    pub above: Option<f64>,
    pub below: Option<f64>,
    /// Matching key for entity-less triggers (time `at`, event type)
    pub at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub kind: String,
    pub entity_ids: Vec<String>,
    pub state: Option<String>,
}

/// A service call inside an automation's action sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub service: String,
    pub targets: Vec<String>,
    /// Explicit value passed to the service (`option`, `state`, `value`)
    pub value: Option<String>,
    /// Seconds of `delay` steps preceding this call
    pub offset_secs: u64,
}

impl Action {
    /// The state the targets end up in after this call, when it is knowable.
    pub fn resulting_state(&self) -> Option<String> {
        let verb = self
            .service
            .split_once('.')
            .map(|(_, v)| v)
            .unwrap_or(&self.service);
        if let Some(state) = SERVICE_RESULTING_STATES
            .iter()
            .find(|(name, _)| *name == verb)
            .map(|(_, state)| *state)
        {
            return Some(state.to_string());
        }
        self.value.clone()
    }
}

/// Service verb → resulting entity state
const SERVICE_RESULTING_STATES: &[(&str, &str)] = &[
    ("turn_on", "on"),
    ("turn_off", "off"),
    ("open_cover", "open"),
    ("close_cover", "closed"),
    ("open_valve", "open"),
    ("close_valve", "closed"),
    ("lock", "locked"),
    ("unlock", "unlocked"),
    ("open", "open"),
    ("alarm_arm_away", "armed_away"),
    ("alarm_arm_home", "armed_home"),
    ("alarm_arm_night", "armed_night"),
    ("alarm_disarm", "disarmed"),
    ("media_play", "playing"),
    ("media_pause", "paused"),
    ("media_stop", "idle"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationRecord {
    pub id: String,
    pub alias: Option<String>,
    pub triggers: Vec<Trigger>,
    pub conditions: Vec<Condition>,
    pub actions: Vec<Action>,
    /// Every entity identifier mentioned anywhere in the definition
    pub referenced_entities: BTreeSet<String>,
}

impl AutomationRecord {
    pub fn display_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptRecord {
    pub id: String,
    pub referenced_entities: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardRecord {
    pub id: String,
    pub referenced_entities: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergySample {
    pub entity_id: String,
    pub timestamp: DateTime<Utc>,
    pub kwh: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRecord {
    pub entity_id: String,
    pub title: Option<String>,
    pub installed_version: Option<String>,
    pub latest_version: Option<String>,
}

impl UpdateRecord {
    pub fn is_pending(&self) -> bool {
        match (&self.installed_version, &self.latest_version) {
            (Some(installed), Some(latest)) => installed != latest,
            (None, Some(_)) => true,
            _ => false,
        }
    }

    /// Core, supervisor and operating-system updates
    pub fn is_platform(&self) -> bool {
        const PLATFORM_MARKERS: [&str; 3] = ["home_assistant_core", "supervisor", "operating_system"];
        let id = self.entity_id.to_lowercase();
        PLATFORM_MARKERS.iter().any(|m| id.contains(m))
    }

    pub fn display_name(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.entity_id)
    }
}

/// An open item from the repairs panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairRecord {
    pub issue_id: String,
    /// Integration that raised the issue
    pub domain: Option<String>,
    /// Lowercased `critical` / `error` / `warning`
    pub severity: String,
    /// Dismissed by the user
    pub ignored: bool,
    pub is_fixable: bool,
    /// Release in which the underlying problem becomes breaking
    pub breaks_in_version: Option<String>,
}

impl RepairRecord {
    pub fn display_name(&self) -> String {
        match &self.domain {
            Some(domain) => format!("{}/{}", domain, self.issue_id),
            None => self.issue_id.clone(),
        }
    }
}

/// A normalized telemetry snapshot.
///
/// Optional sources are `None` when the telemetry did not include them at
/// all, which is different from an empty list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub captured_at: DateTime<Utc>,
    pub entities: Vec<EntityRecord>,
    pub devices: Vec<DeviceRecord>,
    pub neighbor_links: Option<Vec<NeighborLink>>,
    pub automations: Vec<AutomationRecord>,
    pub scripts: Vec<ScriptRecord>,
    pub dashboards: Vec<DashboardRecord>,
    pub energy_samples: Option<Vec<EnergySample>>,
    pub error_log: Option<Vec<String>>,
    pub updates: Option<Vec<UpdateRecord>>,
    pub repairs: Option<Vec<RepairRecord>>,
}

impl Snapshot {
    /// An empty snapshot captured at the given instant
    pub fn empty(captured_at: DateTime<Utc>) -> Self {
        Self {
            captured_at,
            entities: Vec::new(),
            devices: Vec::new(),
            neighbor_links: None,
            automations: Vec::new(),
            scripts: Vec::new(),
            dashboards: Vec::new(),
            energy_samples: None,
            error_log: None,
            updates: None,
            repairs: None,
        }
    }

    pub fn entity(&self, entity_id: &str) -> Option<&EntityRecord> {
        self.entities.iter().find(|e| e.entity_id == entity_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(service: &str, value: Option<&str>) -> Action {
        Action {
            service: service.to_string(),
            targets: vec!["light.hall".to_string()],
            value: value.map(str::to_string),
            offset_secs: 0,
        }
    }

    #[test]
    fn test_entity_domain() {
        assert_eq!(entity_domain("light.kitchen"), "light");
        assert_eq!(entity_domain("input_boolean.guest_mode"), "input_boolean");
        assert_eq!(entity_domain("malformed"), "malformed");
    }

    #[test]
    fn test_resulting_state_from_service() {
        assert_eq!(action("light.turn_on", None).resulting_state().as_deref(), Some("on"));
        assert_eq!(action("switch.turn_off", None).resulting_state().as_deref(), Some("off"));
        assert_eq!(action("lock.lock", None).resulting_state().as_deref(), Some("locked"));
        assert_eq!(action("light.toggle", None).resulting_state(), None);
        assert_eq!(
            action("input_select.select_option", Some("away")).resulting_state().as_deref(),
            Some("away")
        );
    }

    #[test]
    fn test_link_pair_key_is_unordered() {
        let a = NeighborLink {
            source: "b".into(),
            target: "a".into(),
            lqi: 200,
            rssi: Some(-40),
            source_role: None,
            target_role: None,
        };
        assert_eq!(a.pair_key(), ("a", "b"));
    }

    #[test]
    fn test_update_pending() {
        let update = UpdateRecord {
            entity_id: "update.home_assistant_core_update".into(),
            title: None,
            installed_version: Some("2024.1.0".into()),
            latest_version: Some("2024.2.0".into()),
        };
        assert!(update.is_pending());
        assert!(update.is_platform());

        let current = UpdateRecord {
            latest_version: Some("2024.1.0".into()),
            ..update
        };
        assert!(!current.is_pending());
    }
}
