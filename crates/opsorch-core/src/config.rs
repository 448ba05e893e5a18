use crate::{CoreError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Untyped configuration handed to a provider constructor.
///
/// Constructors call [`ProviderConfig::parse`] to turn the bag into their own
/// typed configuration; nothing past the constructor sees the raw map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderConfig(Map<String, Value>);

impl ProviderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a raw JSON object; blank input and `null` yield an empty bag.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Self::new());
        }
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| CoreError::ConfigurationDecode(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::new()),
            other => Err(CoreError::ConfigurationDecode(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.insert(key, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Deserialize the bag into a constructor's typed configuration.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.0.clone()))
            .map_err(|e| CoreError::ProviderConstruction(format!("invalid config: {}", e)))
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl From<Map<String, Value>> for ProviderConfig {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
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

/// Which provider answers a capability, as persisted under
/// `providers/<capability>/default` and as derived from the environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderSelection {
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub config: ProviderConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
}

impl ProviderSelection {
    pub fn named(provider: impl Into<String>, config: ProviderConfig) -> Self {
        Self {
            provider: provider.into().trim().to_lowercase(),
            config,
            plugin: None,
        }
    }

    pub fn plugin(path: impl Into<String>, config: ProviderConfig) -> Self {
        Self {
            provider: String::new(),
            config,
            plugin: Some(path.into()),
        }
    }

    /// Plugin path if one is set and non-blank.
    pub fn plugin_path(&self) -> Option<&str> {
        self.plugin
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    /// True when neither a provider name nor a plugin path is present.
    pub fn is_empty(&self) -> bool {
        self.provider.trim().is_empty() && self.plugin_path().is_none()
    }

    /// Decode a stored selection; the name is trimmed and case-folded.
    pub fn from_stored(raw: &str) -> Result<Self> {
        let mut selection: ProviderSelection = serde_json::from_str(raw)
            .map_err(|e| CoreError::ConfigurationDecode(format!("stored selection: {}", e)))?;
        selection.provider = selection.provider.trim().to_lowercase();
        Ok(selection)
    }

    pub fn to_stored(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| CoreError::ConfigurationDecode(format!("stored selection: {}", e)))
    }
}

/// Source of configuration signals, the process environment in production.
pub trait ConfigSource: Send + Sync {
    /// Value of `key`; unset and blank values are both `None`.
    fn var(&self, key: &str) -> Option<String>;

    /// Selection expressed by `<prefix>_PROVIDER`, `<prefix>_PLUGIN` and
    /// `<prefix>_CONFIG`, or `None` when neither a name nor a plugin is set.
    ///
    /// A malformed config fails even if no provider is named, so a typo
    /// never silently falls through to a stored selection.
    fn selection(&self, prefix: &str) -> Result<Option<ProviderSelection>> {
        let config_key = format!("{}_CONFIG", prefix);
        let config = match self.var(&config_key) {
            Some(raw) => ProviderConfig::from_json_str(&raw).map_err(|e| {
                CoreError::ConfigurationDecode(format!("invalid config in {}: {}", config_key, e))
            })?,
            None => ProviderConfig::new(),
        };

        if let Some(path) = self.var(&format!("{}_PLUGIN", prefix)) {
            return Ok(Some(ProviderSelection::plugin(path, config)));
        }
        Ok(self
            .var(&format!("{}_PROVIDER", prefix))
            .map(|name| ProviderSelection::named(name, config)))
    }
}

/// Reads signals from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvConfigSource;

impl ConfigSource for EnvConfigSource {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

/// Fixed set of signals, used by tests and embedding callers.
#[derive(Debug, Clone, Default)]
pub struct MapConfigSource {
    vars: HashMap<String, String>,
}

impl MapConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }
}

impl ConfigSource for MapConfigSource {
    fn var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_blank_and_null_config_are_empty() {
        assert!(ProviderConfig::from_json_str("").unwrap().is_empty());
        assert!(ProviderConfig::from_json_str("   ").unwrap().is_empty());
        assert!(ProviderConfig::from_json_str("null").unwrap().is_empty());
    }

    #[test]
    fn test_non_object_config_is_rejected() {
        assert!(matches!(
            ProviderConfig::from_json_str("[1,2]"),
            Err(CoreError::ConfigurationDecode(_))
        ));
        assert!(matches!(
            ProviderConfig::from_json_str("{not json"),
            Err(CoreError::ConfigurationDecode(_))
        ));
    }

    #[test]
    fn test_parse_into_typed_config() {
        #[derive(Deserialize)]
        struct TokenConfig {
            token: String,
            #[serde(default)]
            region: Option<String>,
        }

        let config = ProviderConfig::from_json_str(r#"{"token":"t"}"#).unwrap();
        let typed: TokenConfig = config.parse().unwrap();
        assert_eq!(typed.token, "t");
        assert!(typed.region.is_none());

        let missing = ProviderConfig::new().parse::<TokenConfig>();
        assert!(matches!(missing, Err(CoreError::ProviderConstruction(_))));
    }

    #[test]
    fn test_selection_from_provider_name() {
        let source = MapConfigSource::new()
            .with("OPSORCH_INCIDENT_PROVIDER", " Mock ")
            .with("OPSORCH_INCIDENT_CONFIG", r#"{"token":"t"}"#);

        let selection = source.selection("OPSORCH_INCIDENT").unwrap().unwrap();
        assert_eq!(selection.provider, "mock");
        assert_eq!(selection.config.get_str("token"), Some("t"));
        assert!(selection.plugin_path().is_none());
    }

    #[test]
    fn test_plugin_path_wins_over_provider_name() {
        let source = MapConfigSource::new()
            .with("OPSORCH_LOG_PROVIDER", "mock")
            .with("OPSORCH_LOG_PLUGIN", "/usr/local/bin/logplugin");

        let selection = source.selection("OPSORCH_LOG").unwrap().unwrap();
        assert_eq!(selection.plugin_path(), Some("/usr/local/bin/logplugin"));
        assert!(selection.provider.is_empty());
    }

    #[test]
    fn test_no_signals_means_no_selection() {
        let source = MapConfigSource::new().with("OPSORCH_ALERT_PROVIDER", "  ");
        assert!(source.selection("OPSORCH_ALERT").unwrap().is_none());
    }

    #[test]
    fn test_malformed_config_fails_even_without_name() {
        let source = MapConfigSource::new().with("OPSORCH_METRIC_CONFIG", "{oops");
        let err = source.selection("OPSORCH_METRIC").unwrap_err();
        assert!(err.to_string().contains("OPSORCH_METRIC_CONFIG"));
    }

    #[test]
    fn test_stored_selection_round_trip_shape() {
        let selection =
            ProviderSelection::named("Mock", ProviderConfig::new().with("token", json!("t")));
        let stored = selection.to_stored().unwrap();
        let value: Value = serde_json::from_str(&stored).unwrap();
        assert_eq!(value, json!({"provider": "mock", "config": {"token": "t"}}));

        let parsed =
            ProviderSelection::from_stored(r#"{"provider":" PagerDuty ","config":{}}"#).unwrap();
        assert_eq!(parsed.provider, "pagerduty");
        assert!(!parsed.is_empty());
    }

    #[test]
    fn test_stored_selection_rejects_garbage() {
        assert!(matches!(
            ProviderSelection::from_stored("not json"),
            Err(CoreError::ConfigurationDecode(_))
        ));
    }
}
