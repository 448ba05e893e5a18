use super::{Metadata, QueryScope};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MetricQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<MetricExpression>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    /// Resolution in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<i64>,
    #[serde(default, skip_serializing_if = "QueryScope::is_empty")]
    pub scope: QueryScope,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MetricExpression {
    #[serde(default)]
    pub metric_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub aggregation: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<MetricFilter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricFilter {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub value: String,
}
