//! Wire types exchanged with the TSDB service.
//!
//! Values whose shape is decided by the service (datapoint values, filter
//! bounds, result cells) are kept as [`serde_json::Value`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One timestamped measurement to write.
///
/// Either `value` (with `timestamp`) or `values` (`[timestamp, value]`
/// pairs) is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Datapoint {
    pub metric: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<(i64, Value)>,
}

impl Datapoint {
    pub fn new(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            ..Default::default()
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_type(mut self, value_type: impl Into<String>) -> Self {
        self.value_type = Some(value_type.into());
        self
    }

    /// Single value at `timestamp` (milliseconds).
    pub fn with_value(mut self, timestamp: i64, value: impl Into<Value>) -> Self {
        self.timestamp = Some(timestamp);
        self.value = Some(value.into());
        self
    }

    /// Append one `[timestamp, value]` pair to the batch.
    pub fn push_value(mut self, timestamp: i64, value: impl Into<Value>) -> Self {
        self.values.push((timestamp, value.into()));
        self
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct WriteDatapointRequest<'a> {
    pub datapoints: &'a [Datapoint],
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListMetricsResponse {
    #[serde(default)]
    pub metrics: Vec<String>,
}

/// Metadata of one field of a metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    #[serde(rename = "type")]
    pub field_type: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListFieldsResponse {
    #[serde(default)]
    pub fields: HashMap<String, Field>,
}

/// All values seen for one tag key.
pub type TagValues = Vec<String>;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListTagsResponse {
    #[serde(default)]
    pub tags: HashMap<String, TagValues>,
}

/// One query against a metric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub metric: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
    /// Tag keys to return with each result group.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Filters>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<GroupBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aggregators: Vec<Aggregator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<Fill>,
    /// Pagination marker from a previous result's `next_marker`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
}

impl Query {
    pub fn new(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            ..Default::default()
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_filters(mut self, filters: Filters) -> Self {
        self.filters = Some(filters);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_group_by(mut self, group_by: GroupBy) -> Self {
        self.group_by.push(group_by);
        self
    }

    pub fn with_aggregator(mut self, aggregator: Aggregator) -> Self {
        self.aggregators.push(aggregator);
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    pub fn with_fill(mut self, fill: Fill) -> Self {
        self.fill = Some(fill);
        self
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }
}

/// Time range and value filters. `start`/`end` accept absolute
/// millisecond timestamps or relative expressions such as `"1 hour ago"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filters {
    #[serde(default)]
    pub start: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<Value>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldFilter>,
}

impl Filters {
    pub fn starting_at(start: impl Into<Value>) -> Self {
        Self {
            start: start.into(),
            ..Default::default()
        }
    }

    pub fn ending_at(mut self, end: impl Into<Value>) -> Self {
        self.end = Some(end.into());
        self
    }

    pub fn with_tag<I, S>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags
            .insert(key.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// Value predicate such as `">= 10"`.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_field_filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(FieldFilter {
            field: field.into(),
            value: value.into(),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFilter {
    pub field: String,
    pub value: String,
}

/// Group results by tag values (`name = "Tag"`) or by time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupBy {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl GroupBy {
    pub fn tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: "Tag".to_string(),
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }
}

/// Aggregation applied to each group, e.g. `Avg` over `"10 minutes"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregator {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub divisor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factor: Option<f64>,
}

impl Aggregator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_sampling(mut self, sampling: impl Into<String>) -> Self {
        self.sampling = Some(sampling.into());
        self
    }
}

/// Gap filling for sparse series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fill {
    #[serde(rename = "type")]
    pub fill_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_write_interval: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Body of a datapoint query. The presampling flag is only sent when set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub queries: Vec<Query>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disable_presampling: bool,
}

/// Result of one [`Query`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryResult {
    pub metric: String,
    pub field: Option<String>,
    pub fields: Vec<String>,
    pub tags: Vec<String>,
    pub raw_count: u64,
    pub groups: Vec<Group>,
    pub truncated: bool,
    pub next_marker: Option<String>,
}

/// Values sharing the same group key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Group {
    pub group_infos: Vec<GroupInfo>,
    /// Rows of `[timestamp, value, tag values...]`.
    pub values: Vec<Vec<Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupInfo {
    pub name: String,
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct QueryResponse {
    #[serde(default)]
    pub results: Vec<QueryResult>,
}

/// Rows returned by a SQL statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RowResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}
