use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::categories::Classification;

/// Author used when an issue carries no `user.login`.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Issue as returned by the search API. Every field is optional and read
/// leniently: a value of the wrong type becomes `None` or its string form
/// instead of rejecting the whole record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IssueRecord {
    #[serde(deserialize_with = "lenient_u64")]
    pub id: Option<u64>,
    #[serde(deserialize_with = "lenient_u64")]
    pub number: Option<u64>,
    #[serde(deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub body: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub state: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub created_at: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub closed_at: Option<String>,
    #[serde(deserialize_with = "lenient_user")]
    pub user: Option<IssueUser>,
    #[serde(deserialize_with = "lenient_labels")]
    pub labels: Option<Vec<IssueLabel>>,
    #[serde(deserialize_with = "lenient_u64")]
    pub comments: Option<u64>,
    #[serde(deserialize_with = "lenient_string")]
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IssueUser {
    #[serde(deserialize_with = "lenient_string")]
    pub login: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IssueLabel {
    #[serde(deserialize_with = "lenient_string")]
    pub name: Option<String>,
}

/// Non-negative integers, integral floats and numeric strings; anything else
/// is `None`.
fn value_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Strings as-is, other scalars in their JSON text form, compounds `None`.
fn value_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_u64))
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(value_string))
}

fn lenient_user<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<IssueUser>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        Some(value @ Value::Object(_)) => Ok(serde_json::from_value(value).ok()),
        _ => Ok(None),
    }
}

/// Label entries may be objects with a `name` or bare strings.
fn lenient_labels<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<IssueLabel>>, D::Error> {
    let Some(Value::Array(items)) = Option::<Value>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let labels = items
        .into_iter()
        .map(|item| match item {
            Value::Object(_) => serde_json::from_value(item).unwrap_or_default(),
            other => IssueLabel {
                name: value_string(other),
            },
        })
        .collect();
    Ok(Some(labels))
}

/// Fixed internal schema. Field order is the column order of every
/// normalized CSV and JSON artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub id: Option<u64>,
    pub number: Option<u64>,
    pub title: Option<String>,
    pub state: Option<String>,
    #[serde(default)]
    pub body: String,
    pub author: String,
    pub comments_count: Option<u64>,
    /// Label names joined with `", "` in source order.
    #[serde(default)]
    pub labels: String,
    pub url: Option<String>,
    pub created_at: Option<String>,
    pub closed_at: Option<String>,
}

#[cfg(test)]
pub const NORMALIZED_COLUMNS: [&str; 11] = [
    "id",
    "number",
    "title",
    "state",
    "body",
    "author",
    "comments_count",
    "labels",
    "url",
    "created_at",
    "closed_at",
];

impl From<IssueRecord> for NormalizedRecord {
    fn from(issue: IssueRecord) -> Self {
        let author = issue
            .user
            .and_then(|u| u.login)
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());
        let labels = issue
            .labels
            .unwrap_or_default()
            .into_iter()
            .map(|l| l.name.unwrap_or_default())
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            id: issue.id,
            number: issue.number,
            title: issue.title,
            state: issue.state,
            body: issue.body.unwrap_or_default(),
            author,
            comments_count: issue.comments,
            labels,
            url: issue.html_url,
            created_at: issue.created_at,
            closed_at: issue.closed_at,
        }
    }
}

/// A normalized record plus its classification verdict. The csv serializer
/// cannot flatten, so the normalized columns are repeated here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub id: Option<u64>,
    pub number: Option<u64>,
    pub title: Option<String>,
    pub state: Option<String>,
    #[serde(default)]
    pub body: String,
    pub author: String,
    pub comments_count: Option<u64>,
    #[serde(default)]
    pub labels: String,
    pub url: Option<String>,
    pub created_at: Option<String>,
    pub closed_at: Option<String>,
    pub sentiment: String,
    pub category: String,
    pub urgency: String,
}

impl EnrichedRecord {
    pub fn new(record: NormalizedRecord, verdict: Classification) -> Self {
        Self {
            id: record.id,
            number: record.number,
            title: record.title,
            state: record.state,
            body: record.body,
            author: record.author,
            comments_count: record.comments_count,
            labels: record.labels,
            url: record.url,
            created_at: record.created_at,
            closed_at: record.closed_at,
            sentiment: verdict.sentiment.as_str().to_string(),
            category: verdict.category.as_str().to_string(),
            urgency: verdict.urgency.as_str().to_string(),
        }
    }
}

/// The columns aggregation reads back from an enriched table. Missing columns
/// deserialize as `None` and fall through to the default scores.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScoredRow {
    pub labels: Option<String>,
    pub sentiment: Option<String>,
    pub urgency: Option<String>,
}
