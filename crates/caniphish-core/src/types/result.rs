use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::{CaniphishError, Result};

/// Top-level key holding the mail sender issue list
pub const SENDER_ISSUES_KEY: &str = "MailSenderIssues";
/// Top-level key holding the receiver stack and MX records
pub const RECEIVER_ISSUES_KEY: &str = "MailReceiverIssues";
/// Top-level key holding the raw SPF record
pub const SPF_RECORD_KEY: &str = "SPFRecord";
/// Top-level key holding the raw DMARC record
pub const DMARC_RECORD_KEY: &str = "DMARCRecord";

/// Decoded response of the supply-chain scan endpoint.
///
/// The upstream document has no enforced schema, so the object is kept as-is
/// (key order included) and the interesting fields are read through lenient
/// accessors that treat anything missing or oddly shaped as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanResult(Map<String, Value>);

/// An issue found with the domain's mail senders
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderIssue {
    /// Issue code (numeric upstream, kept as text)
    #[serde(deserialize_with = "lenient_string")]
    pub code: String,

    /// Short description
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,

    /// Severity label, e.g. "High"
    #[serde(deserialize_with = "lenient_string")]
    pub severity: String,
}

/// A third-party technology in the domain's mail receiving stack
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupplyDetail {
    /// Vendor or product name
    #[serde(deserialize_with = "lenient_string")]
    pub technology: String,

    /// Kind of service the technology provides
    #[serde(rename = "technologyType", deserialize_with = "lenient_string")]
    pub technology_type: String,
}

impl ScanResult {
    /// Wrap an already-decoded JSON object
    #[must_use]
    pub const fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Parse a response body
    pub fn from_json(body: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(body)?;
        Self::try_from(value)
    }

    /// Raw top-level fields
    #[must_use]
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Look up a raw top-level field
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Issues listed under `MailSenderIssues`
    #[must_use]
    pub fn sender_issues(&self) -> Vec<SenderIssue> {
        parse_list(self.get(SENDER_ISSUES_KEY))
    }

    /// Technologies listed under `MailReceiverIssues.supplyDetails`
    #[must_use]
    pub fn receiver_stack(&self) -> Vec<SupplyDetail> {
        parse_list(self.receiver_field("supplyDetails"))
    }

    /// MX hosts listed under `MailReceiverIssues.mxRecordSet`
    #[must_use]
    pub fn mx_records(&self) -> Vec<String> {
        self.receiver_field("mxRecordSet")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(text).collect())
            .unwrap_or_default()
    }

    /// Raw SPF record, if the domain publishes one
    #[must_use]
    pub fn spf_record(&self) -> Option<String> {
        self.get(SPF_RECORD_KEY).and_then(text)
    }

    /// Raw DMARC record, if the domain publishes one
    #[must_use]
    pub fn dmarc_record(&self) -> Option<String> {
        self.get(DMARC_RECORD_KEY).and_then(text)
    }

    fn receiver_field(&self, key: &str) -> Option<&Value> {
        self.get(RECEIVER_ISSUES_KEY)
            .and_then(Value::as_object)
            .and_then(|receiver| receiver.get(key))
    }
}

impl TryFrom<Value> for ScanResult {
    type Error = CaniphishError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(CaniphishError::MalformedResponse(format!(
                "expected a JSON object, got {}",
                kind(&other)
            ))),
        }
    }
}

impl From<ScanResult> for Value {
    fn from(result: ScanResult) -> Self {
        Self::Object(result.0)
    }
}

/// Decode every object entry of a JSON array, skipping entries that aren't objects.
fn parse_list<T>(value: Option<&Value>) -> Vec<T>
where
    T: for<'de> Deserialize<'de>,
{
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter(|item| item.is_object())
                .filter_map(|item| T::deserialize(item).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Render a scalar as display text; `null`, `false` and empty strings are absent.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        Value::Null | Value::Bool(false) => None,
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
