//! Backend response envelope normalization
//!
//! The backend wraps every response as `{code, data, msg?}` but is loose about
//! it: `code` may be the number `200` or the string `"200"`, and `data` may be a
//! bare array, a paginated object `{list, pageNum, pages, ...}`, a single
//! object, or absent. [`normalize`] turns all of those into one [`Payload`] so
//! nothing downstream has to care.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::record::{coerce_i64, Record};
use crate::{Error, Result};

/// Envelope code meaning success
pub const SUCCESS_CODE: i64 = 200;

/// Raw envelope as sent by the backend
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub code: Value,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Envelope {
    pub fn is_success(&self) -> bool {
        coerce_i64(&self.code) == Some(SUCCESS_CODE)
    }

    /// Backend message, `msg` first then `message`
    pub fn message(&self) -> Option<String> {
        self.msg
            .as_ref()
            .or(self.message.as_ref())
            .filter(|m| !m.trim().is_empty())
            .cloned()
    }

    fn code_text(&self) -> String {
        match &self.code {
            Value::String(s) => s.trim().to_string(),
            Value::Null => "missing".to_string(),
            other => other.to_string(),
        }
    }
}

/// Page metadata from a server-paginated response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub page_num: u64,
    pub page_size: Option<u64>,
    pub pages: u64,
    pub total: Option<u64>,
    pub has_previous: bool,
    pub has_next: bool,
}

/// Canonical result of one successful read
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    pub items: Vec<Record>,
    pub page: Option<PageMeta>,
}

impl Payload {
    pub fn empty() -> Self {
        Self::default()
    }

    /// First record, for fetch-by-id responses
    pub fn into_single(self) -> Option<Record> {
        self.items.into_iter().next()
    }
}

/// Parse and normalize a response body
pub fn normalize_body(body: &[u8]) -> Result<Payload> {
    let envelope: Envelope = serde_json::from_slice(body)?;
    normalize(envelope)
}

/// Normalize an envelope into a payload or an application error
pub fn normalize(envelope: Envelope) -> Result<Payload> {
    if !envelope.is_success() {
        return Err(Error::Application {
            code: envelope.code_text(),
            message: envelope.message(),
        });
    }

    match envelope.data {
        Value::Null => Ok(Payload::empty()),
        Value::Array(items) => Ok(Payload {
            items: collect_records(items),
            page: None,
        }),
        Value::Object(mut map) => match map.remove("list") {
            Some(Value::Array(items)) => {
                let page = page_meta(&map);
                Ok(Payload {
                    items: collect_records(items),
                    page: Some(page),
                })
            }
            Some(Value::Null) => Ok(Payload {
                items: Vec::new(),
                page: Some(page_meta(&map)),
            }),
            Some(other) => {
                // `list` that is not an array: keep the object as a record
                map.insert("list".to_string(), other);
                Ok(Payload {
                    items: vec![Record::from(map)],
                    page: None,
                })
            }
            None => Ok(Payload {
                items: vec![Record::from(map)],
                page: None,
            }),
        },
        other => {
            debug!(data = %other, "Scalar envelope data, treating as empty list");
            Ok(Payload::empty())
        }
    }
}

fn collect_records(items: Vec<Value>) -> Vec<Record> {
    let total = items.len();
    let records: Vec<Record> = items.into_iter().filter_map(Record::from_value).collect();
    if records.len() != total {
        debug!(
            skipped = total - records.len(),
            "Skipped non-object entries in envelope list"
        );
    }
    records
}

fn page_meta(map: &serde_json::Map<String, Value>) -> PageMeta {
    let num = |key: &str| {
        map.get(key)
            .and_then(coerce_i64)
            .and_then(|n| u64::try_from(n).ok())
    };
    let flag = |key: &str| map.get(key).and_then(Value::as_bool);

    let page_num = num("pageNum").unwrap_or(1).max(1);
    let pages = num("pages").unwrap_or(0);
    PageMeta {
        page_num,
        page_size: num("pageSize"),
        pages,
        total: num("total"),
        has_previous: flag("hasPreviousPage").unwrap_or(page_num > 1),
        has_next: flag("hasNextPage").unwrap_or(page_num < pages),
    }
}
