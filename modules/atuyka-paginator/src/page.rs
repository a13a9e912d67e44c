// One batch of items plus the parameters needed to request the batch after it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A scalar request parameter carried between pages (offsets, cursors, max ids).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Str(String),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            ParamValue::Int(_) => None,
        }
    }

    /// Integer view. String values holding a number are accepted too, since
    /// query strings arrive untyped.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(i) => Some(*i),
            ParamValue::Str(s) => s.parse().ok(),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(i) => write!(f, "{i}"),
            ParamValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Int(i64::from(value))
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value)
    }
}

/// Parameter name → value. An empty map requests the first page.
pub type PageParams = BTreeMap<String, ParamValue>;

/// A page returned by a paged endpoint.
///
/// `next` is `None` exactly when the producer knows there are no further pages.
/// A short page says nothing about whether more pages exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub items: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<PageParams>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next: Option<PageParams>) -> Self {
        Self {
            items,
            total: None,
            remaining: None,
            next,
        }
    }

    /// A final page: no further pages follow it.
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            total: None,
            remaining: None,
            next: None,
        }
    }

    /// A page followed by another one requested with `next`.
    pub fn with_next(items: Vec<T>, next: PageParams) -> Self {
        Self {
            items,
            total: None,
            remaining: None,
            next: Some(next),
        }
    }

    pub fn total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }

    pub fn remaining(mut self, remaining: u64) -> Self {
        self.remaining = Some(remaining);
        self
    }

    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            remaining: self.remaining,
            next: self.next,
        }
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self::last(Vec::new())
    }
}

/// Build a `PageParams` from `(name, value)` pairs.
pub fn params<I, K, V>(pairs: I) -> PageParams
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<ParamValue>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
