//! Script-produced request descriptions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One or more values for a single header name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValues {
    /// A single value
    One(String),
    /// Multiple values, sent in order
    Many(Vec<String>),
}

impl HeaderValues {
    /// Iterate over the values in send order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        match self {
            HeaderValues::One(v) => std::slice::from_ref(v).iter().map(String::as_str),
            HeaderValues::Many(vs) => vs.as_slice().iter().map(String::as_str),
        }
    }
}

impl From<&str> for HeaderValues {
    fn from(v: &str) -> Self {
        HeaderValues::One(v.to_string())
    }
}

/// A request description produced by the script boundary
///
/// This is the whole contract between a script and the transport: the engine
/// attaches no policy of its own beyond dispatching it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptRequest {
    /// HTTP method
    pub method: String,

    /// Absolute target URL
    pub url: String,

    /// Headers to send; a name may carry one value or an ordered list
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, HeaderValues>,

    /// Optional request body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Vec<u8>>,
}

impl ScriptRequest {
    /// A bare GET request for the given URL.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Attach a header value.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into(), HeaderValues::One(value.into()));
        self
    }

    /// Attach a body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }
}
