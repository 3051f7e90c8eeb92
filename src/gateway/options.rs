use reqwest::Method;
use serde_json::Value;

/// How a successful response body should be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expect {
    /// JSON when the response says so, text otherwise.
    #[default]
    Auto,
    Json,
    Blob,
    Text,
}

/// Outgoing request body.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Serialized as JSON; sets `Content-Type: application/json` unless the caller set one.
    Json(Value),
    /// Pre-serialized text, sent as-is.
    Text(String),
    /// Raw bytes (uploads, multipart payloads built by the caller), sent as-is.
    Binary {
        bytes: Vec<u8>,
        content_type: Option<String>,
    },
}

/// Value of one query mapping entry.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Empty,
    One(String),
    Many(Vec<String>),
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::One(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::One(value)
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::One(value.to_string())
    }
}

impl From<u32> for QueryValue {
    fn from(value: u32) -> Self {
        QueryValue::One(value.to_string())
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::One(value.to_string())
    }
}

impl<T: Into<QueryValue>> From<Option<T>> for QueryValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(QueryValue::Empty)
    }
}

impl From<Vec<String>> for QueryValue {
    fn from(values: Vec<String>) -> Self {
        QueryValue::Many(values)
    }
}

impl From<Vec<&str>> for QueryValue {
    fn from(values: Vec<&str>) -> Self {
        QueryValue::Many(values.into_iter().map(str::to_string).collect())
    }
}

/// Descriptor for one logical call. Cloned as-is when the call is re-issued.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<RequestBody>,
    pub query: Vec<(String, QueryValue)>,
    pub headers: Vec<(String, String)>,
    /// Suppresses the missing-credential warning and auth-failure UI side effects.
    pub background: bool,
    pub expect: Expect,
    /// Reauthorization retries left; `None` uses the gateway default.
    pub retry_budget: Option<u8>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::new(Method::GET)
    }
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            body: None,
            query: Vec::new(),
            headers: Vec::new(),
            background: false,
            expect: Expect::Auto,
            retry_budget: None,
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    pub fn put() -> Self {
        Self::new(Method::PUT)
    }

    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Text(body.into()));
        self
    }

    pub fn binary(mut self, bytes: Vec<u8>, content_type: Option<&str>) -> Self {
        self.body = Some(RequestBody::Binary {
            bytes,
            content_type: content_type.map(str::to_string),
        });
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn background(mut self) -> Self {
        self.background = true;
        self
    }

    pub fn expect(mut self, expect: Expect) -> Self {
        self.expect = expect;
        self
    }

    pub fn retry_budget(mut self, budget: u8) -> Self {
        self.retry_budget = Some(budget);
        self
    }

    pub(crate) fn has_content_type(&self) -> bool {
        self.headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case("content-type"))
    }
}

/// Serializes a query mapping. Empty values are dropped, lists repeat their key.
pub fn serialize_query(query: &[(String, QueryValue)]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in query {
        match value {
            QueryValue::Empty => {}
            QueryValue::One(v) if v.is_empty() => {}
            QueryValue::One(v) => {
                serializer.append_pair(key, v);
            }
            QueryValue::Many(values) => {
                for v in values.iter().filter(|v| !v.is_empty()) {
                    serializer.append_pair(key, v);
                }
            }
        }
    }
    serializer.finish()
}
