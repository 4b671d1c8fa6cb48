//! Builds the wire request for a validated query: endpoint, fixed
//! `wsfunction`/`wstoken`/`moodlewsrestformat` parameters, then the caller's
//! fields flattened into Moodle's bracket notation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{
    FORMAT_PARAM, FUNCTION_PARAM, JSON_FORMAT, TOKEN_PARAM, WEBSERVICE_PATH,
};
use crate::error::GatewayError;
use crate::webservice::Operation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrayStyle {
    /// `key[0]=a&key[1]=b`
    #[default]
    Indexed,
    /// `key[]=a&key[]=b`; arrays of objects stay indexed so members remain grouped.
    Repeated,
}

impl FromStr for ArrayStyle {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "indexed" => Ok(ArrayStyle::Indexed),
            "repeated" => Ok(ArrayStyle::Repeated),
            other => Err(GatewayError::Config(format!("unknown array style '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscapeMode {
    #[default]
    Percent,
    /// Square brackets stay literal since some deployments reject `%5B`;
    /// everything else is still percent-encoded.
    Literal,
}

impl FromStr for EscapeMode {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "percent" => Ok(EscapeMode::Percent),
            "literal" => Ok(EscapeMode::Literal),
            other => Err(GatewayError::Config(format!("unknown escape mode '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueryEncoding {
    #[serde(default)]
    pub arrays: ArrayStyle,
    #[serde(default)]
    pub escape: EscapeMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Post,
    Get,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Post => f.write_str("POST"),
            HttpMethod::Get => f.write_str("GET"),
        }
    }
}

/// Fully built request, ready for a transport.
#[derive(Clone, PartialEq, Eq)]
pub struct WireRequest {
    pub operation: Operation,
    pub method: HttpMethod,
    pub url: String,
    pub params: Vec<(String, String)>,
}

impl WireRequest {
    /// URL with the token value masked, safe for logs.
    pub fn redacted_url(&self) -> String {
        let prefix = format!("{}=", TOKEN_PARAM);
        let (base, query) = match self.url.split_once('?') {
            Some(parts) => parts,
            None => return self.url.clone(),
        };
        let masked: Vec<String> = query
            .split('&')
            .map(|pair| {
                if pair.starts_with(&prefix) {
                    format!("{}***", prefix)
                } else {
                    pair.to_string()
                }
            })
            .collect();
        format!("{}?{}", base, masked.join("&"))
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Debug for WireRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WireRequest")
            .field("operation", &self.operation)
            .field("method", &self.method)
            .field("url", &self.redacted_url())
            .finish()
    }
}

/// Appends the REST server path to `base` unless it is already there.
pub fn normalize_endpoint(base: &str) -> String {
    let trimmed = base.trim().trim_end_matches('/');
    if trimmed.ends_with(WEBSERVICE_PATH) {
        trimmed.to_string()
    } else {
        format!("{}{}", trimmed, WEBSERVICE_PATH)
    }
}

#[derive(Clone)]
pub struct RequestBuilder {
    endpoint: String,
    token: String,
    encoding: QueryEncoding,
}

impl RequestBuilder {
    pub fn new(base_url: &str, token: impl Into<String>, encoding: QueryEncoding) -> Self {
        Self {
            endpoint: normalize_endpoint(base_url),
            token: token.into(),
            encoding,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn encoding(&self) -> QueryEncoding {
        self.encoding
    }

    /// Builds the POST request for an already validated wire query.
    pub fn build(&self, operation: Operation, wire_query: &Value) -> WireRequest {
        let mut params = vec![
            (FUNCTION_PARAM.to_string(), operation.wire_name().to_string()),
            (TOKEN_PARAM.to_string(), self.token.clone()),
            (FORMAT_PARAM.to_string(), JSON_FORMAT.to_string()),
        ];
        flatten_params(wire_query, "", self.encoding.arrays, &mut params);

        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", self.escape(k), self.escape(v)))
            .collect::<Vec<_>>()
            .join("&");

        WireRequest {
            operation,
            method: HttpMethod::Post,
            url: format!("{}?{}", self.endpoint, query),
            params,
        }
    }

    fn escape(&self, raw: &str) -> String {
        match self.encoding.escape {
            EscapeMode::Percent => urlencoding::encode(raw).into_owned(),
            EscapeMode::Literal => urlencoding::encode(raw).replace("%5B", "[").replace("%5D", "]"),
        }
    }
}

impl fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("endpoint", &self.endpoint)
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}

/// Flattens a JSON tree into `key[sub][0]=value` pairs the way Moodle's PHP
/// parameter parser expects. `null` leaves are omitted, booleans become `1`/`0`.
pub fn flatten_params(value: &Value, prefix: &str, arrays: ArrayStyle, out: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Bool(b) => out.push((prefix.to_string(), if *b { "1" } else { "0" }.to_string())),
        Value::Number(n) => out.push((prefix.to_string(), n.to_string())),
        Value::String(s) => out.push((prefix.to_string(), s.clone())),
        Value::Array(items) => {
            let scalars_only = items.iter().all(|v| !v.is_object() && !v.is_array());
            for (i, item) in items.iter().enumerate() {
                let key = match arrays {
                    ArrayStyle::Repeated if scalars_only => format!("{}[]", prefix),
                    _ => format!("{}[{}]", prefix, i),
                };
                flatten_params(item, &key, arrays, out);
            }
        }
        Value::Object(map) => {
            for (k, v) in map {
                let key = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{}[{}]", prefix, k)
                };
                flatten_params(v, &key, arrays, out);
            }
        }
    }
}
