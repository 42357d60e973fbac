use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value object over an inbound HTTP request as seen by the engine and the
/// provider adapters.
///
/// The engine never depends on a live HTTP server: controllers build a
/// `RequestInfo` from the real request, CLI and test harnesses build
/// synthetic ones. Params are kept sorted so keyed-hash signature schemes
/// can canonicalize without copying.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestInfo {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    #[serde(default)]
    pub raw_body: Option<String>,
    #[serde(default)]
    pub remote_ip: Option<String>,
}

impl RequestInfo {
    /// Synthetic request with only params, for CLI/test harnesses and for
    /// outbound redirect descriptors built by adapters.
    pub fn synthetic(url: impl Into<String>, params: BTreeMap<String, String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            params,
            ..Default::default()
        }
    }

    pub fn post(url: impl Into<String>, params: BTreeMap<String, String>) -> Self {
        Self {
            method: "POST".to_string(),
            url: url.into(),
            params,
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_raw_body(mut self, body: impl Into<String>) -> Self {
        self.raw_body = Some(body.into());
        self
    }

    pub fn with_remote_ip(mut self, ip: impl Into<String>) -> Self {
        self.remote_ip = Some(ip.into());
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Header lookup, case-insensitive per RFC 9110.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Raw capture persisted into the provider call log.
    pub fn to_raw(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{} {}", self.method, self.url))
    }

    pub fn params_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.params).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let request = RequestInfo::default().with_header("X-Content-HMAC", "abc");
        assert_eq!(request.header("x-content-hmac"), Some("abc"));
        assert_eq!(request.header("X-CONTENT-HMAC"), Some("abc"));
        assert_eq!(request.header("x-other"), None);
    }

    #[test]
    fn raw_capture_round_trips() {
        let mut params = BTreeMap::new();
        params.insert("orderId".to_string(), "42".to_string());
        let request = RequestInfo::post("https://pay.example/callback", params).with_raw_body("{}");

        let raw = request.to_raw();
        let parsed: RequestInfo = serde_json::from_str(&raw).expect("raw capture is json");
        assert_eq!(parsed, request);
    }

    #[test]
    fn params_stay_sorted() {
        let mut params = BTreeMap::new();
        params.insert("zeta".to_string(), "1".to_string());
        params.insert("alpha".to_string(), "2".to_string());
        let request = RequestInfo::synthetic("https://x", params);
        let keys: Vec<&String> = request.params.keys().collect();
        assert_eq!(keys, ["alpha", "zeta"]);
    }
}
