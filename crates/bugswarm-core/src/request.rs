// ── Inbound feed requests ──
//
// Peers ask for feeds with a small JSON document:
//
//   {"type":"get","feed":"temperature","params":{"frequency":30}}
//   {"type":"put","feed":"temperature","params":{"status":"off"}}
//
// The predicates below classify a parsed request; they are computed on
// demand, never stored.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use crate::error::CoreError;
use crate::feed::ValueMap;

/// Feed name that addresses the capabilities list instead of a feed.
pub const FEED_LIST_NAME: &str = "feeds";

/// Longest streaming period a peer may ask for: one week.
pub const MAX_FREQUENCY_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RequestType {
    Get,
    Put,
    Post,
    Delete,
}

/// A parsed feed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedRequest {
    #[serde(rename = "type")]
    pub kind: RequestType,
    #[serde(rename = "feed")]
    pub name: String,
    #[serde(default)]
    pub params: ValueMap,
}

impl FeedRequest {
    pub fn new(kind: RequestType, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            params: ValueMap::new(),
        }
    }

    /// Builder-style parameter insertion.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Parse a message payload. Unknown `type` values are rejected.
    pub fn parse(payload: &Value) -> Result<Self, CoreError> {
        Self::deserialize(payload).map_err(|e| CoreError::Parse {
            message: e.to_string(),
        })
    }

    /// Request for the capabilities list.
    pub fn is_feed_list_request(&self) -> bool {
        self.name == FEED_LIST_NAME
    }

    /// A `get` on a named feed.
    pub fn is_feed_request(&self) -> bool {
        self.kind == RequestType::Get && !self.name.is_empty() && !self.is_feed_list_request()
    }

    /// A `put` carrying a `status` param, used to enable or disable a feed.
    pub fn is_feed_meta_request(&self) -> bool {
        self.kind == RequestType::Put
            && !self.is_feed_list_request()
            && self.params.contains_key("status")
    }

    /// Requested streaming period in seconds, if positive.
    ///
    /// Accepts a JSON integer or a string holding one. Values above
    /// [`MAX_FREQUENCY_SECS`] are clamped.
    pub fn frequency(&self) -> Option<u64> {
        let raw = self.params.get("frequency")?;
        let secs = match raw {
            Value::Number(n) => n.as_i64()?,
            Value::String(s) => s.trim().parse::<i64>().ok()?,
            _ => return None,
        };
        u64::try_from(secs)
            .ok()
            .filter(|&s| s > 0)
            .map(|s| s.min(MAX_FREQUENCY_SECS))
    }

    pub fn has_frequency(&self) -> bool {
        self.frequency().is_some()
    }

    /// The `status` param of a meta request.
    pub fn status(&self) -> Option<&str> {
        self.params.get("status").and_then(Value::as_str)
    }
}

impl FromStr for FeedRequest {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s).map_err(|e| CoreError::Parse {
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_every_request_type() {
        for kind in ["get", "put", "post", "delete"] {
            let payload = json!({ "type": kind, "feed": "temp", "params": { "a": 1 } });
            let req = FeedRequest::parse(&payload).unwrap();
            assert_eq!(req.kind.to_string(), kind);
            assert_eq!(req.name, "temp");
            assert_eq!(serde_json::to_value(&req).unwrap(), payload);
        }
    }

    #[test]
    fn unknown_type_fails() {
        let err = FeedRequest::parse(&json!({ "type": "patch", "feed": "temp" })).unwrap_err();
        assert!(matches!(err, CoreError::Parse { .. }));
    }

    #[test]
    fn params_default_to_empty() {
        let req: FeedRequest = r#"{"type":"get","feed":"temp"}"#.parse().unwrap();
        assert!(req.params.is_empty());
        assert!(req.is_feed_request());
        assert!(!req.has_frequency());
    }

    #[test]
    fn frequency_must_be_a_positive_integer() {
        let req = |v: Value| FeedRequest::new(RequestType::Get, "temp").with_param("frequency", v);

        assert_eq!(req(json!(30)).frequency(), Some(30));
        assert_eq!(req(json!("15")).frequency(), Some(15));
        assert_eq!(req(json!(0)).frequency(), None);
        assert_eq!(req(json!(-5)).frequency(), None);
        assert_eq!(req(json!("soon")).frequency(), None);
        assert_eq!(req(json!(2.5)).frequency(), None);
        assert!(!FeedRequest::new(RequestType::Get, "temp").has_frequency());
        assert_eq!(req(json!(i64::MAX)).frequency(), Some(MAX_FREQUENCY_SECS));
    }

    #[test]
    fn classifies_feed_list_requests() {
        let req = FeedRequest::new(RequestType::Get, FEED_LIST_NAME);
        assert!(req.is_feed_list_request());
        assert!(!req.is_feed_request());
        assert!(!req.is_feed_meta_request());
    }

    #[test]
    fn meta_requests_need_put_and_status() {
        let meta = FeedRequest::new(RequestType::Put, "temp").with_param("status", "off");
        assert!(meta.is_feed_meta_request());
        assert!(!meta.is_feed_request());
        assert_eq!(meta.status(), Some("off"));

        let get_with_status = FeedRequest::new(RequestType::Get, "temp").with_param("status", "off");
        assert!(!get_with_status.is_feed_meta_request());
        assert!(get_with_status.is_feed_request());

        let put_without_status = FeedRequest::new(RequestType::Put, "temp");
        assert!(!put_without_status.is_feed_meta_request());

        let put_on_list = FeedRequest::new(RequestType::Put, FEED_LIST_NAME).with_param("status", "off");
        assert!(!put_on_list.is_feed_meta_request());
    }
}
