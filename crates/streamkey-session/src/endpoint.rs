//! API host resolution from the domain lookup response.
//!
//! The lookup returns `data.ttnet_dispatch_actions`, a list of records that
//! may carry `param.strategy_info`, a map of symbolic host to concrete host.
//! Resolution takes two hops: the sentinel host maps to an intermediate
//! host, and a record that maps the intermediate host gives the final one.

use serde_json::Value;
use tracing::debug;

use crate::error::SessionError;
use crate::SessionResult;

/// Dispatch actions from one domain lookup response.
#[derive(Debug, Clone, Default)]
pub struct EndpointMap {
    actions: Vec<Value>,
}

impl EndpointMap {
    /// Read the dispatch actions out of a lookup response body.
    pub fn from_response(body: &Value) -> SessionResult<Self> {
        let actions = body
            .pointer("/data/ttnet_dispatch_actions")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                SessionError::EndpointResolution(
                    "response has no data.ttnet_dispatch_actions".to_string(),
                )
            })?;

        Ok(Self {
            actions: actions.clone(),
        })
    }

    /// Build a map from raw action records.
    pub fn from_actions(actions: Vec<Value>) -> Self {
        Self { actions }
    }

    /// Number of dispatch actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns true if there are no dispatch actions.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// First mapping of `host` in any record's strategy map.
    pub fn lookup(&self, host: &str) -> Option<&str> {
        self.actions.iter().find_map(|action| {
            action
                .pointer("/param/strategy_info")
                .and_then(Value::as_object)
                .and_then(|strategy| strategy.get(host))
                .and_then(Value::as_str)
        })
    }

    /// Resolve the API host, starting from `sentinel`.
    ///
    /// Falls back to the intermediate host when nothing maps it further.
    pub fn resolve_host(&self, sentinel: &str) -> SessionResult<String> {
        let intermediate = self.lookup(sentinel).ok_or_else(|| {
            SessionError::EndpointResolution(format!(
                "no dispatch action maps {sentinel}"
            ))
        })?;

        match self.lookup(intermediate) {
            Some(host) => {
                debug!(%intermediate, %host, "Resolved API host in two hops");
                Ok(host.to_string())
            }
            None => {
                debug!(%intermediate, "No second hop, using intermediate host");
                Ok(intermediate.to_string())
            }
        }
    }

    /// Resolve the API base URL (`scheme://host/`).
    pub fn resolve_base_url(&self, sentinel: &str, scheme: &str) -> SessionResult<String> {
        let host = self.resolve_host(sentinel)?;
        Ok(format!("{scheme}://{host}/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SENTINEL: &str = "webcast-normal.tiktokv.com";

    #[test]
    fn test_two_hop_resolution() {
        let body = json!({
            "data": {
                "ttnet_dispatch_actions": [
                    { "act_priority": 1 },
                    { "param": { "strategy_info": { SENTINEL: "host-a" } } },
                    { "param": { "strategy_info": { "host-a": "host-b" } } },
                ]
            }
        });

        let map = EndpointMap::from_response(&body).unwrap();
        assert_eq!(
            map.resolve_base_url(SENTINEL, "https").unwrap(),
            "https://host-b/"
        );
    }

    #[test]
    fn test_second_hop_may_precede_first() {
        let map = EndpointMap::from_actions(vec![
            json!({ "param": { "strategy_info": { "host-a": "host-b" } } }),
            json!({ "param": { "strategy_info": { SENTINEL: "host-a" } } }),
        ]);
        assert_eq!(map.resolve_host(SENTINEL).unwrap(), "host-b");
    }

    #[test]
    fn test_falls_back_to_intermediate() {
        let map = EndpointMap::from_actions(vec![
            json!({ "param": {} }),
            json!({ "param": { "strategy_info": { SENTINEL: "host-a" } } }),
        ]);
        assert_eq!(
            map.resolve_base_url(SENTINEL, "https").unwrap(),
            "https://host-a/"
        );
    }

    #[test]
    fn test_missing_sentinel_fails() {
        let map = EndpointMap::from_actions(vec![
            json!({ "param": { "strategy_info": { "other": "host-a" } } }),
            json!("not an object"),
        ]);
        assert!(matches!(
            map.resolve_host(SENTINEL),
            Err(SessionError::EndpointResolution(_))
        ));
    }

    #[test]
    fn test_missing_actions_list_fails() {
        let body = json!({ "data": {} });
        assert!(matches!(
            EndpointMap::from_response(&body),
            Err(SessionError::EndpointResolution(_))
        ));
    }
}
