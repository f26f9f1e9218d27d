#![allow(dead_code)]

use mediagen::volc_sign::AccessKeys;
use mediagen::PollPolicy;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use wiremock::{Request, Respond, ResponseTemplate};

/// Polls every few milliseconds so tests against a mock server stay fast.
pub fn quick_poll() -> PollPolicy {
    PollPolicy::fail_fast(Duration::from_millis(10), Duration::from_secs(5))
}

pub fn test_keys() -> AccessKeys {
    AccessKeys {
        access_key_id: "AKTEST".to_string(),
        secret_access_key: "c2VjcmV0".to_string(),
    }
}

/// Answers with each template in turn, then repeats the last one.
pub struct Sequence {
    responses: Vec<ResponseTemplate>,
    calls: AtomicUsize,
}

impl Sequence {
    pub fn new(responses: Vec<ResponseTemplate>) -> Self {
        Self {
            responses,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn json(bodies: Vec<Value>) -> Self {
        Self::new(
            bodies
                .into_iter()
                .map(|body| ResponseTemplate::new(200).set_body_json(body))
                .collect(),
        )
    }
}

impl Respond for Sequence {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let count = self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .get(count)
            .or_else(|| self.responses.last())
            .cloned()
            .unwrap_or_else(|| ResponseTemplate::new(500))
    }
}
