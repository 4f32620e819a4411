//! Scripted HTTP transport.
//!
//! Each route maps a URL pattern to a sequence of replies. Replies are
//! consumed in order and the last one repeats forever, so
//! `[status(500), status(500), json(..)]` fails twice then succeeds.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use dex_common::{HttpResponse, HttpTransport, TransportError};

/// One scripted answer.
#[derive(Debug, Clone)]
pub enum Reply {
    Response(HttpResponse),
    Error(TransportError),
}

impl Reply {
    pub fn json(body: impl Into<String>) -> Self {
        Reply::Response(HttpResponse::new(200, Bytes::from(body.into())))
    }

    pub fn bytes(body: impl Into<Bytes>) -> Self {
        Reply::Response(HttpResponse::new(200, body))
    }

    pub fn status(status: u16) -> Self {
        Reply::Response(HttpResponse::new(status, Bytes::new()))
    }

    pub fn transport_error(message: &str) -> Self {
        Reply::Error(TransportError::new(message))
    }
}

struct Route {
    pattern: String,
    replies: VecDeque<Reply>,
}

/// An [`HttpTransport`] answering from a script and recording every call.
///
/// URLs are matched exactly first, then by the longest route pattern they
/// contain. A later route overrides an earlier one with the same pattern.
/// Unmatched URLs fail with a transport error.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<String>>,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route answering with `replies` in order.
    pub fn route(self, pattern: impl Into<String>, replies: Vec<Reply>) -> Self {
        self.routes
            .lock()
            .unwrap()
            .push(Route {
                pattern: pattern.into(),
                replies: replies.into(),
            });
        self
    }

    /// Hold every call open for `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Every requested URL, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Number of calls whose URL contains `pattern`.
    pub fn calls_matching(&self, pattern: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|url| url.contains(pattern))
            .count()
    }

    /// Highest number of calls that were open at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn next_reply(&self, url: &str) -> Option<Reply> {
        let mut routes = self.routes.lock().unwrap();
        let index = routes
            .iter()
            .rposition(|route| route.pattern == url)
            .or_else(|| {
                routes
                    .iter()
                    .enumerate()
                    .filter(|(_, route)| url.contains(route.pattern.as_str()))
                    .max_by_key(|(_, route)| route.pattern.len())
                    .map(|(index, _)| index)
            })?;

        let replies = &mut routes[index].replies;
        if replies.len() > 1 {
            replies.pop_front()
        } else {
            replies.front().cloned()
        }
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        self.calls.lock().unwrap().push(url.to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let reply = self.next_reply(url);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match reply {
            Some(Reply::Response(response)) => Ok(response),
            Some(Reply::Error(error)) => Err(error),
            None => Err(TransportError::new(format!("no scripted route for {}", url))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_last_reply_repeats() {
        let transport = ScriptedTransport::new()
            .route("/flaky", vec![Reply::status(503), Reply::json("{}")]);

        assert_eq!(transport.get("http://x/flaky").await.unwrap().status, 503);
        assert_eq!(transport.get("http://x/flaky").await.unwrap().status, 200);
        assert_eq!(transport.get("http://x/flaky").await.unwrap().status, 200);
        assert_eq!(transport.calls_matching("/flaky"), 3);
    }

    #[tokio::test]
    async fn test_longest_pattern_wins() {
        let transport = ScriptedTransport::new()
            .route("/pokemon/1", vec![Reply::json("one")])
            .route("/pokemon/10", vec![Reply::json("ten")]);

        let response = transport.get("http://x/pokemon/10/").await.unwrap();
        assert_eq!(response.body, Bytes::from("ten"));

        let response = transport.get("http://x/pokemon/1/").await.unwrap();
        assert_eq!(response.body, Bytes::from("one"));
    }

    #[tokio::test]
    async fn test_later_route_overrides() {
        let transport = ScriptedTransport::new()
            .route("http://x/a", vec![Reply::json("old")])
            .route("http://x/a", vec![Reply::json("new")]);

        let response = transport.get("http://x/a").await.unwrap();
        assert_eq!(response.body, Bytes::from("new"));
    }

    #[tokio::test]
    async fn test_unmatched_url_is_transport_error() {
        let transport = ScriptedTransport::new();
        assert!(transport.get("http://x/missing").await.is_err());
        assert_eq!(transport.calls(), vec!["http://x/missing".to_string()]);
    }
}
