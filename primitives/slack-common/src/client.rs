use crate::error::UpstreamError;
use crate::types::{Channel, User};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Production Slack Web API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://slack.com/api";

/// Items requested per page on cursor-paginated methods.
const PAGE_SIZE: &str = "200";

/// Hard stop for cursor pagination; 200 000 items at `PAGE_SIZE`.
const MAX_PAGES: usize = 1000;

/// Upper bound on a server-requested `Retry-After` wait.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Connection settings for [`SlackClient`].
#[derive(Clone)]
pub struct SlackConfig {
    /// Bot token (`xoxb-...`).
    pub token: String,
    /// Base URL the method name is appended to.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Additional attempts after the first one fails.
    pub retries: u32,
}

impl SlackConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            retries: 3,
        }
    }
}

impl fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlackConfig")
            .field("token", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .finish()
    }
}

/// Body of a `chat.postMessage` call.
#[derive(Debug, Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    text: &'a str,
    username: &'a str,
    icon_emoji: &'a str,
}

/// Thin Slack Web API client.
#[derive(Debug, Clone)]
pub struct SlackClient {
    http: Client,
    config: SlackConfig,
}

impl SlackClient {
    /// Builds a client whose requests are bounded by `config.timeout`.
    pub fn new(config: SlackConfig) -> Result<Self, UpstreamError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    /// Lists every public channel in the workspace, following pagination.
    pub async fn list_channels(&self, exclude_archived: bool) -> Result<Vec<Channel>, UpstreamError> {
        let exclude_archived = if exclude_archived { "true" } else { "false" };
        self.list_all(
            "conversations.list",
            "channels",
            &[("types", "public_channel"), ("exclude_archived", exclude_archived)],
        )
        .await
    }

    /// Lists every member of the workspace, following pagination.
    pub async fn list_users(&self) -> Result<Vec<User>, UpstreamError> {
        self.list_all("users.list", "members", &[]).await
    }

    /// Posts `text` to `channel` under a custom bot name and emoji avatar.
    pub async fn post_message(
        &self,
        channel: &str,
        text: &str,
        username: &str,
        icon_emoji: &str,
    ) -> Result<(), UpstreamError> {
        let url = self.url("chat.postMessage");
        let body = PostMessage {
            channel,
            text,
            username,
            icon_emoji,
        };
        self.call("chat.postMessage", |http| http.post(&url).json(&body))
            .await?;
        Ok(())
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), method)
    }

    /// Collects the `key` array of every page of a cursor-paginated method.
    async fn list_all<T: DeserializeOwned>(
        &self,
        method: &str,
        key: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<T>, UpstreamError> {
        let url = self.url(method);
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;
        let mut seen_cursors = HashSet::new();

        loop {
            let mut query: Vec<(&str, &str)> = params.to_vec();
            query.push(("limit", PAGE_SIZE));
            if let Some(ref c) = cursor {
                query.push(("cursor", c.as_str()));
            }

            let mut body = self
                .call(method, |http| http.get(&url).query(&query))
                .await?;

            let page = body.get_mut(key).map(Value::take).unwrap_or(Value::Null);
            let mut page_items: Vec<T> = if page.is_null() {
                Vec::new()
            } else {
                serde_json::from_value(page).map_err(|source| UpstreamError::Decode {
                    method: method.to_string(),
                    source,
                })?
            };
            debug!(method, count = page_items.len(), "fetched page");
            items.append(&mut page_items);

            match body
                .pointer("/response_metadata/next_cursor")
                .and_then(Value::as_str)
            {
                Some(next) if !next.is_empty() => {
                    let repeated = !seen_cursors.insert(next.to_string());
                    if repeated || seen_cursors.len() >= MAX_PAGES {
                        return Err(UpstreamError::Api {
                            method: method.to_string(),
                            error: "pagination_loop".to_string(),
                        });
                    }
                    cursor = Some(next.to_string());
                }
                _ => break,
            }
        }

        Ok(items)
    }

    /// Sends a request with retries and returns the decoded body of an
    /// `"ok": true` response.
    async fn call<F>(&self, method: &str, build: F) -> Result<Value, UpstreamError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let mut attempts = 0;
        let max_attempts = self.config.retries.saturating_add(1);

        loop {
            attempts += 1;

            let request = build(&self.http).bearer_auth(&self.config.token);

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let body: Value = response.json().await?;
                        return check_ok(method, body);
                    }

                    let retryable =
                        status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS;
                    if retryable && attempts < max_attempts {
                        let delay = retry_after(response.headers())
                            .unwrap_or_else(|| backoff(attempts));
                        warn!(
                            method,
                            status = status.as_u16(),
                            attempt = attempts,
                            max_attempts,
                            "Slack request failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    return Err(UpstreamError::Status {
                        method: method.to_string(),
                        status: status.as_u16(),
                    });
                }
                Err(e) => {
                    if attempts < max_attempts {
                        warn!(
                            method,
                            error = %e,
                            attempt = attempts,
                            max_attempts,
                            "Slack request error, retrying"
                        );
                        tokio::time::sleep(backoff(attempts)).await;
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }
    }
}

fn check_ok(method: &str, body: Value) -> Result<Value, UpstreamError> {
    if body.get("ok").and_then(Value::as_bool) == Some(true) {
        return Ok(body);
    }

    let error = body
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown_error")
        .to_string();
    Err(UpstreamError::Api {
        method: method.to_string(),
        error,
    })
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(100 * u64::from(attempt))
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let secs: u64 = headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()?;
    Some(Duration::from_secs(secs).min(MAX_RETRY_AFTER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn client_for(server: &mockito::ServerGuard, retries: u32) -> SlackClient {
        let config = SlackConfig {
            token: "xoxb-test".to_string(),
            base_url: server.url(),
            timeout: Duration::from_secs(5),
            retries,
        };
        SlackClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn list_channels_follows_cursor() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/conversations.list")
            .match_header("authorization", "Bearer xoxb-test")
            .match_query(Matcher::Regex(
                "^types=public_channel&exclude_archived=true&limit=200$".to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "ok": true,
                    "channels": [{
                        "id": "C1", "name": "general", "created": 100, "creator": "U1",
                        "topic": { "value": "" }, "purpose": { "value": "All hands" }
                    }],
                    "response_metadata": { "next_cursor": "page2" }
                })
                .to_string(),
            )
            .create_async()
            .await;
        let second = server
            .mock("GET", "/conversations.list")
            .match_query(Matcher::Regex("&cursor=page2$".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "ok": true,
                    "channels": [{
                        "id": "C2", "name": "random", "created": 200, "creator": "U2",
                        "topic": { "value": "Anything" }, "purpose": { "value": "" }
                    }],
                    "response_metadata": { "next_cursor": "" }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let channels = client_for(&server, 0).list_channels(true).await.unwrap();

        let ids: Vec<&str> = channels.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["C1", "C2"]);
        assert_eq!(channels[1].topic, "Anything");
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn list_users_without_metadata_is_single_page() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/users.list")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                json!({
                    "ok": true,
                    "members": [{ "id": "U1", "name": "alice", "deleted": false }]
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let users = client_for(&server, 0).list_users().await.unwrap();

        assert_eq!(
            users,
            vec![User {
                id: "U1".to_string(),
                name: "alice".to_string()
            }]
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn api_error_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/users.list")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({ "ok": false, "error": "invalid_auth" }).to_string())
            .expect(1)
            .create_async()
            .await;

        let err = client_for(&server, 3).list_users().await.unwrap_err();

        match err {
            UpstreamError::Api { method, error } => {
                assert_eq!(method, "users.list");
                assert_eq!(error, "invalid_auth");
            }
            other => panic!("unexpected error: {other}"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_errors_are_retried_then_reported() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat.postMessage")
            .with_status(503)
            .expect(2)
            .create_async()
            .await;

        let err = client_for(&server, 1)
            .post_message("#announce", "hello", "bot", ":new:")
            .await
            .unwrap_err();

        assert!(matches!(err, UpstreamError::Status { status: 503, .. }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn post_message_sends_display_fields() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat.postMessage")
            .match_header("authorization", "Bearer xoxb-test")
            .match_body(Matcher::PartialJson(json!({
                "channel": "#announce_new_channels",
                "text": "Channel: <#C1|general>",
                "username": "Hey, There's a New Channel!",
                "icon_emoji": ":new:"
            })))
            .with_status(200)
            .with_body(json!({ "ok": true, "ts": "1.0" }).to_string())
            .create_async()
            .await;

        client_for(&server, 0)
            .post_message(
                "#announce_new_channels",
                "Channel: <#C1|general>",
                "Hey, There's a New Channel!",
                ":new:",
            )
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[test]
    fn debug_redacts_token() {
        let rendered = format!("{:?}", SlackConfig::new("xoxb-secret"));
        assert!(!rendered.contains("xoxb-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[tokio::test]
    async fn repeated_cursor_stops_pagination() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/users.list")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                json!({
                    "ok": true,
                    "members": [{ "id": "U1", "name": "alice" }],
                    "response_metadata": { "next_cursor": "same" }
                })
                .to_string(),
            )
            .expect(2)
            .create_async()
            .await;

        let result = tokio::time::timeout(
            Duration::from_secs(3),
            client_for(&server, 0).list_users(),
        )
        .await
        .expect("pagination did not terminate");

        match result.unwrap_err() {
            UpstreamError::Api { method, error } => {
                assert_eq!(method, "users.list");
                assert_eq!(error, "pagination_loop");
            }
            other => panic!("unexpected error: {other}"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unbounded_retry_count_does_not_overflow() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/users.list")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({ "ok": true, "members": [] }).to_string())
            .create_async()
            .await;

        let users = client_for(&server, u32::MAX).list_users().await.unwrap();

        assert!(users.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_error_then_success_returns_ok() {
        let mut server = mockito::Server::new_async().await;
        let failing = server
            .mock("POST", "/chat.postMessage")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;
        let succeeding = server
            .mock("POST", "/chat.postMessage")
            .with_status(200)
            .with_body(json!({ "ok": true }).to_string())
            .expect(1)
            .create_async()
            .await;

        client_for(&server, 2)
            .post_message("#announce", "hello", "bot", ":new:")
            .await
            .unwrap();

        failing.assert_async().await;
        succeeding.assert_async().await;
    }

    #[tokio::test]
    async fn rate_limit_is_retried_after_delay() {
        let mut server = mockito::Server::new_async().await;
        let limited = server
            .mock("GET", "/conversations.list")
            .match_query(Matcher::Any)
            .with_status(429)
            .with_header("retry-after", "0")
            .expect(1)
            .create_async()
            .await;
        let succeeding = server
            .mock("GET", "/conversations.list")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                json!({
                    "ok": true,
                    "channels": [{ "id": "C1", "name": "general", "creator": "U1" }]
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let channels = client_for(&server, 1).list_channels(false).await.unwrap();

        assert_eq!(channels.len(), 1);
        limited.assert_async().await;
        succeeding.assert_async().await;
    }

    #[tokio::test]
    async fn rate_limit_without_retries_reports_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat.postMessage")
            .with_status(429)
            .create_async()
            .await;

        let err = client_for(&server, 0)
            .post_message("#announce", "hello", "bot", ":new:")
            .await
            .unwrap_err();

        assert!(matches!(err, UpstreamError::Status { status: 429, .. }));
    }

    #[tokio::test]
    async fn transport_errors_are_retried_with_backoff() {
        // Bind then drop to get a port nothing listens on.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let client = SlackClient::new(SlackConfig {
            token: "xoxb-test".to_string(),
            base_url: format!("http://127.0.0.1:{port}"),
            timeout: Duration::from_secs(2),
            retries: 2,
        })
        .unwrap();

        let started = std::time::Instant::now();
        let err = client.list_users().await.unwrap_err();

        assert!(matches!(err, UpstreamError::Http(_)));
        // 100ms after the first attempt, 200ms after the second.
        assert!(started.elapsed() >= Duration::from_millis(300));
    }

    #[test]
    fn retry_after_is_parsed_and_capped() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);

        headers.insert(RETRY_AFTER, "2".parse().unwrap());
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(2)));

        headers.insert(RETRY_AFTER, "999".parse().unwrap());
        assert_eq!(retry_after(&headers), Some(MAX_RETRY_AFTER));

        headers.insert(RETRY_AFTER, "soon".parse().unwrap());
        assert_eq!(retry_after(&headers), None);
    }
}
