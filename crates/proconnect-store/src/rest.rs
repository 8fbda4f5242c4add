//! [`RealtimeStore`] over the hosted database's REST and streaming API.
//!
//! Every node is addressed as `{base}/{path}.json`.  Live subscriptions use
//! the same URL with `Accept: text/event-stream`; the server answers with
//! `put`/`patch` frames describing changes below the subscribed path.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{ACCEPT, ETAG};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::path::StorePath;
use crate::push_key::PushKeyGenerator;
use crate::sse::SseParser;
use crate::store::{ChangeEvent, RealtimeStore, Subscription, SubscriptionId};

/// Connection settings for [`RestStore`].
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Database root, e.g. `https://my-app-default-rtdb.firebaseio.com`.
    pub base_url: String,
    /// Credential sent as the `auth` query parameter.
    pub auth_token: Option<String>,
    /// Timeout for one-shot requests.  Streams are not subject to it.
    pub request_timeout: Duration,
}

/// Payload of a `put`/`patch` stream frame.
#[derive(Debug, Deserialize)]
struct StreamPayload {
    path: String,
}

pub struct RestStore {
    http: Client,
    stream_http: Client,
    base_url: Url,
    auth_token: Option<String>,
    keys: PushKeyGenerator,
    streams: Mutex<HashMap<SubscriptionId, JoinHandle<()>>>,
}

impl RestStore {
    pub fn new(config: RestConfig) -> Result<Self> {
        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .map_err(|e| StoreError::InvalidUrl(format!("{}: {e}", config.base_url)))?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(StoreError::InvalidUrl(config.base_url));
        }

        let http = Client::builder().timeout(config.request_timeout).build()?;
        let stream_http = Client::builder().build()?;

        info!(url = %base_url, "using hosted realtime store");

        Ok(Self {
            http,
            stream_http,
            base_url,
            auth_token: config.auth_token,
            keys: PushKeyGenerator::new(),
            streams: Mutex::new(HashMap::new()),
        })
    }

    /// `{base}/{path}.json`, with each segment percent-encoded.
    fn node_url(&self, path: &StorePath) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| StoreError::InvalidUrl(self.base_url.to_string()))?;
            segments.pop_if_empty();
            match path.segments().split_last() {
                Some((last, parents)) => {
                    segments.extend(parents);
                    segments.push(&format!("{last}.json"));
                }
                None => {
                    segments.push(".json");
                }
            }
        }
        Ok(url)
    }

    fn request(&self, client: &Client, method: Method, path: &StorePath) -> Result<RequestBuilder> {
        let mut builder = client.request(method, self.node_url(path)?);
        if let Some(token) = &self.auth_token {
            builder = builder.query(&[("auth", token)]);
        }
        Ok(builder)
    }

    fn streams(&self) -> MutexGuard<'_, HashMap<SubscriptionId, JoinHandle<()>>> {
        self.streams.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for RestStore {
    fn drop(&mut self) {
        for (_, handle) in self.streams().drain() {
            handle.abort();
        }
    }
}

/// Map a non-success response to a [`StoreError`].
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, body))
}

fn status_error(status: StatusCode, body: String) -> StoreError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::PermissionDenied(body),
        other => StoreError::Http {
            status: other.as_u16(),
            body,
        },
    }
}

/// Absolute location changed by a stream frame, or the subscribed path when
/// the frame does not say.
fn changed_path(subscribed: &StorePath, data: &str) -> StorePath {
    serde_json::from_str::<StreamPayload>(data)
        .ok()
        .and_then(|payload| subscribed.join(&payload.path).ok())
        .unwrap_or_else(|| subscribed.clone())
}

#[async_trait]
impl RealtimeStore for RestStore {
    async fn read(&self, path: &StorePath) -> Result<Option<Value>> {
        let response = self.request(&self.http, Method::GET, path)?.send().await?;
        let value: Value = check(response).await?.json().await?;
        Ok(match value {
            Value::Null => None,
            other => Some(other),
        })
    }

    async fn write(&self, path: &StorePath, value: Value) -> Result<()> {
        let response = self
            .request(&self.http, Method::PUT, path)?
            .query(&[("print", "silent")])
            .json(&value)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn update(&self, path: &StorePath, fields: Map<String, Value>) -> Result<()> {
        for key in fields.keys() {
            path.join(key)?;
        }
        let response = self
            .request(&self.http, Method::PATCH, path)?
            .query(&[("print", "silent")])
            .json(&fields)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn remove(&self, path: &StorePath) -> Result<()> {
        let response = self.request(&self.http, Method::DELETE, path)?.send().await?;
        check(response).await?;
        Ok(())
    }

    fn push_key(&self) -> String {
        self.keys.next_key()
    }

    async fn create_if_absent(&self, path: &StorePath, value: Value) -> Result<bool> {
        let response = self
            .request(&self.http, Method::GET, path)?
            .header("X-Firebase-ETag", "true")
            .send()
            .await?;
        let response = check(response).await?;
        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .ok_or_else(|| StoreError::Http {
                status: response.status().as_u16(),
                body: "missing ETag on conditional read".into(),
            })?;
        let current: Value = response.json().await?;
        if !current.is_null() {
            return Ok(false);
        }

        let response = self
            .request(&self.http, Method::PUT, path)?
            .query(&[("print", "silent")])
            .header("if-match", etag)
            .json(&value)
            .send()
            .await?;
        if response.status() == StatusCode::PRECONDITION_FAILED {
            debug!(path = %path, "conditional create lost the race");
            return Ok(false);
        }
        check(response).await?;
        Ok(true)
    }

    async fn query_by_field(
        &self,
        collection: &StorePath,
        field: &str,
        equals: &Value,
    ) -> Result<Map<String, Value>> {
        let order_by = serde_json::to_string(field)?;
        let equal_to = serde_json::to_string(equals)?;
        let response = self
            .request(&self.http, Method::GET, collection)?
            .query(&[("orderBy", order_by), ("equalTo", equal_to)])
            .send()
            .await?;
        let value: Value = check(response).await?.json().await?;
        Ok(match value {
            Value::Object(children) => children,
            _ => Map::new(),
        })
    }

    async fn subscribe(&self, path: &StorePath) -> Result<Subscription> {
        let response = self
            .request(&self.stream_http, Method::GET, path)?
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;
        let response = check(response).await?;

        let id = SubscriptionId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let subscribed = path.clone();

        let handle = tokio::spawn(async move {
            let mut parser = SseParser::new();
            let mut body = response.bytes_stream();

            while let Some(chunk) = body.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        warn!(subscription = %id, error = %e, "event stream failed");
                        return;
                    }
                };
                for frame in parser.feed(&chunk) {
                    match frame.event.as_str() {
                        "put" | "patch" => {
                            let event = ChangeEvent {
                                path: changed_path(&subscribed, &frame.data),
                            };
                            if tx.send(event).is_err() {
                                return;
                            }
                        }
                        "keep-alive" => {}
                        "cancel" | "auth_revoked" => {
                            warn!(
                                subscription = %id,
                                path = %subscribed,
                                reason = %frame.event,
                                "event stream ended by server"
                            );
                            return;
                        }
                        other => debug!(subscription = %id, event = other, "ignoring stream frame"),
                    }
                }
            }
            debug!(subscription = %id, "event stream closed");
        });

        self.streams().insert(id, handle);
        debug!(subscription = %id, path = %path, "subscribed");

        Ok(Subscription {
            id,
            path: path.clone(),
            events: rx,
        })
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        if let Some(handle) = self.streams().remove(&id) {
            handle.abort();
            debug!(subscription = %id, "unsubscribed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(base: &str, token: Option<&str>) -> RestStore {
        RestStore::new(RestConfig {
            base_url: base.to_string(),
            auth_token: token.map(String::from),
            request_timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_node_url() {
        let store = store("https://demo.example.com/", None);
        let path = StorePath::parse("chats/c1/messages").unwrap();
        assert_eq!(
            store.node_url(&path).unwrap().as_str(),
            "https://demo.example.com/chats/c1/messages.json"
        );
        assert_eq!(
            store.node_url(&StorePath::root()).unwrap().as_str(),
            "https://demo.example.com/.json"
        );
    }

    #[test]
    fn test_node_url_encodes_segments() {
        let store = store("https://demo.example.com", None);
        let path = StorePath::parse("users/a b").unwrap();
        assert_eq!(
            store.node_url(&path).unwrap().as_str(),
            "https://demo.example.com/users/a%20b.json"
        );
    }

    #[test]
    fn test_auth_token_is_sent_as_query() {
        let store = store("https://demo.example.com", Some("secret"));
        let request = store
            .request(&store.http, Method::GET, &StorePath::parse("jobs").unwrap())
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(request.url().query(), Some("auth=secret"));
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let config = |url: &str| RestConfig {
            base_url: url.to_string(),
            auth_token: None,
            request_timeout: Duration::from_secs(1),
        };
        assert!(matches!(RestStore::new(config("not a url")), Err(StoreError::InvalidUrl(_))));
        assert!(matches!(
            RestStore::new(config("ftp://demo.example.com")),
            Err(StoreError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, String::new()),
            StoreError::PermissionDenied(_)
        ));
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, String::new()),
            StoreError::PermissionDenied(_)
        ));
        assert!(matches!(
            status_error(StatusCode::SERVICE_UNAVAILABLE, "down".into()),
            StoreError::Http { status: 503, .. }
        ));
    }

    #[test]
    fn test_changed_path() {
        let subscribed = StorePath::parse("chats/c1/messages").unwrap();
        assert_eq!(
            changed_path(&subscribed, r#"{"path":"/m1","data":{"text":"hi"}}"#).to_string(),
            "chats/c1/messages/m1"
        );
        assert_eq!(changed_path(&subscribed, r#"{"path":"/","data":null}"#), subscribed);
        assert_eq!(changed_path(&subscribed, "garbage"), subscribed);
    }
}
