//! REST cloud store
//!
//! Each account owns a single document at `{base}/accounts/{id}/document`. The server has no
//! push channel, so subscriptions poll the document and report a change whenever its
//! modification time differs from the previous poll.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, error, warn};
use serde_json::Value;

use liftbook_domain::{AccountID, CloudRepository, OnChange, StorageError, Subscription};

use crate::{escape_key, stamp, strip, updated_at};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Option<Value>,
}

impl Response {
    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait SendRequest: Send + Sync + 'static {
    /// Fails only if the server could not be reached.
    async fn send_request(&self, request: Request) -> Result<Response, StorageError>;
}

pub struct ReqwestSendRequest {
    client: reqwest::Client,
}

impl ReqwestSendRequest {
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: reqwest::Client::builder()
                .user_agent("liftbook")
                .timeout(Duration::from_secs(30))
                .build()?,
        })
    }
}

#[async_trait]
impl SendRequest for ReqwestSendRequest {
    async fn send_request(&self, request: Request) -> Result<Response, StorageError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Put => reqwest::Method::PUT,
        };
        let mut builder = self.client.request(method, &request.url);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        let response = builder.send().await.map_err(|err| {
            if err.is_connect() || err.is_timeout() {
                debug!("no connection: {err}");
                StorageError::NoConnection
            } else {
                StorageError::Other(Box::new(err))
            }
        })?;
        let status = response.status().as_u16();
        let content = response
            .bytes()
            .await
            .map_err(|err| StorageError::Other(Box::new(err)))?;
        let body = if content.is_empty() {
            None
        } else {
            Some(
                serde_json::from_slice(&content)
                    .map_err(|err| StorageError::Other(Box::new(err)))?,
            )
        };
        Ok(Response { status, body })
    }
}

pub struct RestCloud<S: SendRequest> {
    sender: Arc<S>,
    base_url: String,
    poll_interval: Duration,
}

impl RestCloud<ReqwestSendRequest> {
    pub fn new(base_url: &str, poll_interval: Duration) -> Result<Self, StorageError> {
        let sender =
            ReqwestSendRequest::new().map_err(|err| StorageError::Other(Box::new(err)))?;
        Ok(Self::with_sender(sender, base_url, poll_interval))
    }
}

impl<S: SendRequest> RestCloud<S> {
    pub fn with_sender(sender: S, base_url: &str, poll_interval: Duration) -> Self {
        Self {
            sender: Arc::new(sender),
            base_url: base_url.trim_end_matches('/').to_string(),
            poll_interval,
        }
    }

    fn document_url(&self, account: &AccountID) -> String {
        format!("{}/accounts/{}/document", self.base_url, escape_key(account))
    }
}

/// Document including metadata, `None` if the account has none yet.
async fn fetch<S: SendRequest>(sender: &S, url: String) -> Result<Option<Value>, StorageError> {
    let response = sender
        .send_request(Request {
            method: Method::Get,
            url,
            body: None,
        })
        .await?;
    match response.status {
        404 => Ok(None),
        _ if response.is_success() => Ok(response.body),
        status => Err(status_error(status)),
    }
}

fn status_error(status: u16) -> StorageError {
    match status {
        401 | 403 => StorageError::PermissionDenied,
        413 | 507 => StorageError::QuotaExceeded,
        _ => StorageError::Other(format!("unexpected response status {status}").into()),
    }
}

#[async_trait]
impl<S: SendRequest> CloudRepository for RestCloud<S> {
    async fn load(&self, account: &AccountID) -> Result<Option<Value>, StorageError> {
        Ok(fetch(&*self.sender, self.document_url(account))
            .await?
            .map(strip))
    }

    async fn save(&self, account: &AccountID, document: &Value) -> Result<(), StorageError> {
        let response = self
            .sender
            .send_request(Request {
                method: Method::Put,
                url: self.document_url(account),
                body: Some(stamp(document, Utc::now())),
            })
            .await?;
        if response.is_success() {
            Ok(())
        } else {
            Err(status_error(response.status))
        }
    }

    /// Must be called within a Tokio runtime. The first poll only records the current state.
    fn subscribe(&self, account: &AccountID, on_change: OnChange) -> Subscription {
        let sender = self.sender.clone();
        let url = self.document_url(account);
        let poll_interval = self.poll_interval;
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let mut last: Option<Option<String>> = None;
            loop {
                interval.tick().await;
                let document = match fetch(&*sender, url.clone()).await {
                    Ok(document) => document,
                    Err(StorageError::NoConnection) => {
                        debug!("polling {url} failed: no connection");
                        continue;
                    }
                    Err(err) => {
                        warn!("polling {url} failed: {err}");
                        continue;
                    }
                };
                let modified = document
                    .as_ref()
                    .and_then(updated_at)
                    .map(ToString::to_string);
                let changed = last.as_ref().is_some_and(|l| *l != modified);
                last = Some(modified);
                if !changed {
                    continue;
                }
                match document {
                    Some(document) => on_change(strip(document)),
                    None => error!("document at {url} disappeared"),
                }
            }
        });
        Subscription::new(move || handle.abort())
    }
}
