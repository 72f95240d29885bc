//! Typed client for a pairwatch instance.

use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

pub type SdkResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Outcome of `POST /requests` or `POST /replica-intake`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptOutcome {
    Accepted { id: String, excess: u32, overloaded: bool },
    Rejected { reason: String },
}

impl AcceptOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, AcceptOutcome::Accepted { .. })
    }
}

#[derive(Debug, Deserialize)]
struct AcceptedBody {
    id: String,
    excess: u32,
    overloaded: bool,
}

#[derive(Debug, Deserialize)]
struct RejectedBody {
    reason: String,
}

/// Body of `GET /status`.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeStatus {
    pub identity: String,
    pub alive: bool,
    pub active: bool,
    pub excess: u32,
    pub flag: Option<u8>,
    pub request_count: u64,
    pub phase: String,
}

#[derive(Debug, Serialize)]
struct DownNotification<'a> {
    identity: &'a str,
}

#[derive(Debug, Deserialize)]
struct DownAck {
    result: String,
}

pub struct NodeClient {
    client: Client,
    base_url: String,
}

impl NodeClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::builder().no_proxy().build().unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Offer a request; an empty payload lets the instance pick a random one.
    pub async fn accept(&self, payload: &str) -> SdkResult<AcceptOutcome> {
        let resp = self
            .client
            .post(self.url("/requests"))
            .body(payload.to_string())
            .send()
            .await?;
        admission(resp).await
    }

    /// Deliver a replicated payload.
    pub async fn replicate(&self, payload: &str) -> SdkResult<AcceptOutcome> {
        let resp = self
            .client
            .post(self.url("/replica-intake"))
            .body(payload.to_string())
            .send()
            .await?;
        admission(resp).await
    }

    pub async fn status(&self) -> SdkResult<NodeStatus> {
        let resp = self.client.get(self.url("/status")).send().await?;
        Ok(success(resp).await?.json().await?)
    }

    /// True on 200, false on 503.
    pub async fn health(&self) -> SdkResult<bool> {
        let resp = self.client.get(self.url("/health")).send().await?;
        Ok(resp.status().is_success())
    }

    pub async fn draw(&self) -> SdkResult<u8> {
        let resp = self.client.get(self.url("/peer-draw")).send().await?;
        Ok(success(resp).await?.json().await?)
    }

    /// Report `identity` as down; returns how the instance applied it.
    pub async fn notify_down(&self, identity: &str) -> SdkResult<String> {
        let resp = self
            .client
            .post(self.url("/notify-down"))
            .json(&DownNotification { identity })
            .send()
            .await?;
        let ack: DownAck = success(resp).await?.json().await?;
        Ok(ack.result)
    }

    pub async fn set_alive(&self, alive: bool) -> SdkResult<()> {
        let resp = self
            .client
            .post(self.url("/alive"))
            .query(&[("alive", alive)])
            .send()
            .await?;
        success(resp).await?;
        Ok(())
    }

    /// Drive the load-balancer cycle by one request.
    pub async fn cycle(&self, payload: &str) -> SdkResult<serde_json::Value> {
        let resp = self
            .client
            .post(self.url("/loadbalancer"))
            .body(payload.to_string())
            .send()
            .await?;
        Ok(success(resp).await?.json().await?)
    }

    /// `GET` an admin view with a bearer key.
    pub async fn admin(&self, view: &str, key: &str) -> SdkResult<Response> {
        Ok(self
            .client
            .get(self.url(&format!("/admin/{}", view)))
            .bearer_auth(key)
            .send()
            .await?)
    }
}

async fn success(resp: Response) -> SdkResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    Err(format!("instance returned error status {}: {}", status, text).into())
}

async fn admission(resp: Response) -> SdkResult<AcceptOutcome> {
    match resp.status() {
        StatusCode::OK => {
            let body: AcceptedBody = resp.json().await?;
            Ok(AcceptOutcome::Accepted {
                id: body.id,
                excess: body.excess,
                overloaded: body.overloaded,
            })
        }
        StatusCode::SERVICE_UNAVAILABLE => {
            let body: RejectedBody = resp.json().await?;
            Ok(AcceptOutcome::Rejected { reason: body.reason })
        }
        _ => Err(success(resp).await.err().unwrap_or_else(|| "unexpected status".into())),
    }
}
