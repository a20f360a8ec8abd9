use async_trait::async_trait;
use reqwest::{Client, Url};

use crate::{
    runtime::RemoteTransport,
    scheduler::TransportError,
    value::Value,
    wire::{self, RemoteRequest},
};

/// POSTs remote calls to a validator service.
///
/// Validator identifiers are URLs, joined onto `base` when relative.
pub struct HttpTransport {
    client: Client,
    base: Url,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        let base = Url::parse(base_url).map_err(|e| TransportError::Remote {
            target: base_url.to_string(),
            message: e.to_string(),
        })?;
        Ok(HttpTransport {
            client: Client::new(),
            base,
        })
    }

    pub fn with_client(client: Client, base: Url) -> Self {
        HttpTransport { client, base }
    }

    fn url(&self, target: &str) -> Result<Url, TransportError> {
        self.base.join(target).map_err(|e| TransportError::Remote {
            target: target.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl RemoteTransport for HttpTransport {
    async fn call(&self, target: &str, args: &[Value]) -> Result<Value, TransportError> {
        let failed = |e: reqwest::Error| TransportError::Remote {
            target: target.to_string(),
            message: e.to_string(),
        };

        let response = self
            .client
            .post(self.url(target)?)
            .json(&RemoteRequest::new(args))
            .send()
            .await
            .map_err(failed)?
            .error_for_status()
            .map_err(failed)?;
        let body: serde_json::Value = response.json().await.map_err(failed)?;
        Ok(wire::response_value(&body))
    }
}
