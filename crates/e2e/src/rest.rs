//! Client for the controller REST API

use std::time::Duration;
use reqwest::{Method, Response};
use serde::Serialize;
use tracing::{debug, info};

use topogui_common::types::FlowEntry;

use crate::error::{E2eError, E2eResult};

const LINKS_PATH: &str = "/v1.0/topology/links";
const FLOW_ENTRY_PATH: &str = "/stats/flowentry";

/// Flow table modification commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowCommand {
    Add,
    Modify,
    Delete,
}

impl FlowCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowCommand::Add => "add",
            FlowCommand::Modify => "modify",
            FlowCommand::Delete => "delete",
        }
    }
}

pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
}

impl RestClient {
    /// Client for the REST service at `base_url` (`http://host:port`)
    pub fn new(base_url: impl Into<String>) -> E2eResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends a request; any non-2xx status becomes `E2eError::Rest`
    async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> E2eResult<Response> {
        let url = format!("{}{}", self.base_url, path);
        debug!("REST {} {}", method, url);

        let mut req = self.client.request(method.clone(), &url);
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req.send().await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let headers = resp
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
            .collect();
        let body = resp.text().await.unwrap_or_default();
        Err(E2eError::Rest {
            method: method.to_string(),
            path: path.to_string(),
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
            headers,
            body,
        })
    }

    /// All links the controller discovered
    pub async fn topology_links(&self) -> E2eResult<Vec<serde_json::Value>> {
        let resp = self.request::<()>(Method::GET, LINKS_PATH, None).await?;
        Ok(resp.json().await?)
    }

    /// True once no links are left, or when the REST service is down
    pub async fn links_cleared(&self) -> E2eResult<bool> {
        match self.topology_links().await {
            Ok(links) => Ok(links.is_empty()),
            Err(E2eError::Http(e)) if e.is_connect() || e.is_timeout() => {
                debug!("REST API not available: {}", e);
                Ok(true)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn flow_entry(&self, command: FlowCommand, flow: &FlowEntry) -> E2eResult<()> {
        let path = format!("{}/{}", FLOW_ENTRY_PATH, command.as_str());
        info!(
            "flow {} dpid={} priority={} tp_src={:?}",
            command.as_str(),
            flow.dpid,
            flow.effective_priority(),
            flow.matches.tp_src
        );
        self.request(Method::POST, &path, Some(flow)).await?;
        Ok(())
    }

    pub async fn add_flow(&self, flow: &FlowEntry) -> E2eResult<()> {
        self.flow_entry(FlowCommand::Add, flow).await
    }

    pub async fn modify_flow(&self, flow: &FlowEntry) -> E2eResult<()> {
        self.flow_entry(FlowCommand::Modify, flow).await
    }

    pub async fn delete_flow(&self, flow: &FlowEntry) -> E2eResult<()> {
        self.flow_entry(FlowCommand::Delete, flow).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let client = RestClient::new("http://localhost:8080/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_flow_command_paths() {
        assert_eq!(FlowCommand::Add.as_str(), "add");
        assert_eq!(FlowCommand::Modify.as_str(), "modify");
        assert_eq!(FlowCommand::Delete.as_str(), "delete");
    }
}
