//! Page navigation capability shared by the scenarios

use std::time::Duration;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{E2eError, E2eResult};

/// Serialized DOM of the page currently shown by a navigator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    /// URL the page ended up at after redirects
    pub url: String,
    pub html: String,
}

/// A single navigation context (one browser tab).
///
/// Every operation takes `&mut self`: a navigator serves one request at a
/// time, and navigating replaces whatever page it was showing.
#[async_trait::async_trait]
pub trait Navigator: Send {
    /// Navigate to `url`, returning the main response status if there was one
    async fn goto(&mut self, url: &str) -> E2eResult<Option<u16>>;

    /// Snapshot the currently loaded page
    async fn snapshot(&mut self) -> E2eResult<PageSnapshot>;

    async fn close(&mut self) -> E2eResult<()>;
}

/// Navigator that fetches pages over plain HTTP without rendering them
pub struct HttpNavigator {
    client: reqwest::Client,
    current: Option<PageSnapshot>,
}

impl HttpNavigator {
    pub fn new(timeout: Duration) -> E2eResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            current: None,
        })
    }
}

#[async_trait::async_trait]
impl Navigator for HttpNavigator {
    async fn goto(&mut self, url: &str) -> E2eResult<Option<u16>> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();
        debug!("GET {} -> {} ({})", url, status, final_url);

        // The status stands even when the body cannot be read
        let html = match resp.text().await {
            Ok(html) => html,
            Err(e) => {
                debug!("Could not read body of {}: {}", url, e);
                String::new()
            }
        };
        self.current = Some(PageSnapshot { url: final_url, html });
        Ok(Some(status))
    }

    async fn snapshot(&mut self) -> E2eResult<PageSnapshot> {
        self.current
            .clone()
            .ok_or_else(|| E2eError::Browser("no page has been loaded".to_string()))
    }

    async fn close(&mut self) -> E2eResult<()> {
        self.current = None;
        Ok(())
    }
}
