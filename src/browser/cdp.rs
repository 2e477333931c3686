//! chromiumoxide-backed implementation of the browser capability.
//!
//! One `CdpBrowser` owns one browser process and one page. The DevTools
//! event handler runs on a background task that is aborted on drop, so the
//! process is torn down on every exit path, including errors mid-login or
//! mid-harvest.

use anyhow::anyhow;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpClient, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{Browser, BrowserEngine, BrowserSettings, Element, Locator};
use crate::error::{Error, Result};

pub struct CdpBrowser {
    client: CdpClient,
    page: Page,
    handler: JoinHandle<()>,
}

impl CdpBrowser {
    pub async fn launch(settings: &BrowserSettings) -> Result<Self> {
        let mut builder = BrowserConfig::builder();

        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &settings.executable {
            builder = builder.chrome_executable(path);
        } else if settings.engine == BrowserEngine::Chromium {
            builder = builder.chrome_executable("chromium");
        }

        let config = builder
            .build()
            .map_err(|e| Error::Browser(anyhow!("invalid browser configuration: {}", e)))?;

        let (client, mut handler) = CdpClient::launch(config)
            .await
            .map_err(|e| Error::Browser(e.into()))?;

        let task = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let page = match client.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                task.abort();
                return Err(Error::Browser(e.into()));
            }
        };

        debug!(engine = ?settings.engine, headless = settings.headless, "browser launched");

        Ok(Self {
            client,
            page,
            handler: task,
        })
    }

    /// Shuts the browser process down. Prefer this over relying on drop so
    /// teardown failures are visible to the caller.
    pub async fn close(mut self) -> Result<()> {
        self.client
            .close()
            .await
            .map_err(|e| Error::Browser(e.into()))?;
        if let Err(e) = self.client.wait().await {
            warn!(error = %e, "browser process did not exit cleanly");
        }
        self.handler.abort();

        Ok(())
    }
}

impl Drop for CdpBrowser {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// `Id` and `Name` flatten into css; xpath goes through the dedicated
/// DevTools search so adapters can keep the selectors the sites were
/// reverse-engineered with.
fn as_css(locator: &Locator) -> Option<String> {
    match locator {
        Locator::Css(s) => Some(s.clone()),
        Locator::Id(s) => Some(format!("#{}", s)),
        Locator::Name(s) => Some(format!("[name=\"{}\"]", s)),
        Locator::XPath(_) => None,
    }
}

#[async_trait]
impl Browser for CdpBrowser {
    type Elem = CdpElement;

    async fn navigate(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| Error::Browser(e.into()))?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| Error::Browser(e.into()))?;

        Ok(())
    }

    async fn find(&self, locator: &Locator) -> Result<Option<Self::Elem>> {
        Ok(self.find_all(locator).await?.into_iter().next())
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<Self::Elem>> {
        let found = match as_css(locator) {
            Some(css) => self.page.find_elements(css).await,
            None => match locator {
                Locator::XPath(x) => self.page.find_xpaths(x).await,
                _ => unreachable!("non-xpath locators flatten to css"),
            },
        };

        match found {
            Ok(elements) => Ok(elements.into_iter().map(CdpElement).collect()),
            // The protocol reports an empty result set as a failed lookup;
            // absence is an ordinary answer here.
            Err(chromiumoxide::error::CdpError::NotFound) => Ok(Vec::new()),
            Err(e) => Err(Error::Browser(e.into())),
        }
    }
}

pub struct CdpElement(chromiumoxide::Element);

impl CdpElement {
    async fn eval_on_self(&self, function: &str) -> Result<Option<serde_json::Value>> {
        let ret = self
            .0
            .call_js_fn(function, false)
            .await
            .map_err(|e| Error::Browser(e.into()))?;

        Ok(ret.result.value)
    }
}

#[async_trait]
impl Element for CdpElement {
    async fn text(&self) -> Result<String> {
        Ok(self
            .0
            .inner_text()
            .await
            .map_err(|e| Error::Browser(e.into()))?
            .unwrap_or_default())
    }

    async fn attr(&self, name: &str) -> Result<Option<String>> {
        self.0
            .attribute(name)
            .await
            .map_err(|e| Error::Browser(e.into()))
    }

    async fn click(&self) -> Result<()> {
        self.0
            .click()
            .await
            .map_err(|e| Error::Browser(e.into()))?;

        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.eval_on_self("function() { this.value = ''; }").await?;

        Ok(())
    }

    async fn send_keys(&self, keys: &str) -> Result<()> {
        self.0
            .focus()
            .await
            .map_err(|e| Error::Browser(e.into()))?;
        self.0
            .type_str(keys)
            .await
            .map_err(|e| Error::Browser(e.into()))?;

        Ok(())
    }

    async fn is_enabled(&self) -> Result<bool> {
        let value = self
            .eval_on_self("function() { return !this.disabled; }")
            .await?;

        Ok(value.and_then(|v| v.as_bool()).unwrap_or(false))
    }

    async fn is_visible(&self) -> Result<bool> {
        let value = self
            .eval_on_self(
                "function() { \
                   const r = this.getBoundingClientRect(); \
                   const s = window.getComputedStyle(this); \
                   return r.width > 0 && r.height > 0 \
                     && s.visibility !== 'hidden' && s.display !== 'none'; \
                 }",
            )
            .await?;

        Ok(value.and_then(|v| v.as_bool()).unwrap_or(false))
    }
}
