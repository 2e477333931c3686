//! The browser capability consumed by every provider.
//!
//! Providers never talk to a driver library directly; they see a page
//! through [`Browser`] and [`Element`] only, which keeps the navigation
//! and harvest logic testable against scripted in-memory sites. The one
//! real implementation lives in [`cdp`] on top of chromiumoxide.

pub mod cdp;

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Result;

/// Opaque descriptor used to find a page element. Adapters treat these as
/// configuration data, not behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
    XPath(String),
    Id(String),
    Name(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(path: impl Into<String>) -> Self {
        Locator::XPath(path.into())
    }

    pub fn id(id: impl Into<String>) -> Self {
        Locator::Id(id.into())
    }

    pub fn name(name: impl Into<String>) -> Self {
        Locator::Name(name.into())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css `{}`", s),
            Locator::XPath(s) => write!(f, "xpath `{}`", s),
            Locator::Id(s) => write!(f, "id `{}`", s),
            Locator::Name(s) => write!(f, "name `{}`", s),
        }
    }
}

/// Which browser binary drives the session. Both speak the DevTools
/// protocol; they differ only in which executable is launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserEngine {
    Chrome,
    Chromium,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrowserSettings {
    pub engine: BrowserEngine,
    /// Explicit path to the browser binary. Defaults to whatever the
    /// engine's conventional name resolves to.
    pub executable: Option<PathBuf>,
    pub headless: bool,
}

/// A handle to one element on the current page.
#[async_trait]
pub trait Element: Sized + Send + Sync {
    async fn text(&self) -> Result<String>;
    async fn attr(&self, name: &str) -> Result<Option<String>>;
    async fn click(&self) -> Result<()>;
    async fn clear(&self) -> Result<()>;
    async fn send_keys(&self, keys: &str) -> Result<()>;
    async fn is_enabled(&self) -> Result<bool>;
    async fn is_visible(&self) -> Result<bool>;
}

/// One live browser session. A session owns exactly one logical thread of
/// control; parallel scraping means independent sessions.
#[async_trait]
pub trait Browser: Send + Sync {
    type Elem: Element;

    async fn navigate(&self, url: &str) -> Result<()>;

    /// Resolves to `None` when nothing currently matches; pair with
    /// [`crate::wait`] when the element is expected to show up later.
    async fn find(&self, locator: &Locator) -> Result<Option<Self::Elem>>;

    async fn find_all(&self, locator: &Locator) -> Result<Vec<Self::Elem>>;
}

#[async_trait]
impl<B: Browser> Browser for &B {
    type Elem = B::Elem;

    async fn navigate(&self, url: &str) -> Result<()> {
        (**self).navigate(url).await
    }

    async fn find(&self, locator: &Locator) -> Result<Option<Self::Elem>> {
        (**self).find(locator).await
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<Self::Elem>> {
        (**self).find_all(locator).await
    }
}
