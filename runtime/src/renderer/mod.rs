//! Renderer abstraction for browser-based page rendering.
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over
//! the browser engine (currently Chromium via chromiumoxide), plus the
//! lazily-launched shared renderer used by rendered fetches.

pub mod chromium;

use anyhow::Result;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// Resource types a page can be told not to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Image,
    Font,
    Stylesheet,
    Media,
}

impl ResourceKind {
    /// Resources listing extraction never needs.
    pub const NON_ESSENTIAL: [ResourceKind; 4] = [
        ResourceKind::Image,
        ResourceKind::Font,
        ResourceKind::Stylesheet,
        ResourceKind::Media,
    ];
}

/// A browser engine that can create rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new browser context (tab).
    async fn new_context(&self) -> Result<Box<dyn RenderContext>>;
    /// Shut down the browser engine.
    async fn shutdown(&self) -> Result<()>;
    /// Number of currently active contexts.
    fn active_contexts(&self) -> usize;
}

/// A single browser context (tab) for rendering pages.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Override the viewport size.
    async fn set_viewport(&mut self, width: u32, height: u32) -> Result<()>;
    /// Abort every request for the given resource kinds from now on.
    async fn block_resources(&mut self, kinds: &[ResourceKind]) -> Result<()>;
    /// Navigate to a URL with a timeout.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult>;
    /// Execute JavaScript in the page context and return the result.
    async fn execute_js(&self, script: &str) -> Result<serde_json::Value>;
    /// Close this context.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// A no-op renderer used when Chromium is unavailable.
///
/// Static fetches work without a browser; rendered fetches against this
/// renderer fail with a navigation error.
pub struct NoopRenderer;

#[async_trait]
impl Renderer for NoopRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        Err(anyhow::anyhow!("Browser not available; static fetches only"))
    }
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
    fn active_contexts(&self) -> usize {
        0
    }
}

type LaunchFn = dyn Fn() -> BoxFuture<'static, Result<Arc<dyn Renderer>>> + Send + Sync;

/// A renderer launched on first use and shared afterwards.
///
/// A failed launch leaves the cell empty so the next caller tries again.
pub struct LazyRenderer {
    cell: OnceCell<Arc<dyn Renderer>>,
    launch: Box<LaunchFn>,
}

impl LazyRenderer {
    /// Launch with a custom factory.
    pub fn new<F>(launch: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<Arc<dyn Renderer>>> + Send + Sync + 'static,
    {
        Self {
            cell: OnceCell::new(),
            launch: Box::new(launch),
        }
    }

    /// Launch a headless Chromium on first use.
    pub fn chromium(chromium_path: Option<String>) -> Self {
        Self::new(move || {
            let path = chromium_path.clone();
            async move {
                let renderer = chromium::ChromiumRenderer::new(path.as_deref()).await?;
                tracing::info!("Chromium renderer initialized");
                Ok::<Arc<dyn Renderer>, anyhow::Error>(Arc::new(renderer))
            }
            .boxed()
        })
    }

    /// Wrap an already-running renderer.
    pub fn ready(renderer: Arc<dyn Renderer>) -> Self {
        Self {
            cell: OnceCell::new_with(Some(renderer)),
            launch: Box::new(|| {
                async { Err::<Arc<dyn Renderer>, _>(anyhow::anyhow!("renderer already set")) }
                    .boxed()
            }),
        }
    }

    /// The shared renderer, launching it if needed.
    pub async fn get(&self) -> Result<Arc<dyn Renderer>> {
        let renderer = self.cell.get_or_try_init(|| (self.launch)()).await?;
        Ok(Arc::clone(renderer))
    }

    /// Whether the renderer has been launched.
    pub fn is_launched(&self) -> bool {
        self.cell.initialized()
    }

    /// Shut down the renderer if it was ever launched.
    pub async fn shutdown(&self) -> Result<()> {
        match self.cell.get() {
            Some(renderer) => renderer.shutdown().await,
            None => Ok(()),
        }
    }
}
