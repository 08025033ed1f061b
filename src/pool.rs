//! Browser session pool.
//!
//! One shared browser process, a pool of reusable isolated contexts and a
//! global cap on open pages. Pool mutation (idle eviction, reuse scan,
//! creation) and cookie persistence are serialized under one async mutex.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{BrowserSettings, DEFAULT_USER_AGENTS};
use crate::cookies::CookieJar;
use crate::fetcher::{
    default_block_list, BrowserBackend, BrowserContext, BrowserPage, ContextOptions, ResourceKind,
    Viewport,
};
use crate::{Engine, Result, SearchError};

/// What the caller wants from the page it is about to get.
#[derive(Debug, Clone, Default)]
pub struct PageRequest {
    /// Picked at random from the configured list when `None`.
    pub user_agent: Option<String>,
    pub viewport: Option<Viewport>,
    /// Resource kinds to refuse; the default image/font/media list when `None`.
    pub block_list: Option<Vec<ResourceKind>>,
}

impl PageRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the engine's resource block list.
    pub fn for_engine(engine: &dyn Engine) -> Self {
        Self {
            block_list: Some(engine.resource_block_list()),
            ..Self::default()
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = Some(viewport);
        self
    }

    pub fn with_block_list(mut self, block_list: Vec<ResourceKind>) -> Self {
        self.block_list = Some(block_list);
        self
    }
}

/// Aggregate pool counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolStats {
    pub total_requests: u64,
    pub active_requests: usize,
    pub max_concurrent: usize,
    pub browser_alive: bool,
    pub context_pool_size: usize,
    pub context_create_count: u64,
    pub context_reuse_count: u64,
    /// Reuses over all context hand-outs, 0.0 when none.
    pub reuse_rate: f64,
}

#[derive(Default)]
struct Counters {
    total_requests: AtomicU64,
    active_requests: AtomicUsize,
    created: AtomicU64,
    reused: AtomicU64,
}

struct ContextUsage {
    open_pages: AtomicUsize,
    last_used: StdMutex<Instant>,
}

impl ContextUsage {
    fn new() -> Self {
        Self {
            open_pages: AtomicUsize::new(0),
            last_used: StdMutex::new(Instant::now()),
        }
    }

    fn open_pages(&self) -> usize {
        self.open_pages.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        *self.last_used.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
    }

    fn idle_since(&self) -> Instant {
        *self.last_used.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn open(&self) {
        self.open_pages.fetch_add(1, Ordering::SeqCst);
        self.touch();
    }

    fn close(&self) {
        let _ = self
            .open_pages
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        self.touch();
    }
}

struct PooledContext {
    id: u64,
    context: Arc<dyn BrowserContext>,
    fingerprint: String,
    usage: Arc<ContextUsage>,
}

/// A page checked out of the pool.
///
/// Call [`release`](Self::release) when done. Dropping a lease without
/// releasing it still frees its slot; the page is closed in the background.
pub struct PageLease {
    page: Arc<dyn BrowserPage>,
    context: Arc<dyn BrowserContext>,
    usage: Arc<ContextUsage>,
    counters: Arc<Counters>,
    permit: Option<OwnedSemaphorePermit>,
    context_id: u64,
    closed: bool,
}

impl PageLease {
    pub fn page(&self) -> &dyn BrowserPage {
        self.page.as_ref()
    }

    pub fn context(&self) -> &Arc<dyn BrowserContext> {
        &self.context
    }

    /// Id of the pooled context this page lives in.
    pub fn context_id(&self) -> u64 {
        self.context_id
    }

    /// Closes the page and returns its slot. The context stays pooled.
    pub async fn release(mut self) {
        if let Err(e) = self.page.close().await {
            warn!("Failed to close page: {}", e);
        }
        self.closed = true;
    }
}

impl Drop for PageLease {
    fn drop(&mut self) {
        self.usage.close();
        self.counters.active_requests.fetch_sub(1, Ordering::SeqCst);

        let permit = self.permit.take();
        if self.closed {
            return;
        }
        let page = Arc::clone(&self.page);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = page.close().await {
                        debug!("Background page close failed: {}", e);
                    }
                    drop(permit);
                });
            }
            Err(_) => debug!("No runtime to close a dropped page"),
        }
    }
}

/// Hands out pages inside reusable contexts of one shared browser.
pub struct BrowserSessionPool {
    backend: Arc<dyn BrowserBackend>,
    settings: BrowserSettings,
    permits: Arc<Semaphore>,
    contexts: Mutex<Vec<PooledContext>>,
    cookie_jar: Option<CookieJar>,
    counters: Arc<Counters>,
    next_id: AtomicU64,
}

impl BrowserSessionPool {
    pub fn new(backend: Arc<dyn BrowserBackend>, settings: &BrowserSettings) -> Self {
        let max = settings.max_concurrent_pages.max(1);
        Self {
            backend,
            permits: Arc::new(Semaphore::new(max)),
            contexts: Mutex::new(Vec::new()),
            cookie_jar: settings.cookie_file.as_ref().map(CookieJar::new),
            counters: Arc::new(Counters::default()),
            next_id: AtomicU64::new(1),
            settings: BrowserSettings {
                max_concurrent_pages: max,
                ..settings.clone()
            },
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.settings.max_concurrent_pages
    }

    /// Free page slots right now.
    pub fn available_slots(&self) -> usize {
        self.permits.available_permits()
    }

    /// Opens a page, waiting while the pool is at its page cap.
    ///
    /// Idle contexts are evicted first. A context with no open pages and the
    /// same block list is reused; otherwise a new one is created with the
    /// persisted cookies loaded. Browser launch failures propagate.
    pub async fn acquire_page(&self, request: PageRequest) -> Result<PageLease> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| SearchError::Browser("session pool is closed".to_string()))?;
        self.counters.total_requests.fetch_add(1, Ordering::SeqCst);

        let options = self.context_options(&request);
        let fingerprint = options.block_fingerprint();

        let (context_id, context, usage) = {
            let mut contexts = self.contexts.lock().await;
            self.evict_idle(&mut contexts).await;

            let reusable = contexts
                .iter()
                .find(|c| c.usage.open_pages() == 0 && c.fingerprint == fingerprint);

            let picked = match reusable {
                Some(entry) => {
                    self.counters.reused.fetch_add(1, Ordering::SeqCst);
                    debug!("Reusing context #{} [{}]", entry.id, fingerprint);
                    (entry.id, Arc::clone(&entry.context), Arc::clone(&entry.usage))
                }
                None => {
                    let context = self.backend.new_context(&options).await?;
                    self.load_cookies(context.as_ref()).await;
                    let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                    let usage = Arc::new(ContextUsage::new());
                    contexts.push(PooledContext {
                        id,
                        context: Arc::clone(&context),
                        fingerprint: fingerprint.clone(),
                        usage: Arc::clone(&usage),
                    });
                    self.counters.created.fetch_add(1, Ordering::SeqCst);
                    info!("Created context #{} [{}], pool size {}", id, fingerprint, contexts.len());
                    if contexts.len() > self.settings.max_context_pool_size {
                        warn!(
                            "Context pool holds {} contexts, above the soft cap of {}",
                            contexts.len(),
                            self.settings.max_context_pool_size
                        );
                    }
                    (id, context, usage)
                }
            };
            picked.2.open();
            picked
        };

        let page = match context.new_page().await {
            Ok(page) => page,
            Err(e) => {
                usage.close();
                return Err(e);
            }
        };
        self.counters.active_requests.fetch_add(1, Ordering::SeqCst);

        Ok(PageLease {
            page: Arc::from(page),
            context,
            usage,
            counters: Arc::clone(&self.counters),
            permit: Some(permit),
            context_id,
            closed: false,
        })
    }

    fn context_options(&self, request: &PageRequest) -> ContextOptions {
        let user_agent = request.user_agent.clone().unwrap_or_else(|| {
            let mut rng = rand::rng();
            self.settings
                .user_agents
                .choose(&mut rng)
                .cloned()
                .unwrap_or_else(|| DEFAULT_USER_AGENTS[0].to_string())
        });
        ContextOptions::new(user_agent)
            .with_viewport(request.viewport.unwrap_or(self.settings.viewport))
            .with_locale(self.settings.locale.clone(), self.settings.timezone.clone())
            .with_accept_language(self.settings.accept_language.clone())
            .with_block_list(request.block_list.clone().unwrap_or_else(default_block_list))
    }

    async fn evict_idle(&self, contexts: &mut Vec<PooledContext>) {
        let timeout = self.settings.context_idle_timeout();
        let now = Instant::now();
        let mut kept = Vec::with_capacity(contexts.len());
        for entry in contexts.drain(..) {
            let idle = now.saturating_duration_since(entry.usage.idle_since());
            if entry.usage.open_pages() == 0 && idle >= timeout {
                debug!("Evicting context #{} idle for {:?}", entry.id, idle);
                if let Err(e) = entry.context.close().await {
                    warn!("Failed to close idle context #{}: {}", entry.id, e);
                }
            } else {
                kept.push(entry);
            }
        }
        *contexts = kept;
    }

    async fn load_cookies(&self, context: &dyn BrowserContext) {
        let Some(jar) = &self.cookie_jar else { return };
        match jar.load().await {
            Ok(cookies) if cookies.is_empty() => {}
            Ok(cookies) => {
                let count = cookies.len();
                match context.add_cookies(cookies).await {
                    Ok(()) => debug!("Loaded {} cookies into new context", count),
                    Err(e) => warn!("Failed to install cookies: {}", e),
                }
            }
            Err(e) => warn!("Failed to read cookie jar {}: {}", jar.path().display(), e),
        }
    }

    /// Persists the cookies of the lease's context, replacing the jar file.
    /// Returns how many were written; zero when no jar is configured.
    pub async fn save_cookies(&self, lease: &PageLease) -> Result<usize> {
        let Some(jar) = &self.cookie_jar else {
            return Ok(0);
        };
        let _guard = self.contexts.lock().await;
        let cookies = lease.context().cookies().await?;
        jar.save(&cookies).await?;
        info!("Saved {} cookies to {}", cookies.len(), jar.path().display());
        Ok(cookies.len())
    }

    pub async fn stats(&self) -> PoolStats {
        let pool_size = self.contexts.lock().await.len();
        self.snapshot(pool_size)
    }

    fn snapshot(&self, pool_size: usize) -> PoolStats {
        let created = self.counters.created.load(Ordering::SeqCst);
        let reused = self.counters.reused.load(Ordering::SeqCst);
        let handed_out = created + reused;
        PoolStats {
            total_requests: self.counters.total_requests.load(Ordering::SeqCst),
            active_requests: self.counters.active_requests.load(Ordering::SeqCst),
            max_concurrent: self.settings.max_concurrent_pages,
            browser_alive: self.backend.is_running(),
            context_pool_size: pool_size,
            context_create_count: created,
            context_reuse_count: reused,
            reuse_rate: if handed_out == 0 {
                0.0
            } else {
                reused as f64 / handed_out as f64
            },
        }
    }

    /// Closes every context and the browser, then reports final counters.
    ///
    /// Later acquisitions fail.
    pub async fn close(&self) -> PoolStats {
        self.permits.close();
        let mut contexts = self.contexts.lock().await;
        for entry in contexts.drain(..) {
            if let Err(e) = entry.context.close().await {
                warn!("Failed to close context #{}: {}", entry.id, e);
            }
        }
        if let Err(e) = self.backend.shutdown().await {
            warn!("Browser shutdown failed: {}", e);
        }
        let stats = self.snapshot(0);
        info!(
            "Session pool closed: {} requests, {} contexts created, {} reused",
            stats.total_requests, stats.context_create_count, stats.context_reuse_count
        );
        stats
    }
}
