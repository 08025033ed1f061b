//! Sliding-window rate limiting keyed by domain and by engine.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::config::RateLimitSettings;

type Window = Arc<Mutex<VecDeque<Instant>>>;

/// Per-key windows for one dimension (domains or engines).
///
/// Each key has its own async lock, so a sleeping acquirer only holds back
/// callers for the same key.
#[derive(Default)]
struct Windows {
    keys: std::sync::Mutex<HashMap<String, Window>>,
}

impl Windows {
    fn window(&self, key: &str, span: Duration) -> Window {
        let mut keys = self.keys.lock().unwrap_or_else(|e| e.into_inner());
        prune(&mut keys, span);
        Arc::clone(keys.entry(key.to_string()).or_default())
    }

    fn existing(&self, key: &str) -> Option<Window> {
        let keys = self.keys.lock().unwrap_or_else(|e| e.into_inner());
        keys.get(key).map(Arc::clone)
    }

    fn len(&self) -> usize {
        self.keys.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    async fn throttle(&self, key: &str, max: usize, span: Duration) -> Duration {
        let window = self.window(key, span);
        let mut stamps = window.lock().await;
        let mut waited = Duration::ZERO;

        loop {
            let now = Instant::now();
            while stamps
                .front()
                .is_some_and(|t| now.duration_since(*t) >= span)
            {
                stamps.pop_front();
            }

            if stamps.len() < max {
                stamps.push_back(now);
                return waited;
            }

            let Some(oldest) = stamps.front().copied() else {
                continue;
            };
            let wait = span.saturating_sub(now.duration_since(oldest));
            debug!("Rate limit reached for '{}', sleeping {:?}", key, wait);
            tokio::time::sleep(wait).await;
            waited += wait;
        }
    }

    async fn count(&self, key: &str, span: Duration) -> usize {
        let Some(window) = self.existing(key) else {
            return 0;
        };
        let stamps = window.lock().await;
        let now = Instant::now();
        stamps
            .iter()
            .filter(|t| now.duration_since(**t) < span)
            .count()
    }
}

/// Drops keys that nobody holds and whose timestamps have all aged out.
fn prune(keys: &mut HashMap<String, Window>, span: Duration) {
    let now = Instant::now();
    keys.retain(|_, window| {
        if Arc::strong_count(window) > 1 {
            return true;
        }
        match window.try_lock() {
            Ok(stamps) => stamps
                .back()
                .is_some_and(|t| now.duration_since(*t) < span),
            Err(_) => true,
        }
    });
}

/// Caps request rate per destination domain and per engine independently.
///
/// Domain and engine limits are applied one after the other, so the worst
/// case wait is their sum. There is no global cap.
pub struct RateLimiter {
    window: Duration,
    max_per_domain: usize,
    max_per_engine: usize,
    domains: Windows,
    engines: Windows,
}

impl RateLimiter {
    /// Creates a limiter allowing `max_per_domain` / `max_per_engine` requests per `window`.
    pub fn new(window: Duration, max_per_domain: usize, max_per_engine: usize) -> Self {
        Self {
            window,
            max_per_domain: max_per_domain.max(1),
            max_per_engine: max_per_engine.max(1),
            domains: Windows::default(),
            engines: Windows::default(),
        }
    }

    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self::new(
            settings.window(),
            settings.max_per_domain,
            settings.max_per_engine,
        )
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Waits until a request to `domain` via `engine` fits in both windows,
    /// then records it. Returns the total time spent waiting.
    pub async fn acquire(&self, domain: Option<&str>, engine: Option<&str>) -> Duration {
        let mut waited = Duration::ZERO;
        if let Some(domain) = domain {
            waited += self
                .domains
                .throttle(domain, self.max_per_domain, self.window)
                .await;
        }
        if let Some(engine) = engine {
            waited += self
                .engines
                .throttle(engine, self.max_per_engine, self.window)
                .await;
        }
        waited
    }

    /// Requests to `domain` recorded within the trailing window.
    pub async fn domain_load(&self, domain: &str) -> usize {
        self.domains.count(domain, self.window).await
    }

    /// Requests through `engine` recorded within the trailing window.
    pub async fn engine_load(&self, engine: &str) -> usize {
        self.engines.count(engine, self.window).await
    }

    /// Number of domain and engine keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.domains.len() + self.engines.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::from_settings(&RateLimitSettings::default())
    }
}
