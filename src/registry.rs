//! Engine registry with adaptive ban state.
//!
//! Engines are registered as `(id, constructor)` pairs and built lazily on
//! first use. An engine caught by anti-bot defenses is banned for
//! `min(base * 2^(n-1), max)` where `n` counts every ban it has received.
//! Ban counts survive automatic unbans, so repeat offenders escalate.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rand::seq::IndexedRandom;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::EngineSettings;
use crate::engines::{Baidu, Bing, Google, So360, Sogou};
use crate::error::{BlockReason, Unavailable};
use crate::{Engine, Result, SearchError};

/// Builds a fresh engine instance.
pub type EngineConstructor = Arc<dyn Fn() -> Arc<dyn Engine> + Send + Sync>;

/// Live ban of one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BanRecord {
    pub unban_at: Instant,
    /// Total bans issued to the engine, including this one.
    pub ban_count: u32,
    pub reason: BlockReason,
}

impl BanRecord {
    /// Time left until the ban lapses.
    pub fn remaining(&self) -> Duration {
        self.unban_at.saturating_duration_since(Instant::now())
    }
}

/// Point-in-time view of one registered engine.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    pub banned: bool,
    pub ban_count: u32,
    pub remaining_secs: u64,
    /// Position in the fallback order, starting at 1.
    pub priority: usize,
}

#[derive(Default)]
struct BanState {
    live: HashMap<String, BanRecord>,
    strikes: HashMap<String, u32>,
}

impl BanState {
    /// Drops the live ban once `now >= unban_at`. Returns whether it is still live.
    fn check(&mut self, id: &str, now: Instant) -> bool {
        match self.live.get(id) {
            Some(record) if now >= record.unban_at => {
                self.live.remove(id);
                info!("Engine '{}' ban expired", id);
                false
            }
            Some(_) => true,
            None => false,
        }
    }
}

/// Holds pluggable engines and decides which are eligible right now.
pub struct EngineRegistry {
    constructors: Vec<(String, EngineConstructor)>,
    enabled: HashSet<String>,
    priority: Vec<String>,
    ban_base: Duration,
    ban_max: Duration,
    cache: Mutex<HashMap<String, Arc<dyn Engine>>>,
    bans: Mutex<BanState>,
}

impl EngineRegistry {
    /// Creates a registry preloaded with the built-in engines.
    pub fn new(settings: &EngineSettings) -> Self {
        let mut registry = Self::empty(settings);
        for (id, ctor) in builtin_constructors() {
            registry.constructors.push((id.to_string(), ctor));
        }
        registry
    }

    /// Creates a registry with no engines registered.
    pub fn empty(settings: &EngineSettings) -> Self {
        Self {
            constructors: Vec::new(),
            enabled: settings.enabled.iter().cloned().collect(),
            priority: settings.priority.clone(),
            ban_base: Duration::from_secs(settings.ban_base_secs),
            ban_max: Duration::from_secs(settings.ban_max_secs.max(settings.ban_base_secs)),
            cache: Mutex::new(HashMap::new()),
            bans: Mutex::new(BanState::default()),
        }
    }

    /// Registers or replaces an engine and enables it.
    pub fn register<F>(&mut self, id: impl Into<String>, ctor: F)
    where
        F: Fn() -> Arc<dyn Engine> + Send + Sync + 'static,
    {
        let id = id.into();
        self.constructors.retain(|(existing, _)| *existing != id);
        self.enabled.insert(id.clone());
        lock(&self.cache).remove(&id);
        self.constructors.push((id, Arc::new(ctor)));
    }

    /// Replaces the enabled set.
    pub fn with_enabled<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enabled = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the fallback order.
    pub fn with_priority<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.priority = ids.into_iter().map(Into::into).collect();
        self
    }

    /// All registered ids in fallback order.
    pub fn all_ids(&self) -> Vec<String> {
        let registered: Vec<&str> = self.constructors.iter().map(|(id, _)| id.as_str()).collect();
        let mut ordered: Vec<String> = self
            .priority
            .iter()
            .filter(|id| registered.contains(&id.as_str()))
            .cloned()
            .collect();
        for id in registered {
            if !ordered.iter().any(|o| o == id) {
                ordered.push(id.to_string());
            }
        }
        ordered
    }

    /// Registered and enabled ids in fallback order, banned or not.
    pub fn enabled_ids(&self) -> Vec<String> {
        self.all_ids()
            .into_iter()
            .filter(|id| self.is_enabled(id))
            .collect()
    }

    fn is_enabled(&self, id: &str) -> bool {
        self.enabled.contains(id)
            && self
                .instance(id)
                .map(|engine| engine.is_enabled())
                .unwrap_or(false)
    }

    fn instance(&self, id: &str) -> Option<Arc<dyn Engine>> {
        let mut cache = lock(&self.cache);
        if let Some(engine) = cache.get(id) {
            return Some(Arc::clone(engine));
        }
        let (_, ctor) = self.constructors.iter().find(|(k, _)| k == id)?;
        let engine = ctor();
        debug!("Constructed engine '{}'", id);
        cache.insert(id.to_string(), Arc::clone(&engine));
        Some(engine)
    }

    /// Returns the engine if it is enabled and not banned.
    pub fn get_engine(&self, id: &str) -> Option<Arc<dyn Engine>> {
        self.try_engine(id).ok()
    }

    /// Like [`get_engine`](Self::get_engine) but says why an engine is unavailable.
    pub fn try_engine(&self, id: &str) -> Result<Arc<dyn Engine>> {
        let unavailable = |reason| SearchError::EngineUnavailable {
            engine: id.to_string(),
            reason,
        };
        let engine = self.instance(id).ok_or_else(|| unavailable(Unavailable::Unknown))?;
        if !self.enabled.contains(id) || !engine.is_enabled() {
            return Err(unavailable(Unavailable::Disabled));
        }
        if self.is_banned(id) {
            return Err(unavailable(Unavailable::Banned));
        }
        Ok(engine)
    }

    /// Bans `id` and returns the ban duration.
    ///
    /// IP-level blocks are held for at least the maximum ban.
    pub fn ban_engine(&self, id: &str, reason: BlockReason) -> Duration {
        let mut bans = lock(&self.bans);
        let count = bans.strikes.get(id).copied().unwrap_or(0) + 1;
        bans.strikes.insert(id.to_string(), count);

        let mut duration = self.ban_duration(count);
        if reason == BlockReason::IpBlocked {
            duration = duration.max(self.ban_max);
        }

        bans.live.insert(
            id.to_string(),
            BanRecord {
                unban_at: Instant::now() + duration,
                ban_count: count,
                reason,
            },
        );
        warn!(
            "Engine '{}' banned for {}s (ban #{}, reason: {})",
            id,
            duration.as_secs(),
            count,
            reason
        );
        duration
    }

    /// `min(base * 2^(count-1), max)`.
    pub fn ban_duration(&self, count: u32) -> Duration {
        let exp = count.saturating_sub(1).min(31);
        let factor = 1u32 << exp;
        self.ban_base
            .checked_mul(factor)
            .unwrap_or(self.ban_max)
            .min(self.ban_max)
    }

    /// True strictly before the engine's unban time; clears expired bans.
    pub fn is_banned(&self, id: &str) -> bool {
        lock(&self.bans).check(id, Instant::now())
    }

    /// Lifts a ban early. The ban count is kept.
    pub fn unban(&self, id: &str) -> bool {
        lock(&self.bans).live.remove(id).is_some()
    }

    /// Live ban record, if any.
    pub fn ban_record(&self, id: &str) -> Option<BanRecord> {
        let mut bans = lock(&self.bans);
        if bans.check(id, Instant::now()) {
            bans.live.get(id).copied()
        } else {
            None
        }
    }

    /// Bans issued to `id` so far.
    pub fn ban_count(&self, id: &str) -> u32 {
        lock(&self.bans).strikes.get(id).copied().unwrap_or(0)
    }

    /// Uniform choice among enabled, non-banned engines.
    pub fn random_engine(&self) -> Option<Arc<dyn Engine>> {
        let eligible = self.eligible_ids();
        let mut rng = rand::rng();
        let id = eligible.choose(&mut rng)?;
        self.instance(id)
    }

    /// Enabled, non-banned engines in fallback order.
    pub fn engines_by_priority(&self) -> Vec<Arc<dyn Engine>> {
        self.eligible_ids()
            .iter()
            .filter_map(|id| self.instance(id))
            .collect()
    }

    fn eligible_ids(&self) -> Vec<String> {
        self.enabled_ids()
            .into_iter()
            .filter(|id| !self.is_banned(id))
            .collect()
    }

    /// Number of engines eligible right now.
    pub fn available_count(&self) -> usize {
        self.eligible_ids().len()
    }

    /// Number of engines serving a ban right now.
    pub fn banned_count(&self) -> usize {
        self.all_ids().iter().filter(|id| self.is_banned(id)).count()
    }

    /// Status of every registered engine, in fallback order.
    pub fn snapshot(&self) -> Vec<EngineStatus> {
        self.all_ids()
            .into_iter()
            .enumerate()
            .map(|(idx, id)| {
                let name = self
                    .instance(&id)
                    .map(|e| e.name().to_string())
                    .unwrap_or_default();
                let record = self.ban_record(&id);
                EngineStatus {
                    name,
                    enabled: self.is_enabled(&id),
                    banned: record.is_some(),
                    ban_count: self.ban_count(&id),
                    remaining_secs: record.map(|r| r.remaining().as_secs()).unwrap_or(0),
                    priority: idx + 1,
                    id,
                }
            })
            .collect()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn builtin_constructors() -> Vec<(&'static str, EngineConstructor)> {
    vec![
        ("baidu", Arc::new(|| Arc::new(Baidu::new()) as Arc<dyn Engine>)),
        ("bing", Arc::new(|| Arc::new(Bing::new()) as Arc<dyn Engine>)),
        ("sogou", Arc::new(|| Arc::new(Sogou::new()) as Arc<dyn Engine>)),
        ("google", Arc::new(|| Arc::new(Google::new()) as Arc<dyn Engine>)),
        ("360", Arc::new(|| Arc::new(So360::new()) as Arc<dyn Engine>)),
    ]
}
