//! Per-domain cron scheduling
//!
//! The ScheduleManager keeps at most one timer per domain. Each timer is a
//! spawned task that sleeps until the next cron fire time, runs the tick to
//! completion, then computes the following fire time.
//!
//! ## Tick
//!
//! 1. Reload the domain; if it is gone, drop its own schedule
//! 2. Skip silently when the provider is disabled or missing
//! 3. Resolve the current IP; on failure log and stop (no history row)
//! 4. Compare with the last known IP; unchanged means no provider call
//! 5. Otherwise delegate to the orchestrator, logging any error
//!
//! ## Time zone
//!
//! Fire times follow the host's local wall clock, so `0 3 * * *` means
//! 03:00 local time. Set `TZ` to pin a daemon to another zone.
//!
//! ## Cancellation
//!
//! Removing, replacing or shutting down takes effect at the next tick
//! boundary. A tick already running is never interrupted.

mod cron_expr;

pub use cron_expr::parse_cron;

use chrono::{DateTime, Local, TimeZone};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::engine::UpdateOrchestrator;
use crate::error::Result;
use crate::model::DomainId;

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Domain no longer exists; its schedule was dropped
    DomainMissing,
    /// Provider disabled or missing; nothing attempted
    ProviderUnavailable,
    /// IP resolution failed; nothing recorded
    IpUnavailable,
    /// Current IP equals the last known IP
    Unchanged,
    /// Provider accepted the new IP
    Updated,
    /// Provider rejected the new IP
    Rejected,
    /// Orchestrator or store error (logged)
    Failed,
}

struct TimerEntry {
    expression: String,
    generation: u64,
    cancel: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

struct Inner {
    orchestrator: Arc<UpdateOrchestrator>,
    timers: Mutex<HashMap<DomainId, TimerEntry>>,
    next_generation: AtomicU64,
    shut_down: AtomicBool,
}

impl Inner {
    fn timers(&self) -> MutexGuard<'_, HashMap<DomainId, TimerEntry>> {
        self.timers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Remove the timer for `domain_id` only if it is still `generation`
    fn remove_generation(&self, domain_id: DomainId, generation: Option<u64>) -> bool {
        let mut timers = self.timers();
        let current = timers.get(&domain_id).map(|entry| entry.generation);
        match (current, generation) {
            (Some(current), Some(expected)) if current != expected => false,
            (Some(_), _) => {
                if let Some(entry) = timers.remove(&domain_id) {
                    let _ = entry.cancel.send(());
                }
                true
            }
            (None, _) => false,
        }
    }

    async fn check_and_update(&self, domain_id: DomainId, generation: Option<u64>) -> TickOutcome {
        let store = self.orchestrator.store();

        let domain = match store.get_domain(domain_id).await {
            Ok(Some(domain)) => domain,
            Ok(None) => {
                warn!("Domain {} not found, removing schedule", domain_id);
                self.remove_generation(domain_id, generation);
                return TickOutcome::DomainMissing;
            }
            Err(e) => {
                error!("Failed to load domain {}: {}", domain_id, e);
                return TickOutcome::Failed;
            }
        };

        match store.get_provider(domain.provider_id).await {
            Ok(Some(provider)) if provider.is_enabled => {}
            Ok(Some(provider)) => {
                info!(
                    "Provider {} for domain {} is disabled, skipping",
                    provider.name, domain.domain_name
                );
                return TickOutcome::ProviderUnavailable;
            }
            Ok(None) => {
                warn!(
                    "Provider {} for domain {} not found, skipping",
                    domain.provider_id, domain.domain_name
                );
                return TickOutcome::ProviderUnavailable;
            }
            Err(e) => {
                error!("Failed to load provider for domain {}: {}", domain.domain_name, e);
                return TickOutcome::Failed;
            }
        }

        let current_ip = match self.orchestrator.resolver().resolve().await {
            Ok(ip) => ip,
            Err(e) => {
                error!("Failed to fetch IP for domain {}: {}", domain.domain_name, e);
                return TickOutcome::IpUnavailable;
            }
        };

        let last_known = domain
            .last_known_ip
            .as_deref()
            .and_then(|s| s.trim().parse::<Ipv4Addr>().ok());
        if last_known == Some(current_ip) {
            info!(
                "No IP change detected for {} (still {})",
                domain.domain_name, current_ip
            );
            return TickOutcome::Unchanged;
        }

        info!(
            "IP changed for {}: {} -> {}",
            domain.domain_name,
            domain.last_known_ip.as_deref().unwrap_or("none"),
            current_ip
        );
        match self.orchestrator.update_with_ip(domain_id, current_ip).await {
            Ok(true) => {
                info!("Successfully updated {} to {}", domain.domain_name, current_ip);
                TickOutcome::Updated
            }
            Ok(false) => TickOutcome::Rejected,
            Err(e) => {
                error!("Failed to update {}: {}", domain.domain_name, e);
                TickOutcome::Failed
            }
        }
    }
}

/// One cron timer per domain, sharing a single orchestrator
///
/// Constructed explicitly and torn down with [`ScheduleManager::shutdown`].
/// Clones share the same timers.
#[derive(Clone)]
pub struct ScheduleManager {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ScheduleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduleManager")
            .field("active", &self.active_count())
            .field("shut_down", &self.inner.shut_down.load(Ordering::SeqCst))
            .finish()
    }
}

impl ScheduleManager {
    pub fn new(orchestrator: Arc<UpdateOrchestrator>) -> Self {
        Self {
            inner: Arc::new(Inner {
                orchestrator,
                timers: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(1),
                shut_down: AtomicBool::new(false),
            }),
        }
    }

    /// Register (or replace) the timer for a domain
    ///
    /// Returns `false` without touching any existing timer when the
    /// expression does not parse or the manager has been shut down. Must be
    /// called from within a tokio runtime.
    pub fn add_schedule(&self, domain_id: DomainId, cron_expression: &str) -> bool {
        if self.inner.shut_down.load(Ordering::SeqCst) {
            warn!(
                "Scheduler is shut down, ignoring schedule for domain {}",
                domain_id
            );
            return false;
        }

        let schedule = match parse_cron(cron_expression) {
            Ok(schedule) => schedule,
            Err(e) => {
                error!("Invalid cron expression for domain {}: {}", domain_id, e);
                return false;
            }
        };

        let mut timers = self.inner.timers();
        if let Some(old) = timers.remove(&domain_id) {
            let _ = old.cancel.send(());
            info!("Removed old schedule for domain {}", domain_id);
        }

        let generation = self.inner.next_generation.fetch_add(1, Ordering::SeqCst);
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let handle = tokio::spawn(run_timer(
            Arc::downgrade(&self.inner),
            domain_id,
            generation,
            schedule,
            cancel_rx,
        ));

        timers.insert(
            domain_id,
            TimerEntry {
                expression: cron_expression.trim().to_string(),
                generation,
                cancel: cancel_tx,
                handle,
            },
        );
        info!("Added schedule for domain {}: {}", domain_id, cron_expression);
        true
    }

    /// Cancel and discard the timer for a domain; `false` if there was none
    pub fn remove_schedule(&self, domain_id: DomainId) -> bool {
        let removed = self.inner.remove_generation(domain_id, None);
        if removed {
            info!("Removed schedule for domain {}", domain_id);
        }
        removed
    }

    /// Register a timer for every stored domain that has a cron expression
    ///
    /// Returns how many timers were registered. Invalid expressions are
    /// logged and skipped.
    pub async fn load_all_schedules(&self) -> Result<usize> {
        let domains = self.inner.orchestrator.store().list_scheduled_domains().await?;

        let mut loaded = 0;
        for domain in domains {
            let Some(expression) = domain.cron_schedule.as_deref() else {
                continue;
            };
            if self.add_schedule(domain.id, expression) {
                info!("Loaded schedule for domain {}: {}", domain.id, expression);
                loaded += 1;
            }
        }
        Ok(loaded)
    }

    /// Run one tick for a domain immediately
    pub async fn check_and_update(&self, domain_id: DomainId) -> TickOutcome {
        self.inner.check_and_update(domain_id, None).await
    }

    /// Cancel every timer and wait for in-flight ticks to finish
    ///
    /// Further `add_schedule` calls return `false`. Safe to call twice.
    pub async fn shutdown(&self) {
        self.inner.shut_down.store(true, Ordering::SeqCst);

        let entries: Vec<(DomainId, TimerEntry)> = self.inner.timers().drain().collect();
        let count = entries.len();

        let mut handles = Vec::with_capacity(count);
        for (_, entry) in entries {
            let _ = entry.cancel.send(());
            handles.push(entry.handle);
        }
        for handle in handles {
            if let Err(e) = handle.await {
                error!("Schedule task ended abnormally: {}", e);
            }
        }

        info!("Scheduler shut down ({} timer(s) cancelled)", count);
    }

    pub fn is_scheduled(&self, domain_id: DomainId) -> bool {
        self.inner.timers().contains_key(&domain_id)
    }

    /// Expression of the active timer for a domain
    pub fn cron_expression(&self, domain_id: DomainId) -> Option<String> {
        self.inner
            .timers()
            .get(&domain_id)
            .map(|entry| entry.expression.clone())
    }

    pub fn active_count(&self) -> usize {
        self.inner.timers().len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::SeqCst)
    }
}

/// First fire time strictly after `from`, on `from`'s wall clock
fn next_fire<Tz: TimeZone>(schedule: &cron::Schedule, from: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    schedule.after(from).next()
}

async fn run_timer(
    inner: Weak<Inner>,
    domain_id: DomainId,
    generation: u64,
    schedule: cron::Schedule,
    mut cancel: oneshot::Receiver<()>,
) {
    let mut last_fire: Option<DateTime<Local>> = None;

    loop {
        let now = Local::now();
        let from = last_fire.map_or(now, |last| last.max(now));
        let Some(next) = next_fire(&schedule, &from) else {
            info!("Schedule for domain {} has no further fire times", domain_id);
            break;
        };
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        debug!("Domain {} next check at {} (in {:?})", domain_id, next, wait);

        tokio::select! {
            biased;
            _ = &mut cancel => break,
            _ = tokio::time::sleep(wait) => {}
        }
        last_fire = Some(next);

        let Some(manager) = inner.upgrade() else {
            break;
        };
        manager.check_and_update(domain_id, Some(generation)).await;
    }

    debug!("Timer for domain {} (generation {}) stopped", domain_id, generation);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Timelike, Utc};

    #[test]
    fn fire_times_follow_the_callers_wall_clock() {
        let schedule = cron_expr::parse_cron("0 3 * * *").unwrap();
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let from = plus_two.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        let next = next_fire(&schedule, &from).unwrap();
        assert_eq!((next.hour(), next.minute()), (3, 0));
        assert_eq!(next.with_timezone(&Utc).hour(), 1);
    }
}
