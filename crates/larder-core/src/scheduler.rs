// Periodic expiration check
//
// Two states: Idle between ticks, Checking while a tick runs. A tick that
// fails is logged and reported, never retried; the next tick is the retry.
use larder_store::FoodItem;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::expiry::{classify, days_until};
use crate::repository::FoodRepository;
use crate::Result;

/// Name the expiration check registers under
pub const EXPIRATION_CHECK: &str = "food_expiration_check";

pub const NOTIFICATION_TITLE: &str = "Food Expiring Soon!";

/// Where tapping the notification should land
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TapTarget {
    Home,
}

/// Payload handed to the platform's notification facility
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpiryNotification {
    pub title: String,
    pub body: String,
    pub expanded_text: String,
    pub tap_target: TapTarget,
    pub item_count: usize,
    pub first_item: String,
}

impl ExpiryNotification {
    /// Summary for `count` qualifying items, `first` being the soonest
    pub fn summarize(first: &FoodItem, first_days_left: i64, count: usize) -> Self {
        let name = &first.name;
        let (body, expanded_text) = if count == 1 && first_days_left <= 0 {
            (
                format!("{} expires today!", name),
                format!(
                    "Your {} is expiring today. Consider using it to avoid waste!",
                    name
                ),
            )
        } else if count == 1 {
            let days = if first_days_left == 1 { "day" } else { "days" };
            (
                format!("{} expires in {} {}!", name, first_days_left, days),
                format!(
                    "Your {} expires in {} {}. Consider using it to avoid waste!",
                    name, first_days_left, days
                ),
            )
        } else {
            (
                format!("{} items including {} expire soon!", count, name),
                format!(
                    "{} food items are expiring soon, including {}. Open Larder to see all items!",
                    count, name
                ),
            )
        };

        Self {
            title: NOTIFICATION_TITLE.to_string(),
            body,
            expanded_text,
            tap_target: TapTarget::Home,
            item_count: count,
            first_item: name.clone(),
        }
    }
}

/// Delivery end of the scheduler. Fire and forget: no acknowledgement.
#[cfg_attr(test, mockall::automock)]
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, notification: &ExpiryNotification);
}

/// Sink that only writes to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn deliver(&self, notification: &ExpiryNotification) {
        info!("{}: {}", notification.title, notification.body);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Checking,
}

/// What a single tick ended with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Notified(ExpiryNotification),
    NothingDue,
    NotificationsDisabled,
    Failure(String),
}

pub struct ExpirationScheduler {
    repo: FoodRepository,
    sink: Arc<dyn NotificationSink>,
    period: Duration,
    state: SchedulerState,
}

impl ExpirationScheduler {
    pub fn new(repo: FoodRepository, sink: Arc<dyn NotificationSink>, period: Duration) -> Self {
        Self {
            repo,
            sink,
            period,
            state: SchedulerState::Idle,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Run one check: Idle -> Checking -> Idle, whatever happens
    pub fn tick(&mut self) -> TickOutcome {
        self.state = SchedulerState::Checking;
        debug!("Expiration check started");

        let outcome = match self.check() {
            Ok(Some(notification)) => {
                self.sink.deliver(&notification);
                TickOutcome::Notified(notification)
            }
            Ok(None) => TickOutcome::NothingDue,
            Err(CheckSkipped::Disabled) => TickOutcome::NotificationsDisabled,
            Err(CheckSkipped::Failed(e)) => {
                warn!("Expiration check failed: {}", e);
                TickOutcome::Failure(e.to_string())
            }
        };

        self.state = SchedulerState::Idle;
        outcome
    }

    fn check(&self) -> std::result::Result<Option<ExpiryNotification>, CheckSkipped> {
        let settings = self.repo.settings()?;
        if !settings.notifications_enabled {
            debug!("Notifications disabled, skipping check");
            return Err(CheckSkipped::Disabled);
        }

        let now = self.repo.now();
        let warning_days = settings.expiration_warning_days;
        let due: Vec<FoodItem> = self
            .repo
            .active_items()?
            .into_iter()
            .filter(|item| classify(item.expires_at, now, warning_days).needs_attention())
            .collect();

        // active items come back sorted by expiration, but don't lean on it
        let Some(first) = due.iter().min_by_key(|item| item.expires_at) else {
            debug!("Nothing expiring within {} day(s)", warning_days);
            return Ok(None);
        };

        info!("{} item(s) expiring soon, first is {}", due.len(), first.name);
        Ok(Some(ExpiryNotification::summarize(
            first,
            days_until(first.expires_at, now),
            due.len(),
        )))
    }

    /// Tick on the configured period until `shutdown` flips to true
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Expiration checks every {:?}", self.period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let outcome = self.tick();
                    debug!("Tick finished: {:?}", outcome);
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Expiration scheduler stopping");
                        break;
                    }
                }
            }
        }
    }
}

enum CheckSkipped {
    Disabled,
    Failed(crate::Error),
}

impl From<crate::Error> for CheckSkipped {
    fn from(err: crate::Error) -> Self {
        CheckSkipped::Failed(err)
    }
}

struct RegisteredTask {
    handle: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

/// Named periodic tasks, at most one per name
#[derive(Default)]
pub struct SchedulerRegistry {
    tasks: Mutex<HashMap<String, RegisteredTask>>,
}

impl SchedulerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn the scheduler under `name` unless one is already running
    ///
    /// Keeps the existing task if there is one; `build` is only called when
    /// a new task is actually spawned. Returns whether it was.
    /// Must be called from inside a tokio runtime.
    pub fn ensure_registered<F>(&self, name: &str, build: F) -> Result<bool>
    where
        F: FnOnce() -> ExpirationScheduler,
    {
        let mut tasks = self
            .tasks
            .lock()
            .map_err(|_| crate::Error::ConfigError("scheduler registry poisoned".into()))?;

        if let Some(existing) = tasks.get(name) {
            if !existing.handle.is_finished() {
                debug!("{} already registered, keeping it", name);
                return Ok(false);
            }
        }

        let (shutdown, rx) = watch::channel(false);
        let handle = tokio::spawn(build().run(rx));
        tasks.insert(name.to_string(), RegisteredTask { handle, shutdown });
        info!("Registered periodic task {}", name);
        Ok(true)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.tasks
            .lock()
            .map(|tasks| tasks.get(name).map_or(false, |t| !t.handle.is_finished()))
            .unwrap_or(false)
    }

    /// Signal every task to stop and wait for them
    pub async fn shutdown_all(&self) {
        let drained: Vec<(String, RegisteredTask)> = match self.tasks.lock() {
            Ok(mut tasks) => tasks.drain().collect(),
            Err(_) => return,
        };

        for (name, task) in drained {
            let _ = task.shutdown.send(true);
            if let Err(e) = task.handle.await {
                warn!("Periodic task {} ended abnormally: {}", name, e);
            }
        }
    }
}
