use chrono::{DateTime, Duration, Utc};
use larder_core::scheduler::EXPIRATION_CHECK;
use larder_core::viewmodels::{FoodForm, HomeViewModel, StatisticsViewModel};
use larder_core::{
    ExpirationScheduler, ExpiryNotification, ExpiryStatus, FixedClock, FoodRepository,
    NotificationSink, SchedulerRegistry, SchedulerState, TickOutcome,
};
use larder_store::{FoodItem, Store, WasteReason};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn start() -> DateTime<Utc> {
    DateTime::from_timestamp_millis(1_760_000_000_000).unwrap()
}

fn open(dir: &TempDir, clock: Arc<FixedClock>) -> FoodRepository {
    let store = Store::open(dir.path().join("larder.db")).unwrap();
    FoodRepository::with_clock(Arc::new(store), clock)
}

fn add(repo: &FoodRepository, name: &str, quantity: &str, days: &str) -> FoodItem {
    FoodForm {
        name: name.to_string(),
        category: "Other".to_string(),
        quantity: quantity.to_string(),
        expires_in_days: days.to_string(),
        ..FoodForm::default()
    }
    .submit(repo)
    .unwrap()
}

#[derive(Default)]
struct RecordingSink {
    delivered: Mutex<Vec<ExpiryNotification>>,
}

impl RecordingSink {
    fn count(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }
}

impl NotificationSink for RecordingSink {
    fn deliver(&self, notification: &ExpiryNotification) {
        self.delivered.lock().unwrap().push(notification.clone());
    }
}

#[test]
fn test_kitchen_lifecycle_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(FixedClock::new(start()));
    let repo = open(&dir, clock.clone());

    let bananas = add(&repo, "Bananas", "5", "2");
    let milk = add(&repo, "Milk", "1", "7");
    let bread = add(&repo, "Bread", "1", "1");

    let home = HomeViewModel::new(repo.clone()).unwrap();
    let state = home.state();
    assert_eq!(state.active_items_count, 3);
    let expiring: Vec<_> = state.expiring_items.iter().map(|t| t.item.name.as_str()).collect();
    assert_eq!(expiring, vec!["Bread", "Bananas"]);
    assert_eq!(state.expiring_items[1].status, ExpiryStatus::ExpiringSoon);

    repo.mark_as_consumed(&bread.id).unwrap();
    clock.advance(Duration::days(3));
    repo.log_waste(&bananas, WasteReason::Expired, Some(2.0)).unwrap();

    let stats = StatisticsViewModel::new(&repo).unwrap().state();
    assert_eq!(stats.active_items_count, 1);
    assert_eq!(stats.consumed_items_count, 1);
    assert_eq!(stats.waste.total_quantity, 5);
    drop(home);
    drop(repo);

    let reopened = open(&dir, clock);
    let active = reopened.active_items().unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0], milk);
    assert!(reopened.food_item(&bananas.id).unwrap().is_none());
    assert_eq!(reopened.require_food_item(&bread.id).unwrap().consumed_at, Some(start()));

    let logs = reopened.waste_logs().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].food_name, "Bananas");
    assert_eq!(logs[0].wasted_at, start() + Duration::days(3));
}

#[test]
fn test_settings_persist() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(FixedClock::new(start()));
    let repo = open(&dir, clock.clone());
    repo.set_warning_days(5).unwrap();
    repo.set_notifications_enabled(false).unwrap();
    drop(repo);

    let settings = open(&dir, clock).settings().unwrap();
    assert_eq!(settings.expiration_warning_days, 5);
    assert!(!settings.notifications_enabled);
    assert_eq!(settings.daily_reminder_time, "18:00");
}

#[test]
fn test_tick_reports_soonest_of_two() {
    let dir = TempDir::new().unwrap();
    let repo = open(&dir, Arc::new(FixedClock::new(start())));
    add(&repo, "Cheese", "1", "3");
    add(&repo, "Milk", "1", "1");
    add(&repo, "Rice", "1", "60");

    let sink = Arc::new(RecordingSink::default());
    let mut scheduler = ExpirationScheduler::new(repo, sink.clone(), std::time::Duration::from_secs(60));

    let TickOutcome::Notified(notification) = scheduler.tick() else {
        panic!("expected a notification");
    };
    assert_eq!(sink.count(), 1);
    assert!(notification.body.contains("Milk"));
    assert!(notification.body.contains('2'));
    assert_eq!(notification.title, "Food Expiring Soon!");
}

#[test]
fn test_tick_respects_disabled_notifications() {
    let dir = TempDir::new().unwrap();
    let repo = open(&dir, Arc::new(FixedClock::new(start())));
    add(&repo, "Milk", "1", "1");
    repo.set_notifications_enabled(false).unwrap();

    let sink = Arc::new(RecordingSink::default());
    let mut scheduler = ExpirationScheduler::new(repo, sink.clone(), std::time::Duration::from_secs(60));
    assert_eq!(scheduler.tick(), TickOutcome::NotificationsDisabled);
    assert_eq!(sink.count(), 0);
}

#[test]
fn test_tick_survives_broken_database() {
    let dir = TempDir::new().unwrap();
    let repo = open(&dir, Arc::new(FixedClock::new(start())));
    add(&repo, "Milk", "1", "1");
    repo.settings().unwrap();

    let other = rusqlite::Connection::open(dir.path().join("larder.db")).unwrap();
    other.execute_batch("DROP TABLE food_items").unwrap();
    drop(other);

    let sink = Arc::new(RecordingSink::default());
    let mut scheduler = ExpirationScheduler::new(repo, sink.clone(), std::time::Duration::from_secs(60));
    assert!(matches!(scheduler.tick(), TickOutcome::Failure(_)));
    assert_eq!(scheduler.state(), SchedulerState::Idle);
    assert_eq!(sink.count(), 0);

    // the next tick fails the same way instead of getting stuck
    assert!(matches!(scheduler.tick(), TickOutcome::Failure(_)));
    assert_eq!(scheduler.state(), SchedulerState::Idle);
}

#[tokio::test]
async fn test_registered_scheduler_ticks_until_shutdown() {
    let dir = TempDir::new().unwrap();
    let repo = open(&dir, Arc::new(FixedClock::new(start())));
    add(&repo, "Yogurt", "2", "0");

    let sink = Arc::new(RecordingSink::default());
    let registry = SchedulerRegistry::new();
    let period = std::time::Duration::from_millis(20);

    let build_sink = sink.clone();
    let build_repo = repo.clone();
    assert!(registry
        .ensure_registered(EXPIRATION_CHECK, move || {
            ExpirationScheduler::new(build_repo, build_sink, period)
        })
        .unwrap());
    // second registration keeps the running task
    assert!(!registry
        .ensure_registered(EXPIRATION_CHECK, || panic!("must not rebuild"))
        .unwrap());
    assert!(registry.is_registered(EXPIRATION_CHECK));

    for _ in 0..100 {
        if sink.count() >= 2 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert!(sink.count() >= 2);

    registry.shutdown_all().await;
    assert!(!registry.is_registered(EXPIRATION_CHECK));
    let after = sink.count();
    tokio::time::sleep(std::time::Duration::from_millis(60)).await;
    assert_eq!(sink.count(), after);
    assert!(sink.delivered.lock().unwrap()[0].body.contains("Yogurt expires today"));
}
