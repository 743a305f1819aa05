// Terminal stand-in for the platform notification facility
use larder_core::{ExpiryNotification, NotificationSink};

pub struct ConsoleSink;

impl NotificationSink for ConsoleSink {
    fn deliver(&self, notification: &ExpiryNotification) {
        let stamp = chrono::Local::now().format("%H:%M");
        println!();
        println!("🔔 [{}] {}", stamp, notification.title);
        println!("   {}", notification.body);
        println!("   {}", notification.expanded_text);
        tracing::debug!("Delivered notification for {} item(s)", notification.item_count);
    }
}
