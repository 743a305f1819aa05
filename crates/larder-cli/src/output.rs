// Plain-text rendering for the terminal
use chrono::{DateTime, Local, Utc};
use larder_core::viewmodels::{HomeUiState, RecipesUiState, StatisticsUiState};
use larder_core::{ExpiryStatus, RecipeSummary, TrackedItem};
use larder_store::{UserSettings, WasteLog};

const SHORT_ID_LEN: usize = 8;

pub fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID_LEN).unwrap_or(id)
}

fn date(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d").to_string()
}

fn marker(status: ExpiryStatus) -> &'static str {
    match status {
        ExpiryStatus::Overdue => "✗",
        ExpiryStatus::Today => "!",
        ExpiryStatus::ExpiringSoon => "⚠",
        ExpiryStatus::Upcoming => " ",
    }
}

pub fn print_items(items: &[TrackedItem]) {
    if items.is_empty() {
        println!("Nothing in the larder");
        return;
    }

    println!(
        "  {:<8}  {:<24} {:<12} {:>12}  {:<10}  {}",
        "ID", "NAME", "CATEGORY", "QUANTITY", "EXPIRES", ""
    );
    for tracked in items {
        let item = &tracked.item;
        println!(
            "{} {:<8}  {:<24} {:<12} {:>12}  {:<10}  {}",
            marker(tracked.status),
            short_id(&item.id),
            item.name,
            item.category,
            format!("{} {}", item.quantity, item.unit),
            date(item.expires_at),
            tracked.label()
        );
    }
}

pub fn print_home(state: &HomeUiState) {
    println!("{} item(s) in the larder", state.active_items_count);
    if !state.expiring_items.is_empty() {
        println!();
        println!("Use these first:");
        for tracked in &state.expiring_items {
            println!("  {} {} ({})", marker(tracked.status), tracked.item.name, tracked.label());
        }
    }
    println!();
    print_items(&state.food_items);
}

pub fn print_detail(tracked: &TrackedItem) {
    let item = &tracked.item;
    println!("{}", item.name);
    println!("  id:        {}", item.id);
    println!("  category:  {}", item.category);
    println!("  quantity:  {} {}", item.quantity, item.unit);
    println!("  purchased: {}", date(item.purchased_at));
    println!("  expires:   {} ({})", date(item.expires_at), tracked.label());
    match item.consumed_at {
        Some(at) => println!("  consumed:  {}", date(at)),
        None => println!("  status:    {}", tracked.status),
    }
    if let Some(photo) = &item.photo_path {
        println!("  photo:     {}", photo);
    }
}

pub fn print_waste_logs(logs: &[WasteLog]) {
    if logs.is_empty() {
        println!("No waste logged. Nice.");
        return;
    }

    for log in logs {
        let value = log
            .estimated_value
            .map(|v| format!("  ~{:.2}", v))
            .unwrap_or_default();
        println!(
            "{}  {:<24} {:>4} {:<10} {:<9}{}",
            date(log.wasted_at),
            log.food_name,
            log.quantity,
            log.unit,
            log.reason.as_str(),
            value
        );
    }
}

pub fn print_stats(state: &StatisticsUiState) {
    println!("Active:    {}", state.active_items_count);
    println!("Consumed:  {}", state.consumed_items_count);
    println!("Expiring:  {}", state.expiring_items_count);
    println!("Total:     {}", state.total_items_count);
    println!("Eaten:     {:.0}%", state.consumption_rate() * 100.0);
    println!();
    println!("Waste, last 30 days:");
    println!("  events:    {}", state.waste.events);
    println!("  quantity:  {}", state.waste.total_quantity);
    if state.waste.total_value > 0.0 {
        println!("  value:     ~{:.2}", state.waste.total_value);
    }
}

pub fn print_settings(settings: &UserSettings) {
    println!(
        "notifications:  {}",
        if settings.notifications_enabled { "on" } else { "off" }
    );
    println!("reminder time:  {}", settings.daily_reminder_time);
    println!("warning window: {} day(s)", settings.expiration_warning_days);
}

pub fn print_recipes(heading: &str, recipes: &[RecipeSummary]) {
    println!("{}", heading);
    for recipe in recipes {
        println!(
            "  • {} ({} min, serves {})",
            recipe.title, recipe.duration_minutes, recipe.servings
        );
        if let Some(description) = &recipe.description {
            println!("    {}", description);
        }
    }
}

pub fn print_recipe_screen(state: &RecipesUiState) {
    if let Some(error) = &state.error {
        println!("({})", error);
    }
    if !state.suggested_recipes.is_empty() {
        let names: Vec<&str> = state.expiring_items.iter().map(|i| i.name.as_str()).collect();
        print_recipes(&format!("Use up {}", names.join(", ")), &state.suggested_recipes);
        println!();
    }
    for section in &state.sections {
        print_recipes(&section.name, &section.recipes);
        println!();
    }
}
