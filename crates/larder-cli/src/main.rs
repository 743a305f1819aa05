use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use larder_core::expiry::{window_start, MAX_WARNING_DAYS};
use larder_core::scheduler::EXPIRATION_CHECK;
use larder_core::viewmodels::{
    validate_reminder_time, FoodDetailViewModel, FoodForm, HomeViewModel, RecipesViewModel,
    StatisticsViewModel,
};
use larder_core::{
    Config, DemoRecipeProvider, ExpirationScheduler, FoodRepository, NotificationSink,
    RecipeProvider, SchedulerRegistry, TickOutcome, TrackedItem,
};
use larder_store::{Store, WasteReason, CATEGORIES, UNITS};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod output;
mod sink;

use sink::ConsoleSink;

#[derive(Parser)]
#[command(name = "larder")]
#[command(version, about = "Keep track of what's in the kitchen before it goes off", long_about = None)]
struct Cli {
    /// Database file, overrides the config
    #[arg(long, global = true, env = "LARDER_DB")]
    db: Option<PathBuf>,

    /// Config file to read instead of the default one
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a food item
    Add {
        name: String,
        #[arg(short, long)]
        category: String,
        #[arg(short, long, default_value = "1")]
        quantity: String,
        #[arg(short, long, default_value = larder_store::DEFAULT_UNIT)]
        unit: String,
        /// Days until it expires
        #[arg(short, long, default_value = "7")]
        expires_in: String,
        /// Path to a photo of the item
        #[arg(long)]
        photo: Option<PathBuf>,
    },
    /// List everything not yet consumed
    List {
        #[arg(long)]
        json: bool,
    },
    /// Items expiring within the warning window
    Expiring {
        /// Window in days, defaults to the saved setting
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(..=i64::from(MAX_WARNING_DAYS)))]
        days: Option<u32>,
        #[arg(long)]
        json: bool,
    },
    /// Show one item
    Show { id: String },
    /// Change an item's details
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        #[arg(short, long)]
        quantity: Option<String>,
        #[arg(short, long)]
        unit: Option<String>,
        /// Days from now until it expires
        #[arg(short, long)]
        expires_in: Option<String>,
    },
    /// Mark an item as eaten
    Consume { id: String },
    /// Throw an item away and log it as waste
    Waste {
        id: String,
        /// expired, spoiled, too_much or other
        #[arg(short, long, default_value = "expired")]
        reason: WasteReason,
        /// Estimated value of what was thrown away
        #[arg(long)]
        value: Option<f64>,
    },
    /// Remove an item without logging waste
    Delete { id: String },
    /// Show the waste log
    WasteLog {
        /// Only the last N days
        #[arg(short, long)]
        days: Option<u32>,
        #[arg(long)]
        json: bool,
    },
    /// Counts and the last 30 days of waste
    Stats,
    /// Show or change settings
    Settings {
        /// Turn reminders on or off
        #[arg(long)]
        notifications: Option<bool>,
        /// Days before expiration to start warning
        #[arg(long, value_parser = clap::value_parser!(u32).range(..=i64::from(MAX_WARNING_DAYS)))]
        warning_days: Option<u32>,
        /// Daily reminder time, HH:MM
        #[arg(long)]
        reminder_time: Option<String>,
    },
    /// Recipe ideas for what's expiring
    Recipes {
        /// Search a single query instead
        #[arg(short, long)]
        query: Option<String>,
    },
    /// Run the expiration check once
    Check,
    /// Run the expiration check periodically until Ctrl-C
    Watch {
        /// Minutes between checks, overrides the config
        #[arg(short, long)]
        interval_minutes: Option<u64>,
    },
    /// Show the effective configuration
    Config {
        /// Write it to the config file
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(db) = &cli.db {
        config.storage.database_path = Some(db.clone());
    }

    // RUST_LOG wins over the configured filter
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // needs no database
    if let Some(Commands::Config { init }) = &cli.command {
        return show_config(&config, cli.config.clone(), *init);
    }

    let repo = open_repository(&config)?;
    let Some(command) = cli.command else {
        output::print_home(&HomeViewModel::new(repo)?.state());
        return Ok(());
    };

    match command {
        Commands::Add {
            name,
            category,
            quantity,
            unit,
            expires_in,
            photo,
        } => {
            let form = FoodForm {
                name,
                category,
                quantity,
                unit,
                expires_in_days: expires_in,
                photo_path: photo.map(|p| p.display().to_string()),
                prefilled_expires_in_days: None,
            };
            let item = form.submit(&repo)?;
            println!("Added {} ({})", item.name, output::short_id(&item.id));
            if !CATEGORIES.contains(&item.category.as_str()) {
                println!("  note: usual categories are {}", CATEGORIES.join(", "));
            }
            if !UNITS.contains(&item.unit.as_str()) {
                println!("  note: usual units are {}", UNITS.join(", "));
            }
        }
        Commands::List { json } => {
            let state = HomeViewModel::new(repo)?.state();
            if json {
                println!("{}", serde_json::to_string_pretty(&state.food_items)?);
            } else {
                output::print_items(&state.food_items);
            }
        }
        Commands::Expiring { days, json } => {
            let warning_days = match days {
                Some(d) => d,
                None => repo.settings()?.expiration_warning_days,
            };
            let items = TrackedItem::assess_all(repo.expiring_items(warning_days)?, repo.now(), warning_days);
            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else if items.is_empty() {
                println!("Nothing expiring in the next {} day(s)", warning_days);
            } else {
                output::print_items(&items);
            }
        }
        Commands::Show { id } => {
            let vm = FoodDetailViewModel::new(repo.clone(), resolve_id(&repo, &id)?);
            let state = vm.state();
            match state.food_item {
                Some(item) => output::print_detail(&item),
                None => bail!(state.error.unwrap_or_else(|| "Food item not found".into())),
            }
        }
        Commands::Edit {
            id,
            name,
            category,
            quantity,
            unit,
            expires_in,
        } => {
            let mut vm = FoodDetailViewModel::new(repo.clone(), resolve_id(&repo, &id)?);
            let Some(mut form) = vm.edit_form() else {
                bail!("No food item with id {}", id);
            };
            if let Some(name) = name {
                form.name = name;
            }
            if let Some(category) = category {
                form.category = category;
            }
            if let Some(quantity) = quantity {
                form.quantity = quantity;
            }
            if let Some(unit) = unit {
                form.unit = unit;
            }
            // an explicit value always applies, even if it matches the prefill
            if let Some(expires_in) = expires_in {
                form.expires_in_days = expires_in;
                form.prefilled_expires_in_days = None;
            }
            let item = vm.update(&form)?;
            println!("Updated {}", item.name);
        }
        Commands::Consume { id } => {
            let mut vm = FoodDetailViewModel::new(repo.clone(), resolve_id(&repo, &id)?);
            if vm.mark_as_consumed()? {
                println!("Enjoy! Marked as consumed");
            } else {
                println!("Already consumed, nothing changed");
            }
        }
        Commands::Waste { id, reason, value } => {
            let mut vm = FoodDetailViewModel::new(repo.clone(), resolve_id(&repo, &id)?);
            let log = vm.log_waste(reason, value)?;
            println!(
                "Logged {} x{} {} as wasted ({})",
                log.food_name, log.quantity, log.unit, log.reason
            );
        }
        Commands::Delete { id } => {
            let mut vm = FoodDetailViewModel::new(repo.clone(), resolve_id(&repo, &id)?);
            vm.delete()?;
            println!("Deleted");
        }
        Commands::WasteLog { days, json } => {
            let logs = match days {
                Some(d) => {
                    let now = repo.now();
                    repo.waste_logs_between(window_start(now, d), now)?
                }
                None => repo.waste_logs()?,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&logs)?);
            } else {
                output::print_waste_logs(&logs);
            }
        }
        Commands::Stats => {
            output::print_stats(&StatisticsViewModel::new(&repo)?.state());
        }
        Commands::Settings {
            notifications,
            warning_days,
            reminder_time,
        } => {
            let mut settings = repo.settings()?;
            let changed = notifications.is_some() || warning_days.is_some() || reminder_time.is_some();
            if let Some(enabled) = notifications {
                settings.notifications_enabled = enabled;
            }
            if let Some(days) = warning_days {
                settings.expiration_warning_days = days;
            }
            if let Some(time) = reminder_time {
                settings.daily_reminder_time = validate_reminder_time(&time)?;
            }
            if changed {
                repo.update_settings(&settings)?;
            }
            output::print_settings(&settings);
        }
        Commands::Recipes { query } => {
            let provider = Arc::new(DemoRecipeProvider::new(config.recipes.delay()));
            match query {
                Some(q) => output::print_recipes(&q, &provider.search(&q).await?),
                None => {
                    let vm = RecipesViewModel::new(repo, provider);
                    vm.load().await?;
                    output::print_recipe_screen(&vm.state());
                }
            }
        }
        Commands::Check => {
            let sink: Arc<dyn NotificationSink> = Arc::new(ConsoleSink);
            let mut scheduler = ExpirationScheduler::new(repo, sink, config.scheduler.interval());
            match scheduler.tick() {
                TickOutcome::Notified(_) => {}
                TickOutcome::NothingDue => println!("Nothing expiring soon"),
                TickOutcome::NotificationsDisabled => println!("Notifications are turned off"),
                TickOutcome::Failure(e) => bail!("Expiration check failed: {}", e),
            }
        }
        Commands::Watch { interval_minutes } => {
            let period = match interval_minutes {
                Some(m) => std::time::Duration::from_secs(m.max(1) * 60),
                None => config.scheduler.interval(),
            };
            let sink: Arc<dyn NotificationSink> = Arc::new(ConsoleSink);
            let registry = SchedulerRegistry::new();
            registry.ensure_registered(EXPIRATION_CHECK, || ExpirationScheduler::new(repo, sink, period))?;

            println!("Checking every {} minute(s). Ctrl-C to stop.", period.as_secs() / 60);
            tokio::signal::ctrl_c().await?;
            registry.shutdown_all().await;
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}

fn open_repository(config: &Config) -> anyhow::Result<FoodRepository> {
    let path = config.database_path()?;
    tracing::debug!("Opening database at {}", path.display());
    let store = Store::open(&path).with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(FoodRepository::new(Arc::new(store)))
}

/// Accept a full id or an unambiguous prefix of an active item's id
fn resolve_id(repo: &FoodRepository, id: &str) -> anyhow::Result<String> {
    if repo.food_item(id)?.is_some() {
        return Ok(id.to_string());
    }

    let matches: Vec<String> = repo
        .active_items()?
        .into_iter()
        .filter(|item| item.id.starts_with(id))
        .map(|item| item.id)
        .collect();

    match matches.as_slice() {
        [only] => Ok(only.clone()),
        [] => bail!("No food item with id {}", id),
        _ => bail!("Id prefix {} matches {} items, use more characters", id, matches.len()),
    }
}

fn show_config(config: &Config, path: Option<PathBuf>, init: bool) -> anyhow::Result<()> {
    if init {
        let path = match path {
            Some(p) => {
                config.save_to(&p)?;
                p
            }
            None => config.save()?,
        };
        println!("Wrote {}", path.display());
        return Ok(());
    }

    print!("{}", toml::to_string_pretty(config)?);
    println!("# database: {}", config.database_path()?.display());
    Ok(())
}
