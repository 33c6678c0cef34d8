use std::env;
use std::sync::Arc;

use clap::Parser;
use log::log_enabled;

use zhmensa::constants::DB_FILENAME;
use zhmensa::data_types::{
    Allergen, Campus, CampusFilter, Lang, Mensa, OpeningState, PriceDisplay, ShowMode, SortMode,
};
use zhmensa::db_operations::{check_or_create_db_tables, increase_clicks};
use zhmensa::geo::{LocationResolver, NominatimGeocoder};
use zhmensa::pipeline::{CatalogManager, DbClickCounts};

/// Fetches and filters the ETH and UZH mensa menus.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Menu language
    #[arg(short, long, env = "MENSA_LANG", value_enum, default_value = "en")]
    lang: Lang,
    /// SQLite file for click counts and the geocode cache
    #[arg(long, env = "MENSA_DB", default_value = "zhmensa.sqlite")]
    db: String,
    /// Only mensas whose name contains this
    #[arg(short, long)]
    search: Option<String>,
    /// Only mensas that are open right now
    #[arg(short, long)]
    open: bool,
    /// Only mensas on this campus
    #[arg(short, long, value_enum)]
    campus: Option<Campus>,
    /// Hide mensas without a menu on the shown day
    #[arg(long)]
    hide_empty: bool,
    /// Hide mensas serving this allergen (repeatable), e.g. 'gluten'
    #[arg(long = "exclude-allergen")]
    exclude_allergen: Vec<String>,
    /// Show another weekday instead of today (1 = Monday .. 7 = Sunday)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=7))]
    weekday: Option<u8>,
    /// Sort order
    #[arg(long, value_enum, default_value = "clicks")]
    sort: SortMode,
    /// Which price tier to print
    #[arg(short, long, value_enum, default_value = "all")]
    price: PriceDisplay,
    /// Record a visit for the given mensa id (e.g. 'uzh/148') before listing
    #[arg(long)]
    visit: Option<String>,
    /// Enable verbose logging{n}[SETS env: RUST_LOG=debug]
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.verbose {
        env::set_var("RUST_LOG", "debug");
    }
    pretty_env_logger::formatted_timed_builder()
        .filter_level(log::LevelFilter::Info)
        .filter_module(
            "zhmensa",
            if env::var(pretty_env_logger::env_logger::DEFAULT_FILTER_ENV).unwrap_or_default()
                == "debug"
            {
                log::LevelFilter::Debug
            } else {
                log::LevelFilter::Info
            },
        )
        .init();

    if !log_enabled!(log::Level::Debug) {
        log::info!("Set env variable 'RUST_LOG=debug' for request details");
    }

    DB_FILENAME.set(args.db.clone()).unwrap();
    check_or_create_db_tables()?;

    if let Some(id) = &args.visit {
        increase_clicks(id)?;
        log::info!("recorded visit for {id}");
    }

    let locations = Arc::new(LocationResolver::new(Arc::new(NominatimGeocoder::new())));
    let manager = CatalogManager::new(args.lang, Arc::new(DbClickCounts), locations);

    manager
        .update_prefs(|prefs| {
            if let Some(search) = args.search.clone() {
                prefs.search_term = search;
            }
            if args.open {
                prefs.show = ShowMode::Open;
            }
            if let Some(campus) = args.campus {
                prefs.campus = CampusFilter::Only(campus);
            }
            prefs.hide_without_menu = args.hide_empty;
            prefs.excluded_allergens = args
                .exclude_allergen
                .iter()
                .map(|label| Allergen::from_label(label))
                .collect();
            prefs.weekday_override = args.weekday;
            prefs.sort_by = args.sort;
            prefs.price_display = args.price;
        })
        .await;

    log::info!("Loading catalogs...");
    let degraded = manager.reload().await;
    for provider in &degraded {
        log::warn!("{provider} data is unavailable, showing a partial catalog");
    }

    let rx = manager.subscribe();
    let list = rx.borrow().clone();
    match list {
        Some(mensas) if mensas.is_empty() => println!("No mensas match the current filters."),
        Some(mensas) => print_catalog(&mensas, args.weekday, args.price),
        None => println!("No catalog loaded."),
    }

    Ok(())
}

fn print_catalog(mensas: &[Mensa], weekday_override: Option<u8>, price: PriceDisplay) {
    use chrono::{Datelike, Local};

    let now = Local::now();
    let weekday = weekday_override.unwrap_or(now.weekday().number_from_monday() as u8);

    for mensa in mensas {
        let state = match mensa.opening_state(weekday, now.time()) {
            OpeningState::Open => "open",
            OpeningState::Closed => "closed",
            OpeningState::Unknown => "hours unknown",
        };
        println!("{} ({}) [{state}]", mensa.name, mensa.id());
        if let Some(address) = &mensa.address {
            println!("  {}", address.replace('\n', ", "));
        }
        for meal_time in mensa
            .meal_times
            .iter()
            .filter(|meal_time| meal_time.weekday_code == Some(weekday))
        {
            let label = meal_time.label.as_deref().unwrap_or("Menu");
            match (meal_time.start, meal_time.end) {
                (Some(start), Some(end)) => println!(
                    "  {label} ({}-{})",
                    start.format("%H:%M"),
                    end.format("%H:%M")
                ),
                _ => println!("  {label}"),
            }
            for meal in &meal_time.meals {
                let title = meal.title.as_deref().unwrap_or("Menu");
                match &meal.price {
                    Some(p) => println!("   • {title} - {}", p.format(price)),
                    None => println!("   • {title}"),
                }
                if let Some(name) = &meal.name {
                    println!("     + {name}");
                }
                if let Some(description) = &meal.description {
                    println!("     + {description}");
                }
                if !meal.allergens.is_empty() {
                    let labels: Vec<&str> =
                        meal.allergens.iter().map(Allergen::label).collect();
                    println!("     + allergens: {}", labels.join(", "));
                }
            }
        }
        println!();
    }
}
