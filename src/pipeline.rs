//! The catalog pipeline: one unfiltered provider catalog in, one filtered,
//! sorted and reordered list out. Every preference change re-runs the whole
//! pipeline over the unfiltered catalog, so filters never compound.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Local};
use tokio::sync::{watch, Mutex, RwLock};

use crate::data_backend;
use crate::data_types::{
    Allergen, CampusFilter, CatalogLoad, Lang, Mensa, OpeningState, Preferences, Provider,
    ShowMode, SortMode,
};
use crate::db_operations;
use crate::geo::LocationResolver;

/// Click counts for popularity sorting. A mensa nobody ever visited counts
/// as -1 so it sorts below one visited a single time.
pub trait ClickCounts: Send + Sync {
    fn clicks(&self, mensa_id: &str) -> i64;
}

pub struct DbClickCounts;

impl ClickCounts for DbClickCounts {
    fn clicks(&self, mensa_id: &str) -> i64 {
        db_operations::get_clicks(mensa_id).ok().flatten().unwrap_or(-1)
    }
}

/// Lowercases and folds umlauts so "zuri" finds "Zürich".
pub fn normalize_for_search(raw: &str) -> String {
    raw.to_lowercase()
        .replace('ä', "a")
        .replace('ö', "o")
        .replace('ü', "u")
        .replace('é', "e")
        .replace('è', "e")
        .replace('ê', "e")
        .replace('à', "a")
}

/// Whether every meal served on the given weekday avoids all excluded
/// allergens. An empty exclusion set keeps everything.
fn day_fully_allergen_free(mensa: &Mensa, weekday: u8, excluded: &HashSet<Allergen>) -> bool {
    if excluded.is_empty() {
        return true;
    }
    mensa
        .meal_times
        .iter()
        .filter(|meal_time| meal_time.weekday_code == Some(weekday))
        .all(|meal_time| meal_time.meals.iter().all(|meal| meal.is_free_of(excluded)))
}

pub async fn apply_pipeline(
    mut list: Vec<Mensa>,
    prefs: &Preferences,
    clicks: &dyn ClickCounts,
    locations: &LocationResolver,
    shared_with_me: &[String],
    now: DateTime<Local>,
) -> Vec<Mensa> {
    let weekday = prefs
        .weekday_override
        .unwrap_or(now.weekday().number_from_monday() as u8);

    if prefs.hide_without_menu {
        list.retain(|mensa| mensa.has_menu_on(weekday));
    }

    if !prefs.search_term.is_empty() {
        let needle = normalize_for_search(&prefs.search_term);
        list.retain(|mensa| normalize_for_search(&mensa.name).contains(&needle));
    }

    // campus resolution may hit the geocoder, so this runs per entity in
    // catalog order instead of a retain()
    let mut kept = Vec::with_capacity(list.len());
    for mensa in list {
        if prefs.weekday_override.is_some()
            && !day_fully_allergen_free(&mensa, weekday, &prefs.excluded_allergens)
        {
            continue;
        }
        if prefs.show == ShowMode::Open
            && mensa.opening_state(weekday, now.time()) != OpeningState::Open
        {
            continue;
        }
        if let CampusFilter::Only(campus) = prefs.campus {
            if locations.campus_of(&mensa).await != Some(campus) {
                continue;
            }
        }
        kept.push(mensa);
    }
    let mut list = kept;

    if prefs.hide_without_menu {
        list.retain(|mensa| !mensa.meal_times.is_empty());
    }

    match prefs.sort_by {
        SortMode::Clicks => {
            list.sort_by_key(|mensa| std::cmp::Reverse(clicks.clicks(&mensa.id())));
        }
        SortMode::Name => list.sort_by_key(|mensa| mensa.name.to_lowercase()),
    }

    if prefs.sort_by == SortMode::Clicks {
        shared_with_me_reorder(&mut list, shared_with_me);
    }

    list
}

/// Pulls up to two recently shared mensas to the front, most recent first.
/// Only ids still present in the filtered list move.
fn shared_with_me_reorder(list: &mut Vec<Mensa>, shared_with_me: &[String]) {
    let present: Vec<String> = shared_with_me
        .iter()
        .filter(|id| list.iter().any(|mensa| &mensa.id() == *id))
        .take(2)
        .cloned()
        .collect();
    for id in present.iter().rev() {
        if let Some(pos) = list.iter().position(|mensa| &mensa.id() == id) {
            let mensa = list.remove(pos);
            list.insert(0, mensa);
        }
    }
}

/// Owns the unfiltered catalog, the current preferences and the published
/// filtered list. Subscribers get `None` until the first reload finished,
/// then `Some` on every pipeline run.
pub struct CatalogManager {
    lang: Lang,
    prefs: RwLock<Preferences>,
    unfiltered: RwLock<Option<CatalogLoad>>,
    shared_with_me: RwLock<Vec<String>>,
    // stale pipeline runs detect themselves through these and drop their result
    generation: AtomicU64,
    published_generation: Mutex<u64>,
    list_tx: watch::Sender<Option<Vec<Mensa>>>,
    clicks: Arc<dyn ClickCounts>,
    locations: Arc<LocationResolver>,
}

impl CatalogManager {
    pub fn new(lang: Lang, clicks: Arc<dyn ClickCounts>, locations: Arc<LocationResolver>) -> Self {
        let (list_tx, _) = watch::channel(None);
        Self {
            lang,
            prefs: RwLock::new(Preferences::default()),
            unfiltered: RwLock::new(None),
            shared_with_me: RwLock::new(Vec::new()),
            generation: AtomicU64::new(0),
            published_generation: Mutex::new(0),
            list_tx,
            clicks,
            locations,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Vec<Mensa>>> {
        self.list_tx.subscribe()
    }

    pub async fn preferences(&self) -> Preferences {
        self.prefs.read().await.clone()
    }

    /// Fetches a fresh catalog from both providers and re-runs the pipeline.
    /// Returns the providers that failed to contribute.
    pub async fn reload(&self) -> Vec<Provider> {
        let load = data_backend::load_catalog(self.lang).await;
        let degraded = load.degraded.clone();
        *self.unfiltered.write().await = Some(load);
        self.refilter().await;
        degraded
    }

    pub async fn update_prefs(&self, mutate: impl FnOnce(&mut Preferences)) {
        mutate(&mut *self.prefs.write().await);
        self.refilter().await;
    }

    /// Resets everything except the excluded allergens, which are a dietary
    /// property rather than a browsing filter.
    pub async fn reset_filters(&self) {
        {
            let mut prefs = self.prefs.write().await;
            let excluded = std::mem::take(&mut prefs.excluded_allergens);
            *prefs = Preferences::default();
            prefs.excluded_allergens = excluded;
        }
        self.refilter().await;
    }

    pub async fn set_shared_with_me(&self, ids: Vec<String>) {
        *self.shared_with_me.write().await = ids;
        self.refilter().await;
    }

    /// Looks a mensa up by catalog id in the unfiltered catalog, so a
    /// selection survives any filter change and any reload.
    pub async fn find(&self, id: &str) -> Option<Mensa> {
        self.unfiltered
            .read()
            .await
            .as_ref()?
            .mensas
            .iter()
            .find(|mensa| mensa.id() == id)
            .cloned()
    }

    async fn refilter(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let snapshot = self.unfiltered.read().await.as_ref().map(|load| load.mensas.clone());
        let result = match snapshot {
            Some(mensas) => {
                let prefs = self.prefs.read().await.clone();
                let shared = self.shared_with_me.read().await.clone();
                Some(
                    apply_pipeline(
                        mensas,
                        &prefs,
                        self.clicks.as_ref(),
                        &self.locations,
                        &shared,
                        Local::now(),
                    )
                    .await,
                )
            }
            None => None,
        };

        self.publish_if_newest(generation, result).await;
    }

    /// Commits a pipeline run's result unless a newer run has published
    /// already. Comparison and publish happen under one lock, so a stale run
    /// can never overwrite a newer result.
    async fn publish_if_newest(&self, generation: u64, result: Option<Vec<Mensa>>) {
        let mut published = self.published_generation.lock().await;
        if generation > *published {
            *published = generation;
            self.list_tx.send_replace(result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::{Campus, Meal, MealTime, Price, Provider};
    use crate::errors::ApiError;
    use crate::geo::{campus_coordinate, Coordinate, Geocoder};
    use async_trait::async_trait;
    use chrono::{NaiveTime, TimeZone};
    use std::collections::HashMap;

    struct FixedClicks(HashMap<String, i64>);

    impl ClickCounts for FixedClicks {
        fn clicks(&self, mensa_id: &str) -> i64 {
            self.0.get(mensa_id).copied().unwrap_or(-1)
        }
    }

    struct MapGeocoder(HashMap<String, Coordinate>);

    #[async_trait]
    impl Geocoder for MapGeocoder {
        async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, ApiError> {
            Ok(self.0.get(address).copied())
        }
    }

    fn resolver(entries: &[(&str, Coordinate)]) -> LocationResolver {
        let map = entries
            .iter()
            .map(|(address, coordinate)| (address.to_string(), *coordinate))
            .collect();
        LocationResolver::new(Arc::new(MapGeocoder(map)))
    }

    fn meal(title: &str, allergens: &[Allergen]) -> Meal {
        Meal {
            title: Some(title.to_string()),
            name: None,
            description: None,
            image_url: None,
            price: Some(Price {
                student: Some(6.2),
                staff: Some(9.3),
                external: Some(12.5),
            }),
            meal_types: Vec::new(),
            meat_types: Vec::new(),
            allergens: allergens.to_vec(),
        }
    }

    fn mensa(provider: Provider, facility_id: i64, name: &str, meal_times: Vec<MealTime>) -> Mensa {
        Mensa {
            provider,
            facility_id,
            name: name.to_string(),
            address: Some(format!("{name}strasse 1")),
            web_url: None,
            image_url: None,
            meal_times,
        }
    }

    fn lunch(weekday: u8, start: (u32, u32), end: (u32, u32), meals: Vec<Meal>) -> MealTime {
        MealTime {
            weekday_code: Some(weekday),
            start: NaiveTime::from_hms_opt(start.0, start.1, 0),
            end: NaiveTime::from_hms_opt(end.0, end.1, 0),
            label: Some("Lunch".to_string()),
            meals,
        }
    }

    // a Wednesday at 12:00
    fn noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 8, 26, 12, 0, 0).unwrap()
    }

    fn no_clicks() -> FixedClicks {
        FixedClicks(HashMap::new())
    }

    #[tokio::test]
    async fn unfiltered_defaults_keep_catalog_order() {
        let list = vec![
            mensa(Provider::Eth, 12, "Polymensa", vec![]),
            mensa(Provider::Uzh, 148, "Obere Mensa", vec![]),
        ];
        let out = apply_pipeline(
            list.clone(),
            &Preferences::default(),
            &no_clicks(),
            &resolver(&[]),
            &[],
            noon(),
        )
        .await;
        assert_eq!(out, list);
    }

    #[tokio::test]
    async fn open_filter_and_click_sort_compose() {
        let open = mensa(
            Provider::Eth,
            12,
            "Polymensa",
            vec![lunch(3, (11, 0), (13, 30), vec![meal("Garden", &[])])],
        );
        let closed = mensa(
            Provider::Uzh,
            148,
            "Obere Mensa",
            vec![lunch(3, (17, 0), (19, 0), vec![meal("Classic", &[])])],
        );
        let clicks = FixedClicks(
            [("eth/12".to_string(), 10), ("uzh/148".to_string(), 3)]
                .into_iter()
                .collect(),
        );
        let mut prefs = Preferences::default();
        prefs.show = ShowMode::Open;

        let out = apply_pipeline(
            vec![closed, open.clone()],
            &prefs,
            &clicks,
            &resolver(&[]),
            &[],
            noon(),
        )
        .await;
        assert_eq!(out, vec![open]);
    }

    #[tokio::test]
    async fn search_is_diacritic_insensitive_substring() {
        let list = vec![
            mensa(Provider::Uzh, 148, "Rämi 59", vec![]),
            mensa(Provider::Uzh, 151, "Irchel Seerose", vec![]),
            mensa(Provider::Uzh, 180, "Zahnmedizin", vec![]),
        ];
        let mut prefs = Preferences::default();
        prefs.search_term = "RAMI".to_string();

        let out = apply_pipeline(
            list.clone(),
            &prefs,
            &no_clicks(),
            &resolver(&[]),
            &[],
            noon(),
        )
        .await;
        let names: Vec<&str> = out.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Rämi 59"]);

        prefs.search_term = "medizin".to_string();
        let out = apply_pipeline(list, &prefs, &no_clicks(), &resolver(&[]), &[], noon()).await;
        let names: Vec<&str> = out.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Zahnmedizin"]);
    }

    #[tokio::test]
    async fn allergen_exclusion_checks_the_whole_day() {
        let clean = mensa(
            Provider::Eth,
            12,
            "Polymensa",
            vec![lunch(3, (11, 0), (13, 0), vec![meal("Garden", &[Allergen::Lactose])])],
        );
        // one gluten meal taints the whole day
        let tainted = mensa(
            Provider::Uzh,
            148,
            "Obere Mensa",
            vec![lunch(
                3,
                (11, 0),
                (13, 0),
                vec![meal("Garden", &[]), meal("Pasta", &[Allergen::Gluten])],
            )],
        );
        let mut prefs = Preferences::default();
        prefs.excluded_allergens = [Allergen::Gluten].into_iter().collect();
        prefs.weekday_override = Some(3);

        let out = apply_pipeline(
            vec![clean.clone(), tainted],
            &prefs,
            &no_clicks(),
            &resolver(&[]),
            &[],
            noon(),
        )
        .await;
        assert_eq!(out, vec![clean]);
    }

    #[tokio::test]
    async fn hide_without_menu_uses_the_reference_weekday() {
        let monday_only = mensa(
            Provider::Eth,
            12,
            "Polymensa",
            vec![lunch(1, (11, 0), (13, 0), vec![meal("Garden", &[])])],
        );
        let wednesday = mensa(
            Provider::Uzh,
            148,
            "Obere Mensa",
            vec![lunch(3, (11, 0), (13, 0), vec![meal("Classic", &[])])],
        );
        let mut prefs = Preferences::default();
        prefs.hide_without_menu = true;

        // reference day is Wednesday
        let out = apply_pipeline(
            vec![monday_only.clone(), wednesday.clone()],
            &prefs,
            &no_clicks(),
            &resolver(&[]),
            &[],
            noon(),
        )
        .await;
        assert_eq!(out, vec![wednesday.clone()]);

        prefs.weekday_override = Some(1);
        let out = apply_pipeline(
            vec![monday_only.clone(), wednesday],
            &prefs,
            &no_clicks(),
            &resolver(&[]),
            &[],
            noon(),
        )
        .await;
        assert_eq!(out, vec![monday_only]);
    }

    #[tokio::test]
    async fn shared_mensas_jump_to_the_front_most_recent_first() {
        let list = vec![
            mensa(Provider::Eth, 12, "Polymensa", vec![]),
            mensa(Provider::Uzh, 148, "Obere Mensa", vec![]),
            mensa(Provider::Uzh, 151, "Untere Mensa", vec![]),
        ];
        let shared = vec![
            "uzh/151".to_string(),
            "uzh/999".to_string(),
            "uzh/148".to_string(),
            "eth/12".to_string(),
        ];

        let out = apply_pipeline(
            list.clone(),
            &Preferences::default(),
            &no_clicks(),
            &resolver(&[]),
            &shared,
            noon(),
        )
        .await;
        // only the two most recent present ids move
        let ids: Vec<String> = out.iter().map(Mensa::id).collect();
        assert_eq!(ids, vec!["uzh/151", "uzh/148", "eth/12"]);

        // name sort disables the reorder
        let mut prefs = Preferences::default();
        prefs.sort_by = SortMode::Name;
        let out = apply_pipeline(list, &prefs, &no_clicks(), &resolver(&[]), &shared, noon()).await;
        let names: Vec<&str> = out.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Obere Mensa", "Polymensa", "Untere Mensa"]);
    }

    #[tokio::test]
    async fn campus_filter_drops_unresolvable_addresses() {
        let zentrum = mensa(Provider::Uzh, 148, "Obere Mensa", vec![]);
        let nowhere = mensa(Provider::Uzh, 151, "Untere Mensa", vec![]);
        let resolver = resolver(&[(
            "Obere Mensastrasse 1",
            campus_coordinate(Campus::Zentrum),
        )]);

        let mut prefs = Preferences::default();
        prefs.campus = CampusFilter::Only(Campus::Zentrum);
        let out = apply_pipeline(
            vec![zentrum.clone(), nowhere.clone()],
            &prefs,
            &no_clicks(),
            &resolver,
            &[],
            noon(),
        )
        .await;
        assert_eq!(out, vec![zentrum.clone()]);

        // without a campus filter the unresolvable one stays
        prefs.campus = CampusFilter::All;
        let out = apply_pipeline(
            vec![zentrum, nowhere],
            &prefs,
            &no_clicks(),
            &resolver,
            &[],
            noon(),
        )
        .await;
        assert_eq!(out.len(), 2);
    }

    #[tokio::test]
    async fn manager_publishes_none_until_first_load() {
        let manager = CatalogManager::new(
            Lang::En,
            Arc::new(no_clicks()),
            Arc::new(resolver(&[])),
        );
        let rx = manager.subscribe();
        assert!(rx.borrow().is_none());

        manager.update_prefs(|prefs| prefs.search_term = "poly".to_string()).await;
        // still no catalog, still None
        assert!(rx.borrow().is_none());
    }

    #[tokio::test]
    async fn stale_runs_never_overwrite_a_newer_published_result() {
        let manager = CatalogManager::new(
            Lang::En,
            Arc::new(no_clicks()),
            Arc::new(resolver(&[])),
        );
        let rx = manager.subscribe();
        let newer = vec![mensa(Provider::Eth, 12, "Polymensa", vec![])];
        let stale = vec![mensa(Provider::Uzh, 148, "Obere Mensa", vec![])];

        // generation 2 publishes first, the slower generation 1 finishes late
        manager.publish_if_newest(2, Some(newer.clone())).await;
        manager.publish_if_newest(1, Some(stale)).await;
        assert_eq!(rx.borrow().as_deref(), Some(newer.as_slice()));

        // a genuinely newer run still gets through
        manager.publish_if_newest(3, None).await;
        assert!(rx.borrow().is_none());
    }

    #[tokio::test]
    async fn reset_keeps_dietary_exclusions() {
        let manager = CatalogManager::new(
            Lang::En,
            Arc::new(no_clicks()),
            Arc::new(resolver(&[])),
        );
        manager
            .update_prefs(|prefs| {
                prefs.search_term = "poly".to_string();
                prefs.show = ShowMode::Open;
                prefs.excluded_allergens = [Allergen::Gluten].into_iter().collect();
            })
            .await;
        manager.reset_filters().await;

        let prefs = manager.preferences().await;
        assert!(prefs.search_term.is_empty());
        assert_eq!(prefs.show, ShowMode::All);
        assert_eq!(
            prefs.excluded_allergens,
            [Allergen::Gluten].into_iter().collect()
        );
    }
}
