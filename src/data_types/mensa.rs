use std::collections::HashSet;

use chrono::NaiveTime;

use crate::constants::SHARE_URL_BASE;
use crate::data_types::tags::{Allergen, MealType, MeatType};
use crate::data_types::{PriceDisplay, Provider};

/// A canteen facility. Identity is `(provider, facility_id)`; everything else
/// is display data coming from whichever provider knows the facility.
#[derive(Debug, Clone)]
pub struct Mensa {
    pub provider: Provider,
    pub facility_id: i64,
    pub name: String,
    pub address: Option<String>,
    pub web_url: Option<String>,
    pub image_url: Option<String>,
    pub meal_times: Vec<MealTime>,
}

impl Mensa {
    /// Catalog-wide unique id, e.g. `"eth/12"` or `"uzh/148"`.
    pub fn id(&self) -> String {
        format!("{}/{}", self.provider.as_str(), self.facility_id)
    }

    pub fn share_url(&self) -> String {
        format!("{}/{}", SHARE_URL_BASE, self.id())
    }

    pub fn has_menu_on(&self, weekday: u8) -> bool {
        self.meal_times
            .iter()
            .filter(|meal_time| meal_time.weekday_code == Some(weekday))
            .any(|meal_time| !meal_time.meals.is_empty())
    }

    /// Opening state for the given weekday (1 = Monday .. 7 = Sunday) at the
    /// given time of day.
    ///
    /// A matching meal time without both bounds makes the whole answer
    /// `Unknown` instead of pretending the mensa is closed.
    pub fn opening_state(&self, weekday: u8, now: NaiveTime) -> OpeningState {
        for meal_time in self
            .meal_times
            .iter()
            .filter(|meal_time| meal_time.weekday_code == Some(weekday))
        {
            match (meal_time.start, meal_time.end) {
                (Some(start), Some(end)) => {
                    if start <= now && now <= end {
                        return OpeningState::Open;
                    }
                }
                _ => return OpeningState::Unknown,
            }
        }
        OpeningState::Closed
    }
}

// identity comparison only, so a reloaded catalog can be matched against a
// previously selected mensa
impl PartialEq for Mensa {
    fn eq(&self, other: &Self) -> bool {
        self.provider == other.provider && self.facility_id == other.facility_id
    }
}

impl Eq for Mensa {}

impl std::hash::Hash for Mensa {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.provider.hash(state);
        self.facility_id.hash(state);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpeningState {
    Open,
    Closed,
    Unknown,
}

/// One service window of a mensa on one weekday ("Lunch", "Dinner", "Street").
/// Missing start/end means the hours are unknown, not that the window is shut.
#[derive(Debug, Clone)]
pub struct MealTime {
    pub weekday_code: Option<u8>,
    pub start: Option<NaiveTime>,
    pub end: Option<NaiveTime>,
    pub label: Option<String>,
    pub meals: Vec<Meal>,
}

#[derive(Debug, Clone)]
pub struct Meal {
    pub title: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: Option<Price>,
    pub meal_types: Vec<MealType>,
    pub meat_types: Vec<MeatType>,
    pub allergens: Vec<Allergen>,
}

impl Meal {
    pub fn is_free_of(&self, excluded: &HashSet<Allergen>) -> bool {
        self.allergens.iter().all(|allergen| !excluded.contains(allergen))
    }

    /// One-line text form used when sharing/copying a meal.
    pub fn summary(&self) -> String {
        [&self.title, &self.name, &self.description]
            .into_iter()
            .flatten()
            .cloned()
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Three price tiers, any of which an upstream may omit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Price {
    pub student: Option<f64>,
    pub staff: Option<f64>,
    pub external: Option<f64>,
}

impl Price {
    /// Formats the price per user preference. Single-tier modes fall back to
    /// the next pricier tier and print "NaN" when nothing is available.
    pub fn format(&self, display: PriceDisplay) -> String {
        match display {
            PriceDisplay::All => format!(
                "{}/{}/{} CHF",
                chf(self.student.unwrap_or(0.0)),
                chf(self.staff.unwrap_or(0.0)),
                chf(self.external.unwrap_or(0.0)),
            ),
            PriceDisplay::Student => tier_or_nan(&[self.student, self.staff, self.external]),
            PriceDisplay::Staff => tier_or_nan(&[self.staff, self.external]),
            PriceDisplay::External => tier_or_nan(&[self.external]),
        }
    }
}

fn tier_or_nan(tiers: &[Option<f64>]) -> String {
    match tiers.iter().flatten().next() {
        Some(amount) => format!("{} CHF", chf(*amount)),
        None => "NaN CHF".to_string(),
    }
}

fn chf(amount: f64) -> String {
    format!("{amount:.2}")
}
