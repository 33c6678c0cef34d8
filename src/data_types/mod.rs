pub mod eth_api_types;
pub mod mensa;
pub mod tags;
pub mod uzh_api_types;

use std::collections::HashSet;

use clap::ValueEnum;

pub use mensa::{Meal, MealTime, Mensa, OpeningState, Price};
pub use tags::{Allergen, MealType, MeatType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Eth,
    Uzh,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eth => "eth",
            Self::Uzh => "uzh",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Lang {
    De,
    En,
}

impl Lang {
    pub fn query_code(&self) -> &'static str {
        match self {
            Self::De => "de",
            Self::En => "en",
        }
    }

    pub fn accept_language(&self) -> &'static str {
        match self {
            Self::De => "de-DE;de;q=0.9",
            Self::En => "en-EN,en;q=0.9",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortMode {
    /// most-visited mensas first
    Clicks,
    /// alphabetical by name
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ShowMode {
    All,
    Open,
}

/// The three Zurich campuses used for location filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Campus {
    Zentrum,
    Irchel,
    Hoenggerberg,
}

impl Campus {
    pub const ALL: [Campus; 3] = [Campus::Zentrum, Campus::Irchel, Campus::Hoenggerberg];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Zentrum => "Zentrum",
            Self::Irchel => "Irchel",
            Self::Hoenggerberg => "Hönggerberg",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampusFilter {
    All,
    Only(Campus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PriceDisplay {
    All,
    Student,
    Staff,
    External,
}

/// Everything the catalog pipeline reads from user settings. Mutations go
/// through the catalog manager so every change triggers a filter re-run.
#[derive(Debug, Clone)]
pub struct Preferences {
    pub search_term: String,
    pub sort_by: SortMode,
    pub show: ShowMode,
    pub campus: CampusFilter,
    pub hide_without_menu: bool,
    pub excluded_allergens: HashSet<Allergen>,
    /// 1 = Monday .. 7 = Sunday; set while previewing a different day
    pub weekday_override: Option<u8>,
    pub price_display: PriceDisplay,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            search_term: String::new(),
            sort_by: SortMode::Clicks,
            show: ShowMode::All,
            campus: CampusFilter::All,
            hide_without_menu: false,
            excluded_allergens: HashSet::new(),
            weekday_override: None,
            price_display: PriceDisplay::All,
        }
    }
}

impl Preferences {
    pub fn is_filtered(&self) -> bool {
        self.sort_by != SortMode::Clicks
            || self.show != ShowMode::All
            || self.campus != CampusFilter::All
    }
}

/// Result of one catalog reload. `degraded` lists providers that contributed
/// nothing because their fetch failed; a partial catalog is a valid result.
#[derive(Debug, Clone, Default)]
pub struct CatalogLoad {
    pub mensas: Vec<Mensa>,
    pub degraded: Vec<Provider>,
}
