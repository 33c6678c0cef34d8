//! Wire types for the two ETH endpoints. The modern "cookpit" answer keys
//! everything with hyphenated names, the legacy one uses camelCase.

use chrono::{Duration, NaiveDate};
use serde::Deserialize;

use crate::constants::ETH_DEFAULT_VALID_TO;

#[derive(Deserialize, Debug)]
pub struct EthWeeklyAnswer {
    #[serde(rename = "weekly-rota-array")]
    pub weekly_rota_array: Option<Vec<EthWeeklyRota>>,
}

#[derive(Deserialize, Debug)]
pub struct EthWeeklyRota {
    #[serde(rename = "facility-id")]
    pub facility_id: Option<i64>,
    #[serde(rename = "valid-from")]
    pub valid_from: Option<String>,
    #[serde(rename = "valid-to")]
    pub valid_to: Option<String>,
    #[serde(rename = "day-of-week-array")]
    pub day_of_week_array: Option<Vec<EthDayOfWeek>>,
}

impl EthWeeklyRota {
    /// Whether this rota covers the given date: `valid_from <= date` and
    /// `date < valid_to + 1 day`. A missing `valid-to` defaults far into the
    /// future (upstream has shipped rotas without one).
    pub fn is_valid_on(&self, date: NaiveDate) -> bool {
        let Some(valid_from) = self
            .valid_from
            .as_deref()
            .and_then(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
        else {
            return false;
        };
        let Some(valid_to) = NaiveDate::parse_from_str(
            self.valid_to.as_deref().unwrap_or(ETH_DEFAULT_VALID_TO),
            "%Y-%m-%d",
        )
        .ok() else {
            return false;
        };
        valid_from <= date && date < valid_to + Duration::days(1)
    }
}

#[derive(Deserialize, Debug)]
pub struct EthDayOfWeek {
    #[serde(rename = "day-of-week-code")]
    pub day_of_week_code: Option<u8>,
    #[serde(rename = "opening-hour-array")]
    pub opening_hour_array: Option<Vec<EthOpeningHour>>,
}

#[derive(Deserialize, Debug)]
pub struct EthOpeningHour {
    #[serde(rename = "meal-time-array")]
    pub meal_time_array: Option<Vec<EthMealTime>>,
}

#[derive(Deserialize, Debug)]
pub struct EthMealTime {
    pub name: Option<String>,
    #[serde(rename = "time-from")]
    pub time_from: Option<String>,
    #[serde(rename = "time-to")]
    pub time_to: Option<String>,
    #[serde(rename = "line-array")]
    pub line_array: Option<Vec<EthLine>>,
}

#[derive(Deserialize, Debug)]
pub struct EthLine {
    pub name: Option<String>,
    pub meal: Option<EthMeal>,
}

#[derive(Deserialize, Debug)]
pub struct EthMeal {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "meal-price-array")]
    pub meal_price_array: Option<Vec<EthPrice>>,
    #[serde(rename = "meal-class-array")]
    pub meal_class_array: Option<Vec<EthCodeDesc>>,
    #[serde(rename = "allergen-array")]
    pub allergen_array: Option<Vec<EthCodeDesc>>,
    #[serde(rename = "meat-type-array")]
    pub meat_type_array: Option<Vec<EthCodeDesc>>,
    #[serde(rename = "image-url")]
    pub image_url: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct EthPrice {
    pub price: Option<f64>,
}

#[derive(Deserialize, Debug)]
pub struct EthCodeDesc {
    pub desc: Option<String>,
}

/// One facility from the legacy metadata endpoint. No menu data, but the
/// modern endpoint carries no names/addresses, so both are needed.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct EthLegacyMensa {
    pub mensa_id: i64,
    pub name: String,
    pub address: Option<String>,
    pub web: Option<String>,
    pub image_url: Option<String>,
}
