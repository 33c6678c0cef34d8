//! UZH client. One request returns every canteen for several consecutive
//! days; the first day's record carries the metadata, the position of a day
//! in the answer determines its weekday.

use crate::constants::{UZH_ENDPOINT, UZH_MIN_FACILITY_ID};
use crate::data_backend::{get_json, parse_time_of_day};
use crate::data_types::uzh_api_types::{UzhAnswer, UzhDay, UzhMensa, UzhMenu};
use crate::data_types::{Allergen, Meal, MealTime, MealType, Mensa, Price, Provider};
use crate::errors::ApiError;

pub async fn get(client: &reqwest::Client) -> Result<Vec<Mensa>, ApiError> {
    let answer: UzhAnswer = get_json(client, UZH_ENDPOINT, None).await?;
    let days = answer.days.unwrap_or_default();
    Ok(facility_ids(&days)
        .into_iter()
        .filter_map(|id| map_mensa(id, &days))
        .collect())
}

/// Distinct facility ids in answer order. Ids below 100 belong to the ETH
/// dataset and are served authoritatively by the ETH endpoints instead.
fn facility_ids(days: &[UzhDay]) -> Vec<i64> {
    let mut ids = Vec::new();
    for day in days {
        for mensa in day.mensa.as_deref().unwrap_or_default() {
            if let Some(id) = mensa.mensa_id {
                if id >= UZH_MIN_FACILITY_ID && !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
    }
    ids
}

fn map_mensa(facility_id: i64, days: &[UzhDay]) -> Option<Mensa> {
    // one record per day for this facility, position-aligned with `days`
    let records: Vec<Option<&UzhMensa>> = days
        .iter()
        .map(|day| {
            day.mensa
                .as_deref()
                .unwrap_or_default()
                .iter()
                .find(|mensa| mensa.mensa_id == Some(facility_id))
        })
        .collect();

    let Some(first) = records.first().copied().flatten() else {
        log::warn!("uzh facility {facility_id} missing from first day, skipping");
        return None;
    };
    let Some(name) = first.name.clone() else {
        log::warn!("uzh facility {facility_id} has no name, skipping");
        return None;
    };

    let (start, end) = first
        .open
        .as_deref()
        .unwrap_or_default()
        .first()
        .and_then(|open| open.text.as_deref())
        .map(parse_open_text)
        .unwrap_or((None, None));

    let mut meal_times = Vec::new();
    for (index, record) in records.iter().enumerate() {
        let weekday_code = u8::try_from(index + 1).ok().filter(|code| (1..=7).contains(code));
        let Some(record) = record else { continue };
        let meals: Vec<Meal> = record
            .menus
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter_map(map_menu)
            .collect();
        if meals.is_empty() {
            continue;
        }
        meal_times.push(MealTime {
            weekday_code,
            start,
            end,
            label: record.menu_time.clone(),
            meals,
        });
    }

    Some(Mensa {
        provider: Provider::Uzh,
        facility_id,
        name,
        // addresses come with decorative commas that break geocoding
        address: first.address.as_ref().map(|a| a.replace(',', "")),
        web_url: None,
        image_url: first.image_url.clone(),
        meal_times,
    })
}

/// Parses opening hours out of text like "11.30 – 13.30" or "11:30–13:30".
fn parse_open_text(raw: &str) -> (Option<chrono::NaiveTime>, Option<chrono::NaiveTime>) {
    let normalized = raw.replace(" – ", "–").replace('.', ":");
    let mut halves = normalized.split('–');
    let start = halves.next().and_then(parse_time_of_day);
    let end = halves.next().and_then(parse_time_of_day);
    (start, end)
}

fn map_menu(menu: &UzhMenu) -> Option<Meal> {
    // title and text carry the whole menu; a record missing either is a
    // placeholder like "geschlossen"
    let title = menu.menu_title.clone()?;
    let text = menu.menu_text.clone()?;
    let price = Price {
        student: menu.price_student,
        staff: menu.price_employee,
        external: menu.price_extern,
    };
    Some(Meal {
        title: Some(title),
        name: None,
        description: Some(text),
        image_url: None,
        price: Some(price),
        meal_types: menu
            .menu_types
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter_map(|raw| MealType::from_uzh(raw))
            .collect(),
        meat_types: Vec::new(),
        allergens: menu
            .ingredients
            .as_ref()
            .and_then(|ingredients| ingredients.allergene.as_deref())
            .unwrap_or_default()
            .iter()
            .filter_map(|raw| Allergen::from_uzh(raw))
            .collect(),
    })
}
