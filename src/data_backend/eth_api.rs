//! ETH client. Menu data comes from the modern "cookpit" weekly-rota
//! endpoint, which only knows facility ids and schedules; names, addresses
//! and images still live on the legacy endpoint. Both answers are merged
//! per facility, modern data winning.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{Datelike, Duration, Local, NaiveDate};

use crate::constants::{ETH_CLIENT_ID, ETH_LEGACY_ENDPOINT, ETH_WEEKLY_ROTAS_ENDPOINT};
use crate::data_backend::{get_json, parse_time_of_day};
use crate::data_types::eth_api_types::{
    EthLegacyMensa, EthLine, EthMealTime, EthWeeklyAnswer, EthWeeklyRota,
};
use crate::data_types::{Allergen, Lang, Meal, MealTime, MealType, MeatType, Mensa, Price, Provider};
use crate::errors::ApiError;

pub async fn get(client: &reqwest::Client, lang: Lang) -> Result<Vec<Mensa>, ApiError> {
    let legacy = get_legacy(client, lang).await?;
    if legacy.is_empty() {
        // an empty facility list means the backfill source is unusable,
        // not that ETH has no mensas
        return Err(ApiError::EmptyAnswer);
    }

    let today = Local::now().date_naive();
    let (valid_after, valid_before) = week_window(today);
    let url = format!(
        "{}?client-id={}&lang={}&rs-first=0&rs-size=50&valid-after={}&valid-before={}",
        ETH_WEEKLY_ROTAS_ENDPOINT,
        ETH_CLIENT_ID,
        lang.query_code(),
        valid_after.format("%Y-%m-%d"),
        valid_before.format("%Y-%m-%d"),
    );
    let answer: EthWeeklyAnswer = get_json(client, &url, Some(lang)).await?;

    let schedules = collect_schedules(answer.weekly_rota_array.unwrap_or_default(), today);
    Ok(resolve_merged(merge_facilities(legacy, schedules)))
}

async fn get_legacy(client: &reqwest::Client, lang: Lang) -> Result<Vec<Mensa>, ApiError> {
    let url = format!("{}/mensas/detail?lang={}", ETH_LEGACY_ENDPOINT, lang.query_code());
    let answer: Vec<EthLegacyMensa> = get_json(client, &url, Some(lang)).await?;
    Ok(answer
        .into_iter()
        .map(|legacy| Mensa {
            provider: Provider::Eth,
            facility_id: legacy.mensa_id,
            name: legacy.name,
            address: legacy.address,
            web_url: legacy.web,
            image_url: legacy.image_url,
            meal_times: Vec::new(),
        })
        .collect())
}

/// Monday of the current ISO week, and the Monday two weeks later. The extra
/// week of slack covers rotas whose `valid-to` is missing or generous.
fn week_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
    (monday, monday + Duration::days(14))
}

/// Flattens the currently valid rotas into one weekly schedule per facility.
fn collect_schedules(
    rotas: Vec<EthWeeklyRota>,
    today: NaiveDate,
) -> Vec<(i64, Vec<MealTime>)> {
    let mut schedules: Vec<(i64, Vec<MealTime>)> = Vec::new();
    for rota in rotas.iter().filter(|rota| rota.is_valid_on(today)) {
        let Some(facility_id) = rota.facility_id else {
            log::warn!("weekly rota without facility id, skipping");
            continue;
        };
        let meal_times = rota_meal_times(rota);
        match schedules.iter_mut().find(|(id, _)| *id == facility_id) {
            Some((_, existing)) => existing.extend(meal_times),
            None => schedules.push((facility_id, meal_times)),
        }
    }
    schedules
}

fn rota_meal_times(rota: &EthWeeklyRota) -> Vec<MealTime> {
    let mut meal_times = Vec::new();
    for day in rota.day_of_week_array.as_deref().unwrap_or_default() {
        let weekday_code = day.day_of_week_code.filter(|code| (1..=7).contains(code));
        for opening_hour in day.opening_hour_array.as_deref().unwrap_or_default() {
            let mut slots: Vec<&EthMealTime> = opening_hour
                .meal_time_array
                .as_deref()
                .unwrap_or_default()
                .iter()
                .collect();
            slots.sort_by(|a, b| cmp_slots(a, b));
            for slot in slots {
                let meals: Vec<Meal> = slot
                    .line_array
                    .as_deref()
                    .unwrap_or_default()
                    .iter()
                    .filter_map(map_line)
                    .collect();
                if meals.is_empty() {
                    continue;
                }
                meal_times.push(MealTime {
                    weekday_code,
                    start: slot.time_from.as_deref().and_then(parse_time_of_day),
                    end: slot.time_to.as_deref().and_then(parse_time_of_day),
                    label: slot.name.clone(),
                    meals,
                });
            }
        }
    }
    meal_times
}

// order by start time; equally named slots count as equal, a missing start
// sorts first
fn cmp_slots(a: &EthMealTime, b: &EthMealTime) -> Ordering {
    if a.name == b.name {
        return Ordering::Equal;
    }
    match (a.time_from.as_deref(), b.time_from.as_deref()) {
        (Some(a_from), Some(b_from)) => a_from.cmp(b_from),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn map_line(line: &EthLine) -> Option<Meal> {
    let Some(meal) = line.meal.as_ref() else {
        // lines without a meal payload are headers/placeholders
        log::debug!("no meal data for line {:?}", line.name);
        return None;
    };
    let description = meal
        .description
        .as_ref()
        .map(|raw| raw.replace("|\n", "| ").replace('\n', " | "));
    let image_url = meal
        .image_url
        .as_ref()
        .map(|url| format!("{url}?client-id={ETH_CLIENT_ID}"));
    let price = meal.meal_price_array.as_ref().map(|prices| Price {
        student: prices.first().and_then(|p| p.price),
        staff: prices.get(1).and_then(|p| p.price),
        external: prices.get(2).and_then(|p| p.price),
    });
    Some(Meal {
        title: Some(line.name.clone().unwrap_or_else(|| "Menu".to_string())),
        name: meal.name.clone(),
        description,
        image_url,
        price,
        meal_types: descs(&meal.meal_class_array)
            .filter_map(|desc| MealType::from_eth(desc))
            .collect(),
        meat_types: descs(&meal.meat_type_array)
            .filter_map(|desc| MeatType::from_eth(desc))
            .collect(),
        allergens: descs(&meal.allergen_array)
            .map(Allergen::from_eth)
            .collect(),
    })
}

fn descs(
    array: &Option<Vec<crate::data_types::eth_api_types::EthCodeDesc>>,
) -> impl Iterator<Item = &str> {
    array
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter_map(|entry| entry.desc.as_deref())
}

/// Per-facility merge state of the two ETH answers.
#[derive(Debug)]
pub(crate) enum FacilityMerge {
    /// rota references a facility the legacy endpoint does not know
    ModernOnly(i64),
    /// facility lost modern schedule coverage, kept with an empty menu
    LegacyOnly(Mensa),
    /// modern schedule attached to legacy metadata
    Reconciled {
        meta: Mensa,
        meal_times: Vec<MealTime>,
    },
}

pub(crate) fn merge_facilities(
    legacy: Vec<Mensa>,
    schedules: Vec<(i64, Vec<MealTime>)>,
) -> Vec<FacilityMerge> {
    let mut merged = Vec::new();
    let mut scheduled_ids: HashSet<i64> = HashSet::new();
    for (facility_id, meal_times) in schedules {
        scheduled_ids.insert(facility_id);
        match legacy.iter().find(|mensa| mensa.facility_id == facility_id) {
            Some(meta) => merged.push(FacilityMerge::Reconciled {
                meta: meta.clone(),
                meal_times,
            }),
            None => merged.push(FacilityMerge::ModernOnly(facility_id)),
        }
    }
    for mensa in legacy {
        if !scheduled_ids.contains(&mensa.facility_id) {
            merged.push(FacilityMerge::LegacyOnly(mensa));
        }
    }
    merged
}

pub(crate) fn resolve_merged(merged: Vec<FacilityMerge>) -> Vec<Mensa> {
    merged
        .into_iter()
        .filter_map(|state| match state {
            FacilityMerge::ModernOnly(facility_id) => {
                // data inconsistency between the two endpoints, not fatal
                log::warn!("weekly rota references unknown facility {facility_id}, skipping");
                None
            }
            FacilityMerge::LegacyOnly(mensa) => Some(mensa),
            FacilityMerge::Reconciled {
                mut meta,
                meal_times,
            } => {
                meta.meal_times = meal_times;
                Some(meta)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::eth_api_types::{EthCodeDesc, EthDayOfWeek, EthMeal, EthOpeningHour, EthPrice};

    fn legacy_mensa(facility_id: i64, name: &str) -> Mensa {
        Mensa {
            provider: Provider::Eth,
            facility_id,
            name: name.to_string(),
            address: Some("Leonhardstrasse 34\n8092 Zürich".to_string()),
            web_url: None,
            image_url: None,
            meal_times: Vec::new(),
        }
    }

    fn lunch() -> MealTime {
        MealTime {
            weekday_code: Some(1),
            start: None,
            end: None,
            label: Some("Lunch".to_string()),
            meals: Vec::new(),
        }
    }

    #[test]
    fn merged_ids_are_the_union_and_modern_wins() {
        let legacy = vec![legacy_mensa(1, "Polymensa"), legacy_mensa(2, "Clausiusbar")];
        let schedules = vec![(1, vec![lunch()]), (9, vec![lunch()])];

        let resolved = resolve_merged(merge_facilities(legacy, schedules));

        // 9 has no legacy metadata and gets dropped; 1 keeps its schedule; 2
        // survives as an empty-menu fallback
        let ids: Vec<i64> = resolved.iter().map(|m| m.facility_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(resolved[0].meal_times.len(), 1);
        assert!(resolved[1].meal_times.is_empty());
    }

    #[test]
    fn no_facility_appears_twice() {
        let legacy = vec![legacy_mensa(1, "Polymensa")];
        // two valid rotas for the same facility collapse into one schedule
        let schedules = collect_schedules(
            vec![
                rota_for(1, vec![meal_time_day(1)]),
                rota_for(1, vec![meal_time_day(2)]),
            ],
            chrono::NaiveDate::from_ymd_opt(2026, 8, 28).unwrap(),
        );
        assert_eq!(schedules.len(), 1);
        let resolved = resolve_merged(merge_facilities(legacy, schedules));
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].meal_times.len(), 2);
    }

    fn rota_for(facility_id: i64, days: Vec<EthDayOfWeek>) -> EthWeeklyRota {
        EthWeeklyRota {
            facility_id: Some(facility_id),
            valid_from: Some("2026-08-24".to_string()),
            valid_to: Some("2026-08-30".to_string()),
            day_of_week_array: Some(days),
        }
    }

    fn meal_time_day(weekday: u8) -> EthDayOfWeek {
        EthDayOfWeek {
            day_of_week_code: Some(weekday),
            opening_hour_array: Some(vec![EthOpeningHour {
                meal_time_array: Some(vec![EthMealTime {
                    name: Some("Lunch".to_string()),
                    time_from: Some("11:00".to_string()),
                    time_to: Some("13:30".to_string()),
                    line_array: Some(vec![line("Garden", true)]),
                }]),
            }]),
        }
    }

    fn line(name: &str, with_meal: bool) -> EthLine {
        EthLine {
            name: Some(name.to_string()),
            meal: with_meal.then(|| EthMeal {
                name: Some("Curry".to_string()),
                description: Some("Rice|\nPapadam\nChutney".to_string()),
                meal_price_array: Some(vec![
                    EthPrice { price: Some(6.2) },
                    EthPrice { price: Some(9.3) },
                    EthPrice { price: Some(12.5) },
                ]),
                meal_class_array: Some(vec![EthCodeDesc {
                    desc: Some("Vegetarian".to_string()),
                }]),
                allergen_array: Some(vec![EthCodeDesc {
                    desc: Some("Gluten Wheat".to_string()),
                }]),
                meat_type_array: None,
                image_url: Some("https://img.ethz.ch/meal.jpg".to_string()),
            }),
        }
    }

    #[test]
    fn lines_without_meal_payload_are_skipped() {
        assert!(map_line(&line("Header", false)).is_none());

        let meal = map_line(&line("Garden", true)).unwrap();
        assert_eq!(meal.title.as_deref(), Some("Garden"));
        assert_eq!(meal.description.as_deref(), Some("Rice| Papadam | Chutney"));
        assert_eq!(
            meal.image_url.as_deref(),
            Some("https://img.ethz.ch/meal.jpg?client-id=ethz-wcms")
        );
        assert_eq!(meal.meal_types, vec![MealType::Vegetarian]);
        assert_eq!(meal.allergens, vec![Allergen::Gluten]);
        assert_eq!(meal.price.unwrap().staff, Some(9.3));
    }

    #[test]
    fn empty_meal_times_and_unknown_weekdays_are_dropped() {
        let mut day = meal_time_day(1);
        day.day_of_week_code = Some(9);
        let rota = rota_for(1, vec![day]);
        let meal_times = rota_meal_times(&rota);
        assert_eq!(meal_times.len(), 1);
        assert_eq!(meal_times[0].weekday_code, None);

        let mut empty_day = meal_time_day(1);
        empty_day.opening_hour_array.as_mut().unwrap()[0]
            .meal_time_array
            .as_mut()
            .unwrap()[0]
            .line_array = Some(vec![line("Header", false)]);
        let rota = rota_for(1, vec![empty_day]);
        assert!(rota_meal_times(&rota).is_empty());
    }

    #[test]
    fn slots_sort_by_start_time_with_name_equality_ties() {
        let dinner = EthMealTime {
            name: Some("Dinner".to_string()),
            time_from: Some("17:30".to_string()),
            time_to: None,
            line_array: None,
        };
        let lunch = EthMealTime {
            name: Some("Lunch".to_string()),
            time_from: Some("11:00".to_string()),
            time_to: None,
            line_array: None,
        };
        let mut slots = vec![&dinner, &lunch];
        slots.sort_by(|a, b| cmp_slots(a, b));
        assert_eq!(slots[0].name.as_deref(), Some("Lunch"));
        assert_eq!(cmp_slots(&dinner, &dinner), Ordering::Equal);
    }

    #[test]
    fn slot_ordering_is_antisymmetric_with_missing_starts() {
        let untimed = EthMealTime {
            name: Some("Street".to_string()),
            time_from: None,
            time_to: None,
            line_array: None,
        };
        let timed = EthMealTime {
            name: Some("Lunch".to_string()),
            time_from: Some("11:00".to_string()),
            time_to: None,
            line_array: None,
        };
        assert_eq!(cmp_slots(&untimed, &timed), Ordering::Less);
        assert_eq!(cmp_slots(&timed, &untimed), Ordering::Greater);

        let also_untimed = EthMealTime {
            name: Some("Dinner".to_string()),
            time_from: None,
            time_to: None,
            line_array: None,
        };
        assert_eq!(cmp_slots(&untimed, &also_untimed), Ordering::Equal);
    }

    #[test]
    fn week_window_starts_on_monday_and_spans_two_weeks() {
        // 2026-08-28 is a Friday
        let friday = NaiveDate::from_ymd_opt(2026, 8, 28).unwrap();
        let (after, before) = week_window(friday);
        assert_eq!(after, NaiveDate::from_ymd_opt(2026, 8, 24).unwrap());
        assert_eq!(before, NaiveDate::from_ymd_opt(2026, 9, 7).unwrap());
    }
}
