use chrono::NaiveTime;
use regex_lite::Regex;
use reqwest::header;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use static_init::dynamic;

use crate::data_types::{CatalogLoad, Lang, Provider};
use crate::errors::ApiError;

pub mod eth_api;
pub mod uzh_api;

/// Fetches both providers concurrently and concatenates their catalogs.
/// A failed provider degrades to an empty contribution and is reported in
/// `CatalogLoad::degraded` instead of failing the whole reload.
pub async fn load_catalog(lang: Lang) -> CatalogLoad {
    let client = reqwest::Client::new();
    let (eth, uzh) = tokio::join!(eth_api::get(&client, lang), uzh_api::get(&client));

    let mut load = CatalogLoad::default();
    for (provider, result) in [(Provider::Eth, eth), (Provider::Uzh, uzh)] {
        match result {
            Ok(mensas) => {
                log::info!("{provider}: {} mensas", mensas.len());
                load.mensas.extend(mensas);
            }
            Err(e) => {
                log::error!("{provider} fetch failed: {e}");
                load.degraded.push(provider);
            }
        }
    }
    load
}

pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    lang: Option<Lang>,
) -> Result<T, ApiError> {
    let mut request = client.get(url).header(header::ACCEPT, "application/json");
    if let Some(lang) = lang {
        request = request.header(header::ACCEPT_LANGUAGE, lang.accept_language());
    }
    let body = request.send().await?.bytes().await?;
    match serde_json::from_slice::<T>(&body) {
        Ok(parsed) => Ok(parsed),
        Err(decode_err) => Err(decode_error(&body, decode_err)),
    }
}

// both universities run Vapor services which answer errors as {error, reason}
#[derive(Deserialize)]
struct ErrorEnvelope {
    #[allow(dead_code)]
    error: bool,
    reason: String,
}

/// A body that failed to decode as the expected payload may still be a typed
/// error envelope, a well-formed answer in an unexpected shape, or at least a
/// readable plain-text message.
fn decode_error(body: &[u8], decode_err: serde_json::Error) -> ApiError {
    if let Ok(envelope) = serde_json::from_slice::<ErrorEnvelope>(body) {
        return ApiError::Upstream(envelope.reason);
    }
    if serde_json::from_slice::<serde_json::Value>(body).is_ok() {
        // valid JSON, just not the schema we asked for
        return ApiError::Decode(decode_err);
    }
    match std::str::from_utf8(body) {
        Ok(text) if !text.trim().is_empty() => ApiError::UnknownBody(text.trim().to_string()),
        _ => {
            log::error!("undecodable response body: {decode_err}");
            ApiError::Undecodable
        }
    }
}

#[dynamic]
static TIME_OF_DAY_RE: Regex = Regex::new(r"^([01]?[0-9]|2[0-3])[:.]([0-5][0-9])").unwrap();

/// Parses "11:30" (or "11.30") into a time of day; anything unparseable is
/// treated as unknown hours.
pub(crate) fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    let caps = TIME_OF_DAY_RE.captures(raw.trim())?;
    let hour = caps.get(1)?.as_str().parse().ok()?;
    let minute = caps.get(2)?.as_str().parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}
