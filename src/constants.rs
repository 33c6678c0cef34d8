use std::sync::OnceLock;

pub static DB_FILENAME: OnceLock<String> = OnceLock::new();

pub const ETH_LEGACY_ENDPOINT: &str = "https://glyph.ethz.ch/eth-ws";
pub const ETH_WEEKLY_ROTAS_ENDPOINT: &str =
    "https://idapps.ethz.ch/cookpit-pub-services/v1/weeklyrotas";
pub const ETH_CLIENT_ID: &str = "ethz-wcms";
pub const UZH_ENDPOINT: &str = "https://iduzhnowweb.uzh.ch/v3/mensa/overviewfordays";
pub const GEOCODER_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";
pub const SHARE_URL_BASE: &str = "https://ethmensa.ch/s";

// ETH has forgotten to provide a "valid-to" in the past, treat those rotas as open-ended
pub const ETH_DEFAULT_VALID_TO: &str = "2099-12-31";

// facility ids below 100 belong to the ETH id space, the UZH answer may still mention them
pub const UZH_MIN_FACILITY_ID: i64 = 100;

// a mensa further away than this from every campus gets no campus assigned
pub const MAX_CAMPUS_DISTANCE_M: f64 = 1000.0;
