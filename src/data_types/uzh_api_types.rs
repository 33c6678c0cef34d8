//! Wire types for the UZH "overview for days" endpoint. One answer carries
//! every canteen for several days at once.

use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct UzhAnswer {
    pub days: Option<Vec<UzhDay>>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UzhDay {
    pub day_date: Option<String>,
    pub mensa: Option<Vec<UzhMensa>>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UzhMensa {
    pub mensa_id: Option<i64>,
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub menu_time: Option<String>,
    pub address: Option<String>,
    pub open: Option<Vec<UzhOpen>>,
    pub menus: Option<Vec<UzhMenu>>,
}

#[derive(Deserialize, Debug)]
pub struct UzhOpen {
    pub text: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UzhMenu {
    pub price_student: Option<f64>,
    pub price_employee: Option<f64>,
    pub price_extern: Option<f64>,
    pub menu_title: Option<String>,
    pub menu_text: Option<String>,
    pub menu_types: Option<Vec<String>>,
    pub ingredients: Option<UzhIngredients>,
}

#[derive(Deserialize, Debug)]
pub struct UzhIngredients {
    pub allergene: Option<Vec<String>>,
}
