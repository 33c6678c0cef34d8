//! Zurich mensa catalog: fetches the ETH and UZH canteen menus, normalizes
//! them into one model and runs a filter/sort pipeline over the result.

pub mod constants;
pub mod data_backend;
pub mod data_types;
pub mod db_operations;
pub mod errors;
pub mod geo;
pub mod pipeline;
