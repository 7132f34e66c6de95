//! A catalog of items with optional images, served over a REST API.

pub mod app;
pub mod feature;
pub mod infra;
