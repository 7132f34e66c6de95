//! Items of the catalog.

pub mod item_api;
pub mod item_error;
pub mod item_query;
pub mod item_repository;
pub mod item_service;
pub mod memory_repository;
