//! Storage of uploaded images.

pub mod asset_store;
pub mod image_transform;
pub mod local_store;
