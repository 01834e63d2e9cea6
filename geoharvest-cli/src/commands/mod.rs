//! CLI command implementations.

pub mod common;
pub mod cost;
pub mod places;
pub mod reviews;
pub mod satellite;
pub mod street_view;
