//! Spatial hierarchy navigation and editing.

pub mod fetch;
pub mod form;
pub mod geo;
pub mod mutation;
pub mod navigator;
pub mod services;

pub use fetch::fetch_children;
pub use navigator::{AddMode, NavigatorError, NavigatorServices, SpatialNavigator};
