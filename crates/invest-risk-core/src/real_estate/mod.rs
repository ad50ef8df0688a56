//! Reference property models usable as evaluators.

pub mod models;

pub use models::RealEstateModel;
