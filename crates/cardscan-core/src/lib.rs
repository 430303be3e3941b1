//! Core domain types for the cardscan rotation engine.

pub mod calendar;
pub mod config;
pub mod error;

pub use calendar::{bucket_name, parse_bucket_date};
pub use config::{
    Environment, OutputCategory, RotationConfig, RotationGranularity, RotationSettings,
};
pub use error::{CoreError, CoreResult};
