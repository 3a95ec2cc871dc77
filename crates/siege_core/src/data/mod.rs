//! Data structures for game tuning.
//!
//! Pure data types deserialised from RON. Loading and validation live in
//! [`crate::config`].

mod level_data;
mod unit_data;

pub use level_data::LevelData;
pub use unit_data::{AttackerData, DefenderData};
