#![forbid(unsafe_code)]

pub mod bank;
pub mod error;
pub mod model;
pub mod quiz;
pub mod time;

pub use error::Error;
pub use time::Clock;
