pub mod metrics;
pub mod property;
pub mod text;
