pub mod datetime;
pub mod geo;
