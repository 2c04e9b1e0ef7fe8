// Domain layer - Fleet models and display rules
pub mod dashboard;
pub mod fleet;
pub mod status_format;
pub mod vehicle;
