// Application layer - Fleet synchronization use cases
pub mod errors;
pub mod fleet_repository;
pub mod fleet_store;
pub mod push_channel;
pub mod staleness_clock;
pub mod sync_controller;
pub mod sync_state;
