// Library for the collector binary, reader tools and tests

pub mod aggregator;
pub mod clock;
pub mod config;
pub mod error;
pub mod facade;
pub mod models;
pub mod sampler;
pub mod source;
pub mod store;
pub mod sweeper;
pub mod version;
