//! Score protein-powder label facts against a declarative scoring spec
//! and rank products per training goal.

pub mod config;
pub mod error;
pub mod facts;
pub mod output;
pub mod scoring;
pub mod telemetry;
