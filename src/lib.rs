//! Facility load-shifting simulator that turns curtailed PV into consumption.

pub mod cli;
pub mod config;
pub mod devices;
pub mod error;
/// CSV ingestion and CSV/JSON export.
pub mod io;
pub mod reporting;
pub mod runner;
pub mod scenario;
/// Device model, aggregation, curtailment target and optimizer.
pub mod sim;
pub mod synthetic;
pub mod telemetry;
