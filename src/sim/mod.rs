/// Facility load totals.
pub mod aggregate;
/// Simulation time axis.
pub mod clock;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod kpi;
pub mod optimizer;
pub mod policy;
/// Compensation window search.
pub mod search;
pub mod target;
pub mod types;
