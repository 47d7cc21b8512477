use crate::runner::RunResult;
use crate::sim::kpi::{SavingsFactors, SweepReport};

/// Savings block printed below the sweep report.
pub fn format_savings(report: &SweepReport, factors: &SavingsFactors) -> String {
    let savings = report.savings(factors);
    format!(
        "--- Savings ---\n\
         CO2 avoided: {:.2} kg ({:.2} kg/kWh)\n\
         Cost avoided: {:.2} ({:.2}/kWh)",
        savings.co2_kg, factors.co2_kg_per_kwh, savings.cost, factors.cost_per_kwh
    )
}

pub fn print_report(result: &RunResult) {
    println!("\n{}", result.report);
    println!("\n{}", format_savings(&result.report, &result.savings));
}
