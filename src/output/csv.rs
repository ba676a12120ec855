use anyhow::Result;

use crate::roi::LeverBudget;
use crate::scenario::Scenario;
use crate::wizard::OptimizationOutcome;

pub fn allocation_to_csv(outcome: &OptimizationOutcome) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "channel",
        "current_budget",
        "size",
        "percentage",
        "base_roi",
        "roi",
    ])?;
    for (allocation, row) in outcome.allocations.iter().zip(&outcome.channels) {
        writer.write_record([
            allocation.name.clone(),
            row.current_budget.to_string(),
            allocation.size.to_string(),
            format!("{:.1}", allocation.percentage),
            format!("{:.2}", row.base_roi),
            format!("{:.4}", row.roi),
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

pub fn levers_to_csv(levers: &[LeverBudget]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["lever", "ref_budget", "new_budget", "base_roi", "roi", "bracket"])?;
    for lever in levers {
        writer.write_record([
            lever.name().to_string(),
            lever.ref_budget().to_string(),
            lever.new_budget().to_string(),
            format!("{:.2}", lever.base_roi()),
            format!("{:.4}", lever.roi()),
            lever.bracket().to_string(),
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

pub fn scenarios_to_csv(scenarios: &[Scenario]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "id",
        "name",
        "type",
        "status",
        "kpi",
        "timeframe",
        "total_budget",
        "roi",
        "contribution",
        "date",
    ])?;
    for scenario in scenarios {
        writer.write_record([
            scenario.id.clone(),
            scenario.name.clone(),
            scenario.scenario_type.to_string(),
            scenario.status.to_string(),
            scenario.kpi.to_string(),
            scenario.timeframe.to_string(),
            scenario.total_budget.to_string(),
            format!("{:.2}", scenario.roi),
            format!("{:.1}", scenario.contribution),
            scenario.date.to_rfc3339(),
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}
