use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Row, Table};

use crate::roi::{BoundaryJump, LeverBudget, RoiQuote};
use crate::scenario::{Scenario, ScenarioAllocation};
use crate::wizard::{OptimizationOutcome, SimulationSummary};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn render_allocation_table(outcome: &OptimizationOutcome) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "Channel",
        "Current",
        "Allocated",
        "Share",
        "Base ROI",
        "Adjusted ROI",
    ]);

    for (allocation, row) in outcome.allocations.iter().zip(&outcome.channels) {
        let flagged = outcome
            .violations
            .iter()
            .any(|v| v.channel == allocation.name);
        let share = format!("{:.1}%", allocation.percentage);
        let share_cell = if flagged {
            Cell::new(share).fg(Color::Yellow)
        } else {
            Cell::new(share)
        };
        table.add_row(Row::from(vec![
            Cell::new(&allocation.name),
            Cell::new(row.current_budget.to_string()),
            Cell::new(allocation.size.to_string()),
            share_cell,
            Cell::new(format!("{:.2}", row.base_roi)),
            Cell::new(format!("{:.2}", row.roi)),
        ]));
    }

    let mut out = table.to_string();
    out.push_str(&format!(
        "\nProjected ROI: {:.2}\nContribution: {:+.1}%",
        outcome.projection.roi, outcome.projection.contribution
    ));
    for violation in &outcome.violations {
        out.push_str(&format!(
            "\nOutside window: {} at {:.1}% (allowed {:.1}-{:.1}%)",
            violation.channel, violation.percentage, violation.min_percent, violation.max_percent
        ));
    }
    out
}

pub fn render_levers_table(levers: &[LeverBudget]) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "Lever",
        "Reference",
        "New",
        "Change",
        "Base ROI",
        "ROI",
        "Ratio bracket",
    ]);
    for lever in levers {
        let change = lever.budget_change_pct();
        let change_cell = if change > 0.0 {
            Cell::new(format!("{change:+.1}%")).fg(Color::Green)
        } else if change < 0.0 {
            Cell::new(format!("{change:+.1}%")).fg(Color::Red)
        } else {
            Cell::new("0.0%")
        };
        table.add_row(Row::from(vec![
            Cell::new(lever.name()),
            Cell::new(lever.ref_budget().to_string()),
            Cell::new(lever.new_budget().to_string()),
            change_cell,
            Cell::new(format!("{:.2}", lever.base_roi())),
            Cell::new(format!("{:.2}", lever.roi())),
            Cell::new(lever.bracket().to_string()),
        ]));
    }
    table.to_string()
}

pub fn render_simulation_summary(summary: &SimulationSummary) -> String {
    format!(
        "Reference budget: {}\nSimulated budget: {} ({:+.1}%)\nProjected ROI: {:.2}\nContribution: {:+.1}%",
        summary.reference_budget,
        summary.simulated_budget,
        summary.budget_change_pct,
        summary.projection.roi,
        summary.projection.contribution
    )
}

pub fn render_scenarios_table(scenarios: &[Scenario]) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "Name",
        "Type",
        "Status",
        "KPI",
        "Timeframe",
        "Budget",
        "ROI",
        "Contribution",
        "Date",
    ]);
    for scenario in scenarios {
        table.add_row(vec![
            scenario.name.clone(),
            scenario.scenario_type.to_string(),
            scenario.status.to_string(),
            scenario.kpi.to_string(),
            scenario.timeframe.to_string(),
            scenario.total_budget.to_string(),
            format!("{:.2}", scenario.roi),
            format!("{:+.1}%", scenario.contribution),
            scenario.date.format("%Y-%m-%d").to_string(),
        ]);
    }
    table.to_string()
}

pub fn render_scenario(scenario: &Scenario) -> String {
    let mut out = render_scenarios_table(std::slice::from_ref(scenario));
    out.push('\n');
    match &scenario.allocation {
        ScenarioAllocation::Channels(channels) => {
            let mut table = new_table();
            table.set_header(vec!["Channel", "Allocated", "Share"]);
            for channel in channels {
                table.add_row(vec![
                    channel.name.clone(),
                    channel.size.to_string(),
                    format!("{:.1}%", channel.percentage),
                ]);
            }
            out.push_str(&table.to_string());
        }
        ScenarioAllocation::Levers(levers) => out.push_str(&render_levers_table(levers)),
    }
    out
}

pub fn render_roi_table(quote: &RoiQuote, jumps: &[BoundaryJump]) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "Base ROI",
        "Reference",
        "New",
        "Ratio",
        "Bracket",
        "Adjusted ROI",
    ]);
    table.add_row(vec![
        format!("{:.2}", quote.base_roi),
        format!("{:.0}", quote.ref_budget),
        format!("{:.0}", quote.new_budget),
        format!("{:.3}", quote.ratio),
        quote.bracket.to_string(),
        format!("{:.4}", quote.adjusted_roi),
    ]);

    let mut boundaries = new_table();
    boundaries.set_header(vec!["Threshold", "At threshold", "From above", "Jump"]);
    for jump in jumps {
        boundaries.add_row(vec![
            format!("{:.1}", jump.threshold),
            format!("{:.6}", jump.at),
            format!("{:.6}", jump.from_above),
            format!("{:+.6}", jump.jump),
        ]);
    }
    format!("{table}\n{boundaries}")
}
