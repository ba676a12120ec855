use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use budget_planner::allocation::{parse_budget, ChannelConstraint, SeededFactors};
use budget_planner::config::{Config, ConfigOverrides};
use budget_planner::output::csv::{allocation_to_csv, levers_to_csv, scenarios_to_csv};
use budget_planner::output::json::render_json;
use budget_planner::output::table::{
    render_allocation_table, render_levers_table, render_roi_table, render_scenario,
    render_simulation_summary,
};
use budget_planner::roi::{boundary_discontinuities, RoiQuote};
use budget_planner::scenario::{Kpi, Scenario, ScenarioAllocation, ScenarioList, Timeframe};
use budget_planner::server::run_server;
use budget_planner::wizard::{OptimizationOutcome, OptimizationWizard, SimulationWizard};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Parser)]
#[command(
    name = "budget-planner",
    about = "Marketing budget allocation and ROI scenario planner"
)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    /// Seed for the allocation factor draws.
    #[arg(short, long)]
    seed: Option<u64>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Preview a budget allocation over the configured channels.
    Allocate {
        #[arg(short, long)]
        budget: Option<String>,
        /// JSON file holding a list of channel constraints.
        #[arg(long)]
        channels: Option<PathBuf>,
    },
    /// Adjust a channel ROI for a budget change.
    Roi {
        #[arg(long)]
        base: f64,
        #[arg(long)]
        reference: f64,
        #[arg(long)]
        new: f64,
    },
    /// Run the optimization wizard end to end.
    Optimize {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        budget: Option<String>,
        #[arg(long)]
        kpi: Option<String>,
        #[arg(long)]
        timeframe: Option<String>,
        /// Channel to hold at its current budget (repeatable).
        #[arg(long)]
        freeze: Vec<String>,
        /// Channel to release from a configured freeze (repeatable).
        #[arg(long)]
        unfreeze: Vec<String>,
    },
    /// Run the simulation wizard end to end.
    Simulate {
        #[arg(short, long)]
        name: String,
        #[arg(long)]
        kpi: Option<String>,
        #[arg(long)]
        timeframe: Option<String>,
        /// Lever to include (repeatable); all configured levers when omitted.
        #[arg(long)]
        lever: Vec<String>,
        /// New budget for a lever, as NAME=AMOUNT (repeatable).
        #[arg(long = "set")]
        set: Vec<String>,
    },
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;
    config.apply_overrides(ConfigOverrides {
        seed: cli.seed,
        total_budget: None,
    });

    match &cli.command {
        Commands::Config { init, show } => {
            handle_config_command(*init, *show, &config, &config_path)?;
        }
        Commands::Serve { host, port } => {
            let host = host.clone().unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let bind = format!("{host}:{port}");
            let addr: SocketAddr = bind
                .parse()
                .map_err(|e| anyhow!("invalid bind address {bind}: {e}"))?;
            run_server(config, addr).await?;
        }
        Commands::Allocate { budget, channels } => {
            if let Some(raw) = budget {
                config.apply_overrides(ConfigOverrides {
                    seed: None,
                    total_budget: Some(parse_budget(raw)?),
                });
            }
            let mut wizard = OptimizationWizard::from_config(&config);
            if let Some(path) = channels {
                let mut draft = wizard.close();
                draft.channels = load_channels(path)?;
                wizard = OptimizationWizard::new(draft);
            }
            let mut factors = SeededFactors::from_optional_seed(config.allocation.seed);
            let outcome = wizard.preview(&mut factors)?;
            if !outcome.violations.is_empty() {
                warn!(
                    "{} channel(s) ended outside their percent window",
                    outcome.violations.len()
                );
            }
            print_allocation(&outcome, cli.output)?;
        }
        Commands::Roi {
            base,
            reference,
            new,
        } => {
            let quote = RoiQuote::new(*base, *reference, *new);
            match cli.output {
                OutputFormat::Table => {
                    println!("{}", render_roi_table(&quote, &boundary_discontinuities()))
                }
                OutputFormat::Json => println!("{}", render_json(&quote)?),
                OutputFormat::Csv => {
                    warn!("CSV output for roi not implemented, using JSON");
                    println!("{}", render_json(&quote)?);
                }
            }
        }
        Commands::Optimize {
            name,
            budget,
            kpi,
            timeframe,
            freeze,
            unfreeze,
        } => {
            let mut wizard = OptimizationWizard::from_config(&config);
            wizard.set_name(name.as_str());
            if let Some(raw) = kpi {
                wizard.set_kpi(raw.parse::<Kpi>()?);
            }
            if let Some(raw) = timeframe {
                wizard.set_timeframe(raw.parse::<Timeframe>()?);
            }
            if let Some(raw) = budget {
                wizard.set_total_budget_input(raw)?;
            }
            wizard.next()?;
            for channel in freeze {
                wizard.set_frozen(channel, true)?;
            }
            for channel in unfreeze {
                wizard.set_frozen(channel, false)?;
            }

            let mut factors = SeededFactors::from_optional_seed(config.allocation.seed);
            let mut scenarios = ScenarioList::new();
            let scenario = wizard.submit(&mut factors, &mut scenarios)?;
            print_scenario(&scenario, cli.output)?;
        }
        Commands::Simulate {
            name,
            kpi,
            timeframe,
            lever,
            set,
        } => {
            let mut wizard = SimulationWizard::from_config(&config);
            wizard.set_name(name.as_str());
            if let Some(raw) = kpi {
                wizard.set_kpi(raw.parse::<Kpi>()?);
            }
            if let Some(raw) = timeframe {
                wizard.set_timeframe(raw.parse::<Timeframe>()?);
            }
            wizard.next()?;

            if lever.is_empty() {
                wizard.select_all();
            }
            for name in lever {
                wizard.select_lever(name)?;
            }
            wizard.next()?;

            for assignment in set {
                let (name, amount) = parse_assignment(assignment)?;
                let roi = wizard.set_new_budget_input(name, amount)?;
                info!("{name} ROI now {roi:.2}");
            }
            wizard.next()?;

            let summary = wizard.summary();
            if matches!(cli.output, OutputFormat::Table) {
                println!("{}", render_levers_table(wizard.levers()));
                println!("{}", render_simulation_summary(&summary));
            }
            let mut scenarios = ScenarioList::new();
            let scenario = wizard.submit(&mut scenarios)?;
            print_scenario(&scenario, cli.output)?;
        }
    }

    Ok(())
}

fn handle_config_command(init: bool, show: bool, config: &Config, config_path: &Path) -> Result<()> {
    if init {
        Config::write_template(config_path)?;
        println!("Wrote config template to {}", config_path.display());
    }
    if show || !init {
        println!("{}", render_json(config)?);
    }
    Ok(())
}

fn load_channels(path: &Path) -> Result<Vec<ChannelConstraint>> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed reading channels: {}", path.display()))?;
    serde_json::from_str(&data)
        .with_context(|| format!("failed parsing channels JSON: {}", path.display()))
}

fn parse_assignment(raw: &str) -> Result<(&str, &str)> {
    let (name, amount) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected NAME=AMOUNT, got {raw:?}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("lever name is empty in {raw:?}"));
    }
    Ok((name, amount.trim()))
}

fn print_allocation(outcome: &OptimizationOutcome, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_allocation_table(outcome)),
        OutputFormat::Json => println!("{}", render_json(outcome)?),
        OutputFormat::Csv => println!("{}", allocation_to_csv(outcome)?),
    }
    Ok(())
}

fn print_scenario(scenario: &Scenario, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_scenario(scenario)),
        OutputFormat::Json => println!("{}", render_json(scenario)?),
        OutputFormat::Csv => {
            println!("{}", scenarios_to_csv(std::slice::from_ref(scenario))?);
            if let ScenarioAllocation::Levers(levers) = &scenario.allocation {
                println!("{}", levers_to_csv(levers)?);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::parse_assignment;

    #[test]
    fn parses_lever_assignments() {
        assert_eq!(
            parse_assignment("TV = 150,000").expect("valid assignment"),
            ("TV", "150,000")
        );
        assert!(parse_assignment("TV").is_err());
        assert!(parse_assignment("=5").is_err());
    }
}
