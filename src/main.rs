//! Operations Dashboard CLI
//! Run: ./target/release/lastmile_ops --role cxo --kpi otif --ticks 3

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use lastmile_ops::config::{DashboardArgs, DashboardConfig};
use lastmile_ops::dashboard::{DashboardSession, DashboardView};
use lastmile_ops::display::{format_budget_ratio, format_record, format_value, truncate_name};
use lastmile_ops::drilldown::{DrilldownData, ResultTab};
use lastmile_ops::models::{MetricUnit, OperationalGroup, Role, Scope, UnitMetric};
use lastmile_ops::search::filter_records;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RoleArg {
    Cxo,
    Company,
    Branch,
}

#[derive(Parser, Debug)]
#[command(name = "lastmile_ops", about = "Last-mile operations KPI dashboard")]
struct Cli {
    #[command(flatten)]
    dashboard: DashboardArgs,

    /// Viewer role
    #[arg(long, value_enum, default_value = "cxo")]
    role: RoleArg,

    /// Home region for a branch user
    #[arg(long)]
    region: Option<String>,

    /// Home branch for a branch user
    #[arg(long)]
    branch: Option<String>,

    /// Region to scope the KPI view to
    #[arg(long)]
    scope_region: Option<String>,

    /// Branch inside --scope-region
    #[arg(long, requires = "scope_region")]
    scope_branch: Option<String>,

    /// Free-text KPI search
    #[arg(long)]
    search: Option<String>,

    /// Live update ticks to apply before printing
    #[arg(long, default_value = "0")]
    ticks: u32,

    /// KPI to drill into
    #[arg(long)]
    kpi: Option<String>,

    /// Region to open inside a region drill-down
    #[arg(long, requires = "kpi")]
    drill_region: Option<String>,

    /// Show the bottom of the ranking instead of the top
    #[arg(long)]
    worst: bool,

    /// Only list drill-down rows whose name matches
    #[arg(long)]
    unit_filter: Option<String>,

    /// Write the drill-down rows to a CSV file
    #[arg(long, requires = "kpi")]
    csv: Option<PathBuf>,

    /// Show the operational counters
    #[arg(long)]
    operational: bool,
}

impl Cli {
    fn role(&self) -> Result<Role> {
        Ok(match self.role {
            RoleArg::Cxo => Role::Cxo,
            RoleArg::Company => Role::CompanyUser,
            RoleArg::Branch => match (&self.region, &self.branch) {
                (Some(region_id), Some(branch_id)) => Role::BranchUser {
                    region_id: region_id.clone(),
                    branch_id: branch_id.clone(),
                },
                _ => bail!("--role branch needs --region and --branch"),
            },
        })
    }

    fn scope(&self) -> Option<Scope> {
        let region_id = self.scope_region.clone()?;
        Some(match &self.scope_branch {
            Some(branch_id) => {
                Scope::RegionBranch { region_id, branch_id: Some(branch_id.clone()) }
            }
            None => Scope::Region { region_id },
        })
    }
}

#[derive(Serialize)]
struct CsvRow<'a> {
    unit_id: &'a str,
    unit_name: &'a str,
    value: f64,
    budget: Option<f64>,
    budget_ratio: Option<f64>,
}

fn print_kpis(view: &DashboardView) {
    println!("\n{}", "=".repeat(72));
    println!("         LAST-MILE OPERATIONS DASHBOARD");
    println!("{}\n", "=".repeat(72));
    println!("  Role:     {}", view.role.label());
    println!("  Scope:    {}", describe_scope(&view.scope));
    if let Some(at) = view.generated_at {
        println!("  Updated:  {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if !view.search_term.is_empty() {
        println!("  Search:   \"{}\"", view.search_term);
    }
    if let Some(err) = &view.last_error {
        println!("  Warning:  {}", err);
    }

    for group in &view.groups {
        println!("\n{} ({:?})", group.title.to_uppercase(), group.comparison_policy);
        println!("{}", "-".repeat(72));
        println!("  {:<32} {:>12} {:>12} {:>12}", "KPI", "Value", "Target", "Budget");
        for kpi in &group.kpis {
            let (value, target, budget) = format_record(kpi);
            let marker = if view.fallbacks.contains(&kpi.id) { " *" } else { "" };
            println!(
                "  {:<32} {:>12} {:>12} {:>12}{}",
                truncate_name(&kpi.name, 32),
                value,
                target,
                budget,
                marker
            );
        }
    }
    if !view.fallbacks.is_empty() {
        println!("\n  * no regional figure, showing the company aggregate");
    }
    if view.groups.is_empty() {
        println!("\n  No KPIs match.");
    }
}

fn describe_scope(scope: &Scope) -> String {
    match scope {
        Scope::All => "All regions".to_string(),
        Scope::Region { region_id } => format!("Region {}", region_id),
        Scope::RegionBranch { region_id, branch_id: Some(branch_id) } => {
            format!("Region {} / Branch {}", region_id, branch_id)
        }
        Scope::RegionBranch { region_id, branch_id: None } => {
            format!("Region {} / all branches", region_id)
        }
    }
}

fn print_operational(groups: &[OperationalGroup]) {
    println!("\nOPERATIONAL VIEW");
    println!("{}", "-".repeat(72));
    for group in groups {
        println!("  {}", group.title);
        for card in &group.cards {
            println!(
                "    {:<34} {:>6}  {:<8} trend {:+}",
                truncate_name(&card.name, 34),
                card.count,
                format!("{:?}", card.status),
                card.trend
            );
        }
    }
}

fn print_rows(title: &str, rows: &[UnitMetric], unit: MetricUnit) {
    println!("\n{}", title);
    println!("{}", "-".repeat(72));
    println!("  {:<4} {:<32} {:>14} {:>12}", "#", "Unit", "Value", "vs Budget");
    for (i, row) in rows.iter().enumerate() {
        println!(
            "  {:<4} {:<32} {:>14} {:>12}",
            i + 1,
            truncate_name(&row.unit.name, 32),
            format_value(row.value, unit),
            format_budget_ratio(row)
        );
    }
    if rows.is_empty() {
        println!("  No data for this level.");
    }
}

fn print_drilldown(data: &DrilldownData, unit: MetricUnit, unit_filter: Option<&str>) {
    let view = &data.view;
    println!("\n{}", "=".repeat(72));
    println!("  DRILL-DOWN: {} by {}", data.kpi_name, view.drilldown_kind.label());
    if let Some(region) = &view.selected_region {
        println!("  Region:     {}", region.name);
    }
    println!("{}", "=".repeat(72));

    let tab = match view.active_result_tab {
        ResultTab::Top => "TOP PERFORMERS",
        ResultTab::Worst => "NEEDS ATTENTION",
    };
    print_rows(tab, data.active_rows(), unit);

    let rows = match unit_filter {
        Some(term) => filter_records(&data.rows, term),
        None => data.rows.clone(),
    };
    print_rows("ALL UNITS (best first)", &rows, unit);
}

fn write_csv(path: &Path, rows: &[UnitMetric]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for row in rows {
        writer.serialize(CsvRow {
            unit_id: &row.unit.id,
            unit_name: &row.unit.name,
            value: row.value,
            budget: row.budget,
            budget_ratio: row.budget_ratio(),
        })?;
    }
    writer.flush()?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = DashboardConfig::from(&cli.dashboard);
    let mut session = DashboardSession::from_config(config, cli.role()?);
    info!("Loading from {}", session.source().describe());

    session.reload().await?;
    for _ in 0..cli.ticks {
        session.tick();
    }
    if let Some(scope) = cli.scope() {
        session.set_scope(scope)?;
    }
    if let Some(term) = &cli.search {
        session.apply_search(term);
    }

    print_kpis(&session.view());
    if cli.operational {
        print_operational(&session.operational());
    }

    if let Some(kpi_id) = &cli.kpi {
        session.open_drilldown(kpi_id)?;
        if let Some(region_id) = &cli.drill_region {
            session.select_region(region_id)?;
        }
        if cli.worst {
            session.set_result_tab(ResultTab::Worst)?;
        }
        let unit = session
            .snapshot()
            .and_then(|s| s.find_kpi(kpi_id).map(|(_, k)| k.unit))
            .unwrap_or(MetricUnit::Count);

        if let Some(data) = session.drilldown_data()? {
            print_drilldown(&data, unit, cli.unit_filter.as_deref());
            if let Some(path) = &cli.csv {
                write_csv(path, &data.rows)?;
                println!("\nWrote {} rows to {}", data.rows.len(), path.display());
            }
        }
    }

    if !session.recent_searches().is_empty() {
        println!("\nRECENT SEARCHES");
        println!("{}", "-".repeat(40));
        for entry in session.recent_searches() {
            println!("  {}", entry.value);
        }
    }

    Ok(())
}
