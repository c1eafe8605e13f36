//! Workboard CLI - Command-line interface for the multi-tenant project store

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use workboard::config::{self, WorkboardConfig, DATABASE_ENV};
use workboard::seed::seed_demo_data;
use workboard::ui::{self, Icons, TableBuilder};
use workboard::{ProjectStatus, Store};

#[derive(Parser)]
#[command(name = "workboard")]
#[command(version = "0.1.0")]
#[command(about = "Multi-tenant project-management data store")]
#[command(long_about = r#"
Workboard keeps organizations, projects, tasks, reports and documents in one
SQLite database, enforcing:
  • Cascade / nullify / restrict policies on every reference
  • Same-organization checks across tenants
  • Atomic team removal when a project is completed

Example usage:
  workboard init
  workboard seed
  workboard project-status --project 1 --status completed
  workboard dashboard --organization 1
  workboard stats
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the database file (overrides WORKBOARD_DATABASE and the config file)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file and create the database schema
    Init {
        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,

        /// Load the demo organization after creating the schema
        #[arg(long)]
        demo: bool,
    },

    /// Check the connection, foreign key enforcement and schema
    Health {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show row counts per table
    Stats,

    /// Load the demo organization into an empty database
    Seed,

    /// List every organization's projects
    Projects {
        /// Only this organization
        #[arg(short, long)]
        organization: Option<i64>,
    },

    /// Show headline counts for an organization, or for one manager's projects
    Dashboard {
        /// Organization id
        #[arg(short, long)]
        organization: i64,

        /// Only the projects this manager is assigned to
        #[arg(short, long)]
        manager: Option<i64>,

        /// Print the counts as JSON
        #[arg(long)]
        json: bool,
    },

    /// Move a project to a new status
    ProjectStatus {
        /// Project id
        #[arg(short, long)]
        project: i64,

        /// Target status (planning, active, on_hold, completed)
        #[arg(short, long)]
        status: String,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
}

fn open_store(path: &Path) -> anyhow::Result<Store> {
    config::ensure_db_dir(path)?;
    tracing::debug!("Opening database at {}", path.display());
    Ok(Store::open(path)?)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let loaded = config::load_config(Some(&config_path))?;
    let database = config::resolve_database_path(
        cli.database.as_deref(),
        std::env::var(DATABASE_ENV).ok(),
        loaded.as_ref(),
    );

    match cli.command {
        Commands::Init { force, demo } => {
            ui::header("Initializing Workboard");

            let config = if loaded.is_none() || force {
                let config = WorkboardConfig {
                    database: Some(database.display().to_string()),
                    create_demo_data: demo,
                };
                config::write_config(&config_path, &config, force)?;
                ui::status(Icons::INFO, "Config", &config_path.display().to_string());
                config
            } else {
                ui::status(
                    Icons::INFO,
                    "Config",
                    &format!("{} (existing)", config_path.display()),
                );
                loaded.unwrap_or_default()
            };

            let mut store = open_store(&database)?;
            ui::status(Icons::DATABASE, "Database", &database.display().to_string());

            if config.create_demo_data || demo {
                match seed_demo_data(&mut store)? {
                    Some(summary) => ui::success(&format!(
                        "Demo organization {} created ({} users, {} projects, {} tasks)",
                        summary.organization_id, summary.users, summary.projects, summary.tasks
                    )),
                    None => ui::warn("Demo data skipped: database already has organizations"),
                }
            }

            ui::success("Workboard initialized");
        }

        Commands::Health { json } => {
            let store = open_store(&database)?;
            let report = store.health()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                ui::header("Workboard health");
                ui::health_check(report.connected, "Connection", &database.display().to_string());
                ui::health_check(
                    report.foreign_keys,
                    "Foreign keys",
                    if report.foreign_keys { "enforced" } else { "disabled" },
                );
                let schema_detail = if report.missing_tables.is_empty() {
                    "all tables present".to_string()
                } else {
                    format!("missing: {}", report.missing_tables.join(", "))
                };
                ui::health_check(report.missing_tables.is_empty(), "Schema", &schema_detail);
                ui::summary_row("SQLite", &report.sqlite_version);
            }

            if !report.is_healthy() {
                anyhow::bail!("database at {} is not healthy", database.display());
            }
        }

        Commands::Stats => {
            let store = open_store(&database)?;
            let stats = store.stats()?;

            ui::header("Database statistics");
            println!("{}", ui::table::stats_table(&stats));
        }

        Commands::Projects { organization } => {
            let store = open_store(&database)?;
            let organizations = match organization {
                Some(id) => vec![store.get_organization(id)?],
                None => store.list_organizations()?,
            };

            for org in organizations {
                ui::status(Icons::ORGANIZATION, &org.name, &format!("#{}", org.id));
                let projects = store.list_organization_projects(org.id)?;
                if projects.is_empty() {
                    ui::summary_row("", &ui::dim("no projects"));
                    continue;
                }

                let mut table =
                    TableBuilder::new(&["ID", "Name", "Status", "Visibility", "Manager", "Dates"]);
                for project in projects {
                    let dates = match (project.start_date, project.end_date) {
                        (Some(start), Some(end)) => format!("{} .. {}", start, end),
                        (Some(start), None) => format!("{} ..", start),
                        (None, Some(end)) => format!(".. {}", end),
                        (None, None) => "-".to_string(),
                    };
                    table.add_row([
                        project.id.to_string(),
                        project.name,
                        project.status.to_string(),
                        project.visibility.to_string(),
                        project
                            .assigned_manager_id
                            .map(|id| id.to_string())
                            .unwrap_or_else(|| "-".to_string()),
                        dates,
                    ]);
                }
                println!("{}", table.build());
            }
        }

        Commands::Dashboard {
            organization,
            manager,
            json,
        } => {
            let store = open_store(&database)?;
            let today = chrono::Local::now().date_naive();
            let org = store.get_organization(organization)?;
            let stats = match manager {
                Some(manager) => store.manager_dashboard_stats(manager, today)?,
                None => store.dashboard_stats(organization, today)?,
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                ui::header(&format!("Dashboard: {}", org.name));
                ui::summary_row(
                    "Projects",
                    &format!(
                        "{} ({} active, {} completed)",
                        stats.projects_total, stats.projects_active, stats.projects_completed
                    ),
                );
                ui::summary_row(
                    "Tasks",
                    &format!("{} ({} completed)", stats.tasks_total, stats.tasks_completed),
                );
                ui::summary_row("Overdue", &stats.overdue_tasks.to_string());
                let people = if manager.is_some() { "Assignees" } else { "Users" };
                ui::summary_row(people, &stats.users_total.to_string());
            }
        }

        Commands::Seed => {
            let mut store = open_store(&database)?;
            match seed_demo_data(&mut store)? {
                Some(summary) => {
                    ui::success("Demo data loaded");
                    ui::summary_row("Organization", &summary.organization_id.to_string());
                    ui::summary_row("Users", &summary.users.to_string());
                    ui::summary_row("Projects", &summary.projects.to_string());
                    ui::summary_row("Tasks", &summary.tasks.to_string());
                }
                None => ui::warn("Database already has organizations; nothing seeded"),
            }
        }

        Commands::ProjectStatus {
            project,
            status,
            json,
        } => {
            let next: ProjectStatus = status.parse()?;
            let mut store = open_store(&database)?;
            let change = store.transition_project_status(project, next)?;
            tracing::info!(
                "Project {} moved {} -> {}",
                project,
                change.previous,
                change.project.status
            );

            if json {
                println!("{}", serde_json::to_string_pretty(&change)?);
            } else {
                ui::status_change(
                    &change.project.name,
                    change.previous,
                    change.project.status,
                    change.unassigned,
                );
            }
        }
    }

    Ok(())
}
