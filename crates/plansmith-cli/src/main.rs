mod config;
mod generate_cmd;
mod materialize_cmd;
mod projects_cmd;
mod serve_cmd;
#[cfg(test)]
mod test_util;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use plansmith_core::llm::ToolCaller;
use plansmith_core::plan::{GenerationRequest, MaterializeRequest};
use plansmith_db::pool;

use config::PlansmithConfig;

#[derive(Parser)]
#[command(
    name = "plansmith",
    about = "Turn project descriptions into GitHub milestones and issues"
)]
struct Cli {
    /// Database URL (overrides PLANSMITH_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a plansmith config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/plansmith")]
        db_url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create the database if missing and run migrations
    DbInit,
    /// Run the HTTP API
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port to listen on
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Generate a project plan with the model and print it as JSON
    Generate {
        /// What the project is
        #[arg(long)]
        description: String,
        /// Features the project should have
        #[arg(long)]
        features: String,
        /// Expected duration in weeks
        #[arg(long)]
        duration: String,
        /// Hours per day the user will work
        #[arg(long)]
        hours: u32,
        /// Preferred tech stack
        #[arg(long)]
        tech_stack: Option<String>,
        /// Write the plan to this file instead of stdout
        #[arg(long)]
        output: Option<String>,
    },
    /// Create a GitHub repository from a plan file (token from GITHUB_TOKEN)
    Materialize {
        /// Path to the plan JSON file
        plan: String,
        /// Repository name
        #[arg(long)]
        repo: String,
        /// Repository description
        #[arg(long, default_value = "")]
        description: String,
        /// Create a private repository
        #[arg(long)]
        private: bool,
    },
    /// List the projects recorded for a user
    Projects {
        /// Tracker username
        username: String,
    },
}

/// Execute the `plansmith init` command: write config file.
fn cmd_init(db_url: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        llm: config::LlmSection::default(),
        github: config::GitHubSection::default(),
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!();
    println!("Set {} (or llm.api_key) to enable plan generation.", config::OPENAI_API_KEY_ENV);
    println!("Next: run `plansmith db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `plansmith db-init` command: create database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = PlansmithConfig::resolve(cli_db_url)?;

    println!("Initializing plansmith database...");

    pool::ensure_database_exists(&resolved.db_config).await?;
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    pool::run_migrations(&db_pool).await?;

    let count = pool::project_count(&db_pool).await?;
    println!("Database ready. projects: {count} rows");

    db_pool.close().await;

    println!("plansmith db-init complete.");
    Ok(())
}

/// Execute the `plansmith serve` command.
async fn cmd_serve(cli_db_url: Option<&str>, bind: &str, port: u16) -> anyhow::Result<()> {
    let resolved = PlansmithConfig::resolve(cli_db_url)?;
    let db_pool = pool::create_pool(&resolved.db_config).await?;

    let model: Option<Arc<dyn ToolCaller>> = match resolved.llm.api_key {
        Some(_) => {
            let client = resolved.llm.client()?;
            tracing::info!(model = client.model(), "plan generation enabled");
            Some(Arc::new(client))
        }
        None => {
            tracing::warn!("no model API key configured; plan generation is disabled");
            None
        }
    };
    let oauth = resolved.github.oauth()?;
    if oauth.is_none() {
        tracing::info!("GitHub OAuth client not configured; OAuth routes are disabled");
    }

    let state = serve_cmd::AppState {
        pool: db_pool.clone(),
        tracker: Arc::new(resolved.github.client()?),
        model,
        oauth,
    };

    let result = serve_cmd::run_serve(state, bind, port).await;
    db_pool.close().await;
    result
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { db_url, force } => {
            cmd_init(&db_url, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::Serve { bind, port } => {
            cmd_serve(cli.database_url.as_deref(), &bind, port).await?;
        }
        Commands::Generate {
            description,
            features,
            duration,
            hours,
            tech_stack,
            output,
        } => {
            let resolved = PlansmithConfig::resolve(cli.database_url.as_deref())?;
            let model = resolved.llm.client()?;
            let request = GenerationRequest {
                description,
                features,
                duration,
                hours_per_day: hours,
                tech_stack,
            };
            generate_cmd::run_generate(&model, &request, output.as_deref()).await?;
        }
        Commands::Materialize {
            plan,
            repo,
            description,
            private,
        } => {
            let credential = materialize_cmd::credential_from_env()?;
            let resolved = PlansmithConfig::resolve(cli.database_url.as_deref())?;
            let tracker = resolved.github.client()?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let request = MaterializeRequest {
                repo_name: repo,
                description,
                private,
            };
            let result = materialize_cmd::run_materialize(
                &db_pool,
                &tracker,
                &credential,
                &plan,
                &request,
            )
            .await;
            db_pool.close().await;
            result?;
        }
        Commands::Projects { username } => {
            let resolved = PlansmithConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = projects_cmd::run_projects(&db_pool, &username).await;
            db_pool.close().await;
            result?;
        }
    }

    Ok(())
}
