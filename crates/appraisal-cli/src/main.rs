use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "appraisal", version, about = "Appraisal outcome action engine")]
struct Cli {
    /// Engine configuration file (YAML). Defaults apply when absent.
    #[arg(long, global = true, env = "APPRAISAL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a rule catalog against its JSON schema and semantic rules.
    Check {
        /// Rule catalog file (YAML)
        catalog: PathBuf,
    },

    /// Evaluate a participant's scores and register the fired rules.
    Evaluate {
        #[arg(long)]
        participant: String,

        /// Appraisal template whose rules apply
        #[arg(long)]
        template: String,

        /// Scores file (YAML) with current and prior-cycle section scores
        #[arg(long)]
        scores: PathBuf,

        /// Rule catalog file. Overrides `catalog_file` from the configuration.
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Actor whose event caused this evaluation
        #[arg(long = "as")]
        triggered_by: Option<String>,
    },

    /// Mark a pending action as performed.
    Execute {
        execution_id: String,

        #[arg(long)]
        by: String,

        /// Id of the development plan created by the action
        #[arg(long, conflicts_with_all = ["pip", "succession"])]
        idp: Option<String>,

        /// Id of the performance improvement plan created by the action
        #[arg(long, conflicts_with = "succession")]
        pip: Option<String>,

        /// Id of the succession nomination created by the action
        #[arg(long)]
        succession: Option<String>,
    },

    /// Resolve a pending action with a second-party approval.
    Override {
        execution_id: String,

        #[arg(long)]
        reason: String,

        #[arg(long = "approved-by")]
        approved_by: String,

        /// Reviewer of the appraisal
        #[arg(long)]
        reviewer: String,

        /// Actor who triggered the evaluation, if known
        #[arg(long = "triggered-by")]
        triggered_by: Option<String>,
    },

    /// Dismiss a pending advisory action.
    Dismiss {
        execution_id: String,

        #[arg(long)]
        by: String,
    },

    /// Acknowledge an executed action.
    Acknowledge {
        execution_id: String,

        #[arg(long)]
        by: String,

        #[arg(long)]
        notes: Option<String>,
    },

    /// List a participant's executions.
    Status {
        #[arg(long)]
        participant: String,

        /// Print JSON instead of a table
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Check whether a participant's appraisal may be finalized (exit 2 while blocked).
    Gate {
        #[arg(long)]
        participant: String,
    },
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
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.cmd {
        Command::Check { catalog } => commands::check::run(&catalog)?,

        Command::Evaluate {
            participant,
            template,
            scores,
            catalog,
            triggered_by,
        } => {
            commands::evaluate::run(
                &config,
                &participant,
                &template,
                &scores,
                catalog.as_deref(),
                triggered_by.as_deref(),
            )
            .await?
        }

        Command::Execute {
            execution_id,
            by,
            idp,
            pip,
            succession,
        } => {
            let outcome = commands::lifecycle::outcome_link(idp, pip, succession);
            commands::lifecycle::execute(&config, &execution_id, &by, outcome).await?
        }

        Command::Override {
            execution_id,
            reason,
            approved_by,
            reviewer,
            triggered_by,
        } => {
            commands::lifecycle::override_execution(
                &config,
                &execution_id,
                &reason,
                &approved_by,
                &reviewer,
                triggered_by,
            )
            .await?
        }

        Command::Dismiss { execution_id, by } => {
            commands::lifecycle::dismiss(&config, &execution_id, &by).await?
        }

        Command::Acknowledge {
            execution_id,
            by,
            notes,
        } => commands::lifecycle::acknowledge(&config, &execution_id, &by, notes).await?,

        Command::Status { participant, json } => {
            commands::status::status(&config, &participant, json).await?
        }

        Command::Gate { participant } => {
            if !commands::status::gate(&config, &participant).await? {
                std::process::exit(2);
            }
        }
    }

    Ok(())
}
