//! gradepredict CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

mod commands;

#[derive(Parser)]
#[command(
    name = "gradepredict",
    version,
    about = "Weighted grade scoring and external score prediction"
)]
struct Cli {
    /// Config file path (default: ./gradepredict.toml, then ~/.config/gradepredict/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict a student's final score from one assessment's weighted grade
    Predict {
        /// Student identifier
        #[arg(long, required_unless_present = "all_students", conflicts_with = "all_students")]
        student: Option<String>,

        /// Predict for every known student
        #[arg(long)]
        all_students: bool,

        /// Assessment identifier
        #[arg(long)]
        assessment: String,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Max concurrent predictions in batch mode (default: from config)
        #[arg(long)]
        parallelism: Option<usize>,
    },

    /// Record a raw score for a student on an assessment
    RecordScore {
        #[arg(long)]
        student: String,

        #[arg(long)]
        assessment: String,

        /// Raw score in marks
        #[arg(long, allow_negative_numbers = true)]
        score: f64,
    },

    /// Write the training matrix as CSV
    ExportTrainingData {
        /// Output file
        #[arg(long, default_value = "training_data.csv")]
        out: PathBuf,
    },

    /// Run the configured model training command
    Train,

    /// Check assessments and grades for problems
    Validate,

    /// Create a starter config and sample data directory
    Init,
}

#[tokio::main]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("gradepredict=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    let result = match cli.command {
        Commands::Predict {
            student,
            all_students,
            assessment,
            format,
            parallelism,
        } => {
            let target = match (student, all_students) {
                (_, true) => commands::predict::Target::AllStudents,
                (Some(student), false) => commands::predict::Target::Student(student),
                (None, false) => {
                    eprintln!("Error: --student or --all-students is required");
                    process::exit(2);
                }
            };
            commands::predict::execute(target, assessment, format, parallelism, config).await
        }
        Commands::RecordScore {
            student,
            assessment,
            score,
        } => commands::record_score::execute(student, assessment, score, config).await,
        Commands::ExportTrainingData { out } => commands::export::execute(out, config).await,
        Commands::Train => commands::train::execute(config).await,
        Commands::Validate => commands::validate::execute(config).await,
        Commands::Init => commands::init::execute().await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
