//! quizgrade CLI: grade quiz answers from the command line.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "quizgrade", version, about = "Quiz answer grading engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade a single answer
    Grade {
        /// Question type: text, multipleChoice, checkbox, rating, grid
        #[arg(long, default_value = "text")]
        question_type: String,

        /// The correct answer
        #[arg(long)]
        correct: String,

        /// The student's answer
        #[arg(long)]
        answer: String,

        /// Similarity threshold for text answers (default from config)
        #[arg(long)]
        threshold: Option<f64>,

        /// Use plain lexical similarity instead of the tiered matcher
        #[arg(long)]
        no_semantic: bool,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Grade a submissions file against a question bank
    Batch {
        /// Question bank TOML file
        #[arg(long)]
        bank: PathBuf,

        /// Submissions TOML file
        #[arg(long)]
        submissions: PathBuf,

        /// Output directory (default from config)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Max concurrent gradings (default from config)
        #[arg(long)]
        parallelism: Option<usize>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate question bank TOML files
    Validate {
        /// Path to a question bank file or directory
        #[arg(long)]
        bank: PathBuf,
    },

    /// Create starter config, question bank and submissions
    Init,
}

#[tokio::main]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let filter = match "quizgrade=info".parse::<tracing_subscriber::filter::Directive>() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Grade {
            question_type,
            correct,
            answer,
            threshold,
            no_semantic,
            format,
            config,
        } => commands::grade::execute(commands::grade::GradeArgs {
            question_type,
            correct,
            answer,
            threshold,
            semantic: !no_semantic,
            format,
            config,
        }),
        Commands::Batch {
            bank,
            submissions,
            output,
            parallelism,
            config,
        } => commands::batch::execute(bank, submissions, output, parallelism, config).await,
        Commands::Validate { bank } => commands::validate::execute(bank),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
