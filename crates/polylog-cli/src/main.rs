//! polylog CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};

use polylog_core::analytics::Period;
use polylog_core::model::{ContentMode, Language, TestMode};

mod commands;

#[derive(Parser)]
#[command(
    name = "polylog",
    version,
    about = "Language practice scoring and progress analytics"
)]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Who is practicing.
#[derive(Args, Clone)]
pub struct SessionArgs {
    /// Learner id (e.g. an email address)
    #[arg(long)]
    pub user: String,

    /// Practice language: en, ja
    #[arg(long, default_value = "en")]
    pub language: Language,
}

/// Which content to practice.
#[derive(Args, Clone)]
pub struct ContentArgs {
    /// Module id (e.g. 300)
    #[arg(long)]
    pub module: String,

    /// Test id (e.g. 301)
    #[arg(long)]
    pub test: String,

    /// Day number; all days when omitted
    #[arg(long)]
    pub day: Option<u32>,

    /// Content mode: learn, review
    #[arg(long, default_value = "review")]
    pub mode: ContentMode,
}

#[derive(Subcommand)]
enum Commands {
    /// Create starter config and sample content
    Init,

    /// Validate content JSON files
    Validate {
        /// Path to a content file or directory
        #[arg(long)]
        content: PathBuf,
    },

    /// Show how many days of content a test has
    Days {
        #[arg(long, default_value = "en")]
        language: Language,

        #[command(flatten)]
        content: ContentArgs,
    },

    /// Grade a multiple-choice, listening, or speech batch
    Grade {
        #[command(flatten)]
        session: SessionArgs,

        #[command(flatten)]
        content: ContentArgs,

        /// Modality: multiple-choice, listening-comprehension, speech-accuracy
        #[arg(long, default_value = "multiple-choice")]
        modality: TestMode,

        /// One answer per question, in order: an option index for choice
        /// items ("-" to skip), a transcript for speech items
        #[arg(long = "answer")]
        answers: Vec<String>,
    },

    /// Send translations to the AI reviewer
    Review {
        #[command(flatten)]
        session: SessionArgs,

        #[command(flatten)]
        content: ContentArgs,

        /// One translation per question, in order
        #[arg(long = "answer")]
        answers: Vec<String>,

        /// Max concurrent reviews (overrides config)
        #[arg(long)]
        parallelism: Option<usize>,
    },

    /// Mark a module complete
    Complete {
        #[command(flatten)]
        session: SessionArgs,

        #[command(flatten)]
        content: ContentArgs,
    },

    /// Show the progress dashboard
    Dashboard {
        #[command(flatten)]
        session: SessionArgs,

        /// Period: 7d, 30d, 90d, all
        #[arg(long, default_value = "all")]
        period: Period,

        /// Only this module category (e.g. 300)
        #[arg(long)]
        category: Option<String>,

        /// Output format: table, json, markdown
        #[arg(long, default_value = "table")]
        format: String,

        /// Also save the dashboard report as JSON
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let directive = match "polylog=info".parse::<tracing_subscriber::filter::Directive>() {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error: invalid log directive: {e}");
            process::exit(1);
        }
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Validate { content } => commands::validate::execute(content),
        Commands::Days { language, content } => {
            commands::days::execute(config, language, content).await
        }
        Commands::Grade {
            session,
            content,
            modality,
            answers,
        } => commands::grade::execute(config, session, content, modality, answers).await,
        Commands::Review {
            session,
            content,
            answers,
            parallelism,
        } => commands::review::execute(config, session, content, answers, parallelism).await,
        Commands::Complete { session, content } => {
            commands::complete::execute(config, session, content).await
        }
        Commands::Dashboard {
            session,
            period,
            category,
            format,
            output,
        } => {
            commands::dashboard::execute(config, session, period, category, format, output).await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
