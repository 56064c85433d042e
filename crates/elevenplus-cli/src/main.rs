//! elevenplus CLI: practice exams from the terminal.

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};

use elevenplus_core::history::{Granularity, SubjectFilter};
use elevenplus_core::model::Subject;
use elevenplus_core::sampling::QuestionCount;

mod commands;
mod context;
mod render;

#[derive(Parser)]
#[command(name = "elevenplus", version, about = "11+ practice exam runner")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory with the subject question banks
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Directory for saved progress and history
    #[arg(long, global = true)]
    pub storage_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter config and a sample question bank
    Init,

    /// Check the question bank for data problems
    Validate,

    /// List subjects and their available tests
    Subjects,

    /// Start a new test
    Start {
        /// Subject (maths, english, verbal-reasoning, non-verbal-reasoning, verbal-skills)
        subject: Subject,

        /// Test key (e.g. "test1")
        test: String,

        /// Number of questions, or "all" (default: last used)
        #[arg(long)]
        count: Option<QuestionCount>,

        /// Run against the clock
        #[arg(long, conflicts_with = "untimed")]
        timed: bool,

        /// Run without the clock
        #[arg(long)]
        untimed: bool,
    },

    /// Show the current question
    Show,

    /// Pick (or un-pick) option letters on the current question
    Select {
        /// Option letters, applied in order
        #[arg(required = true)]
        letters: Vec<String>,

        /// Target a question id instead of the current question
        #[arg(long)]
        question: Option<u32>,
    },

    /// Go to the next question
    Next,

    /// Go to the previous question
    Prev,

    /// Jump to a question by its position (1-based)
    Jump { position: usize },

    /// Submit the test
    Submit {
        /// Submit even with unanswered questions
        #[arg(long)]
        yes: bool,

        /// Walk through the answers after submitting
        #[arg(long)]
        review: bool,
    },

    /// Resume the saved test
    Resume,

    /// Leave the current test without submitting
    Abandon {
        /// Also delete the saved progress
        #[arg(long)]
        discard: bool,
    },

    /// Show a live countdown for the current test
    Watch {
        /// Stop after this many ticks
        #[arg(long)]
        ticks: Option<u32>,
    },

    /// List past attempts
    History {
        /// Subject filter ("all" or a subject)
        #[arg(long)]
        subject: Option<SubjectFilter>,

        /// Delete all history
        #[arg(long)]
        clear: bool,
    },

    /// Show score trends over time
    Trends {
        /// Subject filter ("all" or a subject)
        #[arg(long)]
        subject: Option<SubjectFilter>,

        /// Bucket size: day, week or month
        #[arg(long)]
        granularity: Option<Granularity>,

        /// Share of the most recent periods to show (1-100)
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
        range: Option<u8>,
    },

    /// List past wrong answers, most recent first
    Mistakes {
        /// Subject filter ("all" or a subject)
        #[arg(long, default_value = "all")]
        subject: SubjectFilter,

        /// Only this category
        #[arg(long)]
        category: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("elevenplus=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let global = cli.global;

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Validate => commands::validate::execute(&global).await,
        Commands::Subjects => commands::subjects::execute(&global).await,
        Commands::Start {
            subject,
            test,
            count,
            timed,
            untimed,
        } => {
            let timed = if timed {
                Some(true)
            } else if untimed {
                Some(false)
            } else {
                None
            };
            commands::session::start(&global, subject, test, count, timed).await
        }
        Commands::Show => commands::session::show(&global).await,
        Commands::Select { letters, question } => {
            commands::session::select(&global, letters, question).await
        }
        Commands::Next => commands::session::next(&global).await,
        Commands::Prev => commands::session::prev(&global).await,
        Commands::Jump { position } => commands::session::jump(&global, position).await,
        Commands::Submit { yes, review } => commands::submit::execute(&global, yes, review).await,
        Commands::Resume => commands::session::resume(&global).await,
        Commands::Abandon { discard } => commands::session::abandon(&global, discard).await,
        Commands::Watch { ticks } => commands::watch::execute(&global, ticks).await,
        Commands::History { subject, clear } => commands::history::execute(&global, subject, clear),
        Commands::Trends {
            subject,
            granularity,
            range,
        } => commands::trends::execute(&global, subject, granularity, range),
        Commands::Mistakes { subject, category } => {
            commands::mistakes::execute(&global, subject, category)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
