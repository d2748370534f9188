use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "mend")]
#[command(about = "Applies compiler-error corrections to source files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, help = "Enable verbose debug output")]
    verbose: bool,

    #[arg(long, global = true, help = "Show what would happen without modifying files")]
    dry_run: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Apply corrections from the corrections file to the source tree")]
    Apply {
        #[arg(long, help = "Path to the corrections file (default: Data/corrected_code.json)")]
        corrections: Option<PathBuf>,

        #[arg(long, help = "Patch independent files on separate tasks")]
        parallel: bool,
    },

    #[command(about = "Build a structured error report from compiler output")]
    Report {
        #[arg(long, help = "Build command to run with output captured")]
        command: Option<String>,

        #[arg(long, help = "Read saved build output from a file instead of running a command")]
        input: Option<PathBuf>,

        #[arg(long, help = "Where to write the report (default: Data/error_report.json)")]
        output: Option<PathBuf>,

        #[arg(long, help = "Snippet context lines around each diagnostic")]
        context: Option<u32>,
    },

    #[command(subcommand)]
    History(HistoryCommands),
}

#[derive(Subcommand)]
enum HistoryCommands {
    #[command(about = "List recorded corrections")]
    Show,

    #[command(about = "Remove recorded corrections")]
    Clear {
        #[arg(long, help = "Also remove the generated data files")]
        all: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = cli::Config {
        verbose: cli.verbose,
        dry_run: cli.dry_run,
    };

    match cli.command {
        Commands::Apply {
            corrections,
            parallel,
        } => {
            cli::run_apply(corrections, parallel.then_some(true), &config).await?;
        }
        Commands::Report {
            command,
            input,
            output,
            context,
        } => {
            cli::run_report(command, input, output, context, &config).await?;
        }
        Commands::History(history_cmd) => match history_cmd {
            HistoryCommands::Show => {
                cli::run_history_show(&config).await?;
            }
            HistoryCommands::Clear { all } => {
                cli::run_history_clear(all, &config).await?;
            }
        },
    }

    Ok(())
}
