use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::{
    fs::Workspace,
    graph::{get_dependency_graphs, prettify_graphs, DependencyGraphs},
    impact::{determine_tests_to_run, SelectionConfig, DEFAULT_DEPTH},
};

mod definition;
mod fs;
mod git;
mod graph;
mod impact;
mod import;
mod language;
mod symbol;
mod symbol_kind;

#[derive(Parser, Debug)]
#[command(name = "dgtest")]
#[command(about = "Select the tests impacted by your changes from a dependency graph", long_about = None)]
/// Arguments received by the main command.
///
/// ## Arguments:
/// - `verbose` (`u8`): Verbosity of the logs, repeat for more,
/// - `repo` (`PathBuf`): Path to the project to analyze, defaults to current directory,
/// - `command` (`Command`): Action to perform.
struct Args {
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    /// Display more information on stderr (-v, -vv, -vvv).
    verbose: u8,
    #[arg(short, long, default_value = ".", global = true)]
    /// Path to the project to analyze. Other paths are relative to it.
    repo: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the tests impacted by the changed files, one per line.
    Run {
        /// Source directory, named after the package.
        source: PathBuf,
        #[arg(short, long)]
        /// Tests directory, if tests do not live alongside the source code.
        tests: Option<PathBuf>,
        #[arg(short, long, default_value_t = DEFAULT_DEPTH)]
        /// Maximum depth of the graph traversal. Larger means more coverage, less specificity.
        depth: usize,
        #[arg(short, long = "ignore")]
        /// Exclude tests that begin with this path prefix. Can be repeated.
        ignore_paths: Vec<String>,
        #[arg(short, long)]
        /// Only include tests that begin with this path prefix.
        filter: Option<String>,
        #[arg(short, long)]
        /// Branch to diff against, on top of uncommitted changes.
        branch: Option<String>,
    },
    /// Print the source and tests dependency graphs.
    Graph {
        /// Source directory, named after the package.
        source: PathBuf,
        #[arg(short, long)]
        /// Tests directory, if tests do not live alongside the source code.
        tests: Option<PathBuf>,
        #[arg(long)]
        /// Print the graphs as JSON.
        json: bool,
    },
}

/// Installs the log subscriber. `RUST_LOG` takes precedence over the verbosity flag.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Runs the dgtest command with the arguments from `Args`.
/// - Open the project,
/// - Build the dependency graphs,
/// - Display the selected tests or the graphs.
///
/// ## Returns:
/// - (`Result<()>`): Ok if no critical error, else description of the error.
fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    let workspace = Workspace::open(&args.repo)?;

    match args.command {
        Command::Run {
            source,
            tests,
            depth,
            ignore_paths,
            filter,
            branch,
        } => {
            let (changed_source_files, changed_test_files) =
                git::get_changed_files(&workspace, branch.as_deref())?;
            let (source_graph, tests_graph) =
                get_dependency_graphs(&workspace, &source, tests.as_deref())?;
            let config = SelectionConfig {
                depth,
                ignore_paths,
                filter,
            };
            let files_to_test = determine_tests_to_run(
                &changed_source_files,
                &changed_test_files,
                &source_graph,
                &tests_graph,
                &config,
            );
            for file in files_to_test {
                println!("{file}");
            }
        }
        Command::Graph {
            source,
            tests,
            json,
        } => {
            let (source_graph, tests_graph) =
                get_dependency_graphs(&workspace, &source, tests.as_deref())?;
            if json {
                let graphs = DependencyGraphs {
                    source: &source_graph,
                    tests: &tests_graph,
                };
                println!("{}", serde_json::to_string_pretty(&graphs)?);
            } else {
                println!(
                    "{}",
                    prettify_graphs(&[
                        ("Source Dependency Graph", &source_graph),
                        ("Tests Dependency Graph", &tests_graph),
                    ])
                );
            }
        }
    }

    Ok(())
}
