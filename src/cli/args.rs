// ABOUTME: Command line argument definitions and parsing using Clap
// ABOUTME: Defines the main CLI structure and subcommands for taskgraph

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "taskgraph")]
#[command(about = "Run tasks and their prerequisites from a YAML task graph")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Path to configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Disable colored output")]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute tasks and everything they depend on
    Run {
        #[arg(help = "Path to task-graph YAML file")]
        file: PathBuf,

        #[arg(help = "Tasks to run (defaults to the file's default_tasks, else all tasks)")]
        tasks: Vec<String>,

        #[arg(short = 'x', long = "exclude-task", help = "Leave a task out of the build")]
        exclude: Vec<String>,

        #[arg(
            long = "continue",
            help = "Keep running independent tasks after a failure"
        )]
        continue_on_failure: bool,

        #[arg(short = 'j', long = "jobs", help = "Maximum number of tasks run at once")]
        jobs: Option<usize>,

        #[arg(long, help = "Print the execution plan without running it")]
        dry_run: bool,

        #[arg(short, long, help = "Write the JSON build result to this file")]
        output: Option<PathBuf>,
    },

    /// Print the execution order of the requested tasks
    Plan {
        #[arg(help = "Path to task-graph YAML file")]
        file: PathBuf,

        #[arg(help = "Tasks to plan (defaults to the file's default_tasks, else all tasks)")]
        tasks: Vec<String>,

        #[arg(short = 'x', long = "exclude-task", help = "Leave a task out of the plan")]
        exclude: Vec<String>,

        #[arg(long, help = "Render the plan as a Graphviz DOT graph")]
        dot: bool,
    },

    /// Validate a task-graph file, including cycle detection
    Validate {
        #[arg(help = "Path to task-graph YAML file")]
        file: PathBuf,
    },
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
