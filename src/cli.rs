use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "stackplan")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Plan dependency-ordered infrastructure stacks", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Stack manifest (defaults to ./stackplan.toml)
    #[arg(short = 'f', long, global = true, env = "STACKPLAN_MANIFEST")]
    pub manifest: Option<String>,

    /// Include the built-in directory environment blueprint
    #[arg(long, global = true)]
    pub builtin: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the ordered, compiled plan of every stack
    Plan(PlanArgs),

    /// Check that every stack plans cleanly
    Validate(JobsArgs),

    /// List the exports every stack publishes
    Exports(JobsArgs),

    /// Show dependency edges, declared and inferred
    Graph(GraphArgs),

    /// Emit plans as deployment templates
    Emit(EmitArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser)]
pub struct JobsArgs {
    /// Number of stacks planned in parallel
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,
}

#[derive(Parser)]
pub struct PlanArgs {
    /// Only show matching resources and their dependencies: kind or kind.name
    pub target: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,

    #[command(flatten)]
    pub jobs: JobsArgs,
}

#[derive(Parser)]
pub struct GraphArgs {
    /// Only show this stack
    #[arg(short, long)]
    pub stack: Option<String>,

    /// Print Graphviz DOT instead of text
    #[arg(long)]
    pub dot: bool,
}

#[derive(Parser)]
pub struct EmitArgs {
    /// Only emit matching resources and their dependencies: kind or kind.name
    pub target: Option<String>,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Show what would be emitted without writing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Directory for templates (one <stack>.template.json each); stdout if unset
    #[arg(short, long)]
    pub out: Option<String>,

    #[command(flatten)]
    pub jobs: JobsArgs,
}
