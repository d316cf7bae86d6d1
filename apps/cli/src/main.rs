use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;
use vidquiz_core::{VidquizConfig, plan_segments};

mod render;
mod watch;

#[derive(Parser)]
#[command(name = "vidquiz", version)]
#[command(about = "Watch a video with comprehension quizzes at every checkpoint")]
struct Cli {
    /// Show debug logs (RUST_LOG is used otherwise)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Play a video on a simulated clock and take its quizzes
    Watch(watch::WatchArgs),
    /// Print when each segment's quiz would fire
    Plan(PlanArgs),
}

#[derive(Args)]
struct PlanArgs {
    /// Video length in seconds
    #[arg(short, long)]
    duration: f64,

    /// Number of quiz segments
    #[arg(short, long)]
    segments: usize,

    /// Seconds between quiz boundaries
    #[arg(short, long)]
    interval: Option<f64>,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("vidquiz=debug,vidquiz_core=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_plan(args: PlanArgs, config: VidquizConfig) -> Result<()> {
    let interval = args
        .interval
        .unwrap_or(config.scheduler.boundary_interval_secs);
    let plan = plan_segments(args.duration, args.segments, interval)?;

    println!(
        "\n{}  {}\n",
        style("vidquiz").cyan().bold(),
        style(format!(
            "{} segments over {}",
            plan.len(),
            render::format_position(args.duration)
        ))
        .dim()
    );
    print!("{}", render::format_plan(&plan, args.duration));
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match VidquizConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Command::Watch(args) => watch::run(args, config).await,
        Command::Plan(args) => run_plan(args, config),
    }
}
