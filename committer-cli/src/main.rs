use clap::Parser;
use committer_core::{execute_committer_flow, style, CommitReport, CoreCliArgs, FlowReport};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// `--debug` forces debug; otherwise `COMMITTER_LOG`, falling back to warn
fn init_tracing(debug: bool) {
    let fallback = if debug { "debug" } else { "warn" };
    let filter = if debug {
        EnvFilter::new(fallback)
    } else {
        EnvFilter::try_from_env("COMMITTER_LOG").unwrap_or_else(|_| EnvFilter::new(fallback))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli_args = CoreCliArgs::parse();
    init_tracing(cli_args.debug);
    debug!(args = ?cli_args, "parsed arguments");

    match execute_committer_flow(cli_args).await {
        Ok(FlowReport::Commit(CommitReport::DryRun(message))) => {
            println!("{}", style("run this command to commit:").cyan());
            let git_command = format!("git commit -m \"{}\"", message.trim_end().replace('"', "\\\""));
            println!("{}\n", style(git_command).yellow().bold());
        }
        Ok(_) => {}
        Err(e) => {
            eprintln!(
                "{} {} {}",
                style("❌"),
                style("committer failed:").red().bold(),
                style(format!("{e:#}")).red()
            );
            std::process::exit(1);
        }
    }
}
