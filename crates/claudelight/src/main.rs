//! claude-light — agent lifecycle states rendered as smart-light colors.
//!
//! Invoked by the host's lifecycle hooks, so it never reports a light-control
//! failure through its exit status.

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use clap::error::ErrorKind;

mod cli;

#[derive(Parser)]
#[command(
    name = "claude-light",
    version,
    about = "Show agent lifecycle states on Tuya smart lights"
)]
struct Args {
    /// Enable debug output
    #[arg(short, long)]
    verbose: bool,

    /// Config file to read instead of ~/.config/claudelight/.env
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// thinking, running, question, success, error, done, or setup-hooks
    action: Option<String>,

    /// Anything after the action is ignored.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, hide = true)]
    extra: Vec<String>,
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                let _ = e.print();
            } else {
                cli::print_usage();
            }
            return;
        }
    };

    let default_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format(|buf, record| writeln!(buf, "{} {}", cli::LOG_PREFIX, record.args()))
        .init();

    if !args.extra.is_empty() {
        log::debug!("ignoring extra arguments: {}", args.extra.join(" "));
    }
    let code = cli::run(args.action.as_deref(), args.config.as_deref());
    std::process::exit(code);
}
