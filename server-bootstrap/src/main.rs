mod certs;
mod cleanup;
mod compose;
mod config;
mod env_file;
mod error;
mod logger;
mod operator;
mod prober;
mod release;
mod retry;
mod setup;
mod site;
#[cfg(test)]
mod testing;
mod tools;

use clap::Parser;
use cmd_lib::CmdResult;
use log::{Level, error, info};
use std::path::PathBuf;

use config::BootstrapConfig;
use error::{SetupError, setup_error};
use operator::{Operator, Terminal, Unattended};
use setup::Installer;
use site::SiteOverrides;
use tools::HostToolbox;

#[derive(Parser)]
#[command(
    name = "server-bootstrap",
    version,
    about = "Install the server release from the archive in the working directory"
)]
struct Opts {
    #[arg(short, long, help = "Bootstrap config (default: ./bootstrap.toml if present)")]
    config: Option<PathBuf>,

    #[arg(short = 'C', long, default_value = ".", help = "Working directory")]
    workdir: PathBuf,

    #[arg(long, help = "Country code for the certificates (skips the prompt)")]
    country: Option<String>,

    #[arg(long, help = "State or province (skips the prompt)")]
    state: Option<String>,

    #[arg(long, help = "City (skips the prompt)")]
    city: Option<String>,

    #[arg(long, help = "Organizational unit (skips the prompt)")]
    org_unit: Option<String>,

    #[arg(
        short,
        long,
        help = "Unattended: remove a previous install, reuse an existing CA, take defaults"
    )]
    yes: bool,

    #[arg(short, long, help = "Debug logging")]
    verbose: bool,
}

#[cmd_lib::main]
fn main() -> CmdResult {
    let opts = Opts::parse();
    logger::init(opts.verbose);

    run(opts).inspect_err(|e| match setup_error(e) {
        Some(SetupError::CleanupDeclined(_)) => error!("Aborted: {e}"),
        _ => error!("{}", logger::paint(Level::Error, &format!("Setup failed: {e}"))),
    })
}

fn run(opts: Opts) -> CmdResult {
    let config = BootstrapConfig::load(opts.config.as_deref(), &opts.workdir)?;
    let overrides = SiteOverrides {
        country: opts.country,
        state: opts.state,
        city: opts.city,
        org_unit: opts.org_unit,
    };

    let mut terminal;
    let mut unattended;
    let operator: &mut dyn Operator = if opts.yes {
        unattended = Unattended;
        &mut unattended
    } else {
        terminal = Terminal::stdin();
        &mut terminal
    };

    info!("Bootstrapping in {}", opts.workdir.display());
    Installer {
        config: &config,
        workdir: &opts.workdir,
        tools: &HostToolbox,
        operator,
        overrides,
    }
    .run()
}
