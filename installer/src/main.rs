//! TON Client PHP extension installer CLI entrypoint.
//!
//! This binary inspects the selected PHP runtime, resolves the installer
//! options, and runs either the install or the verify sequence. Progress and
//! errors go through the [`Reporter`]; developer diagnostics go through `log`
//! and are enabled with `RUST_LOG`.

use clap::Parser;
use clap::error::ErrorKind as ClapErrorKind;
use ton_client_installer::artefact::download::HttpFetcher;
use ton_client_installer::artefact::extraction::ReleaseUnpacker;
use ton_client_installer::cli::Cli;
use ton_client_installer::command::SystemCommandExecutor;
use ton_client_installer::error::Result;
use ton_client_installer::options::{Options, resolve};
use ton_client_installer::orchestrator::{Collaborators, Orchestrator};
use ton_client_installer::probe::{PhpCli, PhpRuntime, probe_host};
use ton_client_installer::reporter::Reporter;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            if let Err(print_err) = err.print() {
                log::debug!("failed to print usage: {print_err}");
            }
            std::process::exit(exit_code_for_parse_error(err.kind()));
        }
    };

    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let mut reporter = Reporter::new(cli.reporter_settings(), &mut stdout, &mut stderr);
    let exit_code = exit_code_for_run_result(&run(&cli, &mut reporter));
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, reporter: &mut Reporter<'_>) -> Result<()> {
    let executor = SystemCommandExecutor;
    let runtime = PhpCli::new(&cli.php, &executor);
    let options = resolve_options(cli, &runtime).inspect_err(|err| reporter.error(err))?;

    let tools = Collaborators {
        runtime: &runtime,
        fetcher: &HttpFetcher,
        unpacker: &ReleaseUnpacker,
        executor: &executor,
    };
    let orchestrator = Orchestrator::new(&options, &tools);
    if options.flags.test_only {
        orchestrator.verify(reporter).map(drop)
    } else {
        orchestrator.install(reporter).map(drop)
    }
}

/// Probe the runtime and layer the command line over what it reports.
fn resolve_options(cli: &Cli, runtime: &dyn PhpRuntime) -> Result<Options> {
    let facts = probe_host(runtime)?;
    resolve(cli, &facts)
}

/// Help requests succeed; every other parse failure is a usage error.
fn exit_code_for_parse_error(kind: ClapErrorKind) -> i32 {
    match kind {
        ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => 0,
        _ => 1,
    }
}

/// Errors have already been reported by the time they reach here.
const fn exit_code_for_run_result(result: &Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(_) => 1,
    }
}
