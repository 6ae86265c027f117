use clap::Parser;
use log::LevelFilter;
use std::process::ExitCode;
use xtemplate::cli::{Cli, CliError, run};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut logger = env_logger::Builder::from_default_env();
    if cli.verbose {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

fn report(error: &CliError) {
    if let CliError::Template(e) = error
        && let Some(path) = e.path()
    {
        eprintln!("XPath: {}", path);
    }
    eprintln!("{}", error);
}
