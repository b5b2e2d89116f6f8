//! DeTTECT CLI
//!
//! Command-line interface for DeTTECT

use clap::{CommandFactory, Parser};
use dettect_core::interrupt::OnSignal;
use dettect_core::logging_facility::init;
use dettect_core::Interrupt;

mod cli;
mod commands;

use cli::Cli;
use commands::session::Session;

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init(cli.global.log_format.profile());

    let interrupt = Interrupt::new();
    if let Err(e) = interrupt.install(OnSignal::Exit(0)) {
        tracing::warn!(error = %e, "interrupt handler not installed");
    }

    if !cli.interactive && cli.command.is_none() {
        if let Err(e) = Cli::command().print_help() {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        return;
    }

    let session = match Session::open(&cli.global, interrupt) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        _ if cli.interactive => commands::interactive::run(&session).map(|()| true),
        Some(command) => session.execute(&command.into_request()),
        None => Ok(true),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
