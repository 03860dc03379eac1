//! confgrid command-line entry point

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, Command};
use confgrid_core::{ConfigKey, RESTORE_REMARK, SEED_CONFIGURATIONS};
use confgrid_server::{commands, logging, server, ServerConfig};
use std::path::PathBuf;

fn cli() -> Command {
    Command::new("confgrid")
        .version(confgrid_core::VERSION)
        .about("Configuration matrix storage service")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Path to a TOML config file"),
        )
        .subcommand(Command::new("serve").about("Run the HTTP API (default)"))
        .subcommand(
            Command::new("seed")
                .about("Drop the collection and insert the reference configurations"),
        )
        .subcommand(
            Command::new("restore")
                .about("Reset the assignment configuration to its reference content"),
        )
        .subcommand(
            Command::new("inspect")
                .about("Print stored configurations")
                .arg(
                    Arg::new("key")
                        .long("key")
                        .help("Resolve one configuration instead of listing raw documents"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    let config = ServerConfig::load(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))
        .context("loading configuration")?;
    logging::init(&config.log_level, config.log_format).context("initializing logging")?;

    match matches.subcommand() {
        Some(("seed", _)) => {
            commands::require_data_file(&config, "seed")?;
            let repository = commands::open_repository(&config).await?;
            let report = repository.seed(&SEED_CONFIGURATIONS).await?;
            print_lines(&commands::seed_report_lines(&report));
        }
        Some(("restore", _)) => {
            commands::require_data_file(&config, "restore")?;
            let repository = commands::open_repository(&config).await?;
            let report = repository.restore(&SEED_CONFIGURATIONS[0], RESTORE_REMARK).await?;
            print_lines(&commands::restore_report_lines(&report));
        }
        Some(("inspect", args)) => {
            commands::require_data_file(&config, "inspect")?;
            let repository = commands::open_repository(&config).await?;
            let json = args.get_flag("json");
            match args.get_one::<String>("key") {
                Some(raw) => {
                    let record = repository.resolve(&ConfigKey::parse(raw)?).await?;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&record)?);
                    } else {
                        print_lines(&commands::record_lines(&record));
                    }
                }
                None => {
                    let documents = repository.documents().await?;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&documents)?);
                    } else {
                        print_lines(&commands::document_lines(&documents));
                    }
                }
            }
        }
        _ => {
            let repository = commands::open_repository(&config).await?;
            server::run(&config, repository).await?;
        }
    }

    Ok(())
}
