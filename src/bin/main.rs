use std::{error::Error, path::Path, process, time::Duration};

use serde::Serialize;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use svcctl::{
    CancellationToken, ManagerSettings, OpResult, ServiceManager, ServiceStatus,
    cli::{Cli, Commands, parse_args},
    config::{Manifest, load_manifest, parse_duration},
    native::{ScmApi, SystemScm},
};

/// One row of `status --json`.
#[derive(Serialize)]
struct StatusRow {
    name: String,
    display_name: Option<String>,
    description: Option<String>,
    status: ServiceStatus,
}

fn main() {
    let args = parse_args();
    init_logging(&args);

    match run(args) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(err) => {
            eprintln!("Error: {err}");
            process::exit(2);
        }
    }
}

/// Runs the command and returns whether every operation succeeded.
fn run(args: Cli) -> Result<bool, Box<dyn Error>> {
    let manifest = load_optional_manifest(&args.config, &args.command)?;
    let settings = match &manifest {
        Some(manifest) => manifest.manager_settings()?,
        None => ManagerSettings::default(),
    };
    let manager = ServiceManager::with_settings(SystemScm::default(), settings);

    let token = CancellationToken::new();
    register_cancel_handler(&token);

    if args.command.is_mutating()
        && manager.api().is_supported()
        && !manager.api().is_elevated()
    {
        warn!("svcctl is not running elevated; service changes will likely be denied");
    }

    let mut failed = false;
    match args.command {
        Commands::Status { names, json } => show_statuses(&manager, &names, json)?,
        Commands::Install { service } => {
            let Some(manifest) = manifest else {
                return Err(format!("manifest '{}' not found", args.config).into());
            };

            let specs = match service {
                Some(name) => vec![manifest.spec(&name).ok_or_else(|| {
                    format!("service '{name}' is not declared in '{}'", args.config)
                })?],
                None => manifest.specs(),
            };

            if specs.is_empty() {
                info!("No services declared in '{}'", args.config);
            }

            for result in manager.install_all(&specs, &token)? {
                failed |= report(&result);
            }
        }
        Commands::Uninstall { name } => {
            failed = report(&manager.uninstall_if_exists(&name, &token)?);
        }
        Commands::Start { name, timeout } => {
            let timeout = parse_timeout(timeout.as_deref())?;
            failed = report(&manager.start(&name, timeout, &token)?);
        }
        Commands::Stop { name, timeout } => {
            let timeout = parse_timeout(timeout.as_deref())?;
            failed = report(&manager.stop(&name, timeout, &token)?);
        }
        Commands::Restart { name, timeout } => {
            let timeout = parse_timeout(timeout.as_deref())?;
            failed = report(&manager.restart(&name, timeout, &token)?);
        }
    }

    Ok(!failed)
}

fn init_logging(args: &Cli) {
    let filter = if let Some(level) = args.log_level {
        EnvFilter::default().add_directive(level.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// The manifest is only mandatory for `install`; other commands fall back to
/// default settings when it is absent.
fn load_optional_manifest(
    path: &str,
    command: &Commands,
) -> Result<Option<Manifest>, Box<dyn Error>> {
    if !Path::new(path).exists() && !matches!(command, Commands::Install { .. }) {
        debug!("manifest '{path}' not found; using default settings");
        return Ok(None);
    }

    Ok(Some(load_manifest(Some(path))?))
}

fn register_cancel_handler(token: &CancellationToken) {
    let token = token.clone();
    if let Err(err) = ctrlc::set_handler(move || {
        warn!("Interrupt received; canceling");
        token.cancel();
    }) {
        warn!("Failed to install Ctrl-C handler: {err}");
    }
}

fn parse_timeout(raw: Option<&str>) -> Result<Option<Duration>, Box<dyn Error>> {
    Ok(raw.map(parse_duration).transpose()?)
}

/// Prints the outcome and returns whether it failed.
fn report(result: &OpResult) -> bool {
    if result.is_success() {
        println!("{}", result.message());
        false
    } else {
        eprintln!("{result}");
        if let Some(cause) = result.failure_cause() {
            debug!("caused by: {cause}");
        }
        true
    }
}

fn show_statuses<A: ScmApi>(
    manager: &ServiceManager<A>,
    names: &[String],
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let mut rows = Vec::with_capacity(names.len());
    for name in names {
        let row = match manager.try_get(name)? {
            Some(info) => StatusRow {
                name: info.name,
                display_name: Some(info.display_name),
                description: info.description,
                status: info.status,
            },
            None => StatusRow {
                name: name.clone(),
                display_name: None,
                description: None,
                status: ServiceStatus::NotInstalled,
            },
        };
        rows.push(row);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let width = rows.iter().map(|row| row.name.len()).max().unwrap_or(0).max(4);
    println!("{:<width$}  {:<16}  DISPLAY NAME", "NAME", "STATE");
    for row in rows {
        let state: &str = row.status.as_ref();
        println!(
            "{:<width$}  {:<16}  {}",
            row.name,
            state,
            row.display_name.as_deref().unwrap_or("-")
        );
        if let Some(description) = row.description.filter(|d| !d.trim().is_empty()) {
            println!("{:<width$}  {description}", "");
        }
    }

    Ok(())
}
