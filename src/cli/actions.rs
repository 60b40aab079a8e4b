use anyhow::{anyhow, Context, Result};
use clap::ArgMatches;
use serde::Serialize;
use std::sync::Arc;

use super::config::MastervoltConfig;
use crate::{
    api::modbus::{send_command, MastervoltBuilder, MastervoltClient, MastervoltPoller},
    core::MastervoltError,
    protocol::mastervolt::{DeviceAddress, TransactionOutcome},
};

#[derive(Serialize)]
struct ReadResult {
    address: DeviceAddress,
    value: f32,
}

#[derive(Serialize)]
struct WriteResult {
    address: DeviceAddress,
    value: f32,
    acknowledged: bool,
}

/// Dispatch the selected subcommand.
pub async fn run(matches: &ArgMatches) -> Result<()> {
    let want_json = matches.get_flag("json");

    match matches.subcommand() {
        Some(("list-ports", _)) => {
            list_ports(want_json);
            Ok(())
        }
        Some(("read", sub)) => handle_read(sub, want_json).await,
        Some(("write", sub)) => handle_write(sub, want_json).await,
        Some(("run", sub)) => handle_run(sub, want_json).await,
        Some(("send", sub)) => handle_send(sub).await,
        Some((other, _)) => Err(anyhow!("Unknown command: {other}")),
        None => Err(anyhow!("No command given, see --help")),
    }
}

fn list_ports(want_json: bool) {
    let ports = crate::utils::enumerate_ports();

    if want_json {
        match serde_json::to_string_pretty(&ports) {
            Ok(s) => println!("{s}"),
            Err(err) => log::error!("Failed to serialize port list: {}", err),
        }
    } else {
        for port in ports {
            println!("{}", port.port_name);
        }
    }
}

fn address_from_matches(matches: &ArgMatches) -> Result<DeviceAddress> {
    let field = |name: &str| {
        matches
            .get_one::<u32>(name)
            .copied()
            .ok_or_else(|| MastervoltError::Config(format!("missing {name}")))
    };
    Ok(DeviceAddress::new(
        field("idal")?,
        field("idb")?,
        field("tab")?,
        field("var")?,
    ))
}

async fn client_from_matches(matches: &ArgMatches) -> Result<MastervoltClient> {
    let mut builder = MastervoltBuilder::new();
    if let Some(address) = matches.get_one::<String>("tcp") {
        builder = builder.with_tcp(address);
    } else if let Some(port) = matches.get_one::<String>("port") {
        let baud_rate = matches.get_one::<u32>("baud-rate").copied().unwrap_or(9600);
        builder = builder.with_serial(port, baud_rate);
    }
    if let Some(unit_id) = matches.get_one::<u8>("unit-id") {
        builder = builder.with_unit_id(*unit_id);
    }
    if let Some(timeout_ms) = matches.get_one::<u64>("timeout-ms") {
        builder = builder.with_timeout(*timeout_ms);
    }
    builder.connect().await
}

async fn handle_read(matches: &ArgMatches, want_json: bool) -> Result<()> {
    let address = address_from_matches(matches)?;
    let client = client_from_matches(matches).await?;

    let value = client
        .read_variable(&address)
        .await
        .map_err(MastervoltError::from)
        .with_context(|| format!("Failed to read {address}"))?;

    if want_json {
        println!("{}", serde_json::to_string(&ReadResult { address, value })?);
    } else {
        println!("{value}");
    }
    Ok(())
}

async fn handle_write(matches: &ArgMatches, want_json: bool) -> Result<()> {
    let address = address_from_matches(matches)?;
    let value = matches
        .get_one::<f32>("value")
        .copied()
        .ok_or_else(|| anyhow!("--value is required"))?;
    let client = client_from_matches(matches).await?;

    let outcome = client.write_variable(&address, value).await;
    let acknowledged = outcome.is_ok();

    if want_json {
        println!(
            "{}",
            serde_json::to_string(&WriteResult {
                address,
                value,
                acknowledged,
            })?
        );
    }

    match outcome {
        TransactionOutcome::Ok(_) => {
            log::info!("Wrote {} to {}", value, address);
            Ok(())
        }
        TransactionOutcome::ModbusError(err) => {
            Err(MastervoltError::from(err)).with_context(|| format!("Failed to write {address}"))
        }
        TransactionOutcome::InsufficientData { expected, received } => Err(anyhow!(
            "Write to {address} returned {received} of {expected} registers"
        )),
    }
}

async fn handle_run(matches: &ArgMatches, want_json: bool) -> Result<()> {
    let config = load_config(matches)?;
    let store = config.build_store();
    if store.is_empty() {
        return Err(anyhow!("No valid variables in configuration"));
    }

    let client = Arc::new(
        MastervoltBuilder::from_config(config.connection.clone())
            .connect()
            .await?,
    );
    let poller = MastervoltPoller::spawn(client, store);

    loop {
        tokio::select! {
            update = poller.recv() => match update {
                Some(update) => {
                    if want_json {
                        match serde_json::to_string(&update) {
                            Ok(line) => println!("{line}"),
                            Err(err) => log::warn!("Failed to serialize update: {}", err),
                        }
                    } else {
                        println!(
                            "{} = {}{}",
                            update.name,
                            update.value,
                            update
                                .unit_of_measurement
                                .as_deref()
                                .map(|unit| format!(" {unit}"))
                                .unwrap_or_default()
                        );
                    }
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted, stopping poll loop");
                break;
            }
        }
    }

    poller.shutdown().await
}

async fn handle_send(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    let target = matches
        .get_one::<String>("target")
        .ok_or_else(|| anyhow!("--target is required"))?;

    let store = config.build_store();
    let registry = store.registry();
    let value = match matches.get_one::<f32>("value") {
        Some(value) => *value,
        None => store
            .get(target)
            .map(|entity| entity.default_value)
            .ok_or_else(|| MastervoltError::TargetResolution(target.clone()))?,
    };

    let client = MastervoltBuilder::from_config(config.connection.clone())
        .connect()
        .await?;
    send_command(&client, &registry, target, value)
        .await
        .with_context(|| format!("Command to {target} failed"))
}

fn load_config(matches: &ArgMatches) -> Result<MastervoltConfig> {
    let path = matches
        .get_one::<String>("config")
        .ok_or_else(|| anyhow!("--config is required"))?;
    MastervoltConfig::from_file(path)
}
