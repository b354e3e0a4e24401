//! Command-line surface of the bridge
//! This module defines the commands a user can run and drives the session
//! manager for each of them.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::warn;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::BridgeConfig;
use crate::core::bluetooth::{BleError, DeviceInfo, SessionEvent, SessionManager};
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "smart-lamp-bridge")]
#[command(about = "Discover and toggle an ESP32 BLE smart lamp", version)]
pub struct Cli {
    /// Path to a JSON config file overriding the built-in defaults
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Only select devices whose name contains this fragment
    #[arg(short, long, value_name = "NAME")]
    pub device: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Discover a matching device and list everything seen so far
    Scan,
    /// Connect, switch the lamp on, and disconnect
    On,
    /// Connect, switch the lamp off, and disconnect
    Off,
    /// Connect and drive the lamp interactively
    Control,
}

pub async fn run(cli: Cli) -> Result<()> {
    let mut config = BridgeConfig::load(cli.config.as_deref()).await?;
    if cli.device.is_some() {
        config.device_name = cli.device.clone();
    }

    let (state, events) = AppState::new(&config).await?;
    match cli.command {
        Command::Scan => scan(&state, events).await,
        Command::On => set_once(&state, events, true).await,
        Command::Off => set_once(&state, events, false).await,
        Command::Control => control(&state, events).await,
    }
}

/// Runs a discovery that Ctrl-C cancels instead of killing the process.
async fn discover_with_cancel(manager: Arc<SessionManager>) -> Result<DeviceInfo, BleError> {
    let watcher = tokio::spawn({
        let manager = manager.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                manager.cancel_discovery();
            }
        }
    });
    let result = manager.discover().await;
    watcher.abort();
    result
}

/// Mirrors session events onto the terminal.
fn spawn_event_printer(mut events: mpsc::UnboundedReceiver<SessionEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::DeviceSelected(info) => {
                    println!("* selected {}", info.display_name());
                }
                SessionEvent::Connected(info) => {
                    println!("* connected to {}", info.display_name());
                }
                SessionEvent::Disconnected => println!("* disconnected"),
                SessionEvent::ServicesDiscovered(summary) => {
                    for (service, chars) in &summary {
                        println!("* service {service}: {} characteristic(s)", chars.len());
                    }
                }
            }
        }
    })
}

async fn scan(state: &AppState, events: mpsc::UnboundedReceiver<SessionEvent>) -> Result<()> {
    let _printer = spawn_event_printer(events);
    let manager = state.manager().clone();

    let result = discover_with_cancel(manager.clone()).await;

    let devices = manager.known_devices();
    if devices.is_empty() {
        println!("no devices discovered");
    } else {
        println!("{} device(s) discovered:", devices.len());
        for device in devices {
            let address = device.address.as_deref().unwrap_or("n/a").to_string();
            let rssi = device
                .rssi
                .map(|r| format!("{r} dBm"))
                .unwrap_or_else(|| "n/a".to_string());
            println!(
                "  {}  id: {}  address: {}  rssi: {}",
                device.display_name(),
                device.id,
                address,
                rssi
            );
        }
    }
    result.map(|_| ()).map_err(Into::into)
}

/// One-shot flow: discover, connect, send a single command, disconnect.
async fn set_once(
    state: &AppState,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    on: bool,
) -> Result<()> {
    let _printer = spawn_event_printer(events);
    let manager = state.manager().clone();

    let device = discover_with_cancel(manager.clone()).await?;
    manager.connect(&device.id).await?;

    let ok = state.lamp().set_power(on).await;
    if ok {
        println!("lamp is now {}", if on { "ON" } else { "OFF" });
    }
    manager.disconnect().await;

    if ok {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "lamp command failed: {}",
            manager
                .last_error()
                .unwrap_or_else(|| "unknown error".to_string())
        ))
    }
}

async fn control(state: &AppState, events: mpsc::UnboundedReceiver<SessionEvent>) -> Result<()> {
    let _printer = spawn_event_printer(events);
    let manager = state.manager().clone();

    let device = discover_with_cancel(manager.clone()).await?;
    manager.connect(&device.id).await?;

    let mut lamp_on = false;
    let mut color = LampColor::Red;
    println!("commands: on | off | toggle | color <red|green|blue> | status | quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(err) => {
                        warn!("stdin closed: {err}");
                        break;
                    }
                };
                let mut parts = line.split_whitespace();
                match parts.next() {
                    Some("on") => apply_power(state, &manager, true, &mut lamp_on, color).await,
                    Some("off") => apply_power(state, &manager, false, &mut lamp_on, color).await,
                    Some("toggle") => {
                        let target = !lamp_on;
                        apply_power(state, &manager, target, &mut lamp_on, color).await;
                    }
                    Some("color") => match parts.next().and_then(LampColor::parse) {
                        Some(picked) => {
                            color = picked;
                            println!("lamp color set to {color}");
                        }
                        None => println!("usage: color <red|green|blue>"),
                    },
                    Some("status") => println!(
                        "session: {} | lamp: {} | color: {color}",
                        manager.status(),
                        if lamp_on { "ON" } else { "OFF" }
                    ),
                    Some("quit") | Some("exit") => break,
                    Some(other) => println!("unknown command: {other}"),
                    None => {}
                }
            }
        }
    }

    manager.disconnect().await;
    Ok(())
}

async fn apply_power(
    state: &AppState,
    manager: &SessionManager,
    target: bool,
    lamp_on: &mut bool,
    color: LampColor,
) {
    if state.lamp().set_power(target).await {
        *lamp_on = target;
        if target {
            println!("lamp is ON ({color})");
        } else {
            println!("lamp is OFF");
        }
    } else {
        println!(
            "lamp command failed: {}",
            manager
                .last_error()
                .unwrap_or_else(|| "unknown error".to_string())
        );
    }
}

/// Cosmetic color selection for the terminal display. Nothing about it goes
/// over the air; the firmware only understands on and off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LampColor {
    Red,
    Green,
    Blue,
}

impl LampColor {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "red" => Some(Self::Red),
            "green" => Some(Self::Green),
            "blue" => Some(Self::Blue),
            _ => None,
        }
    }
}

impl fmt::Display for LampColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Red => f.write_str("red"),
            Self::Green => f.write_str("green"),
            Self::Blue => f.write_str("blue"),
        }
    }
}
