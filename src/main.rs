//! CLI Entry Point for rgb_light
//!
//! Provides command-line access to:
//! - Port discovery for the configured hardware identifier
//! - Listing USB serial ports with their identifiers
//! - A demo session against the simulated light
//! - Printing the effective configuration
//!
//! # Usage
//!
//! Locate the light:
//! ```bash
//! rgb_light locate
//! ```
//!
//! Run the demo session:
//! ```bash
//! rgb_light --log-level debug demo --blink-ms 250 --color 4
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rgb_light::capabilities::{LightAlarm, LightColor};
use rgb_light::config::{LightConfig, DEFAULT_CONFIG_PATH};
use rgb_light::health::HealthLevel;
use rgb_light::logging::{self, LoggingConfig};
use rgb_light::mapper;
use rgb_light::mock::{MockConnector, MockLight};
use rgb_light::port_locator::{FixedPort, PortLocator};
use rgb_light::session::{LightRequest, LightSession};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "rgb_light")]
#[command(about = "RGB indicator light session controller", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the configured log level
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the serial port of the configured light
    Locate {
        /// USB vendor id (hex), overrides the configuration
        #[arg(long)]
        vendor: Option<String>,

        /// USB product id (hex), overrides the configuration
        #[arg(long)]
        product: Option<String>,
    },

    /// List USB serial ports with their VID/PID
    Ports,

    /// Print the effective configuration
    Config,

    /// Run a session against the simulated light
    Demo {
        /// Blink on/off time in milliseconds
        #[arg(long, default_value = "500")]
        blink_ms: u32,

        /// How long to keep the light blinking
        #[arg(long, default_value = "2000")]
        run_ms: u64,

        /// Raw host color code to blink
        #[arg(long, default_value = "2")]
        color: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = LightConfig::load_from(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(level) = cli.log_level {
        config.application.log_level = level;
    }
    config.validate()?;
    logging::init(LoggingConfig::from_config(&config)?)?;

    match cli.command {
        Commands::Locate { vendor, product } => {
            if let Some(vendor) = vendor {
                config.device.vendor_id = vendor;
            }
            if let Some(product) = product {
                config.device.product_id = product;
            }
            locate(&config)
        }
        Commands::Ports => list_ports(),
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Commands::Demo {
            blink_ms,
            run_ms,
            color,
        } => demo(&config, blink_ms, run_ms, color).await,
    }
}

fn locate(config: &LightConfig) -> Result<()> {
    let id = config.hardware_id()?;
    let port = system_locator(config)?.locate(&id)?;
    println!("{} -> {}", id, port);
    Ok(())
}

#[cfg(feature = "instrument_serial")]
fn system_locator(config: &LightConfig) -> Result<Box<dyn PortLocator>> {
    use rgb_light::port_locator::{IndexPortLocator, SerialportIndex};

    Ok(match &config.device.port {
        Some(port) => Box::new(FixedPort(port.clone())),
        None => Box::new(IndexPortLocator::new(SerialportIndex)),
    })
}

#[cfg(not(feature = "instrument_serial"))]
fn system_locator(config: &LightConfig) -> Result<Box<dyn PortLocator>> {
    config
        .device
        .port
        .clone()
        .map(|port| Box::new(FixedPort(port)) as Box<dyn PortLocator>)
        .context("port discovery requires the 'instrument_serial' feature; set device.port")
}

#[cfg(feature = "instrument_serial")]
fn list_ports() -> Result<()> {
    use rgb_light::capabilities::format_vid_pid;
    use serialport::SerialPortType;

    let ports = serialport::available_ports().context("enumerating serial ports")?;
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        match port.port_type {
            SerialPortType::UsbPort(info) => println!(
                "{:<16} {} {}",
                port.port_name,
                format_vid_pid(info.vid, info.pid),
                info.product.unwrap_or_default()
            ),
            _ => println!("{:<16} (not USB)", port.port_name),
        }
    }
    Ok(())
}

#[cfg(not(feature = "instrument_serial"))]
fn list_ports() -> Result<()> {
    anyhow::bail!("port listing requires the 'instrument_serial' feature")
}

async fn demo(config: &LightConfig, blink_ms: u32, run_ms: u64, color: u32) -> Result<()> {
    let light = MockLight::new();
    let port = config.device.port.clone().unwrap_or_else(|| "SIM0".to_string());
    let mut session = LightSession::new(
        config.session_config()?,
        Arc::new(FixedPort(port)),
        Arc::new(MockConnector::new(light.clone())),
    );

    session.claim(config.claim_timeout()).await?;
    println!("Claimed simulated light on {}", session.port_name().unwrap_or("?"));

    session
        .switch_on(LightRequest::new(1, LightColor::Primary))
        .await?;
    println!("Steady: {}", light.color());

    let blink = i32::try_from(blink_ms).context("blink time out of range")?;
    println!(
        "Color code {:#x} maps to {}",
        color,
        mapper::device_color_for_code(color)
    );
    session
        .switch_on(LightRequest::raw(1, blink, blink, color, LightAlarm::None.code()))
        .await?;
    println!("Blinking {} for {} ms", light.color(), run_ms);
    tokio::time::sleep(Duration::from_millis(run_ms)).await;

    let status = session.check_health(HealthLevel::Internal).await?;
    println!("{}", status);

    session.switch_off(1).await?;
    session.release().await;

    println!("Device command log:");
    let start = light.history().first().map(|r| r.at);
    for record in light.history() {
        let offset = start.map(|s| record.at - s).unwrap_or_default();
        println!("  {:>6} ms  {:?}", offset.as_millis(), record.command);
    }
    println!("Released, light is {}", light.color());
    Ok(())
}
