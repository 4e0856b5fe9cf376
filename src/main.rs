use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn, LevelFilter};
use std::fs;
use std::thread;
use std::time::Duration;

use techlife_led::{Config, DeviceController, DryRunTransport, MqttTransport, Transport};

/// Give the event loop time to flush queued frames before disconnecting
const FLUSH_DELAY: Duration = Duration::from_millis(200);

#[derive(Parser)]
#[command(name = "techlife_ctl")]
#[command(about = "Techlife LED controller\n\nSends control frames to a Techlife LED strip over MQTT.", long_about = None)]
struct Cli {
    /// Path to configuration file (JSON)
    config: String,

    /// Enable debug output (each command sent)
    #[arg(long)]
    debug: bool,

    /// Enable detailed debug (hex dumps every frame)
    #[arg(long)]
    ddebug: bool,

    /// Log frames instead of publishing them
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Turn the strip on
    On,
    /// Turn the strip off
    Off,
    /// Show a static color (hex, CSS name, rgb(r, g, b) or hsl(h, s%, l%))
    Color { color: String },
    /// Set brightness in percent and re-apply the current color
    Brightness {
        #[arg(allow_negative_numbers = true)]
        percent: i64,
    },
    /// Start the built-in animation
    Animate {
        /// Speed dial, 1..=100
        #[arg(long, allow_negative_numbers = true)]
        speed: Option<i64>,
    },
    /// Stop animating and show the static color
    Static,
    /// Ask the device to refresh its state
    Update,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ddebug implies debug
    let level = if cli.ddebug {
        LevelFilter::Trace
    } else if cli.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    // Load configuration
    let config_data = fs::read_to_string(&cli.config)
        .context(format!("Failed to read config {}", cli.config))?;
    let config = Config::from_json(&config_data)
        .context(format!("Failed to parse config {}", cli.config))?;
    anyhow::ensure!(
        config.device.qos <= 2,
        "Invalid qos {} in {} (expected 0, 1 or 2)",
        config.device.qos,
        cli.config
    );

    let topic = config.device.topic();

    if cli.dry_run {
        let mut controller = DeviceController::new(DryRunTransport::new(), topic, config.device.qos);
        return run_session(&mut controller, &cli.action);
    }

    let transport = MqttTransport::new(&config.mqtt);
    let mut controller = DeviceController::new(transport, topic, config.device.qos);

    controller.connect().context(format!(
        "Failed to connect to MQTT broker {}:{}",
        config.mqtt.host, config.mqtt.port
    ))?;

    let result = perform(&mut controller, &cli.action);

    thread::sleep(FLUSH_DELAY);
    let closed = controller.close().context("Failed to disconnect");

    finish(result, closed)
}

/// Connect, perform one action, close
fn run_session<T: Transport>(controller: &mut DeviceController<T>, action: &Action) -> Result<()> {
    controller.connect()?;
    let result = perform(controller, action);
    let closed = controller.close().context("Failed to disconnect");
    finish(result, closed)
}

/// The action's own error wins over a close error, which is then only logged
fn finish(result: Result<()>, closed: Result<()>) -> Result<()> {
    match (result, closed) {
        (Err(e), Err(close_err)) => {
            warn!("ctl: {:#}", close_err);
            Err(e)
        }
        (result, closed) => result.and(closed),
    }
}

fn describe(action: &Action, topic: &str) -> String {
    format!("ctl: {:?} -> {}", action, topic)
}

fn perform<T: Transport>(controller: &mut DeviceController<T>, action: &Action) -> Result<()> {
    info!("{}", describe(action, controller.topic()));

    match action {
        Action::On => controller.power_on()?,
        Action::Off => controller.power_off()?,
        Action::Color { color } => controller.set_color(color.as_str())?,
        Action::Brightness { percent } => controller.set_brightness(*percent)?,
        Action::Animate { speed } => {
            if let Some(speed) = speed {
                controller.set_animation_speed(*speed);
            }
            controller.animate(true)?
        }
        Action::Static => controller.animate(false)?,
        Action::Update => controller.request_update()?,
    }

    Ok(())
}
