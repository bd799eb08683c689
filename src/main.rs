//! Pi-cam-settings binary for inspecting cameras and their settings.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use pi_cam_settings::{
    CameraSession, CharacteristicsResolver, Config, CoreSetting, DeviceRegistry, Facing,
    NoExtraSettings, SettingsCache, TomlStore, V4L2Hardware,
};
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "pi-cam-settings")]
#[command(about = "Inspect camera capabilities and resolved camera settings")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "pi-cam-settings.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); `RUST_LOG` takes precedence
    #[arg(short, long, default_value = "info")]
    log_level: Level,

    /// Camera facing to activate (front or back)
    #[arg(short, long)]
    facing: Option<Facing>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.to_string()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::load(&args.config)?;
    let hardware = V4L2Hardware::new(config.facing_overrides.clone());

    let registry = match DeviceRegistry::build(&hardware) {
        Ok(registry) => registry,
        Err(err) => {
            warn!(error = %err, "Camera enumeration failed");
            println!("No camera available");
            return Ok(());
        }
    };

    for device in registry.devices() {
        println!(
            "video{}: {} ({}) [{}] facing {}",
            device.index, device.card, device.driver, device.bus_info, device.facing
        );
    }

    let facing = args.facing.unwrap_or(config.default_facing);
    let facing = if registry.has_facing(facing) {
        facing
    } else if let Some(other) = Facing::ALL.into_iter().find(|f| registry.has_facing(*f)) {
        info!(requested = %facing, using = %other, "Requested facing unavailable");
        other
    } else {
        println!("No camera available");
        return Ok(());
    };

    let store = TomlStore::open(&config.settings_path)?;
    let settings = SettingsCache::new(Box::new(store), Box::new(NoExtraSettings));
    let mut session = CameraSession::new(CharacteristicsResolver::new(hardware, registry), settings);

    let characteristics = session.switch_to(facing)?;
    println!();
    println!("Active camera: video{} ({facing})", characteristics.device().index);
    let formats: Vec<String> = characteristics
        .pixel_formats()
        .iter()
        .map(ToString::to_string)
        .collect();
    println!("  Formats: {}", formats.join(", "));
    if let Some(size) = characteristics.largest_picture_size() {
        println!("  Largest picture size: {size}");
    }
    if let Some(range) = characteristics.exposure_range() {
        println!("  Exposure compensation: {}..={}", range.start(), range.end());
    }
    println!("  Focus modes: {}", characteristics.focus_modes().join(", "));

    println!();
    println!("Settings:");
    for setting in CoreSetting::ALL {
        if let Some(value) = session.settings().value(setting.id()) {
            println!("  {:<44} {value}", setting.key());
        }
    }

    Ok(())
}
