use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use pixelbridge_core::{ColourOrder, ConfigManager, DeviceEvent, PixelBridge};

/// Art-Net and sACN bridge for pixel-addressable LED controllers.
#[derive(Parser, Debug)]
#[command(name = "pixelbridge")]
#[command(about = "Maps DMX universes onto pixel controller strips")]
struct Args {
    /// Path to the JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Order of the red, green and blue bytes in incoming pixels (e.g. GRB)
    #[arg(long, value_parser = parse_colour_order)]
    colour_order: Option<ColourOrder>,

    /// Start every strip on a fresh universe instead of filling universes
    #[arg(long)]
    no_pack: bool,

    /// Log packet statistics
    #[arg(short, long)]
    debug: bool,

    /// Disable the Art-Net listener
    #[arg(long)]
    no_artnet: bool,

    /// Disable the sACN listener
    #[arg(long)]
    no_sacn: bool,
}

fn parse_colour_order(s: &str) -> Result<ColourOrder, String> {
    s.parse().map_err(|e| format!("{}", e))
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = ConfigManager::new(args.config);
    let mut settings = config.load()?;
    log::info!("Loaded configuration from {}", config.config_path().display());

    if let Some(order) = args.colour_order {
        settings.colour_order = order.to_string();
    }
    if args.no_pack {
        settings.packing = false;
    }
    if args.debug {
        settings.debug = true;
    }
    if args.no_artnet {
        settings.artnet_enabled = false;
    }
    if args.no_sacn {
        settings.sacn_enabled = false;
    }
    ConfigManager::validate_settings(&settings)
        .map_err(|errors| anyhow::anyhow!(errors.join("; ")))?;

    let devices = settings.devices.clone();

    let mut bridge = PixelBridge::new(settings)?;
    bridge.initialize().await?;

    for device in &devices {
        let device = device.to_device().map_err(|e| anyhow::anyhow!(e))?;
        log::info!(
            "Adding configured device {} ({} strips of {} pixels)",
            device.id(),
            device.strip_count(),
            device.pixels_per_strip()
        );
        bridge.add_device(DeviceEvent::Added(Arc::new(device))).await?;
    }

    tokio::signal::ctrl_c().await?;
    log::info!("Interrupt received");

    bridge.shutdown().await?;
    Ok(())
}
