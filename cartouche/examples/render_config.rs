//! This example renders a map described by a JSON configuration file into a PNG image.
//!
//! Run it with the path to the configuration and, optionally, the output path:
//!
//! ```shell
//! cargo run --example render_config -- ./cartouche/examples/data/north.json north.png
//! ```
//!
//! Add `--slippy z/x/y` to render a single web tile of the same layers instead of the extent
//! given in the configuration.

use anyhow::{anyhow, bail, Result};
use cartouche::{Map, MapConfig, TileConfig};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let Some(config_path) = args.next() else {
        bail!("This example must be run with the path to a map configuration file");
    };

    let mut output = "output_map.png".to_string();
    let mut slippy = None;
    while let Some(arg) = args.next() {
        if arg == "--slippy" {
            let tile = args
                .next()
                .ok_or_else(|| anyhow!("--slippy requires a z/x/y tile address"))?;
            slippy = Some(parse_tile(&tile)?);
        } else {
            output = arg;
        }
    }

    let mut config = MapConfig::open(&config_path)?;
    if let Some(tile) = slippy {
        // The tile sets the srs, size and bounds of the map.
        config.srs = None;
        config.width = None;
        config.height = None;
        config.bounds = None;
        config.slippy = Some(tile);
    }

    let mut map = Map::from_config(&config)?;
    log::info!(
        "Rendering {} layers into {}x{} image",
        map.layers().len(),
        map.width(),
        map.height()
    );

    map.render_to_png(&output)?;
    log::info!("Map saved to {output}");

    Ok(())
}

fn parse_tile(address: &str) -> Result<TileConfig> {
    let parts = address
        .split('/')
        .map(|part| part.parse::<u32>())
        .collect::<Result<Vec<_>, _>>()?;

    let [z, x, y] = parts[..] else {
        bail!("tile address must look like z/x/y, got '{address}'");
    };

    Ok(TileConfig { x, y, z })
}
