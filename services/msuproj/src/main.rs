//! Command-line georeferencing of MSU-MR sensor imagery.
//!
//! Warps a raw sensor image into a GeoTIFF (WGS84 or UTM) using the
//! image's ground control point grid.

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "msuproj")]
#[command(about = "GCP-based georeferencing of satellite sensor images")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Warp an image into a georeferenced GeoTIFF
    Warp {
        /// Input image
        #[arg(short, long)]
        image: PathBuf,

        /// GCP file (default: <image>.gcp or <image-prefix>.gcp)
        #[arg(short, long)]
        gcp: Option<PathBuf>,

        /// Output file (default: <image-prefix>_proj.tif or <image-prefix>_<zone>.tif)
        #[arg(short, long)]
        output: Option<String>,

        /// Project to UTM instead of geographic coordinates
        #[arg(long)]
        utm: bool,

        /// Treat zero intensities as nodata
        #[arg(long)]
        zeros_as_nodata: bool,

        /// Engine configuration file (YAML)
        #[arg(short, long, env = "MSUPROJ_CONFIG")]
        config: Option<PathBuf>,

        /// Resampling kernel: nearest, bilinear or cubic
        #[arg(long)]
        interpolation: Option<String>,

        /// Output pixel size (degrees for geographic, meters for UTM)
        #[arg(long)]
        resolution: Option<f64>,

        /// GeoTIFF compression: none or deflate
        #[arg(long)]
        compression: Option<String>,

        /// Resample on a single thread
        #[arg(long)]
        sequential: bool,
    },

    /// Print image and GCP grid attributes
    Info {
        /// Input image
        #[arg(short, long)]
        image: PathBuf,

        /// GCP file (default: <image>.gcp or <image-prefix>.gcp)
        #[arg(short, long)]
        gcp: Option<PathBuf>,
    },

    /// Print the georeferencing of a GeoTIFF written by msuproj
    Inspect {
        /// GeoTIFF file
        file: PathBuf,
    },
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(&args.log_level, args.json)?;

    match args.command {
        Command::Warp {
            image,
            gcp,
            output,
            utm,
            zeros_as_nodata,
            config,
            interpolation,
            resolution,
            compression,
            sequential,
        } => {
            let request = commands::WarpRequest {
                image,
                gcp,
                output,
                utm,
                zeros_as_nodata,
                config,
                overrides: config::Overrides {
                    interpolation,
                    resolution,
                    compression,
                    sequential,
                },
            };
            commands::warp(request).await
        }
        Command::Info { image, gcp } => commands::info(&image, gcp.as_deref()),
        Command::Inspect { file } => commands::inspect(&file),
    }
}
