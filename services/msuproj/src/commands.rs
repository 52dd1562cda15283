//! Subcommand implementations.

use anyhow::{anyhow, Context, Result};
use georef::naming::{auto_output_path, find_gcp_for_image};
use georef::{Engine, EngineConfig, ProjectionMode, WarpEvent, WarpOptions};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::{load_engine_config, Overrides};

/// Arguments of the `warp` subcommand.
#[derive(Debug)]
pub struct WarpRequest {
    pub image: PathBuf,
    pub gcp: Option<PathBuf>,
    pub output: Option<String>,
    pub utm: bool,
    pub zeros_as_nodata: bool,
    pub config: Option<PathBuf>,
    pub overrides: Overrides,
}

fn resolve_gcp(image: &Path, gcp: Option<&Path>) -> Result<PathBuf> {
    match gcp {
        Some(path) => Ok(path.to_path_buf()),
        None => find_gcp_for_image(image)
            .ok_or_else(|| anyhow!("no GCP file found next to {}", image.display())),
    }
}

/// Load inputs into a fresh engine.
fn load_engine(config: EngineConfig, image: &Path, gcp: &Path) -> Result<Engine> {
    let engine = Engine::with_config(config)?;
    engine
        .set_source(image)
        .with_context(|| format!("Error loading image {}", image.display()))?;
    engine
        .load_gcp(gcp)
        .with_context(|| format!("Error loading GCPs file {}", gcp.display()))?;
    Ok(engine)
}

pub async fn warp(request: WarpRequest) -> Result<()> {
    let mode = ProjectionMode::from_use_utm(request.utm);
    let config = load_engine_config(request.config.as_deref(), mode, &request.overrides)?;
    let gcp = resolve_gcp(&request.image, request.gcp.as_deref())?;
    let engine = load_engine(config, &request.image, &gcp)?;

    let destination = match request.output {
        Some(out) => out,
        None => {
            let label = engine.utm_zone_label().unwrap_or_default();
            auto_output_path(&request.image, mode, &label)
                .to_string_lossy()
                .into_owned()
        }
    };
    let destination = engine.set_destination(&destination)?;

    engine.subscribe(|event| match event {
        WarpEvent::Started => info!("Transformation started"),
        WarpEvent::Finished(status) if status.is_success() => info!("{}", status.message),
        WarpEvent::Finished(status) => warn!(code = ?status.code, "{}", status.message),
    });

    // Ctrl-C cancels the warp; the destination is left untouched
    let canceller = engine.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            canceller.cancel();
        }
    });

    let report = engine
        .warp_async(WarpOptions::new(mode, request.zeros_as_nodata))
        .await?;

    println!("{}", destination.display());
    println!("  size:      {} x {}", report.width, report.height);
    println!("  crs:       {} ({})", report.crs, report.crs.citation());
    println!(
        "  origin:    {:.6}, {:.6}",
        report.geotransform.origin_x, report.geotransform.origin_y
    );
    println!("  pixel:     {:.9}", report.geotransform.pixel_width);
    println!(
        "  cells:     {} valid, {} nodata ({} unmapped)",
        report.valid_cells, report.nodata_cells, report.inverse_misses
    );
    Ok(())
}

pub fn info(image: &Path, gcp: Option<&Path>) -> Result<()> {
    let gcp = resolve_gcp(image, gcp)?;
    let engine = load_engine(EngineConfig::from_env()?, image, &gcp)?;

    println!("Input image:   {}", image.display());
    if let (Some(x), Some(y)) = (engine.source_x_size(), engine.source_y_size()) {
        println!("  size:        {} x {}", x, y);
    }
    println!("Input GCPs:    {}", gcp.display());
    if let (Some(x), Some(y), Some(xs), Some(ys)) = (
        engine.gcp_x_size(),
        engine.gcp_y_size(),
        engine.gcp_x_step(),
        engine.gcp_y_step(),
    ) {
        println!("  grid:        {} x {} nodes", x, y);
        println!("  steps:       {} x {} px", xs, ys);
    }
    if let Some(label) = engine.utm_zone_label() {
        println!("  UTM zone:    {}", label);
    }

    if let (Some(model), Some(x), Some(y)) =
        (engine.model(), engine.source_x_size(), engine.source_y_size())
    {
        let (max_row, max_col) = ((y - 1) as f64, (x - 1) as f64);
        for (name, row, col) in [
            ("upper left", 0.0, 0.0),
            ("upper right", 0.0, max_col),
            ("lower left", max_row, 0.0),
            ("lower right", max_row, max_col),
        ] {
            let (lat, lon) = model.pixel_to_geo(row, col);
            println!("  {:<12} {:>11.6}, {:>11.6}", format!("{}:", name), lat, lon);
        }
    }
    Ok(())
}

pub fn inspect(file: &Path) -> Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let (info, data) = geotiff::decode_geotiff(&bytes)
        .with_context(|| format!("parsing {}", file.display()))?;

    let valid = data.iter().filter(|v| !v.is_nan()).count();
    let crs = info
        .crs
        .map(|c| c.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    println!("{}", file.display());
    println!("  size:        {} x {}", info.width, info.height);
    println!("  crs:         {}", crs);
    if let Some(citation) = &info.citation {
        println!("  citation:    {}", citation);
    }
    println!("  origin:      {:.6}, {:.6}", info.origin().0, info.origin().1);
    println!("  far corner:  {:.6}, {:.6}", info.far_corner().0, info.far_corner().1);
    println!("  pixel size:  {:.9} x {:.9}", info.pixel_scale[0], info.pixel_scale[1]);
    println!("  compression: {}", compression_name(info.compression));
    println!("  nodata:      {}", info.nodata.as_deref().unwrap_or("none"));
    println!("  valid cells: {} of {}", valid, data.len());
    Ok(())
}

fn compression_name(code: u16) -> &'static str {
    match code {
        1 => "none",
        8 => "deflate",
        _ => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_gcp_prefers_explicit_path() {
        let explicit = PathBuf::from("/data/other.gcp");
        let resolved = resolve_gcp(Path::new("/data/pass.jpg"), Some(&explicit)).unwrap();
        assert_eq!(resolved, explicit);
    }

    #[test]
    fn test_resolve_gcp_discovers_sibling() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("pass.jpg");
        assert!(resolve_gcp(&image, None).is_err());

        std::fs::write(dir.path().join("pass.gcp"), "").unwrap();
        assert_eq!(resolve_gcp(&image, None).unwrap(), dir.path().join("pass.gcp"));
    }

    #[test]
    fn test_compression_name() {
        assert_eq!(compression_name(1), "none");
        assert_eq!(compression_name(8), "deflate");
        assert_eq!(compression_name(5), "other");
    }
}
