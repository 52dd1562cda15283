//! Persisting warped rasters as GeoTIFF.
//!
//! The file is written next to its destination under a temporary name and
//! renamed into place only after it has been fully written and synced, so
//! a failed or cancelled write never leaves a partial file at the
//! destination.

use crate::error::{GeorefError, Result};
use crate::types::OutputRaster;
use geotiff::{encode_geotiff, Compression, Georeference};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Writes [`OutputRaster`]s to disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputRasterWriter {
    compression: Compression,
}

impl OutputRasterWriter {
    pub fn new(compression: Compression) -> Self {
        Self { compression }
    }

    /// Encode a raster into GeoTIFF bytes.
    pub fn encode(&self, raster: &OutputRaster) -> Result<Vec<u8>> {
        let gt = raster.geotransform;
        let georef = Georeference {
            origin_x: gt.origin_x,
            origin_y: gt.origin_y,
            pixel_width: gt.pixel_width,
            pixel_height: gt.pixel_height,
            crs: raster.crs,
        };
        Ok(encode_geotiff(
            &raster.data,
            raster.width,
            raster.height,
            &georef,
            self.compression,
        )?)
    }

    /// Write a raster to `dest` atomically.
    pub fn write(&self, raster: OutputRaster, dest: &Path) -> Result<()> {
        self.write_cancellable(raster, dest, &AtomicBool::new(false))
    }

    /// Write a raster to `dest`, aborting before the rename if `cancel`
    /// has been set.
    pub fn write_cancellable(&self, raster: OutputRaster, dest: &Path, cancel: &AtomicBool) -> Result<()> {
        let bytes = self.encode(&raster)?;
        drop(raster);

        let dir = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        if dest.file_name().is_none() {
            return Err(GeorefError::write_failed(format!(
                "{} is not a file path",
                dest.display()
            )));
        }

        let fail = |stage: &str, e: std::io::Error| {
            GeorefError::write_failed(format!("{} {}: {}", stage, dest.display(), e))
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| fail("cannot create temporary file for", e))?;
        debug!(tmp = %tmp.path().display(), bytes = bytes.len(), "Writing temporary output");
        tmp.write_all(&bytes).map_err(|e| fail("cannot write", e))?;
        tmp.as_file().sync_all().map_err(|e| fail("cannot sync", e))?;

        if cancel.load(Ordering::Relaxed) {
            // Dropping the temporary file removes it
            return Err(GeorefError::Cancelled);
        }

        tmp.persist(dest).map_err(|e| fail("cannot rename into", e.error))?;
        info!(path = %dest.display(), bytes = bytes.len(), "Wrote GeoTIFF");
        Ok(())
    }
}
