//! On-disk fixtures: an image and its GCP file in a temporary directory.

use crate::generators::{create_test_image, GcpGridSpec};
use image::GrayImage;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Scenario pass: 1000x800 image, 5x4 grid (x step 250, y step 200),
/// inside UTM zone 37N.
pub fn scenario_pass() -> GcpGridSpec {
    GcpGridSpec::north_up(4, 5, 200, 250, (56.0, 37.5), (0.0015, 0.002)).with_skew(0.0001, 0.0002)
}

/// Small skewed pass used for quick end-to-end tests (120x100 image).
pub fn small_pass() -> GcpGridSpec {
    GcpGridSpec::north_up(3, 4, 50, 40, (55.0, 38.0), (0.004, 0.006)).with_skew(0.0005, 0.001)
}

/// Image + GCP file pair living in a temporary directory.
///
/// The directory is removed when the dataset is dropped.
pub struct TestDataset {
    pub dir: TempDir,
    pub image: PathBuf,
    pub gcp: PathBuf,
    pub spec: GcpGridSpec,
    pub width: usize,
    pub height: usize,
}

impl TestDataset {
    /// Write `pass.png` with the standard test pattern and `pass.gcp`.
    pub fn new(spec: GcpGridSpec, width: usize, height: usize) -> Self {
        Self::with_pixels(spec, width, height, create_test_image(width, height))
    }

    /// Write `pass.png` from explicit 8-bit pixels and `pass.gcp`.
    pub fn with_pixels(spec: GcpGridSpec, width: usize, height: usize, pixels: Vec<u8>) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let image = dir.path().join("pass.png");
        let gcp = dir.path().join("pass.gcp");

        write_gray_png(&image, width, height, pixels);
        std::fs::write(&gcp, spec.to_gcp_text()).expect("write GCP file");

        Self {
            dir,
            image,
            gcp,
            spec,
            width,
            height,
        }
    }

    /// Path inside the fixture directory.
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write an extra text file into the fixture directory.
    pub fn write_text(&self, name: &str, text: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, text).expect("write fixture file");
        path
    }
}

/// Write an 8-bit grayscale PNG.
pub fn write_gray_png(path: &Path, width: usize, height: usize, pixels: Vec<u8>) {
    let img = GrayImage::from_raw(width as u32, height as u32, pixels).expect("pixel count matches size");
    img.save(path).expect("write PNG");
}
