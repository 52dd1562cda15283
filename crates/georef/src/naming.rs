//! File naming conventions around a source image.

use crate::error::{GeorefError, Result};
use crate::types::ProjectionMode;
use std::path::{Path, PathBuf};

/// Image path without its extension.
fn prefix(image: &Path) -> PathBuf {
    image.with_extension("")
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

/// Locate the GCP file for an image: `<image>.gcp`, then
/// `<image-without-extension>.gcp`.
pub fn find_gcp_for_image(image: &Path) -> Option<PathBuf> {
    [with_suffix(image, ".gcp"), with_suffix(&prefix(image), ".gcp")]
        .into_iter()
        .find(|candidate| candidate.is_file())
}

/// Default output path for an image: `<prefix>_proj.tif` for geographic
/// output, `<prefix>_<zone>.tif` for UTM. Existing files are never reused;
/// `_1`, `_2`, ... is appended until the name is free.
pub fn auto_output_path(image: &Path, mode: ProjectionMode, utm_zone_label: &str) -> PathBuf {
    let base = match mode {
        ProjectionMode::Geographic => with_suffix(&prefix(image), "_proj"),
        ProjectionMode::Utm => with_suffix(&prefix(image), &format!("_{}", utm_zone_label)),
    };

    let candidate = with_suffix(&base, ".tif");
    if !candidate.exists() {
        return candidate;
    }
    (1u32..)
        .map(|n| with_suffix(&base, &format!("_{}.tif", n)))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

/// Clean up a user-supplied destination: strip trailing separators and
/// make sure the name ends in `.tif`.
pub fn normalize_destination(dest: &str) -> Result<PathBuf> {
    let trimmed = dest.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() {
        return Err(GeorefError::write_failed("output file name is empty"));
    }
    if trimmed.to_lowercase().ends_with(".tif") {
        Ok(PathBuf::from(trimmed))
    } else {
        Ok(PathBuf::from(format!("{}.tif", trimmed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_destination() {
        assert_eq!(normalize_destination("out").unwrap(), PathBuf::from("out.tif"));
        assert_eq!(normalize_destination("out.tif").unwrap(), PathBuf::from("out.tif"));
        assert_eq!(normalize_destination("dir/out.TIF").unwrap(), PathBuf::from("dir/out.TIF"));
        assert_eq!(normalize_destination("dir/out//").unwrap(), PathBuf::from("dir/out.tif"));
        // Only a suffix counts, not ".tif" anywhere in the name
        assert_eq!(
            normalize_destination("scene.tif.bak").unwrap(),
            PathBuf::from("scene.tif.bak.tif")
        );
        assert!(matches!(
            normalize_destination("///"),
            Err(GeorefError::WriteFailed(_))
        ));
    }

    #[test]
    fn test_auto_output_path_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("pass.jpg");
        assert_eq!(
            auto_output_path(&image, ProjectionMode::Geographic, "37N"),
            dir.path().join("pass_proj.tif")
        );
        assert_eq!(
            auto_output_path(&image, ProjectionMode::Utm, "37N"),
            dir.path().join("pass_37N.tif")
        );
    }

    #[test]
    fn test_auto_output_path_skips_existing() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("pass.jpg");
        std::fs::write(dir.path().join("pass_proj.tif"), b"x").unwrap();
        std::fs::write(dir.path().join("pass_proj_1.tif"), b"x").unwrap();
        assert_eq!(
            auto_output_path(&image, ProjectionMode::Geographic, ""),
            dir.path().join("pass_proj_2.tif")
        );
    }

    #[test]
    fn test_find_gcp_prefers_full_name() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("pass.jpg");
        assert!(find_gcp_for_image(&image).is_none());

        std::fs::write(dir.path().join("pass.gcp"), b"").unwrap();
        assert_eq!(find_gcp_for_image(&image), Some(dir.path().join("pass.gcp")));

        std::fs::write(dir.path().join("pass.jpg.gcp"), b"").unwrap();
        assert_eq!(find_gcp_for_image(&image), Some(dir.path().join("pass.jpg.gcp")));
    }
}
