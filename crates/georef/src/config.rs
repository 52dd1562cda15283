//! Configuration for the georeferencing engine.

use crate::error::{GeorefError, Result};
use crate::types::InterpolationMethod;
use geotiff::Compression;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Engine-wide settings. Per-warp choices live in [`crate::WarpOptions`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Kernel used to sample the source image.
    pub interpolation: InterpolationMethod,

    /// Output pixel size in degrees for geographic warps.
    /// `None` derives it from the GCP spacing.
    pub geographic_resolution_deg: Option<f64>,

    /// Output pixel size in meters for UTM warps.
    /// `None` derives it from the GCP spacing.
    pub utm_resolution_m: Option<f64>,

    /// Refuse warps whose output would exceed this many pixels.
    pub max_output_pixels: usize,

    /// GeoTIFF strip compression.
    pub compression: Compression,

    /// Resample output rows in parallel.
    pub parallel: bool,

    /// Newton iteration bound for the inverse mapping.
    pub max_newton_iterations: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interpolation: InterpolationMethod::Nearest,
            geographic_resolution_deg: None,
            utm_resolution_m: None,
            max_output_pixels: 400_000_000,
            compression: Compression::Deflate,
            parallel: true,
            max_newton_iterations: 20,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables. Unset variables keep
    /// their defaults; unparsable values are rejected.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build a configuration from a variable lookup (`MSUPROJ_*` names).
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(val) = lookup("MSUPROJ_INTERPOLATION") {
            config.interpolation = val.parse()?;
        }

        if let Some(val) = lookup("MSUPROJ_GEO_RESOLUTION") {
            config.geographic_resolution_deg = Some(parse_var("MSUPROJ_GEO_RESOLUTION", &val)?);
        }

        if let Some(val) = lookup("MSUPROJ_UTM_RESOLUTION") {
            config.utm_resolution_m = Some(parse_var("MSUPROJ_UTM_RESOLUTION", &val)?);
        }

        if let Some(val) = lookup("MSUPROJ_MAX_OUTPUT_PIXELS") {
            config.max_output_pixels = parse_var("MSUPROJ_MAX_OUTPUT_PIXELS", &val)?;
        }

        if let Some(val) = lookup("MSUPROJ_COMPRESSION") {
            config.compression = parse_compression(&val)?;
        }

        if let Some(val) = lookup("MSUPROJ_PARALLEL") {
            config.parallel = match val.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => {
                    return Err(GeorefError::InvalidConfig(format!(
                        "MSUPROJ_PARALLEL must be true or false, got '{}'",
                        val
                    )))
                }
            };
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file. Missing keys take defaults.
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(GeorefError::FileNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(&text)
            .map_err(|e| GeorefError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if let Some(res) = self.geographic_resolution_deg {
            if !(res.is_finite() && res > 0.0) {
                return Err(GeorefError::InvalidConfig(
                    "geographic_resolution_deg must be > 0".to_string(),
                ));
            }
        }

        if let Some(res) = self.utm_resolution_m {
            if !(res.is_finite() && res > 0.0) {
                return Err(GeorefError::InvalidConfig(
                    "utm_resolution_m must be > 0".to_string(),
                ));
            }
        }

        if self.max_output_pixels == 0 {
            return Err(GeorefError::InvalidConfig(
                "max_output_pixels must be > 0".to_string(),
            ));
        }

        if self.max_newton_iterations == 0 {
            return Err(GeorefError::InvalidConfig(
                "max_newton_iterations must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Parse a compression name, reporting unknown names as configuration errors.
pub fn parse_compression(s: &str) -> Result<Compression> {
    s.parse()
        .map_err(|e: geotiff::GeoTiffError| GeorefError::InvalidConfig(e.to_string()))
}

fn parse_var<T>(name: &str, val: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    val.trim()
        .parse()
        .map_err(|e| GeorefError::InvalidConfig(format!("{} = '{}': {}", name, val, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.interpolation, InterpolationMethod::Nearest);
        assert_eq!(config.compression, Compression::Deflate);
        assert_eq!(config.max_output_pixels, 400_000_000);
        assert!(config.parallel);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = EngineConfig {
            utm_resolution_m: Some(0.0),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig {
            geographic_resolution_deg: Some(f64::NAN),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig {
            max_newton_iterations: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(GeorefError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_yaml_partial() {
        let config: EngineConfig =
            serde_yaml::from_str("interpolation: bilinear\nutm_resolution_m: 250.0\n").unwrap();
        assert_eq!(config.interpolation, InterpolationMethod::Bilinear);
        assert_eq!(config.utm_resolution_m, Some(250.0));
        assert_eq!(config.max_newton_iterations, 20);
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| {
            pairs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        }
    }

    #[test]
    fn test_from_vars() {
        let config = EngineConfig::from_vars(vars(&[
            ("MSUPROJ_INTERPOLATION", "Cubic"),
            ("MSUPROJ_UTM_RESOLUTION", "500"),
            ("MSUPROJ_COMPRESSION", "none"),
            ("MSUPROJ_PARALLEL", "0"),
        ]))
        .unwrap();
        assert_eq!(config.interpolation, InterpolationMethod::Cubic);
        assert_eq!(config.utm_resolution_m, Some(500.0));
        assert_eq!(config.compression, Compression::None);
        assert!(!config.parallel);

        assert_eq!(EngineConfig::from_vars(vars(&[])).unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_from_vars_rejects_typos() {
        for bad in [
            ("MSUPROJ_COMPRESSION", "lzw"),
            ("MSUPROJ_INTERPOLATION", "bilnear"),
            ("MSUPROJ_GEO_RESOLUTION", "fine"),
            ("MSUPROJ_MAX_OUTPUT_PIXELS", "-5"),
            ("MSUPROJ_PARALLEL", "maybe"),
            ("MSUPROJ_UTM_RESOLUTION", "0"),
        ] {
            assert!(
                matches!(
                    EngineConfig::from_vars(vars(&[bad])),
                    Err(GeorefError::InvalidConfig(_))
                ),
                "{:?} accepted",
                bad
            );
        }
    }

    #[test]
    fn test_yaml_rejects_unknown_compression() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"compression: lzw\n").unwrap();
        assert!(matches!(
            EngineConfig::from_yaml(file.path()),
            Err(GeorefError::InvalidConfig(_))
        ));
    }
}
