//! Engine configuration assembled from file, environment and flags.

use anyhow::{Context, Result};
use georef::config::parse_compression;
use georef::{EngineConfig, ProjectionMode};
use std::path::Path;

/// Command-line overrides applied on top of file/environment settings.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub interpolation: Option<String>,
    pub resolution: Option<f64>,
    pub compression: Option<String>,
    pub sequential: bool,
}

/// Build the engine configuration.
///
/// The base comes from the YAML file when one is given, otherwise from the
/// `MSUPROJ_*` environment; command-line flags override either.
pub fn load_engine_config(
    config_file: Option<&Path>,
    mode: ProjectionMode,
    overrides: &Overrides,
) -> Result<EngineConfig> {
    let mut config = match config_file {
        Some(path) => EngineConfig::from_yaml(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => EngineConfig::from_env().context("reading MSUPROJ_* environment")?,
    };

    if let Some(method) = &overrides.interpolation {
        config.interpolation = method.parse()?;
    }
    if let Some(res) = overrides.resolution {
        match mode {
            ProjectionMode::Geographic => config.geographic_resolution_deg = Some(res),
            ProjectionMode::Utm => config.utm_resolution_m = Some(res),
        }
    }
    if let Some(compression) = &overrides.compression {
        config.compression = parse_compression(compression)?;
    }
    if overrides.sequential {
        config.parallel = false;
    }

    config.validate().context("invalid engine configuration")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use georef::{Compression, InterpolationMethod};
    use std::io::Write;

    #[test]
    fn test_resolution_goes_to_selected_mode() {
        let overrides = Overrides {
            resolution: Some(250.0),
            ..Default::default()
        };
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = load_engine_config(Some(file.path()), ProjectionMode::Utm, &overrides).unwrap();
        assert_eq!(config.utm_resolution_m, Some(250.0));
        assert_eq!(config.geographic_resolution_deg, None);
    }

    #[test]
    fn test_flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "interpolation: cubic\nparallel: true\ncompression: none").unwrap();

        let overrides = Overrides {
            interpolation: Some("bilinear".to_string()),
            sequential: true,
            ..Default::default()
        };
        let config =
            load_engine_config(Some(file.path()), ProjectionMode::Geographic, &overrides).unwrap();
        assert_eq!(config.interpolation, InterpolationMethod::Bilinear);
        assert_eq!(config.compression, Compression::None);
        assert!(!config.parallel);
    }

    #[test]
    fn test_invalid_resolution_rejected() {
        let overrides = Overrides {
            resolution: Some(-1.0),
            ..Default::default()
        };
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(load_engine_config(Some(file.path()), ProjectionMode::Geographic, &overrides).is_err());
    }

    #[test]
    fn test_misspelled_flags_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        for overrides in [
            Overrides {
                interpolation: Some("bilnear".to_string()),
                ..Default::default()
            },
            Overrides {
                compression: Some("lzw".to_string()),
                ..Default::default()
            },
        ] {
            let err = load_engine_config(Some(file.path()), ProjectionMode::Utm, &overrides)
                .unwrap_err();
            assert!(matches!(
                err.downcast_ref::<georef::GeorefError>(),
                Some(georef::GeorefError::InvalidConfig(_))
            ));
        }
    }
}
