//! The warp engine: input management and the warp state machine.
//!
//! ```text
//!            warp()                 Ok
//!   Idle ───────────► Running ──────────► Succeeded
//!     ▲                  │  Err                │
//!     │                  └────────► Failed     │
//!     └───────── (next warp may start from any terminal state)
//! ```
//!
//! Only one warp runs at a time. While a warp is `Running`, another warp
//! and any reload of its inputs are rejected with [`GeorefError::Busy`].
//! A warp works on snapshots (`Arc`s) of the inputs taken when it starts,
//! so a reload after it finishes never affects a result already produced.

use crate::config::EngineConfig;
use crate::error::{GeorefError, Result};
use crate::gcp::GcpGrid;
use crate::model::GeometricModel;
use crate::naming::normalize_destination;
use crate::source::SourceRaster;
use crate::types::{WarpOptions, WarpReport};
use crate::warper::Warper;
use crate::writer::OutputRasterWriter;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Message reported for a successful warp.
pub const SUCCESS_MESSAGE: &str = "Transformation finished successfully";

/// Lifecycle state of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Terminal status of a warp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarpStatus {
    pub state: EngineState,
    /// Human-readable outcome.
    pub message: String,
    /// Error code on failure.
    pub code: Option<&'static str>,
}

impl WarpStatus {
    fn from_result<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Self {
                state: EngineState::Succeeded,
                message: SUCCESS_MESSAGE.to_string(),
                code: None,
            },
            Err(e) => Self {
                state: EngineState::Failed,
                message: e.to_string(),
                code: Some(e.code()),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.state == EngineState::Succeeded
    }
}

/// Notification emitted around each warp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarpEvent {
    /// The engine entered `Running`.
    Started,
    /// The engine reached a terminal state.
    Finished(WarpStatus),
}

type Subscriber = Arc<dyn Fn(&WarpEvent) + Send + Sync>;

#[derive(Default)]
struct Inputs {
    source: Option<Arc<SourceRaster>>,
    grid: Option<Arc<GcpGrid>>,
    model: Option<Arc<GeometricModel>>,
    destination: Option<PathBuf>,
}

struct Inner {
    config: EngineConfig,
    state: Mutex<EngineState>,
    inputs: RwLock<Inputs>,
    last_status: Mutex<Option<WarpStatus>>,
    subscribers: RwLock<Vec<Subscriber>>,
    cancel: AtomicBool,
}

/// Georeferencing engine. Cloning yields another handle to the same engine.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(EngineState::Idle),
                inputs: RwLock::new(Inputs::default()),
                last_status: Mutex::new(None),
                subscribers: RwLock::new(Vec::new()),
                cancel: AtomicBool::new(false),
            }),
        }
    }

    /// Create an engine after validating its configuration.
    pub fn with_config(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn state(&self) -> EngineState {
        *self.inner.state.lock()
    }

    /// Status of the most recent finished warp.
    pub fn last_status(&self) -> Option<WarpStatus> {
        self.inner.last_status.lock().clone()
    }

    /// Load the source image. On failure the previous image stays loaded.
    pub fn set_source(&self, path: impl AsRef<Path>) -> Result<()> {
        self.ensure_not_running()?;
        let source = Arc::new(SourceRaster::load(path)?);
        self.update_inputs(|inputs| inputs.source = Some(source))
    }

    /// Load the GCP grid and build its geometric model. On failure the
    /// previous grid and model stay loaded.
    pub fn load_gcp(&self, path: impl AsRef<Path>) -> Result<()> {
        self.ensure_not_running()?;
        let grid = Arc::new(GcpGrid::load(path)?);
        let model = Arc::new(GeometricModel::build_with_crs(
            grid.clone(),
            geo_common::Crs::Geographic,
            self.inner.config.max_newton_iterations,
        )?);
        info!(zone = %grid.utm_zone_label(), "GCP grid ready");
        self.update_inputs(|inputs| {
            inputs.grid = Some(grid);
            inputs.model = Some(model);
        })
    }

    /// Set the output path, normalized to end in `.tif`.
    pub fn set_destination(&self, dest: &str) -> Result<PathBuf> {
        let path = normalize_destination(dest)?;
        let stored = path.clone();
        self.update_inputs(|inputs| inputs.destination = Some(stored))?;
        Ok(path)
    }

    pub fn destination(&self) -> Option<PathBuf> {
        self.inner.inputs.read().destination.clone()
    }

    pub fn source_x_size(&self) -> Option<usize> {
        self.inner.inputs.read().source.as_ref().map(|s| s.x_size())
    }

    pub fn source_y_size(&self) -> Option<usize> {
        self.inner.inputs.read().source.as_ref().map(|s| s.y_size())
    }

    pub fn gcp_x_size(&self) -> Option<usize> {
        self.inner.inputs.read().grid.as_ref().map(|g| g.x_size())
    }

    pub fn gcp_y_size(&self) -> Option<usize> {
        self.inner.inputs.read().grid.as_ref().map(|g| g.y_size())
    }

    pub fn gcp_x_step(&self) -> Option<usize> {
        self.inner.inputs.read().grid.as_ref().map(|g| g.x_step())
    }

    pub fn gcp_y_step(&self) -> Option<usize> {
        self.inner.inputs.read().grid.as_ref().map(|g| g.y_step())
    }

    /// UTM zone of the loaded grid, available before any warp.
    pub fn utm_zone(&self) -> Option<u8> {
        self.inner.inputs.read().grid.as_ref().map(|g| g.utm_zone())
    }

    /// UTM zone label of the loaded grid, e.g. "37N".
    pub fn utm_zone_label(&self) -> Option<String> {
        self.inner.inputs.read().grid.as_ref().map(|g| g.utm_zone_label())
    }

    /// Geographic model of the loaded grid.
    pub fn model(&self) -> Option<Arc<GeometricModel>> {
        self.inner.inputs.read().model.clone()
    }

    /// Whether a warp could start now.
    pub fn is_ready(&self) -> bool {
        if self.state() == EngineState::Running {
            return false;
        }
        let inputs = self.inner.inputs.read();
        inputs.source.is_some() && inputs.model.is_some() && inputs.destination.is_some()
    }

    /// Register a callback for warp start/finish events.
    ///
    /// Callbacks run on the thread executing the warp.
    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn(&WarpEvent) + Send + Sync + 'static,
    {
        self.inner.subscribers.write().push(Arc::new(callback));
    }

    /// Ask the running warp to stop. It fails with `Cancelled` and leaves
    /// no file at the destination.
    pub fn cancel(&self) {
        if self.state() == EngineState::Running {
            info!("Cancellation requested");
            self.inner.cancel.store(true, Ordering::Relaxed);
        }
    }

    /// Run a warp to completion on the calling thread.
    pub fn warp(&self, options: WarpOptions) -> Result<WarpReport> {
        let (source, grid, destination) = {
            let mut state = self.inner.state.lock();
            if *state == EngineState::Running {
                warn!("Warp rejected: another warp is running");
                return Err(GeorefError::Busy);
            }

            let inputs = self.inner.inputs.read();
            let snapshot = match (&inputs.source, &inputs.grid, &inputs.model, &inputs.destination) {
                (None, _, _, _) => Err("no source image loaded"),
                (_, None, _, _) | (_, _, None, _) => Err("no GCP grid loaded"),
                (_, _, _, None) => Err("no destination set"),
                (Some(s), Some(g), Some(_), Some(d)) => Ok((s.clone(), g.clone(), d.clone())),
            };
            let snapshot = snapshot.map_err(|reason| {
                warn!(reason, "Warp rejected: engine not ready");
                GeorefError::NotReady(reason.to_string())
            })?;

            *state = EngineState::Running;
            self.inner.cancel.store(false, Ordering::Relaxed);
            snapshot
        };

        info!(
            projection = %options.projection,
            zeros_as_nodata = options.zeros_as_nodata,
            destination = %destination.display(),
            "Warp started"
        );
        self.emit(&WarpEvent::Started);

        let start = Instant::now();
        // A panic in the resampler must still end the warp in a terminal state
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.run(&source, grid, &destination, options)
        }))
        .unwrap_or_else(|payload| Err(GeorefError::Worker(panic_message(payload.as_ref()))));
        let status = WarpStatus::from_result(&result);

        *self.inner.state.lock() = status.state;
        *self.inner.last_status.lock() = Some(status.clone());

        match &result {
            Ok(report) => info!(
                width = report.width,
                height = report.height,
                crs = %report.crs,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "{}",
                SUCCESS_MESSAGE
            ),
            Err(e) => warn!(error = %e, code = e.code(), "Warp failed"),
        }

        self.emit(&WarpEvent::Finished(status));
        result
    }

    /// Run a warp on the blocking thread pool and await its result.
    pub async fn warp_async(&self, options: WarpOptions) -> Result<WarpReport> {
        let engine = self.clone();
        tokio::task::spawn_blocking(move || engine.warp(options))
            .await
            .map_err(|e| GeorefError::Worker(e.to_string()))?
    }

    fn run(
        &self,
        source: &SourceRaster,
        grid: Arc<GcpGrid>,
        destination: &Path,
        options: WarpOptions,
    ) -> Result<WarpReport> {
        let config = &self.inner.config;
        let cancel = &self.inner.cancel;

        let model = GeometricModel::for_mode(grid, options.projection, config.max_newton_iterations)?;
        let (raster, stats) = Warper::new(&model, source, config).warp(options.zeros_as_nodata, cancel)?;

        let report = WarpReport {
            width: raster.width,
            height: raster.height,
            geotransform: raster.geotransform,
            crs: raster.crs,
            valid_cells: stats.valid,
            nodata_cells: stats.nodata,
            inverse_misses: stats.misses,
            destination: destination.to_path_buf(),
        };

        OutputRasterWriter::new(config.compression).write_cancellable(raster, destination, cancel)?;
        Ok(report)
    }

    fn ensure_not_running(&self) -> Result<()> {
        if self.state() == EngineState::Running {
            warn!("Input change rejected: a warp is running");
            return Err(GeorefError::Busy);
        }
        Ok(())
    }

    /// Apply an input change unless a warp started meanwhile.
    fn update_inputs(&self, apply: impl FnOnce(&mut Inputs)) -> Result<()> {
        let state = self.inner.state.lock();
        if *state == EngineState::Running {
            warn!("Input change rejected: a warp is running");
            return Err(GeorefError::Busy);
        }
        apply(&mut self.inner.inputs.write());
        Ok(())
    }

    /// Deliver an event to every subscriber. A panicking subscriber is
    /// logged and skipped.
    fn emit(&self, event: &WarpEvent) {
        let subscribers: Vec<Subscriber> = self.inner.subscribers.read().clone();
        for subscriber in subscribers {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| subscriber(event))) {
                warn!(
                    event = ?event,
                    panic = %panic_message(payload.as_ref()),
                    "Warp subscriber panicked"
                );
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("warp worker panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("warp worker panicked: {}", s)
    } else {
        "warp worker panicked".to_string()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state())
            .field("config", &self.inner.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProjectionMode;

    #[test]
    fn test_new_engine_is_idle() {
        let engine = Engine::default();
        assert_eq!(engine.state(), EngineState::Idle);
        assert!(!engine.is_ready());
        assert!(engine.utm_zone().is_none());
        assert!(engine.last_status().is_none());
    }

    #[test]
    fn test_warp_without_inputs_is_not_ready() {
        let engine = Engine::default();
        let err = engine
            .warp(WarpOptions::new(ProjectionMode::Geographic, false))
            .unwrap_err();
        assert!(matches!(err, GeorefError::NotReady(_)));
        assert_eq!(engine.state(), EngineState::Idle);
    }

    #[test]
    fn test_set_destination_normalizes() {
        let engine = Engine::default();
        let path = engine.set_destination("/tmp/out/").unwrap();
        assert_eq!(path, PathBuf::from("/tmp/out.tif"));
        assert_eq!(engine.destination(), Some(path));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig {
            max_output_pixels: 0,
            ..Default::default()
        };
        assert!(matches!(
            Engine::with_config(config),
            Err(GeorefError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_status_messages() {
        let ok: Result<()> = Ok(());
        let status = WarpStatus::from_result(&ok);
        assert!(status.is_success());
        assert_eq!(status.message, SUCCESS_MESSAGE);

        let err: Result<()> = Err(GeorefError::Busy);
        let status = WarpStatus::from_result(&err);
        assert_eq!(status.state, EngineState::Failed);
        assert_eq!(status.code, Some("Busy"));
    }

    #[test]
    fn test_warp_async_without_inputs_is_not_ready() {
        let engine = Engine::default();
        let result = tokio_test::block_on(
            engine.warp_async(WarpOptions::new(ProjectionMode::Utm, false)),
        );
        assert!(matches!(result, Err(GeorefError::NotReady(_))));
        assert_eq!(engine.state(), EngineState::Idle);
        assert!(engine.last_status().is_none());
    }
}
