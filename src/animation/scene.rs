// Tue Jan 13 2026 - Alex

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Flattest camera tilt used for the final map view.
pub const TILT_MAX: f64 = 20.0;

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("Scene file not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid scene: {0}")]
    Invalid(String),
}

/// What the renderer needs to know about a rupture, extracted from its
/// source files by an upstream tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub name: String,
    /// Camera azimuth looking across the fault.
    pub strike_azimuth: f64,
    pub map_tilt: f64,
    /// Time until the last subfault stops slipping, seconds.
    pub rupture_time: f64,
    /// Slip rate timestep, seconds.
    pub srf_dt: f64,
    #[serde(default)]
    pub ground_motion: Option<GroundMotion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundMotion {
    pub nt: usize,
    pub dt: f64,
}

impl Scene {
    /// Camera placement from the fault plane geometry.
    pub fn from_geometry(name: &str, avg_strike: f64, avg_dip: f64, rupture_time: f64, srf_dt: f64) -> Self {
        Self {
            name: name.to_string(),
            strike_azimuth: avg_strike + 90.0,
            map_tilt: (90.0 - avg_dip).max(TILT_MAX),
            rupture_time,
            srf_dt,
            ground_motion: None,
        }
    }

    pub fn with_ground_motion(mut self, nt: usize, dt: f64) -> Self {
        self.ground_motion = Some(GroundMotion { nt, dt });
        self
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SceneError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SceneError::NotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)?;
        let scene: Scene = serde_json::from_str(&contents)?;
        scene.validate()?;
        Ok(scene)
    }

    pub fn validate(&self) -> Result<(), SceneError> {
        if self.name.is_empty() {
            return Err(SceneError::Invalid("name must not be empty".to_string()));
        }
        if self.srf_dt <= 0.0 {
            return Err(SceneError::Invalid("srf_dt must be positive".to_string()));
        }
        if self.rupture_time < 0.0 {
            return Err(SceneError::Invalid("rupture_time must not be negative".to_string()));
        }
        if let Some(gm) = self.ground_motion {
            if gm.dt <= 0.0 {
                return Err(SceneError::Invalid("ground motion dt must be positive".to_string()));
            }
        }
        Ok(())
    }
}
