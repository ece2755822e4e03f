use std::fmt::Display;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::types::WarpPoint;

use super::atomic_io::write_text_atomic;
use super::{StoreError, WarpStore};

/// Warp point persisted as a single pretty-printed JSON object.
#[derive(Debug, Clone)]
pub struct JsonWarpStore {
    path: PathBuf,
}

impl JsonWarpStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Like [`WarpStore::load`] but reports why nothing was loaded.
    pub fn read(&self) -> Result<Option<WarpPoint>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let point = parse_warp_point_json(&raw).map_err(StoreError::Parse)?;
        validate_warp_point(&point).map_err(StoreError::Invalid)?;
        Ok(point.is_set().then_some(point))
    }
}

impl WarpStore for JsonWarpStore {
    fn load(&mut self) -> Option<WarpPoint> {
        match self.read() {
            Ok(Some(point)) => {
                info!(
                    path = %self.path.display(),
                    scene = %point.scene_id,
                    "warp_point_loaded"
                );
                Some(point)
            }
            Ok(None) => {
                debug!(path = %self.path.display(), "warp_point_absent");
                None
            }
            Err(error) => {
                warn!(path = %self.path.display(), error = %error, "warp_point_load_failed");
                None
            }
        }
    }

    fn save(&mut self, point: &WarpPoint) -> Result<(), StoreError> {
        validate_warp_point(point).map_err(StoreError::Invalid)?;
        let json = serde_json::to_string_pretty(point)?;
        write_text_atomic(&self.path, &json).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), scene = %point.scene_id, "warp_point_saved");
        Ok(())
    }
}

pub(crate) fn parse_warp_point_json(raw: &str) -> Result<WarpPoint, String> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, WarpPoint>(&mut deserializer) {
        Ok(point) => Ok(point),
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            if path.is_empty() || path == "." {
                Err(format!("parse warp point json: {source}"))
            } else {
                Err(format!("parse warp point json at {path}: {source}"))
            }
        }
    }
}

fn expected_actual(path: &str, expected: impl Display, actual: impl Display) -> String {
    format!("validation failed at {path}: expected {expected}, got {actual}")
}

pub(crate) fn validate_warp_point(point: &WarpPoint) -> Result<(), String> {
    if point.position.is_finite() && point.velocity.is_finite() {
        return Ok(());
    }
    let coordinates = [
        ("position.x", point.position.x),
        ("position.y", point.position.y),
        ("position.z", point.position.z),
        ("velocity.x", point.velocity.x),
        ("velocity.y", point.velocity.y),
    ];
    for (path, value) in coordinates {
        if !value.is_finite() {
            return Err(expected_actual(path, "finite number", value));
        }
    }
    Ok(())
}
