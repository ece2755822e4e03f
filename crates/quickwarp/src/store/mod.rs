pub(crate) mod atomic_io;
mod json;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::WarpPoint;

pub use json::JsonWarpStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read warp point at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write warp point at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode warp point: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("{0}")]
    Parse(String),
    #[error("{0}")]
    Invalid(String),
}

/// Persistence for the single saved warp point.
pub trait WarpStore {
    /// `None` when nothing usable is stored. Failures are logged, not raised.
    fn load(&mut self) -> Option<WarpPoint>;

    fn save(&mut self, point: &WarpPoint) -> Result<(), StoreError>;
}

/// Keeps the point for the lifetime of the process only.
#[derive(Debug, Clone, Default)]
pub struct MemoryWarpStore {
    point: Option<WarpPoint>,
    saves: u32,
}

impl MemoryWarpStore {
    pub fn with_point(point: WarpPoint) -> Self {
        Self {
            point: Some(point),
            saves: 0,
        }
    }

    pub fn saved(&self) -> Option<&WarpPoint> {
        self.point.as_ref()
    }

    pub fn save_count(&self) -> u32 {
        self.saves
    }
}

impl WarpStore for MemoryWarpStore {
    fn load(&mut self) -> Option<WarpPoint> {
        self.point.clone().filter(WarpPoint::is_set)
    }

    fn save(&mut self, point: &WarpPoint) -> Result<(), StoreError> {
        self.point = Some(point.clone());
        self.saves += 1;
        Ok(())
    }
}

impl<S: WarpStore + ?Sized> WarpStore for Box<S> {
    fn load(&mut self) -> Option<WarpPoint> {
        (**self).load()
    }

    fn save(&mut self, point: &WarpPoint) -> Result<(), StoreError> {
        (**self).save(point)
    }
}
