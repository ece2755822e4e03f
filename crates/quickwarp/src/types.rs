use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// A saved teleport destination.
///
/// An empty `scene_id` means "unset": there is nothing to warp to, which is
/// not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WarpPoint {
    #[serde(rename = "scene", default)]
    pub scene_id: String,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub velocity: Vec2,
}

impl WarpPoint {
    pub fn new(scene_id: impl Into<String>, position: Vec3, velocity: Vec2) -> Self {
        Self {
            scene_id: scene_id.into(),
            position,
            velocity,
        }
    }

    pub fn is_set(&self) -> bool {
        !self.scene_id.is_empty()
    }

    /// Overwrites every field in place.
    pub fn overwrite(&mut self, scene_id: &str, position: Vec3, velocity: Vec2) {
        self.scene_id.clear();
        self.scene_id.push_str(scene_id);
        self.position = position;
        self.velocity = velocity;
    }
}
