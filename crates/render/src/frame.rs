use crate::camera::{FlyCamera, Projection};
use crate::light::LightRig;
use crate::scene::SceneDescriptor;
use cubelight_input::ControlState;
use glam::{Mat4, Vec3};
use std::time::{Duration, Instant};

/// Longest step a single frame may take, in seconds. A stalled window
/// (drag, breakpoint) otherwise teleports the camera.
pub const MAX_FRAME_DT: f32 = 0.1;

/// Measures the time between frames.
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    last: Instant,
}

impl FrameClock {
    pub fn start(now: Instant) -> Self {
        Self { last: now }
    }

    /// Seconds since the previous tick, capped at [`MAX_FRAME_DT`].
    pub fn tick(&mut self, now: Instant) -> f32 {
        let dt = now.saturating_duration_since(self.last);
        self.last = now;
        dt.as_secs_f32().min(MAX_FRAME_DT)
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::start(Instant::now())
    }
}

/// Everything the renderer needs from one update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameView {
    pub view: Mat4,
    pub projection: Mat4,
    pub eye: Vec3,
    pub look_dir: Vec3,
}

/// Mutable per-run state: the camera and, for lit scenes, the light rig.
#[derive(Debug, Clone)]
pub struct SceneState {
    pub camera: FlyCamera,
    pub lights: Option<LightRig>,
    projection: Mat4,
}

impl SceneState {
    /// The projection is fixed here, from the initial viewport.
    pub fn new(scene: &SceneDescriptor, width: u32, height: u32) -> Self {
        let projection = Projection::for_viewport(width, height).matrix();
        Self {
            camera: scene.camera,
            lights: scene.lit.as_ref().map(|l| l.lights),
            projection,
        }
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    /// Advance the camera by one frame and re-aim the spot light.
    pub fn update(&mut self, controls: &ControlState, dt: f32) -> FrameView {
        self.camera.apply_controls(controls, dt);
        let eye = self.camera.position;
        let look_dir = self.camera.forward();
        if let Some(lights) = &mut self.lights {
            lights.track_camera(eye, look_dir);
        }
        FrameView {
            view: self.camera.view_matrix(),
            projection: self.projection,
            eye,
            look_dir,
        }
    }

    /// Run `frames` fixed steps with the same controls held.
    pub fn simulate(&mut self, controls: &ControlState, dt: f32, frames: u32) -> FrameView {
        let mut view = self.update(controls, 0.0);
        for _ in 0..frames {
            view = self.update(controls, dt);
        }
        view
    }
}

/// `Duration` for a frame rate, for fixed-step runs.
pub fn frame_duration(fps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / f64::from(fps.max(1)))
}
