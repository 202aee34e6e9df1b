use glam::{Vec2, Vec3};

use crate::{input::FrameInput, util::math};

/// Fixed world axis; yaw sweeps the XY plane around it.
pub const WORLD_UP: glam::Vec3 = glam::Vec3::Z;
/// Pitch bound in degrees, strictly inside ±90 so `forward × WORLD_UP` never degenerates.
pub const PITCH_LIMIT: f32 = 89.0;

/// Orthonormal orientation derived from yaw and pitch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Basis {
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
}

/// Spherical-to-cartesian basis for angles given in degrees.
///
/// Pure function of the two angles; callers are expected to keep `pitch`
/// inside `[-PITCH_LIMIT, PITCH_LIMIT]`.
pub fn compute_basis(yaw: f32, pitch: f32) -> Basis {
    let (sin_yaw, cos_yaw) = math::degree_to_radian(yaw).sin_cos();
    let (sin_pitch, cos_pitch) = math::degree_to_radian(pitch).sin_cos();

    let forward = Vec3::new(cos_yaw * cos_pitch, sin_yaw * cos_pitch, sin_pitch);
    let right = forward.cross(WORLD_UP).normalize();
    let up = right.cross(forward).normalize();

    Basis { forward, right, up }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Back,
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::Forward,
        Direction::Back,
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
    ];

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// How [`Camera::move_towards`] applies a step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MovementPolicy {
    /// Steps land on `position` immediately.
    Immediate,
    /// Steps move a target; `position` approaches it by `factor` per second.
    Smoothed { factor: f32 },
}

#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    target: Vec3,
    yaw: f32,
    pitch: f32,
    basis: Basis,
    speed: f32,
    policy: MovementPolicy,
}

impl Camera {
    pub const DEFAULT_SPEED: f32 = 10.0;

    pub fn new(position: Vec3) -> Self {
        Self::looking(position, 0.0, 0.0)
    }

    /// Camera at `position` with the given angles in degrees, wrapped and clamped.
    pub fn looking(position: Vec3, yaw: f32, pitch: f32) -> Self {
        let yaw = math::wrap_degrees(yaw);
        let pitch = pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        Self {
            position,
            target: position,
            yaw,
            pitch,
            basis: compute_basis(yaw, pitch),
            speed: Self::DEFAULT_SPEED,
            policy: MovementPolicy::Immediate,
        }
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_policy(mut self, policy: MovementPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn basis(&self) -> Basis {
        self.basis
    }

    pub fn forward(&self) -> Vec3 {
        self.basis.forward
    }

    pub fn right(&self) -> Vec3 {
        self.basis.right
    }

    pub fn up(&self) -> Vec3 {
        self.basis.up
    }

    pub fn update_orientation(&mut self, pointer_delta: Vec2, sensitivity: f32) {
        self.yaw = math::wrap_degrees(self.yaw - pointer_delta.x * sensitivity);
        self.pitch = (self.pitch - pointer_delta.y * sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.basis = compute_basis(self.yaw, self.pitch);
        tracing::trace!(yaw = self.yaw, pitch = self.pitch, "camera orientation");
    }

    /// Step along `direction` for `delta_time` seconds.
    pub fn move_towards(&mut self, direction: Direction, delta_time: f32) {
        let axis = match direction {
            Direction::Forward => self.basis.forward,
            Direction::Back => -self.basis.forward,
            Direction::Right => self.basis.right,
            Direction::Left => -self.basis.right,
            Direction::Up => WORLD_UP,
            Direction::Down => -WORLD_UP,
        };
        let step = axis * self.speed * delta_time;

        self.target += step;
        if self.policy == MovementPolicy::Immediate {
            self.position = self.target;
        }
    }

    /// Advance the smoothing interpolation; a no-op for immediate movement.
    pub fn advance(&mut self, delta_time: f32) {
        if let MovementPolicy::Smoothed { factor } = self.policy {
            let t = (factor * delta_time).clamp(0.0, 1.0);
            self.position = self.position.lerp(self.target, t);
        }
    }
}

/// Turns per-frame input into camera angle deltas and movement steps.
pub struct CameraController {
    pub sensitivity: f32,
}

impl CameraController {
    pub const DEFAULT_SENSITIVITY: f32 = 0.5;

    pub fn new(sensitivity: f32) -> Self {
        Self { sensitivity }
    }

    /// Returns whether the camera orientation changed.
    pub fn apply(&self, camera: &mut Camera, input: &FrameInput, delta_time: f32) -> bool {
        let rotated = input.look_held && input.pointer_delta != Vec2::ZERO;
        if rotated {
            camera.update_orientation(input.pointer_delta, self.sensitivity);
        }

        for direction in Direction::ALL {
            if input.is_held(direction) {
                camera.move_towards(direction, delta_time);
            }
        }
        camera.advance(delta_time);

        rotated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn assert_orthonormal(basis: Basis) {
        for v in [basis.forward, basis.right, basis.up] {
            assert!((v.length() - 1.0).abs() < EPSILON, "{v:?} is not unit length");
        }
        assert!(basis.forward.dot(basis.right).abs() < EPSILON);
        assert!(basis.forward.dot(basis.up).abs() < EPSILON);
        assert!(basis.right.dot(basis.up).abs() < EPSILON);
    }

    #[test]
    fn basis_is_orthonormal_over_the_angle_range() {
        let mut yaw = 0.0;
        while yaw < 360.0 {
            let mut pitch = -PITCH_LIMIT;
            while pitch <= PITCH_LIMIT {
                assert_orthonormal(compute_basis(yaw, pitch));
                pitch += 7.5;
            }
            assert_orthonormal(compute_basis(yaw, PITCH_LIMIT));
            yaw += 11.25;
        }
    }

    #[test]
    fn orientation_updates_keep_basis_orthonormal() {
        let mut camera = Camera::new(Vec3::ZERO);
        for (dx, dy) in [(13.0, -4.0), (-250.0, 300.0), (0.3, -900.0), (720.0, 1.0)] {
            camera.update_orientation(Vec2::new(dx, dy), 0.5);
            assert_orthonormal(camera.basis());
        }
    }

    #[test]
    fn yaw_wraps_past_full_turn() {
        let mut camera = Camera::looking(Vec3::ZERO, 359.0, 0.0);
        let sensitivity = 0.5;
        // yaw -= dx * sensitivity, so a +2 degree turn needs dx = -4
        camera.update_orientation(Vec2::new(-2.0 / sensitivity, 0.0), sensitivity);

        assert!((camera.yaw() - 1.0).abs() < 1e-3, "yaw = {}", camera.yaw());
        assert!((0.0..360.0).contains(&camera.yaw()));
    }

    #[test]
    fn yaw_wraps_below_zero() {
        let mut camera = Camera::looking(Vec3::ZERO, 1.0, 0.0);
        camera.update_orientation(Vec2::new(4.0, 0.0), 0.5);

        assert!((camera.yaw() - 359.0).abs() < 1e-3);
    }

    #[test]
    fn pitch_clamps_exactly_at_bounds() {
        let mut camera = Camera::new(Vec3::ZERO);
        camera.update_orientation(Vec2::new(0.0, -1000.0), 1.0);
        assert_eq!(camera.pitch(), PITCH_LIMIT);
        camera.update_orientation(Vec2::new(0.0, -1.0), 1.0);
        assert_eq!(camera.pitch(), PITCH_LIMIT);

        camera.update_orientation(Vec2::new(0.0, 5000.0), 1.0);
        assert_eq!(camera.pitch(), -PITCH_LIMIT);
        assert_orthonormal(camera.basis());
    }

    #[test]
    fn default_orientation_looks_along_x() {
        let camera = Camera::new(Vec3::new(-5.0, 0.0, 0.0));
        assert!(camera.forward().abs_diff_eq(Vec3::X, EPSILON));
        assert!(camera.right().abs_diff_eq(-Vec3::Y, EPSILON));
        assert!(camera.up().abs_diff_eq(Vec3::Z, EPSILON));
    }

    #[test]
    fn immediate_movement_follows_basis() {
        let mut camera = Camera::new(Vec3::ZERO);
        camera.move_towards(Direction::Forward, 0.5);
        assert!(camera.position().abs_diff_eq(Vec3::new(5.0, 0.0, 0.0), EPSILON));

        camera.move_towards(Direction::Up, 0.1);
        assert!(camera.position().abs_diff_eq(Vec3::new(5.0, 0.0, 1.0), EPSILON));

        camera.move_towards(Direction::Left, 0.1);
        assert!(camera.position().abs_diff_eq(Vec3::new(5.0, 1.0, 1.0), EPSILON));
    }

    #[test]
    fn smoothed_movement_approaches_target() {
        let mut camera =
            Camera::new(Vec3::ZERO).with_policy(MovementPolicy::Smoothed { factor: 5.0 });
        camera.move_towards(Direction::Forward, 1.0);
        assert_eq!(camera.position(), Vec3::ZERO);

        camera.advance(0.1);
        assert!(camera.position().abs_diff_eq(Vec3::new(5.0, 0.0, 0.0), EPSILON));

        camera.advance(1.0);
        assert!(camera.position().abs_diff_eq(Vec3::new(10.0, 0.0, 0.0), EPSILON));
    }

    #[test]
    fn controller_ignores_pointer_without_look_button() {
        let controller = CameraController::new(0.5);
        let mut camera = Camera::new(Vec3::ZERO);
        let mut input = FrameInput {
            pointer_delta: Vec2::new(10.0, 10.0),
            ..FrameInput::default()
        };

        assert!(!controller.apply(&mut camera, &input, 0.016));
        assert_eq!(camera.yaw(), 0.0);

        input.look_held = true;
        assert!(controller.apply(&mut camera, &input, 0.016));
        assert_eq!(camera.yaw(), 355.0);
        assert_eq!(camera.pitch(), -5.0);
    }
}
