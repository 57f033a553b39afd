//! Garment placement over a person photo
//!
//! Holds the translate + scale transform applied to the garment layer and
//! the only operations allowed to change it.

pub mod estimator;
pub mod input;

use serde::{Deserialize, Serialize};

pub use estimator::{
    estimate_placement, estimate_placement_calibrated, ContainerSize, EstimateError,
    SegmentationResult, TorsoBoundingBox, BACKGROUND_PART, TORSO_BACK, TORSO_FRONT, TORSO_PARTS,
};
pub use input::{ButtonAction, InputEvent, InputOutcome, Key, StepConfig};

/// Smallest scale the garment can shrink to
pub const MIN_SCALE: f32 = 0.1;

/// Where the garment layer sits relative to the centre of its container
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementState {
    /// Horizontal offset in container pixels (positive = right)
    pub offset_x: f32,
    /// Vertical offset in container pixels (positive = down)
    pub offset_y: f32,
    /// Uniform scale of the garment layer
    pub scale: f32,
}

impl PlacementState {
    /// Placement used when a try-on session opens
    pub const DEFAULT: PlacementState = PlacementState {
        offset_x: 0.0,
        offset_y: -40.0,
        scale: 0.5,
    };

    pub fn new(offset_x: f32, offset_y: f32, scale: f32) -> Self {
        Self { offset_x, offset_y, scale }
    }

    /// CSS-style transform for the garment layer
    pub fn transform(&self) -> String {
        format!(
            "translate({}px, {}px) scale({})",
            self.offset_x, self.offset_y, self.scale
        )
    }

    fn is_finite(&self) -> bool {
        self.offset_x.is_finite() && self.offset_y.is_finite() && self.scale.is_finite()
    }
}

impl Default for PlacementState {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Policy for a placement controller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementConfig {
    /// State restored by `reset()`
    pub default_state: PlacementState,
    /// Scale floor
    pub min_scale: f32,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            default_state: PlacementState::DEFAULT,
            min_scale: MIN_SCALE,
        }
    }
}

impl PlacementConfig {
    /// Default state with its scale lifted to the floor
    pub fn clamped_default(&self) -> PlacementState {
        PlacementState {
            scale: self.default_state.scale.max(self.min_scale),
            ..self.default_state
        }
    }
}

/// Owns a [`PlacementState`] and exposes its legal mutators.
///
/// Every operation is total: non-finite input is ignored and the scale is
/// clamped, never rejected, so repeated shrinking saturates at the floor.
#[derive(Debug, Clone)]
pub struct PlacementController {
    state: PlacementState,
    config: PlacementConfig,
}

impl Default for PlacementController {
    fn default() -> Self {
        Self::new(PlacementConfig::default())
    }
}

impl PlacementController {
    pub fn new(config: PlacementConfig) -> Self {
        Self {
            state: config.clamped_default(),
            config,
        }
    }

    /// Current placement
    pub fn state(&self) -> PlacementState {
        self.state
    }

    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    /// Shift the garment by a delta
    pub fn move_by(&mut self, dx: f32, dy: f32) {
        let offset_x = self.state.offset_x + dx;
        let offset_y = self.state.offset_y + dy;
        // Non-finite deltas and overflowing sums leave the state alone
        if !offset_x.is_finite() || !offset_y.is_finite() {
            return;
        }
        self.state.offset_x = offset_x;
        self.state.offset_y = offset_y;
    }

    /// Grow or shrink the garment, never below the configured floor
    pub fn scale_by(&mut self, ds: f32) {
        let scale = self.state.scale + ds;
        if !scale.is_finite() {
            return;
        }
        self.state.scale = scale.max(self.config.min_scale);
    }

    /// Restore the configured default (not the last estimated seed)
    pub fn reset(&mut self) {
        self.state = self.config.clamped_default();
    }

    /// Apply one frame of a pointer drag.
    ///
    /// Takes the per-frame pointer delta, not an absolute position, so the
    /// result does not depend on where on the garment the drag started.
    pub fn drag_to(&mut self, delta_x: f32, delta_y: f32) {
        self.move_by(delta_x, delta_y);
    }

    /// Replace the whole state (auto-placement seed)
    pub fn replace(&mut self, state: PlacementState) {
        if !state.is_finite() {
            return;
        }
        self.state = PlacementState {
            scale: state.scale.max(self.config.min_scale),
            ..state
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_controller() {
        let ctl = PlacementController::default();
        assert_eq!(ctl.state(), PlacementState::new(0.0, -40.0, 0.5));
    }

    #[test]
    fn test_moves_accumulate() {
        let deltas = [(3.0, -1.0), (-7.5, 2.5), (0.25, 10.0), (4.0, -4.0)];
        let mut forward = PlacementController::default();
        let mut backward = PlacementController::default();
        for &(dx, dy) in &deltas {
            forward.move_by(dx, dy);
        }
        for &(dx, dy) in deltas.iter().rev() {
            backward.move_by(dx, dy);
        }

        let sum_x: f32 = deltas.iter().map(|d| d.0).sum();
        let sum_y: f32 = deltas.iter().map(|d| d.1).sum();
        assert_eq!(forward.state().offset_x, sum_x);
        assert_eq!(forward.state().offset_y, -40.0 + sum_y);
        assert_eq!(forward.state(), backward.state());
    }

    #[test]
    fn test_scale_clamps_at_floor() {
        let mut ctl = PlacementController::default();
        for _ in 0..100 {
            ctl.scale_by(-0.05);
            assert!(ctl.state().scale >= MIN_SCALE);
        }
        assert_eq!(ctl.state().scale, MIN_SCALE);

        // Growing from the floor starts from the floor, not from the debt
        ctl.scale_by(0.2);
        assert!((ctl.state().scale - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_scale_sum_above_floor() {
        let mut ctl = PlacementController::default();
        for ds in [0.1, -0.05, 0.02, 0.03] {
            ctl.scale_by(ds);
        }
        assert!((ctl.state().scale - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut ctl = PlacementController::default();
        ctl.move_by(12.0, 30.0);
        ctl.scale_by(1.0);
        ctl.reset();
        let once = ctl.state();
        ctl.reset();
        assert_eq!(once, ctl.state());
        assert_eq!(once, PlacementState::DEFAULT);
    }

    #[test]
    fn test_reset_ignores_seed() {
        let mut ctl = PlacementController::default();
        ctl.replace(PlacementState::new(-80.0, -15.0, 1.0));
        ctl.reset();
        assert_eq!(ctl.state(), PlacementState::DEFAULT);
    }

    #[test]
    fn test_drag_is_position_independent() {
        let mut a = PlacementController::default();
        let mut b = PlacementController::default();
        a.drag_to(5.0, 5.0);
        a.drag_to(5.0, -2.0);
        b.move_by(10.0, 3.0);
        assert_eq!(a.state(), b.state());
    }

    #[test]
    fn test_non_finite_input_ignored() {
        let mut ctl = PlacementController::default();
        ctl.move_by(f32::NAN, 1.0);
        ctl.scale_by(f32::INFINITY);
        ctl.replace(PlacementState::new(0.0, f32::NAN, 1.0));
        assert_eq!(ctl.state(), PlacementState::DEFAULT);
    }

    #[test]
    fn test_overflowing_sum_ignored() {
        let mut ctl = PlacementController::default();
        ctl.move_by(3e38, 0.0);
        ctl.move_by(3e38, 0.0);
        assert_eq!(ctl.state().offset_x, 3e38);
        assert!(ctl.state().is_finite());

        ctl.scale_by(3e38);
        ctl.scale_by(3e38);
        assert!(ctl.state().scale.is_finite());
    }

    #[test]
    fn test_replace_respects_floor() {
        let mut ctl = PlacementController::default();
        ctl.replace(PlacementState::new(1.0, 2.0, 0.01));
        assert_eq!(ctl.state(), PlacementState::new(1.0, 2.0, MIN_SCALE));
    }

    #[test]
    fn test_transform_string() {
        let state = PlacementState::new(-80.0, -15.0, 1.0);
        assert_eq!(state.transform(), "translate(-80px, -15px) scale(1)");
    }
}
