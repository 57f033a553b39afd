//! Input events for garment placement
//!
//! Maps keyboard, pointer, wheel and button input onto fixed-step
//! controller operations.

use serde::{Deserialize, Serialize};

use super::PlacementController;

/// Fixed step sizes for discrete input
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepConfig {
    /// Pixels per arrow key or move button press
    pub move_step: f32,
    /// Scale delta per `+`/`-` key press
    pub key_scale_step: f32,
    /// Scale delta per zoom button press
    pub button_scale_step: f32,
    /// Scale delta per ctrl + wheel notch
    pub wheel_scale_step: f32,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            move_step: 2.0,
            key_scale_step: 0.01,
            button_scale_step: 0.02,
            wheel_scale_step: 0.05,
        }
    }
}

/// Keys the try-on view reacts to.
///
/// Travels as a DOM `KeyboardEvent.key` string; unknown names become `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Key {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Plus,
    Minus,
    Escape,
    Other,
}

impl Key {
    /// Parse a DOM `KeyboardEvent.key` value
    pub fn from_name(name: &str) -> Self {
        match name {
            "ArrowUp" => Key::ArrowUp,
            "ArrowDown" => Key::ArrowDown,
            "ArrowLeft" => Key::ArrowLeft,
            "ArrowRight" => Key::ArrowRight,
            "+" | "=" => Key::Plus,
            "-" | "_" => Key::Minus,
            "Escape" => Key::Escape,
            _ => Key::Other,
        }
    }

    /// DOM name of the key
    pub fn name(&self) -> &'static str {
        match self {
            Key::ArrowUp => "ArrowUp",
            Key::ArrowDown => "ArrowDown",
            Key::ArrowLeft => "ArrowLeft",
            Key::ArrowRight => "ArrowRight",
            Key::Plus => "+",
            Key::Minus => "-",
            Key::Escape => "Escape",
            Key::Other => "Unidentified",
        }
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::from_name(&name)
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.name().to_string()
    }
}

/// On-screen control buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ButtonAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    ZoomIn,
    ZoomOut,
    Reset,
}

/// A single input event from the try-on view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InputEvent {
    Key {
        key: Key,
    },
    /// One frame of a pointer drag (delta since the previous frame)
    #[serde(rename_all = "camelCase")]
    Drag {
        delta_x: f32,
        delta_y: f32,
    },
    /// Wheel notch; only zooms while ctrl is held
    #[serde(rename_all = "camelCase")]
    Wheel {
        delta_y: f32,
        #[serde(default)]
        ctrl: bool,
    },
    /// Pinch gesture, delta applied directly to scale
    Pinch {
        delta: f32,
    },
    Button {
        action: ButtonAction,
    },
}

/// What the caller should do after an event was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InputOutcome {
    /// Placement changed
    Updated,
    /// Event recognised but nothing to do, or no session open
    Ignored,
    /// Leave fullscreen
    ExitFullscreen,
    /// Close the try-on session
    Close,
}

impl InputEvent {
    /// Apply the event to a controller.
    ///
    /// Nothing happens while no session is open.
    pub fn apply(
        &self,
        controller: &mut PlacementController,
        steps: &StepConfig,
        session_open: bool,
        fullscreen: bool,
    ) -> InputOutcome {
        if !session_open {
            return InputOutcome::Ignored;
        }

        let step = steps.move_step;
        match *self {
            InputEvent::Key { key } => match key {
                Key::ArrowUp => controller.move_by(0.0, -step),
                Key::ArrowDown => controller.move_by(0.0, step),
                Key::ArrowLeft => controller.move_by(-step, 0.0),
                Key::ArrowRight => controller.move_by(step, 0.0),
                Key::Plus => controller.scale_by(steps.key_scale_step),
                Key::Minus => controller.scale_by(-steps.key_scale_step),
                Key::Escape if fullscreen => return InputOutcome::ExitFullscreen,
                Key::Escape => return InputOutcome::Close,
                Key::Other => return InputOutcome::Ignored,
            },
            InputEvent::Drag { delta_x, delta_y } => controller.drag_to(delta_x, delta_y),
            InputEvent::Wheel { delta_y, ctrl } => {
                if !ctrl {
                    return InputOutcome::Ignored;
                }
                if delta_y > 0.0 {
                    controller.scale_by(-steps.wheel_scale_step);
                } else {
                    controller.scale_by(steps.wheel_scale_step);
                }
            }
            InputEvent::Pinch { delta } => controller.scale_by(delta),
            InputEvent::Button { action } => match action {
                ButtonAction::MoveUp => controller.move_by(0.0, -step),
                ButtonAction::MoveDown => controller.move_by(0.0, step),
                ButtonAction::MoveLeft => controller.move_by(-step, 0.0),
                ButtonAction::MoveRight => controller.move_by(step, 0.0),
                ButtonAction::ZoomIn => controller.scale_by(steps.button_scale_step),
                ButtonAction::ZoomOut => controller.scale_by(-steps.button_scale_step),
                ButtonAction::Reset => controller.reset(),
            },
        }
        InputOutcome::Updated
    }
}
