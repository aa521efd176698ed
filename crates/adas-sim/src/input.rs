//! Per-tick driver requests and the sources that produce them

use std::collections::VecDeque;
use serde::{Deserialize, Serialize};
use crate::mode::Mode;
use crate::vehicle::{Side, SpeedAdjust};

/// Requests for one tick; every field is optional
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickInput {
    pub mode: Option<Mode>,
    pub steer: Option<Side>,
    pub speed: Option<SpeedAdjust>,
}

impl TickInput {
    pub fn mode(mode: Mode) -> Self {
        Self { mode: Some(mode), ..Default::default() }
    }

    pub fn steer(side: Side) -> Self {
        Self { steer: Some(side), ..Default::default() }
    }

    pub fn speed(adjust: SpeedAdjust) -> Self {
        Self { speed: Some(adjust), ..Default::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.mode.is_none() && self.steer.is_none() && self.speed.is_none()
    }
}

/// Anything that can drive the simulation
pub trait InputSource {
    /// Requests for the next tick
    fn poll(&mut self) -> TickInput;
}

/// Key code reported when no key was pressed
pub const KEY_NONE: u8 = 255;
/// Escape
pub const KEY_QUIT: u8 = 27;
/// Left arrow
pub const KEY_ARROW_LEFT: u8 = 81;
/// Right arrow
pub const KEY_ARROW_RIGHT: u8 = 83;

/// Keyboard bindings: digits select modes, q/d steer, z/s change speed
#[derive(Debug, Clone, Default)]
pub struct KeyboardInput {
    pending: Option<u8>,
}

impl KeyboardInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate one key code
    pub fn translate(key: u8) -> TickInput {
        let mode = match key {
            b'0' => Some(Mode::Manual),
            b'1' => Some(Mode::AdaptiveCruise),
            b'2' => Some(Mode::LaneKeep),
            b'3' => Some(Mode::Emergency),
            _ => None,
        };
        let steer = match key {
            b'q' | KEY_ARROW_LEFT => Some(Side::Left),
            b'd' | KEY_ARROW_RIGHT => Some(Side::Right),
            _ => None,
        };
        let speed = match key {
            b'z' => Some(SpeedAdjust::Faster),
            b's' => Some(SpeedAdjust::Slower),
            _ => None,
        };
        TickInput { mode, steer, speed }
    }

    pub fn is_quit(key: u8) -> bool {
        key == KEY_QUIT
    }

    /// Record the key read by the event loop for the next poll
    pub fn press(&mut self, key: u8) {
        self.pending = (key != KEY_NONE).then_some(key);
    }
}

impl InputSource for KeyboardInput {
    fn poll(&mut self) -> TickInput {
        self.pending.take().map(Self::translate).unwrap_or_default()
    }
}

/// Hand gesture bindings: the number of raised fingers selects the mode
///
/// A missing hand counts as zero fingers. Four or more fingers request
/// nothing and leave the current mode in place.
#[derive(Debug, Clone, Default)]
pub struct GestureInput {
    fingers: Option<u8>,
    steer: Option<Side>,
}

impl GestureInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode_for_fingers(fingers: Option<u8>) -> Option<Mode> {
        match fingers {
            None | Some(0) => Some(Mode::Manual),
            Some(1) => Some(Mode::AdaptiveCruise),
            Some(2) => Some(Mode::LaneKeep),
            Some(3) => Some(Mode::Emergency),
            Some(_) => None,
        }
    }

    /// Latest classifier reading; `None` when no hand is visible
    pub fn observe(&mut self, fingers: Option<u8>) {
        self.fingers = fingers;
    }

    /// Steering still comes from the keyboard alongside gestures
    pub fn steer(&mut self, side: Side) {
        self.steer = Some(side);
    }
}

impl InputSource for GestureInput {
    fn poll(&mut self) -> TickInput {
        TickInput {
            mode: Self::mode_for_fingers(self.fingers),
            steer: self.steer.take(),
            speed: None,
        }
    }
}

/// Replays a fixed sequence of inputs, then reports no requests
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    queue: VecDeque<TickInput>,
}

impl ScriptedInput {
    pub fn new(inputs: impl IntoIterator<Item = TickInput>) -> Self {
        Self {
            queue: inputs.into_iter().collect(),
        }
    }

    /// Queue `ticks` empty inputs
    pub fn idle(&mut self, ticks: usize) -> &mut Self {
        self.queue.extend(std::iter::repeat(TickInput::default()).take(ticks));
        self
    }

    pub fn then(&mut self, input: TickInput) -> &mut Self {
        self.queue.push_back(input);
        self
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self) -> TickInput {
        self.queue.pop_front().unwrap_or_default()
    }
}
