//! Infinite linear loop animations.
//!
//! A [`LoopTimeline`] is a pure phase accumulator. The
//! [`LoopAnimationController`] wraps it with a state machine, a frame loop and
//! the element it writes translations to.

use std::{cell::RefCell, fmt, rc::Rc};

use serde::{Deserialize, Serialize};

use crate::{FrameHandle, FrameLoop, FrameScheduler, MotionError, Result, TransformTarget};

/// Which way the strip travels. `left` moves content toward negative x.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "left", alias = "forward")]
    Forward,
    #[serde(rename = "right", alias = "reverse")]
    Reverse,
}

/// Options accepted by [`LoopAnimationController::start`]. The loop always
/// repeats forever.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopOptions {
    pub duration_seconds: f64,
    pub direction: Direction,
    /// Distance travelled per cycle, in percent of the strip width.
    pub shift_percent: f64,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            duration_seconds: 20.0,
            direction: Direction::Forward,
            shift_percent: 50.0,
        }
    }
}

impl LoopOptions {
    pub fn validate(&self) -> Result<()> {
        if !self.duration_seconds.is_finite() || self.duration_seconds <= 0.0 {
            return Err(MotionError::configuration(format!(
                "durationSeconds must be > 0, got {}",
                self.duration_seconds
            )));
        }
        if !self.shift_percent.is_finite()
            || self.shift_percent <= 0.0
            || self.shift_percent > 100.0
        {
            return Err(MotionError::configuration(format!(
                "shiftPercent must be in (0, 100], got {}",
                self.shift_percent
            )));
        }
        Ok(())
    }
}

/// Cyclic phase accumulator.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopTimeline {
    elapsed_seconds: f64,
    duration_seconds: f64,
    direction: Direction,
}

impl LoopTimeline {
    pub fn new(duration_seconds: f64, direction: Direction) -> Result<Self> {
        LoopOptions {
            duration_seconds,
            direction,
            ..LoopOptions::default()
        }
        .validate()?;

        Ok(Self {
            elapsed_seconds: 0.0,
            duration_seconds,
            direction,
        })
    }

    /// Moves the playhead forward. Negative or non-finite deltas are ignored.
    pub fn advance(&mut self, delta_seconds: f64) {
        if delta_seconds.is_finite() && delta_seconds > 0.0 {
            self.elapsed_seconds += delta_seconds;
        }
    }

    /// Current phase in `[0, 1)`. Reverse timelines count down from 1.
    pub fn progress(&self) -> f64 {
        let phase = (self.elapsed_seconds / self.duration_seconds).fract();
        match self.direction {
            Direction::Forward => phase,
            Direction::Reverse => {
                // `1 - phase` rounds up to 1 for phases below one ulp.
                let progress = 1.0 - phase;
                if progress >= 1.0 {
                    0.0
                } else {
                    progress
                }
            }
        }
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_seconds
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

/// Translation of a strip that wraps after `shift_percent`.
pub fn translate_percent(progress: f64, shift_percent: f64) -> f64 {
    -shift_percent * progress
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopState {
    Idle,
    Running,
    Paused,
    /// Terminal.
    Stopped,
}

struct Playback {
    state: LoopState,
    timeline: Option<LoopTimeline>,
    shift_percent: f64,
    target: Option<Rc<dyn TransformTarget>>,
    last_timestamp: Option<f64>,
    transform: f64,
}

impl Playback {
    fn on_frame(&mut self, timestamp_ms: f64) {
        if self.state != LoopState::Running || !timestamp_ms.is_finite() {
            return;
        }
        match self.last_timestamp {
            Some(last) if timestamp_ms <= last => return,
            Some(last) => self.advance((timestamp_ms - last) / 1_000.0),
            None => {}
        }
        self.last_timestamp = Some(timestamp_ms);
    }

    fn advance(&mut self, delta_seconds: f64) {
        if let Some(timeline) = self.timeline.as_mut() {
            timeline.advance(delta_seconds);
        }
        self.render();
    }

    fn progress(&self) -> f64 {
        self.timeline.as_ref().map_or(0.0, LoopTimeline::progress)
    }

    fn render(&mut self) {
        self.transform = translate_percent(self.progress(), self.shift_percent);
        if let Some(target) = &self.target {
            target.set_translate_x_percent(self.transform);
        }
    }
}

/// Drives one infinite marquee: `Idle → Running ⇄ Paused → Stopped`.
pub struct LoopAnimationController {
    label: String,
    playback: Rc<RefCell<Playback>>,
    scheduler: Option<Rc<dyn FrameScheduler>>,
    frame_loop: Option<FrameLoop>,
}

impl LoopAnimationController {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            playback: Rc::new(RefCell::new(Playback {
                state: LoopState::Idle,
                timeline: None,
                shift_percent: 0.0,
                target: None,
                last_timestamp: None,
                transform: 0.0,
            })),
            scheduler: None,
            frame_loop: None,
        }
    }

    /// Starts the loop from progress 0 and registers it with `scheduler`.
    pub fn start(
        &mut self,
        target: Rc<dyn TransformTarget>,
        options: &LoopOptions,
        scheduler: Rc<dyn FrameScheduler>,
    ) -> Result<()> {
        let state = self.state();
        if state != LoopState::Idle {
            return Err(MotionError::lifecycle(format!(
                "loop `{}` cannot start from {state:?}",
                self.label
            )));
        }
        options.validate()?;

        {
            let mut playback = self.playback.borrow_mut();
            playback.timeline = Some(LoopTimeline::new(
                options.duration_seconds,
                options.direction,
            )?);
            playback.shift_percent = options.shift_percent;
            playback.target = Some(target);
            playback.state = LoopState::Running;
            playback.render();
        }
        self.scheduler = Some(scheduler);
        self.arm();

        tracing::debug!(
            label = %self.label,
            duration_seconds = options.duration_seconds,
            direction = ?options.direction,
            "loop animation started"
        );
        Ok(())
    }

    /// Advances a running loop by wall-clock seconds, independent of frames.
    pub fn advance(&self, delta_seconds: f64) {
        let mut playback = self.playback.borrow_mut();
        if playback.state == LoopState::Running {
            playback.advance(delta_seconds);
        }
    }

    /// Translation in percent derived from the current progress. Frozen at the
    /// last value once the loop is stopped.
    pub fn current_transform(&self) -> f64 {
        self.playback.borrow().transform
    }

    /// Like [`Self::current_transform`] but fails when the loop is not live.
    pub fn try_current_transform(&self) -> Result<f64> {
        let playback = self.playback.borrow();
        match playback.state {
            LoopState::Running | LoopState::Paused => Ok(playback.transform),
            state => Err(MotionError::lifecycle(format!(
                "transform of loop `{}` read while {state:?}",
                self.label
            ))),
        }
    }

    pub fn progress(&self) -> f64 {
        self.playback.borrow().progress()
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.playback
            .borrow()
            .timeline
            .as_ref()
            .map_or(0.0, LoopTimeline::elapsed_seconds)
    }

    /// Holds progress and releases the frame registration.
    pub fn pause(&mut self) -> Result<()> {
        self.transition(LoopState::Running, LoopState::Paused)?;
        self.disarm();
        tracing::debug!(label = %self.label, progress = self.progress(), "loop animation paused");
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        self.transition(LoopState::Paused, LoopState::Running)?;
        self.arm();
        tracing::debug!(label = %self.label, progress = self.progress(), "loop animation resumed");
        Ok(())
    }

    /// Halts progress and releases the frame registration. Safe to repeat.
    pub fn stop(&mut self) {
        let previous = {
            let mut playback = self.playback.borrow_mut();
            std::mem::replace(&mut playback.state, LoopState::Stopped)
        };
        self.disarm();
        self.scheduler = None;
        if matches!(previous, LoopState::Running | LoopState::Paused) {
            tracing::debug!(label = %self.label, "loop animation stopped");
        }
    }

    pub fn state(&self) -> LoopState {
        self.playback.borrow().state
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Registration that will drive the next frame, if any.
    pub fn frame_handle(&self) -> Option<FrameHandle> {
        self.frame_loop.as_ref().and_then(FrameLoop::handle)
    }

    fn transition(&self, from: LoopState, to: LoopState) -> Result<()> {
        let mut playback = self.playback.borrow_mut();
        if playback.state != from {
            return Err(MotionError::lifecycle(format!(
                "loop `{}` cannot move to {to:?} from {:?}",
                self.label, playback.state
            )));
        }
        playback.state = to;
        Ok(())
    }

    fn arm(&mut self) {
        let Some(scheduler) = self.scheduler.clone() else {
            return;
        };
        self.playback.borrow_mut().last_timestamp = None;
        let playback = self.playback.clone();
        self.frame_loop = Some(FrameLoop::start(scheduler, move |timestamp_ms| {
            playback.borrow_mut().on_frame(timestamp_ms);
        }));
    }

    fn disarm(&mut self) {
        if let Some(frame_loop) = self.frame_loop.take() {
            frame_loop.cancel();
        }
    }
}

impl Drop for LoopAnimationController {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for LoopAnimationController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopAnimationController")
            .field("label", &self.label)
            .field("state", &self.state())
            .field("progress", &self.progress())
            .field("frame_handle", &self.frame_handle())
            .finish()
    }
}
