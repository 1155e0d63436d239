//! Smooth-scroll interpolation.
//!
//! Input deltas accumulate into a target offset; every frame the virtual
//! offset closes a fixed fraction of the remaining distance (a first-order
//! low-pass filter) and the result is written to the host viewport.

use std::{cell::RefCell, fmt, rc::Rc};

use serde::{Deserialize, Serialize};

use crate::{
    InputEvent, InputEvents, InputSourceKind, ListenerId, MotionError, Result, ScrollConfig,
    ScrollViewport,
};

/// Engine shared between the frame loop and the input listener.
pub type SharedScrollEngine = Rc<RefCell<ScrollInterpolationEngine>>;

/// Snapshot of the interpolation state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrollState {
    /// Eased position; this is what the viewport shows.
    pub virtual_offset: f64,
    /// Un-eased position accumulated from input.
    pub target_offset: f64,
    pub lerp_factor: f64,
    pub wheel_multiplier: f64,
    pub touch_multiplier: f64,
    pub is_infinite: bool,
}

pub struct ScrollInterpolationEngine {
    state: ScrollState,
    smooth_wheel: bool,
    snap_epsilon: f64,
    viewport: Rc<dyn ScrollViewport>,
    listener: Option<(Rc<dyn InputEvents>, ListenerId)>,
    last_timestamp: Option<f64>,
    velocity: f64,
    disposed: bool,
}

impl ScrollInterpolationEngine {
    /// Builds an engine positioned at the viewport's current offset. The engine
    /// does not tick on its own and listens to nothing until [`Self::listen`].
    pub fn new(config: &ScrollConfig, viewport: Rc<dyn ScrollViewport>) -> Result<Self> {
        config.validate()?;

        let start = viewport.scroll_offset();
        Ok(Self {
            state: ScrollState {
                virtual_offset: start,
                target_offset: start,
                lerp_factor: config.lerp,
                wheel_multiplier: config.wheel_multiplier,
                touch_multiplier: config.touch_multiplier,
                is_infinite: config.infinite,
            },
            smooth_wheel: config.smooth_wheel,
            snap_epsilon: config.snap_epsilon,
            viewport,
            listener: None,
            last_timestamp: None,
            velocity: 0.0,
            disposed: false,
        })
    }

    /// Builds a shared engine already subscribed to `input`.
    pub fn initialize(
        config: &ScrollConfig,
        viewport: Rc<dyn ScrollViewport>,
        input: Rc<dyn InputEvents>,
    ) -> Result<SharedScrollEngine> {
        let engine = Rc::new(RefCell::new(Self::new(config, viewport)?));
        Self::listen(&engine, input);
        Ok(engine)
    }

    /// Subscribes the engine to an input source. The listener only holds a weak
    /// reference, and [`Self::dispose`] removes it.
    pub fn listen(engine: &SharedScrollEngine, input: Rc<dyn InputEvents>) {
        let weak = Rc::downgrade(engine);
        let id = input.subscribe(Rc::new(move |event: InputEvent| {
            let Some(engine) = weak.upgrade() else {
                return;
            };
            match engine.try_borrow_mut() {
                Ok(mut engine) => engine.on_input(event),
                Err(_) => tracing::warn!(?event, "scroll engine busy, input dropped"),
            };
        }));

        let previous = engine.borrow_mut().listener.replace((input, id));
        if let Some((input, id)) = previous {
            input.unsubscribe(id);
        }
    }

    /// Merges a raw delta into the target offset.
    pub fn on_input(&mut self, event: InputEvent) {
        if self.disposed {
            tracing::trace!(?event, "input after dispose ignored");
            return;
        }

        let multiplier = match event.source {
            InputSourceKind::Wheel => self.state.wheel_multiplier,
            InputSourceKind::Touch => self.state.touch_multiplier,
        };
        let delta = event.delta_y * multiplier;
        if delta == 0.0 || !delta.is_finite() {
            return;
        }

        self.state.target_offset = self.constrain(self.state.target_offset + delta);
        if event.source == InputSourceKind::Wheel && !self.smooth_wheel {
            self.jump_to_target();
        }
    }

    /// Moves the target to `offset`. With `immediate` the viewport jumps there
    /// at once instead of easing.
    pub fn scroll_to(&mut self, offset: f64, immediate: bool) -> Result<()> {
        self.ensure_live("scroll_to")?;
        if !offset.is_finite() {
            return Err(MotionError::configuration(format!(
                "scroll target must be finite, got {offset}"
            )));
        }

        self.state.target_offset = self.constrain(offset);
        if immediate {
            self.jump_to_target();
        }
        Ok(())
    }

    /// Advances one frame. Stale timestamps and calls after disposal are
    /// silently ignored.
    pub fn tick(&mut self, timestamp_ms: f64) {
        if let Err(err) = self.try_tick(timestamp_ms) {
            tracing::debug!(%err, "scroll tick ignored");
        }
    }

    /// Like [`Self::tick`] but reports use after disposal.
    pub fn try_tick(&mut self, timestamp_ms: f64) -> Result<()> {
        self.ensure_live("tick")?;
        if !timestamp_ms.is_finite() {
            return Ok(());
        }
        if matches!(self.last_timestamp, Some(last) if timestamp_ms <= last) {
            return Ok(());
        }
        self.last_timestamp = Some(timestamp_ms);

        let before = self.state.virtual_offset;
        if !self.state.is_infinite {
            // The content extent can shrink between frames.
            let limit = self.viewport.scroll_limit().max(0.0);
            self.state.target_offset = self.state.target_offset.clamp(0.0, limit);
            self.state.virtual_offset = self.state.virtual_offset.clamp(0.0, limit);
        }
        let target = self.state.target_offset;
        let mut next = self.state.virtual_offset;
        next += (target - next) * self.state.lerp_factor;
        if (target - next).abs() < self.snap_epsilon {
            next = target;
        }

        self.state.virtual_offset = next;
        self.velocity = next - before;
        if self.velocity != 0.0 {
            self.apply();
            tracing::trace!(timestamp_ms, offset = next, target, "scroll tick");
        }
        Ok(())
    }

    /// Releases the input subscription and makes the engine inert.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.velocity = 0.0;
        if let Some((input, id)) = self.listener.take() {
            input.unsubscribe(id);
        }
        tracing::debug!(offset = self.state.virtual_offset, "scroll engine disposed");
    }

    pub fn state(&self) -> ScrollState {
        self.state
    }

    pub fn virtual_offset(&self) -> f64 {
        self.state.virtual_offset
    }

    pub fn target_offset(&self) -> f64 {
        self.state.target_offset
    }

    /// Offset change applied by the most recent tick.
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn is_scrolling(&self) -> bool {
        self.state.virtual_offset != self.state.target_offset
    }

    /// Position within the scrollable range, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        let limit = self.viewport.scroll_limit();
        if limit <= 0.0 {
            return 0.0;
        }
        (self.visible_offset() / limit).clamp(0.0, 1.0)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn is_listening(&self) -> bool {
        self.listener.is_some()
    }

    fn ensure_live(&self, operation: &str) -> Result<()> {
        if self.disposed {
            Err(MotionError::lifecycle(format!(
                "{operation} called on a disposed scroll engine"
            )))
        } else {
            Ok(())
        }
    }

    fn jump_to_target(&mut self) {
        self.velocity = self.state.target_offset - self.state.virtual_offset;
        self.state.virtual_offset = self.state.target_offset;
        self.apply();
    }

    fn constrain(&self, offset: f64) -> f64 {
        if self.state.is_infinite {
            offset
        } else {
            offset.clamp(0.0, self.viewport.scroll_limit().max(0.0))
        }
    }

    fn visible_offset(&self) -> f64 {
        let limit = self.viewport.scroll_limit();
        if !self.state.is_infinite {
            return self.state.virtual_offset.clamp(0.0, limit.max(0.0));
        }
        if limit <= 0.0 {
            0.0
        } else {
            self.state.virtual_offset.rem_euclid(limit)
        }
    }

    fn apply(&self) {
        self.viewport.set_scroll_offset(self.visible_offset());
    }
}

impl Drop for ScrollInterpolationEngine {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for ScrollInterpolationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrollInterpolationEngine")
            .field("state", &self.state)
            .field("smooth_wheel", &self.smooth_wheel)
            .field("snap_epsilon", &self.snap_epsilon)
            .field("listening", &self.is_listening())
            .field("disposed", &self.disposed)
            .finish()
    }
}
