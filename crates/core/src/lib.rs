//! Animation orchestration core for the portfolio site.
//!
//! Two animation sources run side by side on the host's frame scheduler: a
//! smooth-scroll engine that eases the document scroll position toward the
//! offset requested by wheel and touch input, and infinite marquee loops that
//! translate duplicated content strips. [`LifecycleBinder`] ties both to a
//! surface's mount state so that nothing keeps running after teardown.

pub mod binder;
pub mod config;
pub mod error;
pub mod frame;
pub mod host;
pub mod scroll;
pub mod surface;
pub mod timeline;

pub use binder::{LeakWarning, LifecycleBinder};
pub use config::{MarqueeConfig, MotionConfig, ScrollConfig};
pub use error::{MotionError, Result};
pub use frame::{FrameCallback, FrameHandle, FrameLoop, FrameScheduler, ManualFrameScheduler};
pub use host::{
    InputEvent, InputEvents, InputListener, InputSourceKind, ListenerId, MemoryElement,
    MemoryInput, MemoryViewport, ScrollViewport, TransformTarget,
};
pub use scroll::{ScrollInterpolationEngine, ScrollState, SharedScrollEngine};
pub use surface::{MarqueeSlot, MarqueeStrip, Surface};
pub use timeline::{
    translate_percent, Direction, LoopAnimationController, LoopOptions, LoopState, LoopTimeline,
};
