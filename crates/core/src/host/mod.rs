//! Capabilities the page host lends to the motion core.
//!
//! Everything here is single-threaded and shared through `Rc`, so setters take
//! `&self` and rely on interior mutability in the implementation.

mod memory;

use std::rc::Rc;

use serde::{Deserialize, Serialize};

pub use memory::{MemoryElement, MemoryInput, MemoryViewport};

/// Where a raw scroll delta came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputSourceKind {
    Wheel,
    Touch,
}

/// Raw `(deltaX, deltaY, sourceKind)` tuple emitted by the input source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputEvent {
    pub delta_x: f64,
    pub delta_y: f64,
    pub source: InputSourceKind,
}

impl InputEvent {
    pub fn wheel(delta_y: f64) -> Self {
        Self {
            delta_x: 0.0,
            delta_y,
            source: InputSourceKind::Wheel,
        }
    }

    pub fn touch(delta_y: f64) -> Self {
        Self {
            delta_x: 0.0,
            delta_y,
            source: InputSourceKind::Touch,
        }
    }
}

/// Identifies a subscription made through [`InputEvents::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(pub u64);

pub type InputListener = Rc<dyn Fn(InputEvent)>;

/// Source of wheel and touch deltas.
pub trait InputEvents {
    fn subscribe(&self, listener: InputListener) -> ListenerId;
    fn unsubscribe(&self, id: ListenerId);
}

/// The document scroll position, a single process-wide resource.
pub trait ScrollViewport {
    /// Largest reachable scroll offset (content extent minus viewport size).
    fn scroll_limit(&self) -> f64;
    fn set_scroll_offset(&self, offset: f64);
    fn scroll_offset(&self) -> f64;
}

/// Element whose horizontal translation is driven by a loop animation.
pub trait TransformTarget {
    /// Applies a translation expressed in percent of the element's own width.
    fn set_translate_x_percent(&self, percent: f64);
}
