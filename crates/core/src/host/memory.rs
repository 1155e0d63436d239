use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
    fmt,
};

use super::{InputEvent, InputEvents, InputListener, ListenerId, ScrollViewport, TransformTarget};

/// In-memory document scroll position.
#[derive(Debug, Default)]
pub struct MemoryViewport {
    limit: Cell<f64>,
    offset: Cell<f64>,
    writes: Cell<u64>,
}

impl MemoryViewport {
    pub fn new(limit: f64) -> Self {
        Self {
            limit: Cell::new(limit.max(0.0)),
            ..Default::default()
        }
    }

    pub fn set_limit(&self, limit: f64) {
        self.limit.set(limit.max(0.0));
    }

    /// Number of times the scroll position has been written.
    pub fn writes(&self) -> u64 {
        self.writes.get()
    }
}

impl ScrollViewport for MemoryViewport {
    fn scroll_limit(&self) -> f64 {
        self.limit.get()
    }

    fn set_scroll_offset(&self, offset: f64) {
        self.offset.set(offset);
        self.writes.set(self.writes.get() + 1);
    }

    fn scroll_offset(&self) -> f64 {
        self.offset.get()
    }
}

/// Input source that lets the caller inject events by hand.
#[derive(Default)]
pub struct MemoryInput {
    listeners: RefCell<BTreeMap<ListenerId, InputListener>>,
    next_id: Cell<u64>,
}

impl MemoryInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `event` to every current listener.
    pub fn emit(&self, event: InputEvent) {
        let listeners: Vec<InputListener> = self.listeners.borrow().values().cloned().collect();
        for listener in listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl InputEvents for MemoryInput {
    fn subscribe(&self, listener: InputListener) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().insert(id, listener);
        id
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.listeners.borrow_mut().remove(&id);
    }
}

impl fmt::Debug for MemoryInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryInput")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Element that records the last translation applied to it.
#[derive(Debug, Default)]
pub struct MemoryElement {
    id: String,
    translate_x_percent: Cell<f64>,
}

impl MemoryElement {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            translate_x_percent: Cell::new(0.0),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn translate_x_percent(&self) -> f64 {
        self.translate_x_percent.get()
    }
}

impl TransformTarget for MemoryElement {
    fn set_translate_x_percent(&self, percent: f64) {
        self.translate_x_percent.set(percent);
    }
}
