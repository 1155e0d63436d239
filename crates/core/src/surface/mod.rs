use std::{fmt, rc::Rc};

use crate::{
    InputEvents, LoopOptions, MarqueeConfig, MotionError, Result, ScrollViewport, TransformTarget,
};

/// A marquee element hosted by a surface.
#[derive(Clone)]
pub struct MarqueeSlot {
    pub label: String,
    pub target: Rc<dyn TransformTarget>,
    /// Per-slot override of the configured marquee options.
    pub options: Option<LoopOptions>,
}

impl fmt::Debug for MarqueeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarqueeSlot")
            .field("label", &self.label)
            .field("options", &self.options)
            .finish()
    }
}

/// Everything a mounted page section lends to the motion core: its scroll
/// viewport, its input source and the marquee elements it renders.
#[derive(Clone)]
pub struct Surface {
    name: String,
    viewport: Rc<dyn ScrollViewport>,
    input: Rc<dyn InputEvents>,
    marquees: Vec<MarqueeSlot>,
}

impl Surface {
    pub fn new(
        name: impl Into<String>,
        viewport: Rc<dyn ScrollViewport>,
        input: Rc<dyn InputEvents>,
    ) -> Self {
        Self {
            name: name.into(),
            viewport,
            input,
            marquees: Vec::new(),
        }
    }

    /// Adds a marquee driven by the binder's configured options.
    pub fn with_marquee(self, label: impl Into<String>, target: Rc<dyn TransformTarget>) -> Self {
        self.push_marquee(label.into(), target, None)
    }

    pub fn with_marquee_options(
        self,
        label: impl Into<String>,
        target: Rc<dyn TransformTarget>,
        options: LoopOptions,
    ) -> Self {
        self.push_marquee(label.into(), target, Some(options))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn viewport(&self) -> Rc<dyn ScrollViewport> {
        self.viewport.clone()
    }

    pub fn input(&self) -> Rc<dyn InputEvents> {
        self.input.clone()
    }

    pub fn marquees(&self) -> &[MarqueeSlot] {
        &self.marquees
    }

    fn push_marquee(
        mut self,
        label: String,
        target: Rc<dyn TransformTarget>,
        options: Option<LoopOptions>,
    ) -> Self {
        self.marquees.push(MarqueeSlot {
            label,
            target,
            options,
        });
        self
    }
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("name", &self.name)
            .field("marquees", &self.marquees)
            .finish()
    }
}

/// A content block repeated back to back so a looping translation can wrap
/// without a visible seam.
///
/// With `copies` contiguous copies, translating by `100 / copies` percent of
/// the whole strip lands exactly on the start of the next copy.
#[derive(Debug, Clone, PartialEq)]
pub struct MarqueeStrip<T> {
    block: Vec<T>,
    copies: usize,
}

impl<T> MarqueeStrip<T> {
    pub fn new(block: Vec<T>, copies: usize) -> Result<Self> {
        if block.is_empty() {
            return Err(MotionError::configuration("marquee content block is empty"));
        }
        if copies < 2 {
            return Err(MotionError::configuration(format!(
                "marquee needs at least 2 copies of its content, got {copies}"
            )));
        }
        Ok(Self { block, copies })
    }

    /// The usual layout: the block followed by one duplicate.
    pub fn doubled(block: Vec<T>) -> Result<Self> {
        Self::new(block, 2)
    }

    /// Items in render order.
    pub fn items(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.copies).flat_map(move |_| self.block.iter())
    }

    pub fn len(&self) -> usize {
        self.block.len() * self.copies
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn block_len(&self) -> usize {
        self.block.len()
    }

    pub fn copies(&self) -> usize {
        self.copies
    }

    pub fn shift_percent(&self) -> f64 {
        100.0 / self.copies as f64
    }

    /// Loop options for this strip, keeping timing from `config`.
    pub fn loop_options(&self, config: &MarqueeConfig) -> LoopOptions {
        LoopOptions {
            shift_percent: self.shift_percent(),
            ..config.loop_options()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Direction, MemoryElement, MemoryInput, MemoryViewport};

    #[test]
    fn doubled_strip_repeats_block_and_wraps_at_half() {
        let strip = MarqueeStrip::doubled(vec!["TypeScript", "React.js", "Next.js"]).unwrap();

        let items: Vec<_> = strip.items().copied().collect();
        assert_eq!(
            items,
            vec!["TypeScript", "React.js", "Next.js", "TypeScript", "React.js", "Next.js"]
        );
        assert_eq!(strip.len(), 6);
        assert_eq!(strip.shift_percent(), 50.0);
    }

    #[test]
    fn more_copies_shorten_the_wrap() {
        let strip = MarqueeStrip::new(vec![1, 2], 4).unwrap();
        assert_eq!(strip.shift_percent(), 25.0);

        let config = MarqueeConfig {
            duration_seconds: 12.0,
            direction: Direction::Reverse,
            shift_percent: 50.0,
        };
        let options = strip.loop_options(&config);
        assert_eq!(options.shift_percent, 25.0);
        assert_eq!(options.duration_seconds, 12.0);
        assert_eq!(options.direction, Direction::Reverse);
    }

    #[test]
    fn rejects_strips_that_cannot_wrap_seamlessly() {
        assert!(MarqueeStrip::new(vec![1], 1).is_err());
        assert!(MarqueeStrip::<u8>::new(Vec::new(), 2).is_err());
    }

    #[test]
    fn surface_collects_marquees() {
        let surface = Surface::new(
            "home",
            Rc::new(MemoryViewport::new(100.0)),
            Rc::new(MemoryInput::new()),
        )
        .with_marquee("tech", Rc::new(MemoryElement::new("techScroller")))
        .with_marquee_options(
            "clients",
            Rc::new(MemoryElement::new("clients")),
            LoopOptions::default(),
        );

        assert_eq!(surface.name(), "home");
        assert_eq!(surface.marquees().len(), 2);
        assert!(surface.marquees()[0].options.is_none());
        assert_eq!(surface.marquees()[1].label, "clients");
    }
}
