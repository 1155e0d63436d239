//! Ties the scroll engine and marquee loops to a surface's mount state.
//!
//! Every successful [`LifecycleBinder::bind`] is paired with exactly one
//! teardown, either an explicit [`LifecycleBinder::unbind`], the implicit one
//! performed by re-binding, or the one run on drop. After teardown no frame
//! callback owned by the binding may fire.

use std::{fmt, rc::Rc};

use serde::Serialize;

use crate::{
    FrameHandle, FrameLoop, FrameScheduler, LoopAnimationController, MotionConfig, Result,
    ScrollInterpolationEngine, SharedScrollEngine, Surface,
};

/// Diagnostic raised when a frame registration outlives its binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeakWarning {
    pub surface: String,
    /// `scroll` or the marquee label that owned the registration.
    pub owner: String,
    pub handle: FrameHandle,
}

impl fmt::Display for LeakWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} registration {} still pending after unbinding `{}`",
            self.owner, self.handle, self.surface
        )
    }
}

struct Binding {
    surface: String,
    engine: SharedScrollEngine,
    scroll_loop: FrameLoop,
    controllers: Vec<LoopAnimationController>,
}

impl Binding {
    fn owned_handles(&self) -> Vec<(String, FrameHandle)> {
        let scroll = self
            .scroll_loop
            .handle()
            .map(|handle| ("scroll".to_string(), handle));
        let loops = self.controllers.iter().filter_map(|controller| {
            controller
                .frame_handle()
                .map(|handle| (controller.label().to_string(), handle))
        });
        scroll.into_iter().chain(loops).collect()
    }

    /// Cancel first so no callback can reach the engine once it is disposed.
    fn release(mut self) {
        self.scroll_loop.cancel();
        self.engine.borrow_mut().dispose();
        for controller in &mut self.controllers {
            controller.stop();
        }
    }
}

pub struct LifecycleBinder {
    config: MotionConfig,
    scheduler: Rc<dyn FrameScheduler>,
    binding: Option<Binding>,
    leak_warnings: Vec<LeakWarning>,
    binds: u64,
    unbinds: u64,
}

impl LifecycleBinder {
    pub fn new(config: MotionConfig, scheduler: Rc<dyn FrameScheduler>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            scheduler,
            binding: None,
            leak_warnings: Vec::new(),
            binds: 0,
            unbinds: 0,
        })
    }

    /// Activates `surface`: builds the scroll engine, starts its self-chaining
    /// frame loop, then starts one loop animation per marquee slot.
    ///
    /// A binder that is already bound tears the previous surface down first.
    /// If any step fails, everything acquired so far is released.
    pub fn bind(&mut self, surface: &Surface) -> Result<()> {
        if let Some(previous) = self.surface_name().map(str::to_owned) {
            tracing::warn!(
                previous = %previous,
                next = surface.name(),
                "bind on an active binder, unbinding first"
            );
            self.unbind();
        }

        let engine = ScrollInterpolationEngine::initialize(
            &self.config.scroll,
            surface.viewport(),
            surface.input(),
        )?;

        let ticking = Rc::downgrade(&engine);
        let scroll_loop = FrameLoop::start(self.scheduler.clone(), move |timestamp_ms| {
            let Some(engine) = ticking.upgrade() else {
                return;
            };
            match engine.try_borrow_mut() {
                Ok(mut engine) => engine.tick(timestamp_ms),
                Err(_) => tracing::warn!(timestamp_ms, "scroll engine busy, frame skipped"),
            };
        });

        let mut binding = Binding {
            surface: surface.name().to_string(),
            engine,
            scroll_loop,
            controllers: Vec::with_capacity(surface.marquees().len()),
        };

        for slot in surface.marquees() {
            let options = slot
                .options
                .unwrap_or_else(|| self.config.marquee.loop_options());
            let mut controller = LoopAnimationController::new(slot.label.clone());
            if let Err(err) = controller.start(slot.target.clone(), &options, self.scheduler.clone())
            {
                tracing::warn!(surface = surface.name(), marquee = %slot.label, %err, "bind rolled back");
                binding.release();
                return Err(err);
            }
            binding.controllers.push(controller);
        }

        tracing::debug!(
            surface = surface.name(),
            marquees = binding.controllers.len(),
            "surface bound"
        );
        self.binding = Some(binding);
        self.binds += 1;
        Ok(())
    }

    /// Deactivates the bound surface. Unbinding an idle binder is a no-op.
    ///
    /// Returns the number of leak warnings raised by this call.
    pub fn unbind(&mut self) -> usize {
        let Some(binding) = self.binding.take() else {
            tracing::trace!("unbind on an idle binder");
            return 0;
        };

        let surface = binding.surface.clone();
        let owned = binding.owned_handles();
        binding.release();
        self.unbinds += 1;

        let mut leaks = 0;
        for (owner, handle) in owned {
            if self.scheduler.is_pending(handle) {
                let warning = LeakWarning {
                    surface: surface.clone(),
                    owner,
                    handle,
                };
                tracing::warn!(%warning, "frame registration leaked");
                self.leak_warnings.push(warning);
                leaks += 1;
            }
        }

        tracing::debug!(surface = %surface, leaks, "surface unbound");
        leaks
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    pub fn surface_name(&self) -> Option<&str> {
        self.binding.as_ref().map(|binding| binding.surface.as_str())
    }

    /// Registration that will drive the next scroll tick.
    pub fn scroll_frame_handle(&self) -> Option<FrameHandle> {
        self.binding
            .as_ref()
            .and_then(|binding| binding.scroll_loop.handle())
    }

    pub fn engine(&self) -> Option<SharedScrollEngine> {
        self.binding.as_ref().map(|binding| binding.engine.clone())
    }

    pub fn controllers(&self) -> &[LoopAnimationController] {
        match self.binding.as_ref() {
            Some(binding) => binding.controllers.as_slice(),
            None => &[],
        }
    }

    pub fn controllers_mut(&mut self) -> &mut [LoopAnimationController] {
        match self.binding.as_mut() {
            Some(binding) => binding.controllers.as_mut_slice(),
            None => &mut [],
        }
    }

    pub fn leak_warnings(&self) -> &[LeakWarning] {
        &self.leak_warnings
    }

    pub fn take_leak_warnings(&mut self) -> Vec<LeakWarning> {
        std::mem::take(&mut self.leak_warnings)
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    /// Completed `(bind, unbind)` counts.
    pub fn cycle_counts(&self) -> (u64, u64) {
        (self.binds, self.unbinds)
    }
}

impl Drop for LifecycleBinder {
    fn drop(&mut self) {
        self.unbind();
    }
}

impl fmt::Debug for LifecycleBinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleBinder")
            .field("surface", &self.surface_name())
            .field("scroll_frame_handle", &self.scroll_frame_handle())
            .field("controllers", &self.controllers())
            .field("leak_warnings", &self.leak_warnings.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::{Cell, RefCell},
        collections::BTreeMap,
    };

    use super::*;
    use crate::{
        FrameCallback, InputEvent, LoopOptions, LoopState, ManualFrameScheduler, MemoryElement,
        MemoryInput, MemoryViewport, ScrollViewport,
    };

    struct Page {
        surface: Surface,
        viewport: Rc<MemoryViewport>,
        input: Rc<MemoryInput>,
        marquee: Option<Rc<MemoryElement>>,
    }

    fn page(name: &str, with_marquee: bool) -> Page {
        let viewport = Rc::new(MemoryViewport::new(4_000.0));
        let input = Rc::new(MemoryInput::new());
        let mut surface = Surface::new(name, viewport.clone(), input.clone());
        let mut marquee = None;
        if with_marquee {
            let element = Rc::new(MemoryElement::new("techScroller"));
            surface = surface.with_marquee("tech-stack", element.clone());
            marquee = Some(element);
        }
        Page {
            surface,
            viewport,
            input,
            marquee,
        }
    }

    fn binder(scheduler: &Rc<ManualFrameScheduler>) -> LifecycleBinder {
        LifecycleBinder::new(MotionConfig::default(), scheduler.clone()).unwrap()
    }

    #[test]
    fn bind_then_unbind_leaves_no_registrations() {
        let scheduler = Rc::new(ManualFrameScheduler::new());
        let mut binder = binder(&scheduler);
        let home = page("home", true);

        binder.bind(&home.surface).unwrap();
        assert_eq!(scheduler.pending_count(), 2);
        assert_eq!(home.input.listener_count(), 1);

        assert_eq!(binder.unbind(), 0);
        assert_eq!(scheduler.pending_count(), 0);
        assert_eq!(home.input.listener_count(), 0);
        assert!(binder.leak_warnings().is_empty());
        assert!(!binder.is_bound());
    }

    #[test]
    fn unbind_twice_is_harmless() {
        let scheduler = Rc::new(ManualFrameScheduler::new());
        let mut binder = binder(&scheduler);
        binder.bind(&page("home", false).surface).unwrap();

        binder.unbind();
        assert_eq!(binder.unbind(), 0);
        assert_eq!(binder.cycle_counts(), (1, 1));
    }

    #[test]
    fn rebinding_leaves_exactly_the_new_engine_loop() {
        let scheduler = Rc::new(ManualFrameScheduler::new());
        let mut binder = binder(&scheduler);
        let a = page("surfaceA", true);
        let b = page("surfaceB", false);

        binder.bind(&a.surface).unwrap();
        binder.unbind();
        binder.bind(&b.surface).unwrap();

        let handle = binder.scroll_frame_handle().unwrap();
        assert_eq!(scheduler.pending_handles(), vec![handle]);
        assert_eq!(binder.surface_name(), Some("surfaceB"));

        a.input.emit(InputEvent::wheel(500.0));
        b.input.emit(InputEvent::wheel(500.0));
        scheduler.run_frames(16.0, 16.0, 10);

        assert_eq!(a.viewport.writes(), 0);
        assert!(b.viewport.scroll_offset() > 0.0);
        assert_eq!(a.marquee.unwrap().translate_x_percent(), 0.0);
        assert_eq!(scheduler.pending_handles().len(), 1);
    }

    #[test]
    fn repeated_navigation_never_stacks_loops() {
        let scheduler = Rc::new(ManualFrameScheduler::new());
        let mut binder = binder(&scheduler);
        let pages = [page("home", true), page("projects", false)];

        let mut now = 0.0;
        for cycle in 0..12 {
            let current = &pages[cycle % 2];
            binder.bind(&current.surface).unwrap();
            let expected = 1 + current.surface.marquees().len();
            for _ in 0..5 {
                now += 16.0;
                assert_eq!(scheduler.run_frame(now), expected);
            }
            binder.unbind();
            assert_eq!(scheduler.pending_count(), 0);
        }
        assert_eq!(binder.cycle_counts(), (12, 12));
    }

    #[test]
    fn bind_on_bound_binder_unbinds_previous_surface() {
        let scheduler = Rc::new(ManualFrameScheduler::new());
        let mut binder = binder(&scheduler);
        let a = page("a", true);
        let b = page("b", true);

        binder.bind(&a.surface).unwrap();
        binder.bind(&b.surface).unwrap();

        assert_eq!(scheduler.pending_count(), 2);
        assert_eq!(a.input.listener_count(), 0);
        assert_eq!(b.input.listener_count(), 1);
        assert_eq!(binder.cycle_counts(), (2, 1));
    }

    #[test]
    fn frames_drive_scroll_and_marquee_independently() {
        let scheduler = Rc::new(ManualFrameScheduler::new());
        let mut binder = binder(&scheduler);
        let home = page("home", true);
        binder.bind(&home.surface).unwrap();

        binder
            .engine()
            .unwrap()
            .borrow_mut()
            .scroll_to(1_000.0, false)
            .unwrap();
        // 10 seconds of frames at 16ms.
        scheduler.run_frames(0.0, 16.0, 626);

        assert!((home.viewport.scroll_offset() - 1_000.0).abs() < 1.0);
        let marquee = home.marquee.as_ref().unwrap();
        assert!((marquee.translate_x_percent() + 25.0).abs() < 1e-6);
        assert!((binder.controllers()[0].progress() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn no_frame_reaches_the_engine_after_unbind() {
        let scheduler = Rc::new(ManualFrameScheduler::new());
        let mut binder = binder(&scheduler);
        let home = page("home", true);
        binder.bind(&home.surface).unwrap();
        let engine = binder.engine().unwrap();
        engine.borrow_mut().scroll_to(800.0, false).unwrap();
        scheduler.run_frames(0.0, 16.0, 3);

        binder.unbind();
        let writes = home.viewport.writes();
        let transform = home.marquee.as_ref().unwrap().translate_x_percent();
        scheduler.run_frames(100.0, 16.0, 20);

        assert_eq!(home.viewport.writes(), writes);
        assert_eq!(home.marquee.unwrap().translate_x_percent(), transform);
        assert!(engine.borrow().is_disposed());
        assert!(engine.borrow_mut().try_tick(10_000.0).is_err());
    }

    #[test]
    fn controllers_can_be_paused_while_bound() {
        let scheduler = Rc::new(ManualFrameScheduler::new());
        let mut binder = binder(&scheduler);
        binder.bind(&page("home", true).surface).unwrap();

        binder.controllers_mut()[0].pause().unwrap();
        assert_eq!(scheduler.pending_count(), 1);
        assert_eq!(binder.controllers()[0].state(), LoopState::Paused);

        binder.unbind();
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn failed_marquee_start_rolls_back_everything() {
        let scheduler = Rc::new(ManualFrameScheduler::new());
        let mut binder = binder(&scheduler);
        let viewport = Rc::new(MemoryViewport::new(1_000.0));
        let input = Rc::new(MemoryInput::new());
        let surface = Surface::new("broken", viewport, input.clone())
            .with_marquee("ok", Rc::new(MemoryElement::new("ok")))
            .with_marquee_options(
                "bad",
                Rc::new(MemoryElement::new("bad")),
                LoopOptions {
                    duration_seconds: -1.0,
                    ..LoopOptions::default()
                },
            );

        assert!(binder.bind(&surface).is_err());
        assert!(!binder.is_bound());
        assert_eq!(scheduler.pending_count(), 0);
        assert_eq!(input.listener_count(), 0);
        assert_eq!(binder.cycle_counts(), (0, 0));
    }

    #[test]
    fn rejects_invalid_configuration_up_front() {
        let scheduler = Rc::new(ManualFrameScheduler::new());
        let mut config = MotionConfig::default();
        config.scroll.lerp = 0.0;
        assert!(LifecycleBinder::new(config, scheduler).is_err());
    }

    #[test]
    fn dropping_the_binder_unbinds() {
        let scheduler = Rc::new(ManualFrameScheduler::new());
        let home = page("home", true);
        {
            let mut binder = binder(&scheduler);
            binder.bind(&home.surface).unwrap();
        }
        assert_eq!(scheduler.pending_count(), 0);
        assert_eq!(home.input.listener_count(), 0);
    }

    /// Scheduler whose `cancel` does nothing, standing in for a broken host.
    #[derive(Default)]
    struct StickyScheduler {
        pending: RefCell<BTreeMap<FrameHandle, FrameCallback>>,
        next_id: Cell<u64>,
    }

    impl FrameScheduler for StickyScheduler {
        fn register_once(&self, callback: FrameCallback) -> FrameHandle {
            let handle = FrameHandle::new(self.next_id.get());
            self.next_id.set(handle.id() + 1);
            self.pending.borrow_mut().insert(handle, callback);
            handle
        }

        fn cancel(&self, _handle: FrameHandle) {}

        fn is_pending(&self, handle: FrameHandle) -> bool {
            self.pending.borrow().contains_key(&handle)
        }
    }

    #[test]
    fn surviving_registrations_raise_leak_warnings() {
        let scheduler = Rc::new(StickyScheduler::default());
        let mut binder = LifecycleBinder::new(MotionConfig::default(), scheduler).unwrap();
        let home = page("home", true);

        binder.bind(&home.surface).unwrap();
        assert_eq!(binder.unbind(), 2);

        let warnings = binder.take_leak_warnings();
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].owner, "scroll");
        assert_eq!(warnings[1].owner, "tech-stack");
        assert!(warnings[0].to_string().contains("home"));
        assert!(binder.leak_warnings().is_empty());
    }
}
