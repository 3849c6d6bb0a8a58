//! Screen transitions
//!
//! A [`ScreenTransition`] covers the screen, holds it covered while a
//! background task runs, then reveals it again:
//!
//! ```text
//! Idle -> Covering -> Holding -> Revealing -> Idle
//! ```
//!
//! The task starts on a worker thread the moment holding begins. Holding ends
//! once the minimum hold time has passed and the worker has finished; the
//! worker's output is handed back from [`ScreenTransition::update`] on that
//! frame. Workers cannot be cancelled, only joined.

use std::fmt;
use std::thread::{self, JoinHandle};

use crate::core::config::EngineConfig;
use crate::core::events::Event;
use crate::core::time::FrameTime;
use crate::render::{Color, DrawCall, DrawSurface, Rect};
use crate::timing::Timer;

use super::document::SceneError;

/// Where a transition is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPhase {
    #[default]
    Idle,
    Covering,
    Holding,
    Revealing,
}

/// Visual drawn over the scene while a transition runs
pub trait TransitionEffect: Send {
    /// Draw at `coverage` in `[0, 1]`, where 1 hides the scene completely
    fn draw(
        &mut self,
        surface: &mut dyn DrawSurface,
        viewport: Rect,
        viewport_scale: f32,
        coverage: f32,
    );
}

/// Full-screen tint whose opacity follows the coverage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeEffect {
    pub color: Color,
    pub depth: f32,
}

impl FadeEffect {
    #[must_use]
    pub const fn new(color: Color) -> Self {
        Self { color, depth: 1.0 }
    }
}

impl Default for FadeEffect {
    fn default() -> Self {
        Self::new(Color::BLACK)
    }
}

impl TransitionEffect for FadeEffect {
    fn draw(
        &mut self,
        surface: &mut dyn DrawSurface,
        viewport: Rect,
        viewport_scale: f32,
        coverage: f32,
    ) {
        if coverage <= 0.0 {
            return;
        }
        surface.draw(DrawCall {
            texture: None,
            destination: Rect::from_position_size(
                viewport.position() * viewport_scale,
                viewport.size() * viewport_scale,
            ),
            tint: self.color.faded(coverage),
            depth: self.depth,
            alpha: coverage,
            ..DrawCall::default()
        });
    }
}

type Task<T> = Box<dyn FnOnce() -> T + Send>;

/// Cover, hold while a worker runs, reveal
pub struct ScreenTransition<T: Send + 'static> {
    phase: TransitionPhase,
    fade_timer: Timer,
    hold_timer: Timer,
    effect: Box<dyn TransitionEffect>,
    task: Option<Task<T>>,
    worker: Option<JoinHandle<T>>,
    /// Set when the worker could not be started
    finished: Option<Result<T, SceneError>>,
    pub transition_started: Event<()>,
    pub holding_started: Event<()>,
    pub holding_ended: Event<()>,
    pub transition_ended: Event<()>,
}

impl<T: Send + 'static> ScreenTransition<T> {
    /// Fade over `fade_ms` each way and hold for at least `hold_ms`
    pub fn new(fade_ms: u32, hold_ms: u32, effect: impl TransitionEffect + 'static) -> Self {
        Self {
            phase: TransitionPhase::Idle,
            fade_timer: Timer::new(fade_ms),
            hold_timer: Timer::new(hold_ms),
            effect: Box::new(effect),
            task: None,
            worker: None,
            finished: None,
            transition_started: Event::new(),
            holding_started: Event::new(),
            holding_ended: Event::new(),
            transition_ended: Event::new(),
        }
    }

    /// Black fade with the configured timings
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.transition_fade_ms, config.transition_hold_ms, FadeEffect::default())
    }

    #[must_use]
    pub fn phase(&self) -> TransitionPhase {
        self.phase
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.phase != TransitionPhase::Idle
    }

    #[must_use]
    pub fn is_holding(&self) -> bool {
        self.phase == TransitionPhase::Holding
    }

    /// Whether the worker has produced its output
    #[must_use]
    pub fn is_work_finished(&self) -> bool {
        match &self.worker {
            Some(handle) => handle.is_finished(),
            None => self.task.is_none(),
        }
    }

    /// How much of the screen is hidden, in `[0, 1]`
    #[must_use]
    pub fn coverage(&self) -> f32 {
        match self.phase {
            TransitionPhase::Idle => 0.0,
            TransitionPhase::Covering => self.fade_timer.proportion(),
            TransitionPhase::Holding => 1.0,
            TransitionPhase::Revealing => 1.0 - self.fade_timer.proportion(),
        }
    }

    /// Start covering; `task` runs on a worker once the screen is covered.
    ///
    /// Returns false, dropping `task`, if a transition is already running.
    pub fn activate(&mut self, task: Option<Task<T>>) -> bool {
        if self.is_active() {
            log::warn!("Screen transition already running");
            return false;
        }
        self.task = task;
        self.finished = None;
        self.fade_timer.reset();
        self.phase = TransitionPhase::Covering;
        self.transition_started.emit(&());
        true
    }

    /// Advance one frame. Returns the task output on the frame holding ends.
    pub fn update(&mut self, time: FrameTime) -> Option<Result<T, SceneError>> {
        match self.phase {
            TransitionPhase::Idle => None,
            TransitionPhase::Covering => {
                if self.fade_timer.update(time).is_some() {
                    self.begin_holding();
                }
                None
            }
            TransitionPhase::Holding => {
                self.hold_timer.update(time);
                if !(self.hold_timer.is_exceeded() && self.is_work_finished()) {
                    return None;
                }
                let output = self.join();
                self.end_holding();
                output
            }
            TransitionPhase::Revealing => {
                if self.fade_timer.update(time).is_some() {
                    self.phase = TransitionPhase::Idle;
                    self.transition_ended.emit(&());
                }
                None
            }
        }
    }

    /// Draw the effect over whatever is on screen
    pub fn draw(&mut self, surface: &mut dyn DrawSurface, viewport: Rect, viewport_scale: f32) {
        if self.is_active() {
            let coverage = self.coverage();
            self.effect.draw(surface, viewport, viewport_scale, coverage);
        }
    }

    fn begin_holding(&mut self) {
        self.hold_timer.reset();
        self.phase = TransitionPhase::Holding;
        self.holding_started.emit(&());

        let Some(task) = self.task.take() else {
            return;
        };
        let spawned = thread::Builder::new()
            .name("scene-builder".into())
            .spawn(task);
        match spawned {
            Ok(handle) => self.worker = Some(handle),
            Err(e) => {
                log::error!("Could not start scene builder thread: {e}");
                self.finished = Some(Err(SceneError::Io(e.to_string())));
            }
        }
    }

    fn end_holding(&mut self) {
        self.hold_timer.reset();
        self.fade_timer.reset();
        self.phase = TransitionPhase::Revealing;
        self.holding_ended.emit(&());
    }

    fn join(&mut self) -> Option<Result<T, SceneError>> {
        if let Some(output) = self.finished.take() {
            return Some(output);
        }
        let handle = self.worker.take()?;
        Some(handle.join().map_err(|_| {
            log::error!("Scene builder thread panicked");
            SceneError::WorkerPanicked
        }))
    }
}

impl<T: Send + 'static> Drop for ScreenTransition<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl<T: Send + 'static> fmt::Debug for ScreenTransition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScreenTransition")
            .field("phase", &self.phase)
            .field("coverage", &self.coverage())
            .field("working", &self.worker.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::render::RecordingSurface;

    fn step(transition: &mut ScreenTransition<u32>, ms: f32) -> Option<Result<u32, SceneError>> {
        transition.update(FrameTime::from_millis(ms))
    }

    /// Step until holding ends, waiting on the worker between frames
    fn run_until_output(transition: &mut ScreenTransition<u32>) -> Result<u32, SceneError> {
        for _ in 0..1000 {
            if let Some(output) = step(transition, 50.0) {
                return output;
            }
            thread::sleep(Duration::from_millis(1));
        }
        panic!("transition never finished holding");
    }

    #[test]
    fn test_full_cycle_runs_task_on_worker() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut transition: ScreenTransition<u32> =
            ScreenTransition::new(100, 200, FadeEffect::default());
        for (event, name) in [
            (&mut transition.transition_started, "started"),
            (&mut transition.holding_started, "holding"),
            (&mut transition.holding_ended, "held"),
            (&mut transition.transition_ended, "ended"),
        ] {
            let log = Arc::clone(&log);
            event.subscribe(move |_| log.lock().unwrap().push(name));
        }

        assert!(transition.activate(Some(Box::new(|| 42))));
        assert_eq!(transition.phase(), TransitionPhase::Covering);

        step(&mut transition, 50.0);
        assert!((transition.coverage() - 0.5).abs() < 1e-4);
        step(&mut transition, 50.0);
        assert!(transition.is_holding());

        assert_eq!(run_until_output(&mut transition), Ok(42));
        assert_eq!(transition.phase(), TransitionPhase::Revealing);

        step(&mut transition, 100.0);
        assert_eq!(transition.phase(), TransitionPhase::Idle);
        assert_eq!(*log.lock().unwrap(), vec!["started", "holding", "held", "ended"]);
    }

    #[test]
    fn test_holds_for_minimum_time_without_task() {
        let mut transition: ScreenTransition<u32> =
            ScreenTransition::new(10, 300, FadeEffect::default());
        transition.activate(None);
        step(&mut transition, 10.0);
        assert!(transition.is_holding());

        assert!(step(&mut transition, 200.0).is_none());
        assert!(transition.is_holding());
        assert!(step(&mut transition, 200.0).is_none());
        assert_eq!(transition.phase(), TransitionPhase::Revealing);
    }

    #[test]
    fn test_holds_until_worker_finishes() {
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let mut transition: ScreenTransition<u32> =
            ScreenTransition::new(10, 10, FadeEffect::default());
        transition.activate(Some(Box::new(move || {
            let _ = release_rx.recv();
            7
        })));
        step(&mut transition, 10.0);

        for _ in 0..5 {
            assert!(step(&mut transition, 100.0).is_none());
            assert!(transition.is_holding());
        }

        release_tx.send(()).unwrap();
        assert_eq!(run_until_output(&mut transition), Ok(7));
    }

    #[test]
    fn test_worker_panic_is_reported() {
        let mut transition: ScreenTransition<u32> =
            ScreenTransition::new(10, 10, FadeEffect::default());
        transition.activate(Some(Box::new(|| panic!("boom"))));
        step(&mut transition, 10.0);

        assert_eq!(run_until_output(&mut transition), Err(SceneError::WorkerPanicked));
    }

    #[test]
    fn test_second_activation_is_refused() {
        let mut transition: ScreenTransition<u32> =
            ScreenTransition::new(10, 10, FadeEffect::default());
        assert!(transition.activate(None));
        assert!(!transition.activate(None));
    }

    #[test]
    fn test_fade_draws_scaled_overlay() {
        let mut transition: ScreenTransition<u32> =
            ScreenTransition::new(100, 10, FadeEffect::default());
        let mut surface = RecordingSurface::new();
        let viewport = Rect::new(0, 0, 320, 180);

        transition.draw(&mut surface, viewport, 2.0);
        assert!(surface.calls.is_empty());

        transition.activate(None);
        step(&mut transition, 25.0);
        transition.draw(&mut surface, viewport, 2.0);

        let call = &surface.calls[0];
        assert_eq!(call.destination, Rect::new(0, 0, 640, 360));
        assert!((call.alpha - 0.25).abs() < 1e-4);
        assert_eq!(call.tint, Color::BLACK.faded(0.25));
    }
}
