use std::time::Duration;

use tracing::{debug, trace, warn};

use super::timers::{FiredTimer, TimerId, TimerQueue};
use super::{
  CarouselError, CarouselEvent, CarouselParts, CarouselSettings, CarouselState, NavControl,
  Slide,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CarouselTimer {
  Settle,
  Autoplay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
  Idle,
  Transitioning { settle: TimerId },
}

/// Carousel state machine owning its slides, controls and timers.
pub struct CarouselController<S: Slide> {
  slides: Vec<S>,
  controls: Vec<Box<dyn NavControl>>,
  settings: CarouselSettings,
  current_index: usize,
  phase: Phase,
  autoplay: Option<TimerId>,
  timers: TimerQueue<CarouselTimer>,
}

impl<S: Slide> CarouselController<S> {
  /// Build an idle controller showing the first slide.
  pub fn new(parts: CarouselParts<S>, settings: CarouselSettings) -> Result<Self, CarouselError> {
    let CarouselParts {
      mut slides,
      prev,
      next,
    } = parts;

    if slides.is_empty() {
      return Err(CarouselError::NoSlides);
    }

    for (index, slide) in slides.iter_mut().enumerate() {
      slide.set_active(index == 0);
    }

    let mut controller = Self {
      slides,
      controls: prev.into_iter().chain(next).collect(),
      settings,
      current_index: 0,
      phase: Phase::Idle,
      autoplay: None,
      timers: TimerQueue::new(),
    };
    controller.set_controls_enabled(true);

    debug!(slides = controller.slides.len(), "carousel ready");
    Ok(controller)
  }

  /// Build the controller and start autoplay, the way a page initialises it once loaded.
  pub fn init(parts: CarouselParts<S>, settings: CarouselSettings) -> Result<Self, CarouselError> {
    let mut controller = Self::new(parts, settings)?;
    controller.start_autoplay();
    Ok(controller)
  }

  /// Current state snapshot.
  pub fn state(&self) -> CarouselState {
    CarouselState {
      current_index: self.current_index,
      is_transitioning: matches!(self.phase, Phase::Transitioning { .. }),
      autoplay_active: self.autoplay.is_some(),
    }
  }

  /// Slides in display order.
  pub fn slides(&self) -> &[S] {
    &self.slides
  }

  /// Timing in use.
  pub fn settings(&self) -> CarouselSettings {
    self.settings
  }

  /// Virtual time elapsed since construction.
  pub fn now(&self) -> Duration {
    self.timers.now()
  }

  /// Show the slide at `index`, returning `false` when the request was dropped.
  ///
  /// Requests are dropped while a transition holds the lock and when `index` is out of range.
  pub fn go_to(&mut self, index: usize) -> bool {
    if let Phase::Transitioning { .. } = self.phase {
      trace!(index, "navigation dropped during transition");
      return false;
    }
    if index >= self.slides.len() {
      warn!(index, slides = self.slides.len(), "navigation to missing slide ignored");
      return false;
    }

    let previous = self.current_index;
    self.slides[previous].set_active(false);
    self.slides[index].set_active(true);
    self.current_index = index;
    self.set_controls_enabled(false);

    let settle = self
      .timers
      .schedule_timeout(self.settings.settle_delay, CarouselTimer::Settle);
    self.phase = Phase::Transitioning { settle };

    debug!(from = previous, to = index, "carousel transition started");
    true
  }

  /// Advance to the following slide, wrapping after the last one.
  pub fn next(&mut self) -> bool {
    let index = (self.current_index + 1) % self.slides.len();
    self.go_to(index)
  }

  /// Go back to the preceding slide, wrapping before the first one.
  pub fn prev(&mut self) -> bool {
    let len = self.slides.len();
    let index = (self.current_index + len - 1) % len;
    self.go_to(index)
  }

  /// (Re)start autoplay. Any running autoplay timer is replaced, never duplicated.
  pub fn start_autoplay(&mut self) {
    self.pause_autoplay();
    let id = self
      .timers
      .schedule_interval(self.settings.autoplay_interval, CarouselTimer::Autoplay);
    self.autoplay = Some(id);
    debug!(interval_ms = self.settings.autoplay_interval.as_millis() as u64, "autoplay started");
  }

  /// Stop automatic advances. An in-flight transition still completes.
  pub fn pause_autoplay(&mut self) {
    if let Some(id) = self.autoplay.take() {
      self.timers.cancel(id);
      debug!("autoplay paused");
    }
  }

  /// Route a host input signal to the matching operation.
  pub fn handle(&mut self, event: CarouselEvent) {
    match event {
      CarouselEvent::PrevPressed => {
        self.prev();
      }
      CarouselEvent::NextPressed => {
        self.next();
      }
      CarouselEvent::PointerEnter => self.pause_autoplay(),
      CarouselEvent::PointerLeave => self.start_autoplay(),
    }
  }

  /// Let `elapsed` time pass, firing every timer that comes due on the way.
  pub fn advance(&mut self, elapsed: Duration) {
    let target = self.timers.now() + elapsed;
    while let Some(fired) = self.timers.pop_due(target) {
      self.fire(fired);
    }
    self.timers.settle_at(target);
  }

  /// Cancel every pending timer and release the transition lock.
  ///
  /// The controller stays usable; autoplay has to be started again explicitly.
  pub fn teardown(&mut self) {
    let cleared = self.timers.clear();
    self.autoplay = None;
    if let Phase::Transitioning { .. } = self.phase {
      self.phase = Phase::Idle;
      self.set_controls_enabled(true);
    }
    debug!(cleared, "carousel torn down");
  }

  fn fire(&mut self, fired: FiredTimer<CarouselTimer>) {
    match fired.kind {
      CarouselTimer::Settle => {
        if self.phase == (Phase::Transitioning { settle: fired.id }) {
          self.phase = Phase::Idle;
          self.set_controls_enabled(true);
          trace!(at_ms = fired.due_at.as_millis() as u64, "transition settled");
        }
      }
      CarouselTimer::Autoplay => {
        if let Phase::Transitioning { .. } = self.phase {
          trace!(at_ms = fired.due_at.as_millis() as u64, "autoplay tick skipped");
        } else {
          self.next();
        }
      }
    }
  }

  fn set_controls_enabled(&mut self, enabled: bool) {
    for control in &mut self.controls {
      control.set_enabled(enabled);
    }
  }
}
