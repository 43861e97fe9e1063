//! Slide carousel with a transition lock and a pausable autoplay timer.
//!
//! The controller never looks anything up on its own: slides and navigation controls are
//! handed over at construction through the [`Slide`] and [`NavControl`] traits, and time only
//! moves when the host calls [`CarouselController::advance`]. Every deferred callback lives in
//! the controller's own [`timers::TimerQueue`], so dropping the controller drops them too.

mod controller;
pub mod timers;

use std::time::Duration;

pub use controller::CarouselController;

/// Slide handle whose visibility the controller toggles.
pub trait Slide {
  /// Show or hide the slide.
  fn set_active(&mut self, active: bool);
}

/// Manual navigation affordance (a previous or next button).
pub trait NavControl {
  /// Enable or disable the control.
  fn set_enabled(&mut self, enabled: bool);
}

/// Collaborators handed to the controller at construction.
pub struct CarouselParts<S> {
  /// Ordered slides; must not be empty.
  pub slides: Vec<S>,
  /// Control triggering [`CarouselController::prev`], when the page has one.
  pub prev: Option<Box<dyn NavControl>>,
  /// Control triggering [`CarouselController::next`], when the page has one.
  pub next: Option<Box<dyn NavControl>>,
}

impl<S> CarouselParts<S> {
  /// Parts with slides only.
  pub fn new(slides: Vec<S>) -> Self {
    Self {
      slides,
      prev: None,
      next: None,
    }
  }

  /// Attach the "previous" control.
  pub fn with_prev(mut self, control: impl NavControl + 'static) -> Self {
    self.prev = Some(Box::new(control));
    self
  }

  /// Attach the "next" control.
  pub fn with_next(mut self, control: impl NavControl + 'static) -> Self {
    self.next = Some(Box::new(control));
    self
  }
}

/// Timing used by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarouselSettings {
  /// Period between automatic advances.
  pub autoplay_interval: Duration,
  /// How long navigation stays locked after a transition starts.
  pub settle_delay: Duration,
}

impl Default for CarouselSettings {
  fn default() -> Self {
    Self {
      autoplay_interval: Duration::from_millis(3000),
      settle_delay: Duration::from_millis(800),
    }
  }
}

/// Snapshot of the controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarouselState {
  /// Index of the visible slide.
  pub current_index: usize,
  /// Whether the transition lock is held.
  pub is_transitioning: bool,
  /// Whether the autoplay timer is running.
  pub autoplay_active: bool,
}

/// Input signals the host forwards to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarouselEvent {
  /// The "previous" control was activated.
  PrevPressed,
  /// The "next" control was activated.
  NextPressed,
  /// The pointer entered the carousel container.
  PointerEnter,
  /// The pointer left the carousel container.
  PointerLeave,
}

/// Errors raised while constructing a controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CarouselError {
  /// The slide collection was empty.
  NoSlides,
}

impl std::fmt::Display for CarouselError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::NoSlides => write!(f, "carousel requires at least one slide"),
    }
  }
}

impl std::error::Error for CarouselError {}
