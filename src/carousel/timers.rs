//! Deterministic timer queue driven by an explicit virtual clock.

use std::time::Duration;

use tracing::trace;

/// Shortest period accepted for any timer.
pub const MIN_TIMER_PERIOD: Duration = Duration::from_millis(1);

/// Handle to a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

#[derive(Debug)]
struct ScheduledTask<K> {
  id: TimerId,
  due_at: Duration,
  order: u64,
  interval: Option<Duration>,
  kind: K,
}

/// Timer that has come due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiredTimer<K> {
  /// Handle of the timer.
  pub id: TimerId,
  /// Deadline the timer fired at.
  pub due_at: Duration,
  /// Payload supplied when scheduling.
  pub kind: K,
}

/// Owned queue of one-shot and periodic timers.
///
/// Timers fire in deadline order. At equal deadlines one-shot timers fire before periodic
/// ones, then scheduling order decides. Periodic timers are re-armed when popped, so
/// cancelling the handle stops all future firings.
#[derive(Debug)]
pub struct TimerQueue<K> {
  now: Duration,
  tasks: Vec<ScheduledTask<K>>,
  next_id: u64,
  next_order: u64,
}

impl<K> Default for TimerQueue<K> {
  fn default() -> Self {
    Self {
      now: Duration::ZERO,
      tasks: Vec::new(),
      next_id: 1,
      next_order: 0,
    }
  }
}

impl<K: Copy> TimerQueue<K> {
  /// Create an empty queue with the clock at zero.
  pub fn new() -> Self {
    Self::default()
  }

  /// Current virtual time.
  pub fn now(&self) -> Duration {
    self.now
  }

  /// Number of pending timers.
  pub fn len(&self) -> usize {
    self.tasks.len()
  }

  /// Returns `true` when no timers are pending.
  pub fn is_empty(&self) -> bool {
    self.tasks.is_empty()
  }

  /// Returns `true` when the handle refers to a pending timer.
  pub fn is_pending(&self, id: TimerId) -> bool {
    self.tasks.iter().any(|task| task.id == id)
  }

  /// Schedule a one-shot timer firing `delay` from now.
  pub fn schedule_timeout(&mut self, delay: Duration, kind: K) -> TimerId {
    self.push(delay, None, kind)
  }

  /// Schedule a periodic timer firing every `interval`, first after one full interval.
  pub fn schedule_interval(&mut self, interval: Duration, kind: K) -> TimerId {
    let interval = interval.max(MIN_TIMER_PERIOD);
    self.push(interval, Some(interval), kind)
  }

  fn push(&mut self, delay: Duration, interval: Option<Duration>, kind: K) -> TimerId {
    let id = TimerId(self.next_id);
    self.next_id += 1;
    let order = self.next_order;
    self.next_order += 1;
    let due_at = self.now + delay;

    trace!(id = id.0, due_at_ms = due_at.as_millis() as u64, periodic = interval.is_some(), "timer scheduled");
    self.tasks.push(ScheduledTask {
      id,
      due_at,
      order,
      interval,
      kind,
    });
    id
  }

  /// Cancel a timer, returning whether it was still pending.
  pub fn cancel(&mut self, id: TimerId) -> bool {
    let before = self.tasks.len();
    self.tasks.retain(|task| task.id != id);
    let removed = before != self.tasks.len();
    trace!(id = id.0, removed, "timer cancelled");
    removed
  }

  /// Cancel every pending timer, returning how many were dropped.
  pub fn clear(&mut self) -> usize {
    let cleared = self.tasks.len();
    self.tasks.clear();
    cleared
  }

  fn next_task_index(&self, due_limit: Duration) -> Option<usize> {
    self
      .tasks
      .iter()
      .enumerate()
      .filter(|(_, task)| task.due_at <= due_limit)
      .min_by_key(|(_, task)| (task.due_at, task.interval.is_some(), task.order))
      .map(|(index, _)| index)
  }

  /// Pop the earliest timer due at or before `due_limit`, moving the clock to its deadline.
  ///
  /// Periodic timers are re-armed one interval after the deadline they fired at.
  pub fn pop_due(&mut self, due_limit: Duration) -> Option<FiredTimer<K>> {
    let index = self.next_task_index(due_limit)?;
    let task = self.tasks.remove(index);
    if task.due_at > self.now {
      self.now = task.due_at;
    }

    if let Some(interval) = task.interval {
      let order = self.next_order;
      self.next_order += 1;
      self.tasks.push(ScheduledTask {
        id: task.id,
        due_at: task.due_at + interval,
        order,
        interval: task.interval,
        kind: task.kind,
      });
    }

    Some(FiredTimer {
      id: task.id,
      due_at: task.due_at,
      kind: task.kind,
    })
  }

  /// Move the clock forward to `target` without firing anything.
  ///
  /// Callers drain [`TimerQueue::pop_due`] first; the clock never moves backwards.
  pub fn settle_at(&mut self, target: Duration) {
    if target > self.now {
      self.now = target;
    }
  }
}
