// extensions/scheduler.rs
//
// Animation scheduler: time-bounded property interpolation ("tasks"),
// absolute-offset sequences ("timelines") and pure timers.
// Completely decoupled from any scene: values are read from and written to an
// `Animate` sink keyed by (target, property).
//
// Usage:
//   let mut scheduler: Scheduler<EntityId, Cue> = Scheduler::new();
//   scheduler.schedule(Tween::to(id, Property::Opacity, 1.0, 0.5), Some(Cue::FadedIn));
//   scheduler.tick(dt, &mut world);
//   for cue in scheduler.drain_fired() { ... }
//
// Completion callbacks are events of type `E`, queued in firing order and
// drained by the owner after each tick.

use glam::Vec3;
use super::easing::{Easing, ease, ease_vec3};

/// Which property of a target a task animates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    Opacity,
    Position,
    Scale,
    Rotation,
    Tint,
    /// Screen-space offset for overlay elements.
    Offset,
    Intensity,
    Speed,
}

/// An animatable value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TweenValue {
    Scalar(f32),
    Vector(Vec3),
}

impl TweenValue {
    /// Eased interpolation. Mismatched kinds snap to `to`.
    pub fn interpolate(self, to: TweenValue, t: f32, easing: Easing) -> TweenValue {
        match (self, to) {
            (TweenValue::Scalar(a), TweenValue::Scalar(b)) => TweenValue::Scalar(ease(a, b, t, easing)),
            (TweenValue::Vector(a), TweenValue::Vector(b)) => TweenValue::Vector(ease_vec3(a, b, t, easing)),
            (_, to) => to,
        }
    }

    pub fn scalar(self) -> Option<f32> {
        match self {
            TweenValue::Scalar(v) => Some(v),
            TweenValue::Vector(_) => None,
        }
    }

    pub fn vector(self) -> Option<Vec3> {
        match self {
            TweenValue::Vector(v) => Some(v),
            TweenValue::Scalar(_) => None,
        }
    }
}

impl From<f32> for TweenValue {
    fn from(v: f32) -> Self {
        TweenValue::Scalar(v)
    }
}

impl From<Vec3> for TweenValue {
    fn from(v: Vec3) -> Self {
        TweenValue::Vector(v)
    }
}

/// Storage the scheduler animates. `read` returns `None` when the target no
/// longer exists; writes to missing targets must be ignored.
pub trait Animate<T> {
    fn read(&self, target: T, property: Property) -> Option<TweenValue>;
    fn write(&mut self, target: T, property: Property, value: TweenValue);
}

/// Description of a single property animation.
#[derive(Debug, Clone)]
pub struct Tween<T> {
    pub target: T,
    pub property: Property,
    /// Start value. `None` starts from the live value on the first active tick.
    pub from: Option<TweenValue>,
    pub to: TweenValue,
    /// Duration in seconds.
    pub duration: f32,
    /// Seconds to wait before the task becomes active.
    pub delay: f32,
    pub easing: Easing,
}

impl<T> Tween<T> {
    /// Animate from the current value to `to`.
    pub fn to(target: T, property: Property, to: impl Into<TweenValue>, duration: f32) -> Self {
        Self {
            target,
            property,
            from: None,
            to: to.into(),
            duration,
            delay: 0.0,
            easing: Easing::QUAD_OUT,
        }
    }

    /// Apply a value on the next tick (zero-duration tween).
    pub fn set(target: T, property: Property, value: impl Into<TweenValue>) -> Self {
        Self::to(target, property, value, 0.0)
    }

    // -- Builder methods --

    pub fn from_value(mut self, from: impl Into<TweenValue>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn with_delay(mut self, delay: f32) -> Self {
        self.delay = delay.max(0.0);
        self
    }

    /// Delay plus duration.
    pub fn end_time(&self) -> f32 {
        self.delay + self.duration
    }

    fn progress(&self, local: f32) -> f32 {
        if self.duration > 0.0 {
            (local / self.duration).clamp(0.0, 1.0)
        } else {
            1.0
        }
    }
}

/// Handle to a task or timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub u32);

/// Handle to a running timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimelineId(pub u32);

#[derive(Debug, Clone)]
enum Entry<T, E> {
    Tween {
        at: f32,
        tween: Tween<T>,
        from: Option<TweenValue>,
        done: bool,
    },
    Cue {
        at: f32,
        event: E,
        fired: bool,
    },
}

/// Ordered set of tweens and cues placed at absolute offsets.
///
/// `then` appends after everything sequenced so far, `with` runs alongside the
/// previous step, `at` places a tween at an explicit offset. The aggregate
/// completion event fires once, after the last member finishes.
#[derive(Debug, Clone)]
pub struct Timeline<T, E> {
    entries: Vec<Entry<T, E>>,
    cursor: f32,
    last_start: f32,
    on_complete: Option<E>,
}

impl<T: Copy + PartialEq, E: Clone> Timeline<T, E> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0.0,
            last_start: 0.0,
            on_complete: None,
        }
    }

    /// Append a tween after the current end of the sequence.
    pub fn then(mut self, tween: Tween<T>) -> Self {
        let at = self.cursor;
        self.cursor = at + tween.end_time();
        self.last_start = at;
        self.entries.push(Entry::Tween { at, tween, from: None, done: false });
        self
    }

    /// Run a tween in parallel with the previously appended step.
    pub fn with(mut self, tween: Tween<T>) -> Self {
        let at = self.last_start;
        self.cursor = self.cursor.max(at + tween.end_time());
        self.entries.push(Entry::Tween { at, tween, from: None, done: false });
        self
    }

    /// Place a tween at an absolute offset without moving the sequence cursor.
    pub fn at(mut self, offset: f32, tween: Tween<T>) -> Self {
        self.entries.push(Entry::Tween { at: offset.max(0.0), tween, from: None, done: false });
        self
    }

    /// Insert an idle gap.
    pub fn wait(mut self, seconds: f32) -> Self {
        self.last_start = self.cursor;
        self.cursor += seconds.max(0.0);
        self
    }

    /// Fire an event at the current end of the sequence.
    pub fn cue(mut self, event: E) -> Self {
        let at = self.cursor;
        self.last_start = at;
        self.entries.push(Entry::Cue { at, event, fired: false });
        self
    }

    pub fn on_complete(mut self, event: E) -> Self {
        self.on_complete = Some(event);
        self
    }

    /// Total length in seconds.
    pub fn duration(&self) -> f32 {
        self.entries
            .iter()
            .map(|e| match e {
                Entry::Tween { at, tween, .. } => at + tween.end_time(),
                Entry::Cue { at, .. } => *at,
            })
            .fold(self.cursor, f32::max)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Copy + PartialEq, E: Clone> Default for Timeline<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct Task<T, E> {
    id: TaskId,
    tween: Tween<T>,
    elapsed: f32,
    from: Option<TweenValue>,
    on_complete: Option<E>,
}

#[derive(Debug)]
struct Timer<E> {
    id: TaskId,
    remaining: f32,
    event: E,
}

#[derive(Debug)]
struct Run<T, E> {
    id: TimelineId,
    timeline: Timeline<T, E>,
    elapsed: f32,
}

/// Owns every active task, timer and timeline.
///
/// Tasks on the same (target, property) are mutually exclusive: scheduling a
/// new one removes the previous ones before they mutate state again, and a
/// removed task never fires its completion event.
#[derive(Debug)]
pub struct Scheduler<T, E> {
    tasks: Vec<Task<T, E>>,
    timers: Vec<Timer<E>>,
    runs: Vec<Run<T, E>>,
    next_id: u32,
    fired: Vec<E>,
}

impl<T: Copy + PartialEq, E: Clone> Scheduler<T, E> {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            timers: Vec::new(),
            runs: Vec::new(),
            next_id: 1,
            fired: Vec::new(),
        }
    }

    fn alloc(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Start a task, cancelling any prior task on the same (target, property).
    pub fn schedule(&mut self, tween: Tween<T>, on_complete: Option<E>) -> TaskId {
        self.cancel(tween.target, Some(tween.property));
        let id = TaskId(self.alloc());
        self.tasks.push(Task {
            id,
            tween,
            elapsed: 0.0,
            from: None,
            on_complete,
        });
        id
    }

    /// Register a pure timer that fires `event` after `seconds`.
    pub fn delay(&mut self, seconds: f32, event: E) -> TaskId {
        let id = TaskId(self.alloc());
        self.timers.push(Timer { id, remaining: seconds, event });
        id
    }

    /// Start a timeline.
    pub fn play(&mut self, timeline: Timeline<T, E>) -> TimelineId {
        let id = TimelineId(self.alloc());
        self.runs.push(Run { id, timeline, elapsed: 0.0 });
        id
    }

    /// Cancel tasks on `target` (all properties when `property` is `None`),
    /// including not-yet-finished timeline members on that key.
    /// Returns the number of standalone tasks removed.
    pub fn cancel(&mut self, target: T, property: Option<Property>) -> usize {
        let matches = |t: &Tween<T>| t.target == target && property.map_or(true, |p| t.property == p);
        let before = self.tasks.len();
        self.tasks.retain(|task| !matches(&task.tween));
        for run in &mut self.runs {
            for entry in &mut run.timeline.entries {
                if let Entry::Tween { tween, done, .. } = entry {
                    if !*done && matches(tween) {
                        *done = true;
                    }
                }
            }
        }
        before - self.tasks.len()
    }

    /// Cancel a task or timer by handle.
    pub fn cancel_id(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len() + self.timers.len();
        self.tasks.retain(|t| t.id != id);
        self.timers.retain(|t| t.id != id);
        before != self.tasks.len() + self.timers.len()
    }

    /// Stop a timeline. Its completion event never fires.
    pub fn cancel_timeline(&mut self, id: TimelineId) -> bool {
        let before = self.runs.len();
        self.runs.retain(|r| r.id != id);
        before != self.runs.len()
    }

    /// Whether any task or live timeline member animates (target, property).
    pub fn is_animating(&self, target: T, property: Property) -> bool {
        let key = |t: &Tween<T>| t.target == target && t.property == property;
        self.tasks.iter().any(|task| key(&task.tween))
            || self.runs.iter().any(|run| {
                run.timeline.entries.iter().any(|e| matches!(e, Entry::Tween { tween, done: false, .. } if key(tween)))
            })
    }

    /// Whether a timer with this handle is still pending.
    pub fn is_pending(&self, id: TaskId) -> bool {
        self.timers.iter().any(|t| t.id == id) || self.tasks.iter().any(|t| t.id == id)
    }

    /// Advance timers, tasks and timelines, applying values to `sink`.
    /// Returns the number of tasks that completed this tick.
    pub fn tick<A: Animate<T>>(&mut self, dt: f32, sink: &mut A) -> usize {
        let Self { tasks, timers, runs, fired, .. } = self;

        // Timers
        for timer in timers.iter_mut() {
            timer.remaining -= dt;
        }
        timers.retain(|timer| {
            if timer.remaining <= 0.0 {
                fired.push(timer.event.clone());
                false
            } else {
                true
            }
        });

        // Standalone tasks
        let mut completed = 0;
        tasks.retain_mut(|task| {
            task.elapsed += dt;
            let local = task.elapsed - task.tween.delay;
            if local < 0.0 {
                return true;
            }
            let tween = &task.tween;
            let from = *task.from.get_or_insert_with(|| {
                tween.from.or_else(|| sink.read(tween.target, tween.property)).unwrap_or(tween.to)
            });
            let t = tween.progress(local);
            sink.write(tween.target, tween.property, from.interpolate(tween.to, t, tween.easing));
            if t >= 1.0 {
                completed += 1;
                if let Some(event) = task.on_complete.take() {
                    fired.push(event);
                }
                false
            } else {
                true
            }
        });

        // Timelines
        runs.retain_mut(|run| {
            run.elapsed += dt;
            let now = run.elapsed;
            for entry in run.timeline.entries.iter_mut() {
                match entry {
                    Entry::Tween { at, tween, from, done } => {
                        if *done || now < *at + tween.delay {
                            continue;
                        }
                        if from.is_none() {
                            // Latest started wins: a member taking over a key removes standalone tasks on it.
                            tasks.retain(|t| !(t.tween.target == tween.target && t.tween.property == tween.property));
                            *from = Some(
                                tween.from.or_else(|| sink.read(tween.target, tween.property)).unwrap_or(tween.to),
                            );
                        }
                        let start = from.unwrap_or(tween.to);
                        let t = tween.progress(now - *at - tween.delay);
                        sink.write(tween.target, tween.property, start.interpolate(tween.to, t, tween.easing));
                        if t >= 1.0 {
                            *done = true;
                        }
                    }
                    Entry::Cue { at, event, fired: cue_fired } => {
                        if !*cue_fired && now >= *at {
                            *cue_fired = true;
                            fired.push(event.clone());
                        }
                    }
                }
            }
            let finished = now >= run.timeline.duration()
                && run.timeline.entries.iter().all(|e| match e {
                    Entry::Tween { done, .. } => *done,
                    Entry::Cue { fired, .. } => *fired,
                });
            if finished {
                if let Some(event) = run.timeline.on_complete.take() {
                    fired.push(event);
                }
            }
            !finished
        });

        completed
    }

    /// Take all completion events fired since the last drain, in firing order.
    pub fn drain_fired(&mut self) -> Vec<E> {
        std::mem::take(&mut self.fired)
    }

    /// Number of active standalone tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether nothing is scheduled at all.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.timers.is_empty() && self.runs.is_empty()
    }

    /// Drop everything without firing.
    pub fn clear(&mut self) {
        self.tasks.clear();
        self.timers.clear();
        self.runs.clear();
        self.fired.clear();
    }
}

impl<T: Copy + PartialEq, E: Clone> Default for Scheduler<T, E> {
    fn default() -> Self {
        Self::new()
    }
}
