use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, Instant};

use super::easing::Easing;
use crate::driver::Driver;
use crate::universe::ChannelMap;

/// Post-processing hook run over every computed channel map before it
/// is pushed to the driver. Filters mutate the map in place and run in
/// registration order.
pub type Filter = Arc<dyn Fn(&mut ChannelMap) + Send + Sync>;

/// Invoked once when the final loop of an animation completes.
pub type OnFinish = Box<dyn FnOnce() + Send>;

/// How many times an animation repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loops {
    Finite(u32),
    Infinite,
}

impl Loops {
    fn reached(self, completed: u32) -> bool {
        match self {
            Loops::Finite(count) => completed >= count,
            Loops::Infinite => false,
        }
    }
}

impl Default for Loops {
    fn default() -> Self {
        Loops::Finite(1)
    }
}

/// Options for a single transition.
#[derive(Default)]
pub struct TransitionOptions {
    /// Explicit start values. Channels without one are read from the
    /// driver when the transition first runs.
    pub from: Option<ChannelMap>,
    /// Easing name resolved against [`Easing::from_name`]; missing or
    /// unknown names run linear.
    pub easing: Option<String>,
}

/// A planned interpolation of a channel subset over a time window
/// within an animation.
#[derive(Clone)]
pub struct Transition {
    to: ChannelMap,
    from: Option<ChannelMap>,
    easing: Easing,
    start: Duration,
    end: Duration,
}

impl Transition {
    pub fn targets(&self) -> &ChannelMap {
        &self.to
    }

    pub fn easing(&self) -> Easing {
        self.easing
    }

    pub fn window(&self) -> (Duration, Duration) {
        (self.start, self.end)
    }
}

/// A keyframe animation against a single universe driver.
///
/// Build it by chaining [`add`](Self::add) and [`delay`](Self::delay),
/// then start it with [`run`](Self::run) or [`run_loop`](Self::run_loop).
/// While running, the animation becomes the driver's mutation caller,
/// ticking at half the driver's send interval.
pub struct Animation {
    transitions: Vec<Transition>,
    duration: Duration,
    loops: Loops,
    filters: Vec<Filter>,
    task: Option<JoinHandle<()>>,
}

impl Animation {
    pub fn new() -> Self {
        Self {
            transitions: Vec::new(),
            duration: Duration::ZERO,
            loops: Loops::default(),
            filters: Vec::new(),
            task: None,
        }
    }

    /// Append a transition towards the given target values.
    pub fn add(
        &mut self,
        to: ChannelMap,
        duration: Duration,
        options: TransitionOptions,
    ) -> &mut Self {
        let easing = Easing::from_name(options.easing.as_deref().unwrap_or("linear"));
        self.transitions.push(Transition {
            to,
            from: options.from,
            easing,
            start: self.duration,
            end: self.duration + duration,
        });
        self.duration += duration;
        self
    }

    /// Hold the current state for `duration` without touching any
    /// channel.
    pub fn delay(&mut self, duration: Duration) -> &mut Self {
        self.add(ChannelMap::new(), duration, TransitionOptions::default())
    }

    /// Register a post-processing filter.
    pub fn with_filter(
        &mut self,
        filter: impl Fn(&mut ChannelMap) + Send + Sync + 'static,
    ) -> &mut Self {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Total duration of a single pass.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Start the animation against the driver. The completion callback
    /// fires once, after the configured number of loops has elapsed.
    pub fn run(&mut self, driver: Arc<dyn Driver>, on_finish: Option<OnFinish>) {
        // Tick at double the driver rate so every transfer sees a fresh
        // intermediate state.
        let frame_delay = (driver.send_interval() / 2).max(Duration::from_millis(1));

        if let Some(task) = self.task.take() {
            task.abort();
        }

        let mut runner = Runner {
            transitions: self
                .transitions
                .iter()
                .map(|plan| RunTransition {
                    plan: plan.clone(),
                    captured: None,
                })
                .collect(),
            duration: self.duration,
            loops: self.loops,
            filters: self.filters.clone(),
            cursor: 0,
            completed_loops: 0,
            epoch: Instant::now(),
        };
        let mut on_finish = on_finish;

        self.task = Some(tokio::spawn(async move {
            let mut ticker = interval(frame_delay);
            loop {
                ticker.tick().await;
                if runner.step(Instant::now(), driver.as_ref()) == Step::Finished {
                    break;
                }
            }
            if let Some(callback) = on_finish.take() {
                callback();
            }
        }));
    }

    /// Start the animation with an explicit repeat count.
    pub fn run_loop(
        &mut self,
        driver: Arc<dyn Driver>,
        on_finish: Option<OnFinish>,
        loops: Loops,
    ) {
        self.loops = loops;
        self.run(driver, on_finish);
    }

    /// Cancel the scheduled ticks. Channel values stay where the last
    /// tick left them; no tick fires after this returns.
    pub async fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Default for Animation {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Animation {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[derive(PartialEq)]
enum Step {
    Continue,
    Finished,
}

/// Per-run transition state: the immutable plan plus the start values
/// captured when the transition first runs.
struct RunTransition {
    plan: Transition,
    captured: Option<ChannelMap>,
}

/// Single-writer state machine advanced once per scheduled tick.
struct Runner {
    transitions: Vec<RunTransition>,
    duration: Duration,
    loops: Loops,
    filters: Vec<Filter>,
    cursor: usize,
    completed_loops: u32,
    epoch: Instant,
}

impl Runner {
    fn step(&mut self, now: Instant, driver: &dyn Driver) -> Step {
        let elapsed = now.duration_since(self.epoch);

        // Settle every transition whose window has passed since the last
        // tick, dropping its captured start state.
        let first_settled = self.cursor;
        while self.cursor < self.transitions.len()
            && self.transitions[self.cursor].plan.end <= elapsed
        {
            self.transitions[self.cursor].captured = None;
            self.cursor += 1;
        }

        if self.cursor > first_settled {
            let mut settled = ChannelMap::new();
            for transition in &self.transitions[first_settled..self.cursor] {
                settled.extend(&transition.plan.to);
            }
            self.push(settled, driver);
        }

        if elapsed >= self.duration {
            self.completed_loops += 1;
            if self.loops.reached(self.completed_loops) {
                return Step::Finished;
            }
            // Re-arm drift-free: the next loop starts where this one was
            // scheduled to end, not at `now`.
            self.epoch += self.duration;
            self.cursor = 0;
            return Step::Continue;
        }

        if let Some(values) = self.interpolate(elapsed, driver) {
            self.push(values, driver);
        }

        Step::Continue
    }

    /// Intermediate values for the in-progress transition, if one is
    /// active and has a non-zero window.
    fn interpolate(&mut self, elapsed: Duration, driver: &dyn Driver) -> Option<ChannelMap> {
        let current = self.transitions.get_mut(self.cursor)?;
        let window = current.plan.end - current.plan.start;
        if window.is_zero() {
            return None;
        }

        let plan = &current.plan;
        let captured = current.captured.get_or_insert_with(|| {
            plan.to
                .keys()
                .map(|&channel| {
                    let value = plan
                        .from
                        .as_ref()
                        .and_then(|from| from.get(&channel).copied())
                        .or_else(|| driver.get(channel))
                        .unwrap_or(0);
                    (channel, value)
                })
                .collect()
        });

        let into = elapsed.saturating_sub(plan.start).min(window);
        let progress = plan
            .easing
            .apply(into.as_secs_f64(), 0.0, 1.0, window.as_secs_f64());

        let mut values = ChannelMap::with_capacity(plan.to.len());
        for (&channel, &end) in &plan.to {
            let start = captured.get(&channel).copied().unwrap_or(0);
            let value = f64::from(start) + progress * (f64::from(end) - f64::from(start));
            values.insert(channel, value.round().clamp(0.0, 255.0) as u8);
        }
        Some(values)
    }

    fn push(&self, mut values: ChannelMap, driver: &dyn Driver) {
        for filter in &self.filters {
            filter(&mut values);
        }
        driver.update(&values);
    }
}
