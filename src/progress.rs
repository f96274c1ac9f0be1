//! Loading progress bookkeeping.
//!
//! Every [`Stage`](crate::Stage) owns a [`LoadTracker`] and reports each model
//! fetch to it. Trackers are cheap shared handles, so a host can keep a clone
//! and poll it, or group several of them in a [`ProgressBoard`] to drive a
//! single progress bar.

use std::cell::RefCell;
use std::rc::Rc;

type ProgressFn = Box<dyn FnMut(&str, usize, usize)>;

#[derive(Default)]
struct TrackerState {
    total: usize,
    loaded: usize,
    errors: Vec<String>,
    on_progress: Option<ProgressFn>,
}

/// Counts items started, finished and failed.
#[derive(Clone, Default)]
pub struct LoadTracker {
    state: Rc<RefCell<TrackerState>>,
}

impl LoadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called with `(item, loaded, total)` each time an item finishes.
    pub fn on_progress(&self, f: impl FnMut(&str, usize, usize) + 'static) {
        self.state.borrow_mut().on_progress = Some(Box::new(f));
    }

    pub fn item_start(&self, item: &str) {
        let mut state = self.state.borrow_mut();
        state.total += 1;
        log::debug!("loading '{}' ({}/{})", item, state.loaded, state.total);
    }

    pub fn item_end(&self, item: &str) {
        let (loaded, total, callback) = {
            let mut state = self.state.borrow_mut();
            state.loaded += 1;
            (state.loaded, state.total, state.on_progress.take())
        };
        log::debug!("loaded '{}' ({}/{})", item, loaded, total);

        // The callback runs without the borrow held so it may query the tracker.
        if let Some(mut callback) = callback {
            callback(item, loaded, total);
            let mut state = self.state.borrow_mut();
            if state.on_progress.is_none() {
                state.on_progress = Some(callback);
            }
        }
    }

    /// A failed item counts as settled for [`Self::is_done`] but not as loaded.
    pub fn item_error(&self, item: &str) {
        self.state.borrow_mut().errors.push(item.to_string());
    }

    pub fn total(&self) -> usize {
        self.state.borrow().total
    }

    pub fn loaded(&self) -> usize {
        self.state.borrow().loaded
    }

    pub fn errors(&self) -> Vec<String> {
        self.state.borrow().errors.clone()
    }

    /// Fraction of started items that finished, `1.0` when nothing started.
    pub fn progress(&self) -> f32 {
        let state = self.state.borrow();
        if state.total == 0 {
            1.0
        } else {
            state.loaded as f32 / state.total as f32
        }
    }

    pub fn is_done(&self) -> bool {
        let state = self.state.borrow();
        state.loaded + state.errors.len() >= state.total
    }
}

impl std::fmt::Debug for LoadTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("LoadTracker")
            .field("total", &state.total)
            .field("loaded", &state.loaded)
            .field("errors", &state.errors)
            .finish()
    }
}

/// Several named trackers folded into one percentage.
#[derive(Debug, Default)]
pub struct ProgressBoard {
    trackers: Vec<(String, LoadTracker)>,
}

impl ProgressBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tracker under `name`, replacing any tracker of that name.
    pub fn add(&mut self, name: impl Into<String>, tracker: LoadTracker) {
        let name = name.into();
        match self.trackers.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = tracker,
            None => self.trackers.push((name, tracker)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&LoadTracker> {
        self.trackers.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    /// Items loaded over items started across every tracker, `0..=100`.
    pub fn percentage(&self) -> f32 {
        let (loaded, total) = self
            .trackers
            .iter()
            .fold((0, 0), |(l, t), (_, tracker)| {
                (l + tracker.loaded(), t + tracker.total())
            });
        if total == 0 {
            100.0
        } else {
            loaded as f32 / total as f32 * 100.0
        }
    }

    pub fn is_done(&self) -> bool {
        self.trackers.iter().all(|(_, t)| t.is_done())
    }

    /// `(tracker name, item)` for every failed item.
    pub fn failures(&self) -> Vec<(String, String)> {
        self.trackers
            .iter()
            .flat_map(|(name, t)| t.errors().into_iter().map(move |e| (name.clone(), e)))
            .collect()
    }
}
