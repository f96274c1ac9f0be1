//! Keyframe clips and the player that blends them onto a node tree.

use std::cell::Cell;
use std::rc::Rc;

use glam::{Quat, Vec3};

use crate::graph::{NodeId, SceneGraph};

/// A keyframe channel targeting one named node under the player's root.
#[derive(Clone, Debug, PartialEq)]
pub enum Track {
    Translation {
        node: String,
        keys: Vec<(f32, Vec3)>,
    },
    Rotation {
        node: String,
        keys: Vec<(f32, Quat)>,
    },
}

impl Track {
    pub fn node(&self) -> &str {
        match self {
            Track::Translation { node, .. } | Track::Rotation { node, .. } => node,
        }
    }
}

/// Index of the key at or before `time`, plus the blend factor toward the
/// next key. Times before the first key or after the last clamp to the ends.
fn locate<T>(keys: &[(f32, T)], time: f32) -> Option<(usize, usize, f32)> {
    let last = keys.len().checked_sub(1)?;
    if time <= keys[0].0 {
        return Some((0, 0, 0.0));
    }
    if time >= keys[last].0 {
        return Some((last, last, 0.0));
    }
    let next = keys.iter().position(|(t, _)| *t > time)?;
    let prev = next - 1;
    let span = keys[next].0 - keys[prev].0;
    let f = if span > 0.0 {
        (time - keys[prev].0) / span
    } else {
        0.0
    };
    Some((prev, next, f))
}

fn sample_vec3(keys: &[(f32, Vec3)], time: f32) -> Option<Vec3> {
    let (a, b, f) = locate(keys, time)?;
    Some(keys[a].1.lerp(keys[b].1, f))
}

fn sample_quat(keys: &[(f32, Quat)], time: f32) -> Option<Quat> {
    let (a, b, f) = locate(keys, time)?;
    Some(keys[a].1.slerp(keys[b].1, f))
}

/// A named animation made of keyframe tracks.
#[derive(Clone, Debug, PartialEq)]
pub struct Clip {
    pub name: String,
    /// Length in seconds; playback wraps at this point.
    pub duration: f32,
    pub tracks: Vec<Track>,
}

impl Clip {
    pub fn new(name: impl Into<String>, duration: f32) -> Self {
        Self {
            name: name.into(),
            duration,
            tracks: Vec::new(),
        }
    }

    pub fn with_track(mut self, track: Track) -> Self {
        self.tracks.push(track);
        self
    }
}

#[derive(Clone, Copy, Debug)]
struct Fade {
    from: f32,
    to: f32,
    elapsed: f32,
    duration: f32,
}

#[derive(Debug)]
struct Action {
    clip: Clip,
    time: f32,
    weight: f32,
    fade: Option<Fade>,
    playing: bool,
}

impl Action {
    fn advance(&mut self, dt: f32) {
        if self.clip.duration > 0.0 {
            self.time = (self.time + dt).rem_euclid(self.clip.duration);
        }
        if let Some(fade) = self.fade.as_mut() {
            fade.elapsed += dt;
            let t = if fade.duration > 0.0 {
                (fade.elapsed / fade.duration).min(1.0)
            } else {
                1.0
            };
            self.weight = fade.from + (fade.to - fade.from) * t;
            if t >= 1.0 {
                self.fade = None;
                if self.weight <= 0.0 {
                    self.playing = false;
                }
            }
        }
    }
}

/// Plays clips on the subtree of a root node, blending overlapping actions
/// by weight.
#[derive(Debug)]
pub struct ClipPlayer {
    root: NodeId,
    actions: Vec<Action>,
    time_scale: f32,
}

impl ClipPlayer {
    pub fn new(root: NodeId) -> Self {
        Self {
            root,
            actions: Vec::new(),
            time_scale: 1.0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Multiplier applied to every `dt` passed to [`Self::update`].
    pub fn set_time_scale(&mut self, time_scale: f32) {
        self.time_scale = time_scale;
    }

    fn action_mut(&mut self, name: &str) -> Option<&mut Action> {
        self.actions.iter_mut().find(|a| a.clip.name == name)
    }

    /// Restart `clip` from time zero at full weight.
    pub fn play(&mut self, clip: &Clip) {
        match self.action_mut(&clip.name) {
            Some(action) => {
                action.time = 0.0;
                action.weight = 1.0;
                action.fade = None;
                action.playing = true;
            }
            None => self.actions.push(Action {
                clip: clip.clone(),
                time: 0.0,
                weight: 1.0,
                fade: None,
                playing: true,
            }),
        }
    }

    /// Fade `from` out and `to` in over `duration` seconds.
    ///
    /// Returns `false` if either clip has never been played.
    pub fn cross_fade(&mut self, from: &str, to: &str, duration: f32) -> bool {
        let has_from = self.actions.iter().any(|a| a.clip.name == from);
        let has_to = self.actions.iter().any(|a| a.clip.name == to);
        if !has_from || !has_to {
            return false;
        }
        if let Some(action) = self.action_mut(from) {
            action.fade = Some(Fade {
                from: action.weight,
                to: 0.0,
                elapsed: 0.0,
                duration,
            });
        }
        if let Some(action) = self.action_mut(to) {
            action.playing = true;
            action.weight = 0.0;
            action.fade = Some(Fade {
                from: 0.0,
                to: 1.0,
                elapsed: 0.0,
                duration,
            });
        }
        true
    }

    pub fn is_playing(&self, name: &str) -> bool {
        self.actions
            .iter()
            .any(|a| a.clip.name == name && a.playing)
    }

    /// Current blend weight of a clip, zero if it is not playing.
    pub fn weight(&self, name: &str) -> f32 {
        self.actions
            .iter()
            .find(|a| a.clip.name == name && a.playing)
            .map_or(0.0, |a| a.weight)
    }

    pub fn stop_all(&mut self) {
        self.actions.clear();
    }

    /// Advance every playing action by `dt` (scaled) and write the blended
    /// pose to the nodes the tracks name.
    pub fn update(&mut self, dt: f32, graph: &mut SceneGraph) {
        let dt = dt * self.time_scale;
        for action in self.actions.iter_mut().filter(|a| a.playing) {
            action.advance(dt);
        }

        // (node name, translation accumulator, rotation accumulator)
        let mut poses: Vec<(&str, Option<(Vec3, f32)>, Option<(Quat, f32)>)> = Vec::new();
        for action in self.actions.iter().filter(|a| a.playing && a.weight > 0.0) {
            let w = action.weight;
            for track in &action.clip.tracks {
                let index = match poses.iter().position(|(n, _, _)| *n == track.node()) {
                    Some(i) => i,
                    None => {
                        poses.push((track.node(), None, None));
                        poses.len() - 1
                    }
                };
                let pose = &mut poses[index];
                match track {
                    Track::Translation { keys, .. } => {
                        if let Some(v) = sample_vec3(keys, action.time) {
                            let (sum, total) = pose.1.unwrap_or((Vec3::ZERO, 0.0));
                            pose.1 = Some((sum + v * w, total + w));
                        }
                    }
                    Track::Rotation { keys, .. } => {
                        if let Some(q) = sample_quat(keys, action.time) {
                            pose.2 = Some(match pose.2 {
                                None => (q, w),
                                Some((acc, total)) => (acc.slerp(q, w / (total + w)), total + w),
                            });
                        }
                    }
                }
            }
        }

        for (name, translation, rotation) in poses {
            let Some(node) = graph.find_by_name(self.root, name) else {
                continue;
            };
            if let Some(t) = graph.transform_mut(node) {
                if let Some((sum, total)) = translation {
                    t.position = sum / total;
                }
                if let Some((q, _)) = rotation {
                    t.rotation = q.normalize();
                }
            }
        }
    }
}

/// Cancellation handle returned by [`Model::loop_clips`](super::Model::loop_clips).
#[derive(Clone, Debug, Default)]
pub struct ClipLoopHandle {
    cancelled: Rc<Cell<bool>>,
}

impl ClipLoopHandle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Stop the loop. Later ticks of the timer do nothing.
    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

/// A repeating timer driven by frame time.
#[derive(Debug)]
pub(crate) struct ClipLoop {
    interval: f32,
    elapsed: f32,
    handle: ClipLoopHandle,
}

impl ClipLoop {
    pub(crate) fn new(interval: f32, handle: ClipLoopHandle) -> Self {
        Self {
            interval,
            elapsed: 0.0,
            handle,
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.handle.is_cancelled()
    }

    pub(crate) fn cancel(&self) {
        self.handle.cancel();
    }

    /// Advance by `dt` and return how many times the timer fired.
    pub(crate) fn tick(&mut self, dt: f32) -> u32 {
        if self.is_cancelled() {
            return 0;
        }
        if self.interval <= 0.0 {
            return 1;
        }
        self.elapsed += dt;
        let fired = (self.elapsed / self.interval).floor();
        self.elapsed -= fired * self.interval;
        fired as u32
    }
}
