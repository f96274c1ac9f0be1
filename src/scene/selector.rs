//! Registry of scene factories and the single running shell.

use std::collections::HashMap;

use super::scene::SceneId;
use crate::app::Shell;

type ShellFactory = Box<dyn Fn() -> Shell>;

/// Builds shells on demand and keeps exactly one of them current.
///
/// # Example
///
/// ```
/// use stagehand::{Scene, SceneSelector, Shell, ShellConfig};
///
/// struct Menu;
/// impl Scene for Menu {}
///
/// let mut selector = SceneSelector::new();
/// selector.register("menu", || Shell::new(ShellConfig::new().title("menu"), Menu));
///
/// let shell = selector.select("menu").unwrap();
/// assert!(shell.is_running());
/// assert!(selector.select("credits").is_none());
/// ```
#[derive(Default)]
pub struct SceneSelector {
    factories: HashMap<SceneId, ShellFactory>,
    current: Option<(SceneId, Shell)>,
}

impl SceneSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `id`, replacing any previous one.
    pub fn register(&mut self, id: impl Into<SceneId>, factory: impl Fn() -> Shell + 'static) {
        self.factories.insert(id.into(), Box::new(factory));
    }

    pub fn contains(&self, id: &SceneId) -> bool {
        self.factories.contains_key(id)
    }

    /// Identifier of the current shell.
    pub fn current_id(&self) -> Option<&SceneId> {
        self.current.as_ref().map(|(id, _)| id)
    }

    pub fn current(&self) -> Option<&Shell> {
        self.current.as_ref().map(|(_, shell)| shell)
    }

    pub fn current_mut(&mut self) -> Option<&mut Shell> {
        self.current.as_mut().map(|(_, shell)| shell)
    }

    /// Tear down the current shell, then build and start the shell
    /// registered under `id` and make it current.
    ///
    /// Returns `None` for an unknown id, leaving the current shell alone. A
    /// shell whose load fails is still installed, in the failed state.
    pub fn select(&mut self, id: impl Into<SceneId>) -> Option<&mut Shell> {
        let id = id.into();
        let Some(factory) = self.factories.get(&id) else {
            log::warn!("scene '{}' not found", id);
            return None;
        };

        if let Some((old_id, mut old)) = self.current.take() {
            log::info!("leaving scene '{}'", old_id);
            old.destroy();
        }

        log::info!("entering scene '{}'", id);
        let mut shell = factory();
        if let Err(e) = shell.start() {
            log::error!("scene '{}' did not start: {}", id, e);
        }
        self.current = Some((id, shell));
        self.current_mut()
    }

    /// Tear down the current shell, if any, leaving no scene selected.
    pub fn clear(&mut self) {
        if let Some((_, mut shell)) = self.current.take() {
            shell.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{ShellConfig, ShellState};
    use crate::scene::Scene;
    use crate::stage::Stage;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Named {
        name: &'static str,
        log: Log,
    }

    impl Scene for Named {
        fn mounted(&mut self, _stage: &mut Stage) {
            self.log.borrow_mut().push(format!("mount {}", self.name));
        }
        fn before_destroy(&mut self, _stage: &mut Stage) {
            self.log.borrow_mut().push(format!("destroy {}", self.name));
        }
    }

    fn selector(log: &Log) -> SceneSelector {
        let mut selector = SceneSelector::new();
        for name in ["a", "b"] {
            let log = log.clone();
            selector.register(name, move || {
                Shell::new(
                    ShellConfig::new().title(name).fixed_step(0.1),
                    Named {
                        name,
                        log: log.clone(),
                    },
                )
            });
        }
        selector
    }

    #[test]
    fn switching_destroys_previous_first() {
        let log = Log::default();
        let mut selector = selector(&log);

        selector.select("a").unwrap();
        selector.select("b").unwrap();
        assert_eq!(*log.borrow(), vec!["mount a", "destroy a", "mount b"]);
        assert_eq!(selector.current_id(), Some(&SceneId::new("b")));
        assert_eq!(selector.current().unwrap().state(), ShellState::Running);
    }

    #[test]
    fn unknown_id_keeps_current() {
        let log = Log::default();
        let mut selector = selector(&log);
        selector.select("a");
        assert!(selector.select("missing").is_none());
        assert_eq!(selector.current_id(), Some(&SceneId::new("a")));
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn register_overwrites() {
        let log = Log::default();
        let mut selector = selector(&log);
        let other = log.clone();
        selector.register("a", move || {
            Shell::new(
                ShellConfig::new().fixed_step(0.1),
                Named {
                    name: "a2",
                    log: other.clone(),
                },
            )
        });
        selector.select("a");
        assert_eq!(*log.borrow(), vec!["mount a2"]);

        selector.clear();
        assert!(selector.current().is_none());
        assert_eq!(log.borrow().last().map(String::as_str), Some("destroy a2"));
    }

    #[test]
    fn ids_from_str_and_string_match() {
        let log = Log::default();
        let selector = selector(&log);
        assert!(selector.contains(&"a".into()));
        assert!(selector.contains(&SceneId::from(String::from("b"))));
        assert!(!selector.contains(&SceneId::new("c")));
        assert_eq!(SceneId::new("a").to_string(), "a");
    }
}
