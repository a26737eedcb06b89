//! In-memory stand-ins for the OS seams.
//!
//! These exist so the controller's sequencing and failure handling can be
//! exercised without a kernel, a service manager, or root. Clones share
//! state, so a fake handed to a component stays inspectable from the
//! test.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::rc::Rc;

use crate::module::{ModuleLoader, UnloadOutcome};
use crate::net::LinkControl;
use crate::properties::{Observation, PropertyStore};

// ============================================================================
// Property store
// ============================================================================

/// In-memory property store with scripted observations.
///
/// `set` calls are recorded and also applied to the current map with a
/// fresh generation. A per-name observation script, when present, is
/// consumed one entry per `observe` call; the final entry is sticky so a
/// terminal state keeps being observed.
#[derive(Debug, Clone, Default)]
pub struct FakePropertyStore {
    inner: Rc<RefCell<PropertyInner>>,
}

#[derive(Debug, Default)]
struct PropertyInner {
    current: HashMap<String, Observation>,
    script: HashMap<String, VecDeque<Option<Observation>>>,
    sets: Vec<(String, String)>,
    next_generation: u64,
}

impl FakePropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a property from "outside" (as the service manager would),
    /// bumping its generation without recording a controller set.
    pub fn insert(&self, name: &str, value: &str) {
        let mut inner = self.inner.borrow_mut();
        inner.next_generation += 1;
        let generation = inner.next_generation;
        inner.current.insert(
            name.to_string(),
            Observation {
                value: value.to_string(),
                generation,
            },
        );
    }

    /// Queues one scripted observation for `name`. `None` scripts an
    /// absent property. The last queued entry is observed forever.
    pub fn push_observation(&self, name: &str, value: Option<&str>, generation: u64) {
        self.inner
            .borrow_mut()
            .script
            .entry(name.to_string())
            .or_default()
            .push_back(value.map(|v| Observation {
                value: v.to_string(),
                generation,
            }));
    }

    /// All `set` calls made through the trait, in order.
    pub fn sets(&self) -> Vec<(String, String)> {
        self.inner.borrow().sets.clone()
    }
}

impl PropertyStore for FakePropertyStore {
    fn observe(&self, name: &str) -> Option<Observation> {
        let mut inner = self.inner.borrow_mut();
        if let Some(queue) = inner.script.get_mut(name) {
            if queue.len() > 1 {
                return queue.pop_front().flatten();
            }
            if let Some(entry) = queue.front() {
                return entry.clone();
            }
        }
        inner.current.get(name).cloned()
    }

    fn set(&self, name: &str, value: &str) -> io::Result<()> {
        let mut inner = self.inner.borrow_mut();
        inner.sets.push((name.to_string(), value.to_string()));
        inner.next_generation += 1;
        let generation = inner.next_generation;
        inner.current.insert(
            name.to_string(),
            Observation {
                value: value.to_string(),
                generation,
            },
        );
        Ok(())
    }
}

// ============================================================================
// Module loader
// ============================================================================

/// Recording module loader with scriptable failures.
#[derive(Debug, Clone, Default)]
pub struct FakeModuleLoader {
    inner: Rc<RefCell<LoaderInner>>,
}

#[derive(Debug, Default)]
struct LoaderInner {
    loads: Vec<(Vec<u8>, String)>,
    unloads: Vec<String>,
    load_failures: VecDeque<io::ErrorKind>,
    busy_remaining: HashMap<String, u32>,
    unload_failures: HashMap<String, io::ErrorKind>,
    attempt_counts: HashMap<String, u32>,
}

impl FakeModuleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a failure for the next load call (FIFO across calls).
    pub fn fail_next_load(&self, kind: io::ErrorKind) {
        self.inner.borrow_mut().load_failures.push_back(kind);
    }

    /// Makes the next `count` unload attempts for `name` report Busy.
    pub fn set_busy(&self, name: &str, count: u32) {
        self.inner
            .borrow_mut()
            .busy_remaining
            .insert(name.to_string(), count);
    }

    /// Makes every unload attempt for `name` fail hard.
    pub fn fail_unload(&self, name: &str, kind: io::ErrorKind) {
        self.inner
            .borrow_mut()
            .unload_failures
            .insert(name.to_string(), kind);
    }

    /// Successful loads as (image bytes, params), in order.
    pub fn loads(&self) -> Vec<(Vec<u8>, String)> {
        self.inner.borrow().loads.clone()
    }

    /// Successful unloads by module name, in order.
    pub fn unloads(&self) -> Vec<String> {
        self.inner.borrow().unloads.clone()
    }

    /// Total unload attempts (including Busy outcomes) for `name`.
    pub fn unload_attempts(&self, name: &str) -> u32 {
        *self
            .inner
            .borrow()
            .attempt_counts
            .get(name)
            .unwrap_or(&0)
    }
}

impl ModuleLoader for FakeModuleLoader {
    fn load(&self, image: &[u8], params: &str) -> io::Result<()> {
        let mut inner = self.inner.borrow_mut();
        if let Some(kind) = inner.load_failures.pop_front() {
            return Err(io::Error::from(kind));
        }
        inner.loads.push((image.to_vec(), params.to_string()));
        Ok(())
    }

    fn unload(&self, name: &str) -> io::Result<UnloadOutcome> {
        let mut inner = self.inner.borrow_mut();
        *inner.attempt_counts.entry(name.to_string()).or_insert(0) += 1;
        if let Some(kind) = inner.unload_failures.get(name) {
            return Err(io::Error::from(*kind));
        }
        if let Some(remaining) = inner.busy_remaining.get_mut(name) {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(UnloadOutcome::Busy);
            }
        }
        inner.unloads.push(name.to_string());
        Ok(UnloadOutcome::Unloaded)
    }
}

// ============================================================================
// Link control
// ============================================================================

/// Recording link control with an optional scripted failure.
#[derive(Debug, Clone, Default)]
pub struct FakeLinkControl {
    inner: Rc<RefCell<LinkInner>>,
}

#[derive(Debug, Default)]
struct LinkInner {
    ups: Vec<String>,
    fail: Option<io::ErrorKind>,
}

impl FakeLinkControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, kind: io::ErrorKind) {
        self.inner.borrow_mut().fail = Some(kind);
    }

    /// Interfaces brought up, in order.
    pub fn ups(&self) -> Vec<String> {
        self.inner.borrow().ups.clone()
    }
}

impl LinkControl for FakeLinkControl {
    fn bring_up(&self, ifname: &str) -> io::Result<()> {
        let mut inner = self.inner.borrow_mut();
        if let Some(kind) = inner.fail {
            return Err(io::Error::from(kind));
        }
        inner.ups.push(ifname.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_store_set_bumps_generation() {
        let store = FakePropertyStore::new();
        store.set("init.svc.hostapd", "stopped").expect("set");
        let first = store.observe("init.svc.hostapd").expect("first");
        store.set("init.svc.hostapd", "running").expect("set");
        let second = store.observe("init.svc.hostapd").expect("second");
        assert!(second.generation > first.generation);
        assert_eq!(second.value, "running");
    }

    #[test]
    fn test_property_store_script_is_sticky_on_last_entry() {
        let store = FakePropertyStore::new();
        store.push_observation("s", Some("stopped"), 1);
        store.push_observation("s", Some("running"), 2);
        assert_eq!(store.observe("s").expect("obs").value, "stopped");
        assert_eq!(store.observe("s").expect("obs").value, "running");
        // Last entry repeats.
        assert_eq!(store.observe("s").expect("obs").value, "running");
    }

    #[test]
    fn test_module_loader_busy_then_unloaded() {
        let loader = FakeModuleLoader::new();
        loader.set_busy("libra", 2);
        assert_eq!(loader.unload("libra").expect("busy"), UnloadOutcome::Busy);
        assert_eq!(loader.unload("libra").expect("busy"), UnloadOutcome::Busy);
        assert_eq!(
            loader.unload("libra").expect("done"),
            UnloadOutcome::Unloaded
        );
        assert_eq!(loader.unload_attempts("libra"), 3);
        assert_eq!(loader.unloads(), vec!["libra".to_string()]);
    }

    #[test]
    fn test_link_control_records_ups() {
        let link = FakeLinkControl::new();
        link.bring_up("softap.0").expect("up");
        assert_eq!(link.ups(), vec!["softap.0".to_string()]);
    }
}
