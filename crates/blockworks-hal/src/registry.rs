//! [`BlockRegistry`] – the grid terminal: name-based block and group lookup.
//!
//! The registry holds a shared handle for every registered [`Piston`],
//! [`MotorStator`] and [`Drill`], plus named groups of block names.  A
//! program resolves the handles it needs once and keeps them; the registry
//! is only consulted again when the program explicitly re-resolves.
//!
//! Lookups return `Option`: a missing block is a configuration problem for
//! the caller to report, not a panic.
//!
//! The registry is shared between the grid that builds it and the programs
//! that query it, so registration goes through `&self`.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::block::{Drill, MotorStator, Piston};

/// Central name → block handle table.
#[derive(Default)]
pub struct BlockRegistry {
    pistons: RwLock<HashMap<String, Arc<dyn Piston>>>,
    motor_stators: RwLock<HashMap<String, Arc<dyn MotorStator>>>,
    drills: RwLock<HashMap<String, Arc<dyn Drill>>>,
    groups: RwLock<HashMap<String, Vec<String>>>,
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl BlockRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a piston.  Any block previously registered under the same
    /// name is replaced.
    pub fn register_piston(&self, piston: Arc<dyn Piston>) {
        debug!(name = piston.name(), "registered piston");
        write(&self.pistons).insert(piston.name().to_string(), piston);
    }

    /// Register a rotor or hinge.
    pub fn register_motor_stator(&self, stator: Arc<dyn MotorStator>) {
        debug!(name = stator.name(), "registered motor stator");
        write(&self.motor_stators).insert(stator.name().to_string(), stator);
    }

    /// Register a drill head.
    pub fn register_drill(&self, drill: Arc<dyn Drill>) {
        debug!(name = drill.name(), "registered drill");
        write(&self.drills).insert(drill.name().to_string(), drill);
    }

    /// Define (or redefine) a named group.  Members are block names; the
    /// order is preserved by [`pistons_in_group`][Self::pistons_in_group].
    pub fn register_group(&self, group: impl Into<String>, members: Vec<String>) {
        write(&self.groups).insert(group.into(), members);
    }

    pub fn piston(&self, name: &str) -> Option<Arc<dyn Piston>> {
        read(&self.pistons).get(name).cloned()
    }

    pub fn motor_stator(&self, name: &str) -> Option<Arc<dyn MotorStator>> {
        read(&self.motor_stators).get(name).cloned()
    }

    pub fn drill(&self, name: &str) -> Option<Arc<dyn Drill>> {
        read(&self.drills).get(name).cloned()
    }

    /// Pistons belonging to `group`, in member order.
    ///
    /// Returns `None` when the group does not exist.  Members that are not
    /// registered pistons are skipped, so the result may be empty.
    pub fn pistons_in_group(&self, group: &str) -> Option<Vec<Arc<dyn Piston>>> {
        let groups = read(&self.groups);
        let members = groups.get(group)?;
        let pistons = read(&self.pistons);
        Some(
            members
                .iter()
                .filter_map(|name| pistons.get(name).cloned())
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockworks_types::BlockError;
    use std::sync::Mutex;

    // ------------------------------------------------------------------
    // Test doubles
    // ------------------------------------------------------------------

    struct MockPiston {
        name: String,
        velocity: Mutex<f32>,
    }
    impl MockPiston {
        fn new(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                velocity: Mutex::new(0.0),
            })
        }
    }
    impl Piston for MockPiston {
        fn name(&self) -> &str {
            &self.name
        }
        fn position(&self) -> f32 {
            0.0
        }
        fn velocity(&self) -> f32 {
            *self.velocity.lock().unwrap()
        }
        fn set_velocity(&self, velocity: f32) -> Result<(), BlockError> {
            *self.velocity.lock().unwrap() = velocity;
            Ok(())
        }
        fn min_limit(&self) -> f32 {
            0.0
        }
        fn max_limit(&self) -> f32 {
            10.0
        }
        fn set_max_limit(&self, _limit: f32) -> Result<(), BlockError> {
            Ok(())
        }
    }

    struct MockDrill {
        name: String,
    }
    impl Drill for MockDrill {
        fn name(&self) -> &str {
            &self.name
        }
        fn is_enabled(&self) -> bool {
            false
        }
        fn set_enabled(&self, _enabled: bool) -> Result<(), BlockError> {
            Ok(())
        }
    }

    // ------------------------------------------------------------------
    // Tests
    // ------------------------------------------------------------------

    #[test]
    fn lookup_by_name() {
        let registry = BlockRegistry::new();
        registry.register_piston(MockPiston::new("RPiston"));

        assert!(registry.piston("RPiston").is_some());
        assert!(registry.piston("Nope").is_none());
        // Names are per block type.
        assert!(registry.motor_stator("RPiston").is_none());
    }

    #[test]
    fn resolved_handle_shares_block_state() {
        let registry = BlockRegistry::new();
        registry.register_piston(MockPiston::new("p"));

        let a = registry.piston("p").unwrap();
        let b = registry.piston("p").unwrap();
        a.set_velocity(0.5).unwrap();
        assert!((b.velocity() - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn group_preserves_order_and_skips_non_pistons() {
        let registry = BlockRegistry::new();
        registry.register_piston(MockPiston::new("p2"));
        registry.register_piston(MockPiston::new("p1"));
        registry.register_drill(Arc::new(MockDrill {
            name: "d".to_string(),
        }));
        registry.register_group(
            "lift",
            vec!["p1".to_string(), "d".to_string(), "p2".to_string()],
        );

        let pistons = registry.pistons_in_group("lift").unwrap();
        let names: Vec<&str> = pistons.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["p1", "p2"]);
    }

    #[test]
    fn unknown_group_is_none_and_empty_group_is_empty() {
        let registry = BlockRegistry::new();
        registry.register_group("empty", vec!["ghost".to_string()]);
        assert!(registry.pistons_in_group("missing").is_none());
        assert!(registry.pistons_in_group("empty").unwrap().is_empty());
    }

    #[test]
    fn re_registering_replaces_old_block() {
        let registry = BlockRegistry::new();
        registry.register_piston(MockPiston::new("p"));
        registry.piston("p").unwrap().set_velocity(3.0).unwrap();

        registry.register_piston(MockPiston::new("p"));
        assert!((registry.piston("p").unwrap().velocity() - 0.0).abs() < f32::EPSILON);
    }
}
