// src/protocol/profiles.rs

use serde::Serialize;
use std::collections::BTreeSet;

pub const MANIPULATION: &str = "manipulation";
pub const SENSING: &str = "sensing";
pub const NAVIGATION: &str = "navigation";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RobotProfile {
    pub capabilities: BTreeSet<String>,
    pub battery_capacity_wh: f64,
}

impl RobotProfile {
    pub fn new(capabilities: &[&str], battery_capacity_wh: f64) -> Self {
        Self {
            capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
            battery_capacity_wh,
        }
    }

    pub fn has(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }
}

/// Known robot profiles, matched against robot ids by name containment.
#[derive(Clone, Debug, PartialEq)]
pub struct ProfileRegistry {
    profiles: Vec<(String, RobotProfile)>,
    baseline: RobotProfile,
}

impl ProfileRegistry {
    pub fn new(baseline: RobotProfile) -> Self {
        Self {
            profiles: Vec::new(),
            baseline,
        }
    }

    pub fn register(mut self, name: &str, profile: RobotProfile) -> Self {
        self.profiles.push((name.to_lowercase(), profile));
        self
    }

    pub fn baseline(&self) -> &RobotProfile {
        &self.baseline
    }

    /// Longest profile name contained in `robot_id` wins; ties go to the
    /// profile registered first.
    pub fn resolve(&self, robot_id: &str) -> (&str, &RobotProfile) {
        let robot_id = robot_id.to_lowercase();
        let mut best: Option<&(String, RobotProfile)> = None;
        for entry in &self.profiles {
            if entry.0.is_empty() || !robot_id.contains(entry.0.as_str()) {
                continue;
            }
            if best.is_none_or(|b| entry.0.len() > b.0.len()) {
                best = Some(entry);
            }
        }
        best.map(|(name, profile)| (name.as_str(), profile))
            .unwrap_or(("baseline", &self.baseline))
    }
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::new(RobotProfile::new(&[NAVIGATION], 50.0))
            .register("limo", RobotProfile::new(&[NAVIGATION], 60.0))
            .register("limo_scout", RobotProfile::new(&[NAVIGATION, SENSING], 40.0))
            .register("limo_heavy", RobotProfile::new(&[NAVIGATION, MANIPULATION], 80.0))
            .register("locobot", RobotProfile::new(&[NAVIGATION, MANIPULATION, SENSING], 45.0))
    }
}

/// Capability a task needs, inferred from keywords in its name.
pub fn required_capability(task: &str) -> Option<&'static str> {
    let task = task.to_lowercase();
    if ["pick", "place", "open"].iter().any(|k| task.contains(k)) {
        Some(MANIPULATION)
    } else if ["detect", "search"].iter().any(|k| task.contains(k)) {
        Some(SENSING)
    } else {
        None
    }
}
