// src/validation/plan.rs

use crate::model::Predicate;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityState {
    Opened,
    Closed,
    On,
    Off,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationKind {
    AlreadyHolding { held: String },
    ObjectInClosedContainer { object: String, container: String },
    NotHolding,
    HoldingDifferentObject { held: String, named: String },
    ContainerClosed { container: String },
}

impl ViolationKind {
    pub fn hint(&self) -> String {
        match self {
            ViolationKind::AlreadyHolding { held } => {
                format!("Place or drop `{held}` before picking up anything else.")
            }
            ViolationKind::ObjectInClosedContainer { container, .. } => {
                format!("Open `{container}` before picking up its contents.")
            }
            ViolationKind::NotHolding => "Pick up an object before placing it.".to_string(),
            ViolationKind::HoldingDifferentObject { held, .. } => {
                format!("Only the held object `{held}` can be placed.")
            }
            ViolationKind::ContainerClosed { container } => {
                format!("Open `{container}` before placing into it.")
            }
        }
    }
}

/// The first step that broke the plan.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Violation {
    pub step: usize,
    pub action: String,
    pub kind: ViolationKind,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub score: f64,
    pub violation: Option<Violation>,
    pub location: Option<String>,
}

impl ValidationResult {
    fn from_outcome(violation: Option<Violation>, location: Option<String>) -> Self {
        let valid = violation.is_none();
        Self {
            valid,
            score: if valid { 1.0 } else { 0.0 },
            violation,
            location,
        }
    }
}

/// Tracks what the robot holds and the state of the world it has touched.
#[derive(Debug, Default)]
pub struct PlanValidator {
    holding: Option<String>,
    entity_state: HashMap<String, EntityState>,
    container_contents: HashMap<String, BTreeSet<String>>,
    location: Option<String>,
}

fn id(raw: &str) -> String {
    raw.trim().to_lowercase()
}

impl PlanValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the world from initial predicates, in order.
    pub fn with_initial_state<S: AsRef<str>>(initial: &[S]) -> Self {
        let mut validator = Self::new();
        for raw in initial {
            let Ok(pred) = Predicate::find(raw.as_ref()) else {
                debug!(predicate = raw.as_ref(), "skipping unparseable initial predicate");
                continue;
            };
            match (pred.name.as_str(), pred.arg(0), pred.arg(1)) {
                ("closed", Some(x), _) => validator.set_state(x, EntityState::Closed),
                ("opened", Some(x), _) => validator.set_state(x, EntityState::Opened),
                ("switchedon", Some(x), _) => validator.set_state(x, EntityState::On),
                ("switchedoff", Some(x), _) => validator.set_state(x, EntityState::Off),
                ("inside", Some(x), Some(y)) => {
                    validator.container_contents.entry(id(y)).or_default().insert(id(x));
                }
                _ => {}
            }
        }
        validator
    }

    fn set_state(&mut self, entity: &str, state: EntityState) {
        self.entity_state.insert(id(entity), state);
    }

    fn is_closed(&self, entity: &str) -> bool {
        self.entity_state.get(entity) == Some(&EntityState::Closed)
    }

    fn closed_container_of(&self, object: &str) -> Option<&str> {
        self.container_contents
            .iter()
            .find(|(container, contents)| contents.contains(object) && self.is_closed(container))
            .map(|(container, _)| container.as_str())
    }

    pub fn entity_state(&self, entity: &str) -> Option<EntityState> {
        self.entity_state.get(&id(entity)).copied()
    }

    pub fn holding(&self) -> Option<&str> {
        self.holding.as_deref()
    }

    /// Applies one action. Unknown actions leave the state untouched.
    pub fn step(&mut self, action: &Predicate) -> Result<(), ViolationKind> {
        match action.name.as_str() {
            "pick_up" => {
                if let Some(held) = &self.holding {
                    return Err(ViolationKind::AlreadyHolding { held: held.clone() });
                }
                let Some(object) = action.arg(0).map(id) else {
                    return Ok(());
                };
                if let Some(container) = self.closed_container_of(&object) {
                    return Err(ViolationKind::ObjectInClosedContainer {
                        object,
                        container: container.to_string(),
                    });
                }
                self.holding = Some(object);
            }
            "place" | "drop" => {
                let Some(held) = self.holding.as_deref() else {
                    return Err(ViolationKind::NotHolding);
                };
                // An unnamed object never matches what is held.
                let named = action.arg(0).map(id).unwrap_or_default();
                if named != held {
                    return Err(ViolationKind::HoldingDifferentObject {
                        held: held.to_string(),
                        named,
                    });
                }
                if let Some(container) = action.arg(1).map(id) {
                    if self.is_closed(&container) {
                        return Err(ViolationKind::ContainerClosed { container });
                    }
                }
                self.holding = None;
            }
            "open" | "close" | "switch_on" | "switch_off" => {
                let Some(entity) = action.arg(0) else {
                    return Ok(());
                };
                let state = match action.name.as_str() {
                    "open" => EntityState::Opened,
                    "close" => EntityState::Closed,
                    "switch_on" => EntityState::On,
                    _ => EntityState::Off,
                };
                self.set_state(entity, state);
            }
            "move_to" | "navigate" => {
                if let Some(target) = action.arg(0) {
                    self.location = Some(id(target));
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Runs the whole sequence, stopping at the first violation.
    pub fn validate<S: AsRef<str>>(mut self, actions: &[S]) -> ValidationResult {
        for (step, raw) in actions.iter().enumerate() {
            let raw = raw.as_ref();
            let Ok(action) = Predicate::find(raw) else {
                debug!(step, action = raw, "ignoring unparseable action");
                continue;
            };
            if let Err(kind) = self.step(&action) {
                warn!(step, action = raw, hint = %kind.hint(), "plan rejected");
                let violation = Violation {
                    step,
                    action: raw.to_string(),
                    kind,
                };
                return ValidationResult::from_outcome(Some(violation), self.location);
            }
        }
        ValidationResult::from_outcome(None, self.location)
    }
}

/// Validates an action sequence seeded with optional initial predicates.
pub fn validate_actions<A: AsRef<str>, P: AsRef<str>>(
    actions: &[A],
    initial: &[P],
) -> ValidationResult {
    PlanValidator::with_initial_state(initial).validate(actions)
}

pub fn logical_score<A: AsRef<str>, P: AsRef<str>>(actions: &[A], initial: &[P]) -> f64 {
    validate_actions(actions, initial).score
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: [&str; 0] = [];

    #[test]
    fn pick_and_place_round_trip_is_valid() {
        let plan = ["move_to(table1)", "pick_up(box)", "move_to(shelf)", "place(box)"];
        let result = validate_actions(&plan, &NONE);
        assert!(result.valid);
        assert_eq!(result.score, 1.0);
        assert_eq!(result.location.as_deref(), Some("shelf"));
    }

    #[test]
    fn double_pick_up_is_rejected() {
        let result = validate_actions(&["pick_up(box1)", "pick_up(box2)"], &NONE);
        assert!(!result.valid);
        assert_eq!(result.score, 0.0);
        let violation = result.violation.unwrap();
        assert_eq!(violation.step, 1);
        assert_eq!(
            violation.kind,
            ViolationKind::AlreadyHolding { held: "box1".into() }
        );
    }

    #[test]
    fn place_without_holding_is_rejected() {
        let result = validate_actions(&["place(box)"], &NONE);
        assert!(!result.valid);
        assert_eq!(result.violation.unwrap().kind, ViolationKind::NotHolding);
    }

    #[test]
    fn placing_a_different_object_is_rejected() {
        let result = validate_actions(&["pick_up(cup)", "drop(plate)"], &NONE);
        assert!(matches!(
            result.violation.unwrap().kind,
            ViolationKind::HoldingDifferentObject { .. }
        ));
    }

    #[test]
    fn closed_container_blocks_pick_up_until_opened() {
        let initial = ["closed(fridge)", "inside(milk, fridge)"];
        let blocked = validate_actions(&["pick_up(milk)"], &initial);
        assert!(!blocked.valid);
        assert_eq!(
            blocked.violation.unwrap().kind,
            ViolationKind::ObjectInClosedContainer {
                object: "milk".into(),
                container: "fridge".into()
            }
        );

        let opened = validate_actions(&["open(fridge)", "pick_up(milk)"], &initial);
        assert!(opened.valid);
    }

    #[test]
    fn placing_into_closed_container_is_rejected() {
        let plan = ["pick_up(apple)", "close(Fridge)", "place(apple, fridge)"];
        let result = validate_actions(&plan, &NONE);
        assert_eq!(
            result.violation.unwrap().kind,
            ViolationKind::ContainerClosed { container: "fridge".into() }
        );
    }

    #[test]
    fn empty_plan_is_vacuously_valid() {
        let result = validate_actions(&NONE, &NONE);
        assert!(result.valid);
        assert_eq!(result.score, 1.0);
        assert_eq!(logical_score(&NONE, &NONE), 1.0);
        assert_eq!(logical_score(&["place(box)"], &NONE), 0.0);
    }

    #[test]
    fn unknown_and_unparseable_actions_are_ignored() {
        let plan = ["wave(hand)", "go somewhere nice", "PICK_UP(Box)", "place(box)"];
        assert!(validate_actions(&plan, &NONE).valid);
    }

    #[test]
    fn pick_up_without_object_still_requires_empty_hands() {
        let result = validate_actions(&["pick_up(a)", "pick_up()"], &NONE);
        assert_eq!(
            result.violation.unwrap().kind,
            ViolationKind::AlreadyHolding { held: "a".into() }
        );

        assert!(validate_actions(&["pick_up()", "pick_up(a)"], &NONE).valid);
    }

    #[test]
    fn placing_an_unnamed_object_is_rejected() {
        let result = validate_actions(&["pick_up(a)", "place()"], &NONE);
        assert_eq!(
            result.violation.unwrap().kind,
            ViolationKind::HoldingDifferentObject {
                held: "a".into(),
                named: String::new()
            }
        );

        let result = validate_actions(&["pick_up(a)", "drop(, shelf)"], &NONE);
        assert!(!result.valid);
    }

    #[test]
    fn numbered_and_tagged_actions_are_checked() {
        let result = validate_actions(&["1. pick_up(box1)", "2. pick_up(box2)"], &NONE);
        let violation = result.violation.unwrap();
        assert_eq!(violation.step, 1);
        assert_eq!(violation.action, "2. pick_up(box2)");

        let result = validate_actions(&["robot1: place(box)"], &NONE);
        assert_eq!(result.violation.unwrap().kind, ViolationKind::NotHolding);

        let plan = ["1. move_to(table)", "robot1: pick_up(box)", "- place(box)"];
        let result = validate_actions(&plan, &NONE);
        assert!(result.valid);
        assert_eq!(result.location.as_deref(), Some("table"));
    }

    #[test]
    fn later_initial_predicates_override_earlier_ones() {
        let initial = ["closed(fridge)", "opened(fridge)", "inside(milk, fridge)"];
        let validator = PlanValidator::with_initial_state(&initial);
        assert_eq!(validator.entity_state("fridge"), Some(EntityState::Opened));
        assert!(validator.validate(&["pick_up(milk)"]).valid);

        let reclosed = ["opened(fridge)", "closed(fridge)", "inside(milk, fridge)"];
        assert!(!validate_actions(&["pick_up(milk)"], &reclosed).valid);
    }

    #[test]
    fn switched_on_seed_is_recorded() {
        let validator = PlanValidator::with_initial_state(&["switchedon(Stove)", "noise((("]);
        assert_eq!(validator.entity_state("stove"), Some(EntityState::On));
        assert_eq!(validator.entity_state("noise"), None);
    }

    #[test]
    fn navigate_updates_location() {
        let plan = ["move_to(hall)", "navigate(Kitchen)", "wave(hand)"];
        let result = validate_actions(&plan, &NONE);
        assert!(result.valid);
        assert_eq!(result.location.as_deref(), Some("kitchen"));
    }

    #[test]
    fn drop_into_open_container_is_valid() {
        let initial = ["closed(bin)"];
        let plan = ["pick_up(can)", "open(bin)", "drop(can, bin)", "pick_up(cup)"];
        let result = validate_actions(&plan, &initial);
        assert!(result.valid);
        assert_eq!(result.score, 1.0);

        let blocked = validate_actions(&["pick_up(can)", "drop(can, bin)"], &initial);
        assert_eq!(
            blocked.violation.unwrap().kind,
            ViolationKind::ContainerClosed { container: "bin".into() }
        );
    }

    #[test]
    fn switch_actions_update_entity_state() {
        let mut validator = PlanValidator::with_initial_state(&["switchedoff(lamp)"]);
        assert_eq!(validator.entity_state("lamp"), Some(EntityState::Off));
        validator.step(&Predicate::parse("switch_on(lamp)").unwrap()).unwrap();
        assert_eq!(validator.entity_state("LAMP"), Some(EntityState::On));
        assert_eq!(validator.entity_state("oven"), None);
        assert_eq!(validator.holding(), None);
    }
}
