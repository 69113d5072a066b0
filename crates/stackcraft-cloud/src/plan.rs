//! Plans computed from a saved stack state and a fresh run

use crate::resource::ResourceRef;
use crate::state::StackState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Represents a planned action for a resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Type of action to perform
    pub action_type: ActionType,

    /// Resource URN
    pub urn: String,

    /// Provider type token
    pub type_token: String,

    /// Logical resource name
    pub name: String,
}

impl Action {
    fn new(action_type: ActionType, urn: &str, type_token: &str, name: &str) -> Self {
        Self {
            action_type,
            urn: urn.to_string(),
            type_token: type_token.to_string(),
            name: name.to_string(),
        }
    }
}

/// Type of action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create a new resource
    Create,
    /// Update an existing resource
    Update,
    /// Delete a resource
    Delete,
    /// No changes needed
    NoOp,
}

impl ActionType {
    pub fn symbol(&self) -> &'static str {
        match self {
            ActionType::Create => "+",
            ActionType::Update => "~",
            ActionType::Delete => "-",
            ActionType::NoOp => " ",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

/// Plan containing all actions to be applied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Actions in registration order, deletions last
    pub actions: Vec<Action>,

    /// Whether the plan has any changes
    pub has_changes: bool,
}

impl Plan {
    pub fn new(actions: Vec<Action>) -> Self {
        let has_changes = actions.iter().any(|a| a.action_type != ActionType::NoOp);
        Self {
            actions,
            has_changes,
        }
    }

    /// Diff the resources of a fresh run against the previously saved state
    pub fn between(previous: &StackState, current: &[ResourceRef]) -> Self {
        let mut actions = Vec::with_capacity(current.len());
        let mut seen = BTreeSet::new();

        for resource in current {
            seen.insert(resource.urn.as_str());
            let action_type = match previous.resources.get(&resource.urn) {
                None => ActionType::Create,
                Some(saved) if saved.args != resource.args => ActionType::Update,
                Some(_) => ActionType::NoOp,
            };
            actions.push(Action::new(
                action_type,
                &resource.urn,
                &resource.type_token,
                &resource.name,
            ));
        }

        // Reverse registration order so dependents go first
        for (urn, saved) in previous.ordered().into_iter().rev() {
            if !seen.contains(urn.as_str()) {
                actions.push(Action::new(
                    ActionType::Delete,
                    urn,
                    &saved.type_token,
                    &saved.name,
                ));
            }
        }

        Self::new(actions)
    }

    /// Plan that deletes everything in `previous`
    pub fn destroy(previous: &StackState) -> Self {
        Self::between(previous, &[])
    }

    /// Get actions by type
    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    /// Summary of the plan
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.actions_by_type(ActionType::Create).len(),
            update: self.actions_by_type(ActionType::Update).len(),
            delete: self.actions_by_type(ActionType::Delete).len(),
            no_change: self.actions_by_type(ActionType::NoOp).len(),
        }
    }
}

/// Summary of planned actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub no_change: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to delete, {} unchanged",
            self.create, self.update, self.delete, self.no_change
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputMap;
    use crate::resource::ResourceOptions;
    use serde_json::{Value, json};

    fn resource(name: &str, args: Value) -> ResourceRef {
        ResourceRef {
            urn: format!("urn:stackcraft:dev::p::t:r::{}", name),
            id: name.to_string(),
            type_token: "t:r".to_string(),
            name: name.to_string(),
            args,
            outputs: Value::Null,
            options: ResourceOptions::new(),
        }
    }

    fn saved(resources: &[ResourceRef]) -> StackState {
        let mut state = StackState::new();
        state.record_run(resources, OutputMap::new());
        state
    }

    #[test]
    fn test_first_run_creates_everything() {
        let current = vec![resource("zone", json!({})), resource("dns-record-0", json!({}))];
        let plan = Plan::between(&StackState::new(), &current);

        assert!(plan.has_changes);
        assert_eq!(plan.summary().create, 2);
    }

    #[test]
    fn test_unchanged_rerun_is_noop() {
        let current = vec![resource("zone", json!({ "name": "example.com" }))];
        let plan = Plan::between(&saved(&current), &current);

        assert!(!plan.has_changes);
        assert_eq!(plan.summary().to_string(), "0 to create, 0 to update, 0 to delete, 1 unchanged");
    }

    #[test]
    fn test_changed_args_and_removed_record() {
        let before = vec![
            resource("zone", json!({ "paused": false })),
            resource("dns-record-0", json!({})),
            resource("dns-record-1", json!({})),
        ];
        let after = vec![
            resource("zone", json!({ "paused": true })),
            resource("dns-record-0", json!({})),
        ];
        let plan = Plan::between(&saved(&before), &after);

        assert_eq!(
            plan.summary(),
            PlanSummary {
                create: 0,
                update: 1,
                delete: 1,
                no_change: 1
            }
        );
        assert_eq!(plan.actions_by_type(ActionType::Delete)[0].name, "dns-record-1");
    }

    #[test]
    fn test_destroy_reverses_order() {
        let before = vec![resource("zone", json!({})), resource("dns-record-0", json!({}))];
        let plan = Plan::destroy(&saved(&before));

        let names: Vec<_> = plan.actions.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["dns-record-0", "zone"]);
    }
}
