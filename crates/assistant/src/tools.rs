//! Maps the synced action catalog onto callable function definitions.
//!
//! One definition per action, in catalog order, fields passed through
//! unchanged. Duplicate names and malformed parameter schemas are not
//! filtered here; the provider rejects them if it cares.

use pmrelay_core::catalog::Action;
use pmrelay_core::provider::ToolDefinition;

/// Convert one action into a function definition.
pub fn to_definition(action: &Action) -> ToolDefinition {
    ToolDefinition {
        name: action.name.clone(),
        description: action.description.clone(),
        parameters: action.parameters.clone(),
    }
}

/// Convert the whole catalog, preserving order.
pub fn tool_definitions(actions: &[Action]) -> Vec<ToolDefinition> {
    actions.iter().map(to_definition).collect()
}
