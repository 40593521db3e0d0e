use crate::schema::{PlanModifier, PlanModifierRequest, PlanModifierResponse};
use crate::types::Dynamic;

/// A plan modifier that uses the current state value when the planned value is unknown
///
/// Server-assigned identifiers keep their value across updates instead of
/// showing as "known after apply" on every plan.
pub struct UseStateForUnknown;

impl UseStateForUnknown {
    pub fn create() -> Box<dyn PlanModifier> {
        Box::new(Self)
    }
}

impl PlanModifier for UseStateForUnknown {
    fn description(&self) -> String {
        "once set, the value of this attribute in state will not change".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let plan_value = match (&request.plan_value, &request.state_value) {
            (Dynamic::Unknown, Dynamic::Null) => request.plan_value,
            (Dynamic::Unknown, _) => request.state_value,
            _ => request.plan_value,
        };

        PlanModifierResponse {
            plan_value,
            requires_replace: false,
            diagnostics: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttributePath;

    fn request(state: Dynamic, plan: Dynamic) -> PlanModifierRequest {
        PlanModifierRequest {
            config_value: Dynamic::Null,
            state_value: state,
            plan_value: plan,
            path: AttributePath::new("id"),
        }
    }

    #[test]
    fn use_state_for_unknown_preserves_state_when_unknown() {
        let response =
            UseStateForUnknown.modify(request(Dynamic::String("42".to_string()), Dynamic::Unknown));

        assert_eq!(response.plan_value, Dynamic::String("42".to_string()));
        assert!(!response.requires_replace);
    }

    #[test]
    fn use_state_for_unknown_uses_plan_when_known() {
        let response = UseStateForUnknown.modify(request(
            Dynamic::String("42".to_string()),
            Dynamic::String("43".to_string()),
        ));

        assert_eq!(response.plan_value, Dynamic::String("43".to_string()));
    }

    #[test]
    fn use_state_for_unknown_stays_unknown_without_state() {
        let response = UseStateForUnknown.modify(request(Dynamic::Null, Dynamic::Unknown));

        assert!(response.plan_value.is_unknown());
    }
}
