//! Default value providers for attributes
//!
//! Defaults are evaluated during planning when an attribute is null in the
//! configuration. An attribute with a default is also computed, so the
//! planned value is always known.

use crate::schema::{Default, DefaultRequest, DefaultResponse};
use crate::types::Dynamic;

/// StaticDefault provides a static default value
pub struct StaticDefault {
    value: Dynamic,
}

impl StaticDefault {
    pub fn create(value: Dynamic) -> Box<dyn Default> {
        Box::new(Self { value })
    }

    pub fn string(value: &str) -> Box<dyn Default> {
        Self::create(Dynamic::String(value.to_string()))
    }

    pub fn bool(value: bool) -> Box<dyn Default> {
        Self::create(Dynamic::Bool(value))
    }

    /// Empty list default, for collections the remote API omits when empty
    pub fn empty_list() -> Box<dyn Default> {
        Self::create(Dynamic::List(vec![]))
    }
}

impl Default for StaticDefault {
    fn description(&self) -> String {
        format!("static default value: {:?}", self.value)
    }

    fn default_value(&self, _request: DefaultRequest) -> DefaultResponse {
        DefaultResponse {
            value: self.value.clone(),
        }
    }
}
