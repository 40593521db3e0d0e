//! Schema types and builders for tfplug
//!
//! This module provides the schema system for defining provider, resource and
//! data source schemas, and applies the schema to configuration: required
//! checks, attribute validators, defaults and plan modifiers.

use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use std::collections::HashMap;

/// AttributeType defines the type system for Terraform attributes
/// This must match Terraform's type system exactly
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number, // Always f64
    Bool,
    List(Box<AttributeType>),               // Ordered, allows duplicates
    Set(Box<AttributeType>),                // Unordered, no duplicates
    Map(Box<AttributeType>),                // String keys only
    Object(HashMap<String, AttributeType>), // Fixed structure
}

impl AttributeType {
    pub fn list_of(element: AttributeType) -> Self {
        AttributeType::List(Box::new(element))
    }

    pub fn object<'a>(fields: impl IntoIterator<Item = (&'a str, AttributeType)>) -> Self {
        AttributeType::Object(
            fields
                .into_iter()
                .map(|(name, ty)| (name.to_string(), ty))
                .collect(),
        )
    }
}

/// Schema is returned by providers/resources/data sources
/// Version is used for state migration
#[derive(Debug)]
pub struct Schema {
    pub version: i64, // Increment when schema changes require migration
    pub block: Block, // Root block containing all attributes
}

/// Block represents a configuration block
#[derive(Debug)]
pub struct Block {
    pub attributes: Vec<Attribute>,
    pub description: String,
    pub deprecated: bool,
}

/// Attribute represents a single configuration attribute
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    pub validators: Vec<Box<dyn Validator>>,
    pub plan_modifiers: Vec<Box<dyn PlanModifier>>,
    pub default: Option<Box<dyn Default>>,
    pub deprecated: bool,
    /// Element attributes of a list of objects, see [`AttributeBuilder::list_nested`]
    pub nested: Vec<Attribute>,
}

// Manual Debug implementation since validators/modifiers don't implement Debug
impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field(
                "validators",
                &format!("{} validators", self.validators.len()),
            )
            .field(
                "plan_modifiers",
                &format!("{} plan modifiers", self.plan_modifiers.len()),
            )
            .field("default", &self.default.is_some())
            .field("nested", &self.nested)
            .finish()
    }
}

/// Validator performs validation on attribute values during planning
/// Implement this for custom validation logic
pub trait Validator: Send + Sync {
    /// Human-readable description
    fn description(&self) -> String;
    /// Perform validation. Only called for known, non-null values.
    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse;
}

/// Request for validators
pub struct ValidatorRequest {
    pub value: Dynamic,
    pub path: AttributePath,
}

/// Response from validators
pub struct ValidatorResponse {
    pub diagnostics: Vec<Diagnostic>,
}

/// PlanModifier modifies planned values during planning
/// Common uses: RequiresReplace, UseStateForUnknown
pub trait PlanModifier: Send + Sync {
    /// Human-readable description
    fn description(&self) -> String;
    /// Modify the planned value
    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse;
}

/// Request for plan modifiers
pub struct PlanModifierRequest {
    pub config_value: Dynamic,
    pub state_value: Dynamic,
    pub plan_value: Dynamic,
    pub path: AttributePath,
}

/// Response from plan modifiers
pub struct PlanModifierResponse {
    pub plan_value: Dynamic,
    pub requires_replace: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Default provides default values for optional attributes
/// Called when attribute is not set in configuration
pub trait Default: Send + Sync {
    /// Human-readable description
    fn description(&self) -> String;
    /// Provide default value
    fn default_value(&self, request: DefaultRequest) -> DefaultResponse;
}

/// Request for default values
pub struct DefaultRequest {
    pub path: AttributePath,
}

/// Response with default value
pub struct DefaultResponse {
    pub value: Dynamic,
}

/// Result of planning a change against a schema
pub struct PlannedChange {
    pub planned_state: DynamicValue,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.block.attributes.iter().find(|attr| attr.name == name)
    }

    /// Checks required attributes, rejects values for computed-only
    /// attributes and runs each attribute's validators.
    pub fn validate_config(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        let mut diagnostics = vec![];

        for attr in &self.block.attributes {
            let path = AttributePath::new(&attr.name);
            let value = config.get(&path).cloned().unwrap_or(Dynamic::Null);
            validate_attribute(attr, &value, path, &mut diagnostics);
        }

        diagnostics
    }

    /// Fills null attributes that declare a default
    pub fn apply_defaults(&self, config: &mut DynamicValue) -> crate::Result<()> {
        for attr in &self.block.attributes {
            let Some(default) = &attr.default else {
                continue;
            };
            let path = AttributePath::new(&attr.name);
            let is_null = config.get(&path).map_or(true, Dynamic::is_null);
            if is_null {
                let response = default.default_value(DefaultRequest { path: path.clone() });
                config.set_value(&path, response.value)?;
            }
        }
        Ok(())
    }

    /// Plans the new state from configuration: defaults are applied, computed
    /// attributes left unset become unknown and plan modifiers run last.
    pub fn plan_change(&self, config: &DynamicValue, prior_state: &DynamicValue) -> PlannedChange {
        let mut planned = config.clone();
        let mut diagnostics = vec![];
        let mut requires_replace = vec![];

        if let Err(e) = self.apply_defaults(&mut planned) {
            diagnostics.push(Diagnostic::error("Failed to apply defaults", e.to_string()));
        }

        for attr in &self.block.attributes {
            let path = AttributePath::new(&attr.name);
            let mut plan_value = planned.get(&path).cloned().unwrap_or(Dynamic::Null);
            if attr.computed && plan_value.is_null() {
                plan_value = Dynamic::Unknown;
            }

            // Creates have no prior state to compare against.
            if !prior_state.is_null() {
                for modifier in &attr.plan_modifiers {
                    let response = modifier.modify(PlanModifierRequest {
                        config_value: config.get(&path).cloned().unwrap_or(Dynamic::Null),
                        state_value: prior_state.get(&path).cloned().unwrap_or(Dynamic::Null),
                        plan_value,
                        path: path.clone(),
                    });
                    plan_value = response.plan_value;
                    diagnostics.extend(response.diagnostics);
                    if response.requires_replace {
                        requires_replace.push(path.clone());
                    }
                }
            }

            if !attr.nested.is_empty() {
                let prior = prior_state.get(&path).unwrap_or(&Dynamic::Null);
                plan_value = plan_nested(&attr.nested, plan_value, prior, &path);
            }

            if let Err(e) = planned.set_value(&path, plan_value) {
                diagnostics.push(
                    Diagnostic::error("Failed to plan attribute", e.to_string())
                        .with_attribute(path),
                );
            }
        }

        PlannedChange {
            planned_state: planned,
            requires_replace,
            diagnostics,
        }
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: &Dynamic,
    path: AttributePath,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if value.is_null() {
        if attr.required {
            diagnostics.push(
                Diagnostic::error(
                    "Missing required argument",
                    format!(
                        "The argument \"{}\" is required, but no definition was found.",
                        attr.name
                    ),
                )
                .with_attribute(path),
            );
        }
        return;
    }

    if attr.computed && !attr.optional && !attr.required {
        diagnostics.push(
            Diagnostic::error(
                "Invalid Configuration for Read-Only Attribute",
                format!(
                    "Cannot set value for attribute \"{}\": it is computed by the provider.",
                    attr.name
                ),
            )
            .with_attribute(path),
        );
        return;
    }

    if value.is_unknown() {
        return;
    }

    for validator in &attr.validators {
        let response = validator.validate(ValidatorRequest {
            value: value.clone(),
            path: path.clone(),
        });
        diagnostics.extend(response.diagnostics);
    }

    let Some(elements) = value.as_list() else {
        return;
    };
    if attr.nested.is_empty() {
        return;
    }
    for (index, element) in elements.iter().enumerate() {
        let Dynamic::Map(fields) = element else {
            continue;
        };
        for field in &attr.nested {
            let field_value = fields.get(&field.name).unwrap_or(&Dynamic::Null);
            let field_path = path.clone().index(index as i64).attribute(&field.name);
            validate_attribute(field, field_value, field_path, diagnostics);
        }
    }
}

/// Plans each element of a list of objects against the element at the same
/// index in the prior state. Computed fields left unset keep their prior
/// value when the element's configured fields are unchanged and become
/// unknown otherwise.
fn plan_nested(
    nested: &[Attribute],
    planned: Dynamic,
    prior: &Dynamic,
    path: &AttributePath,
) -> Dynamic {
    let Dynamic::List(elements) = planned else {
        return planned;
    };
    let prior_elements = prior.as_list().unwrap_or_default();

    Dynamic::List(
        elements
            .into_iter()
            .enumerate()
            .map(|(index, element)| {
                let prior_element = prior_elements.get(index).unwrap_or(&Dynamic::Null);
                plan_element(nested, element, prior_element, &path.clone().index(index as i64))
            })
            .collect(),
    )
}

fn plan_element(
    nested: &[Attribute],
    element: Dynamic,
    prior: &Dynamic,
    path: &AttributePath,
) -> Dynamic {
    let Dynamic::Map(mut fields) = element else {
        return element;
    };
    let empty = HashMap::new();
    let prior_fields = match prior {
        Dynamic::Map(prior_fields) => prior_fields,
        _ => &empty,
    };

    for attr in nested {
        let Some(default) = &attr.default else {
            continue;
        };
        if fields.get(&attr.name).map_or(true, Dynamic::is_null) {
            let response = default.default_value(DefaultRequest {
                path: path.clone().attribute(&attr.name),
            });
            fields.insert(attr.name.clone(), response.value);
        }
    }

    let unchanged = matches!(prior, Dynamic::Map(_)) && matches_prior(nested, &fields, prior_fields);

    for attr in nested {
        let value = fields.remove(&attr.name).unwrap_or(Dynamic::Null);
        let prior_value = prior_fields.get(&attr.name).unwrap_or(&Dynamic::Null);
        let value = if attr.computed && value.is_null() {
            if unchanged {
                prior_value.clone()
            } else {
                Dynamic::Unknown
            }
        } else if !attr.nested.is_empty() {
            plan_nested(&attr.nested, value, prior_value, &path.clone().attribute(&attr.name))
        } else {
            value
        };
        fields.insert(attr.name.clone(), value);
    }

    Dynamic::Map(fields)
}

/// Whether configured fields equal the prior ones. Unset computed fields
/// match anything.
fn matches_prior(
    nested: &[Attribute],
    fields: &HashMap<String, Dynamic>,
    prior: &HashMap<String, Dynamic>,
) -> bool {
    nested.iter().all(|attr| {
        let value = fields.get(&attr.name).unwrap_or(&Dynamic::Null);
        let prior_value = prior.get(&attr.name).unwrap_or(&Dynamic::Null);
        if attr.computed && value.is_null() {
            return true;
        }
        match (value, prior_value) {
            (Dynamic::List(elements), Dynamic::List(prior_elements)) if !attr.nested.is_empty() => {
                elements.len() == prior_elements.len()
                    && elements.iter().zip(prior_elements).all(|pair| match pair {
                        (Dynamic::Map(element), Dynamic::Map(prior_element)) => {
                            matches_prior(&attr.nested, element, prior_element)
                        }
                        (element, prior_element) => element == prior_element,
                    })
            }
            _ => value == prior_value,
        }
    })
}

/// AttributeBuilder provides fluent API for building attributes
/// ALWAYS use this instead of constructing Attribute directly
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    /// Create a new attribute builder
    pub fn new(name: &str, type_: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type: type_,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                validators: Vec::new(),
                plan_modifiers: Vec::new(),
                default: None,
                deprecated: false,
                nested: Vec::new(),
            },
        }
    }

    /// A list of objects whose fields are described by `attributes`. Each
    /// field keeps its own required, computed and validator settings.
    pub fn list_nested(name: &str, attributes: Vec<Attribute>) -> Self {
        let element = AttributeType::object(
            attributes
                .iter()
                .map(|attr| (attr.name.as_str(), attr.r#type.clone())),
        );
        let mut builder = Self::new(name, AttributeType::list_of(element));
        builder.attribute.nested = attributes;
        builder
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    /// Mark as sensitive (hidden)
    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.attribute.deprecated = true;
        self
    }

    pub fn validator(mut self, validator: Box<dyn Validator>) -> Self {
        self.attribute.validators.push(validator);
        self
    }

    pub fn plan_modifier(mut self, modifier: Box<dyn PlanModifier>) -> Self {
        self.attribute.plan_modifiers.push(modifier);
        self
    }

    /// Set default, which also marks the attribute computed
    pub fn default(mut self, default: Box<dyn Default>) -> Self {
        self.attribute.default = Some(default);
        self.attribute.computed = true;
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// SchemaBuilder provides fluent API for building schemas
/// ALWAYS use this for consistency
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            schema: Schema {
                version: 0,
                block: Block {
                    attributes: Vec::new(),
                    description: String::new(),
                    deprecated: false,
                },
            },
        }
    }

    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.schema.block.attributes.push(attr);
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.schema.block.description = desc.to_string();
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.schema.block.deprecated = true;
        self
    }

    pub fn build(self) -> Schema {
        self.schema
    }
}

impl std::default::Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::StaticDefault;
    use crate::plan_modifier::UseStateForUnknown;
    use crate::validator::StringOneOfValidator;

    fn department_like_schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("enabled", AttributeType::String)
                    .optional()
                    .validator(StringOneOfValidator::create(&["Enabled", "Disabled"]))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("directory_user", AttributeType::Bool)
                    .optional()
                    .default(StaticDefault::bool(false))
                    .build(),
            )
            .build()
    }

    fn config(pairs: &[(&str, Dynamic)]) -> DynamicValue {
        DynamicValue::new(Dynamic::Map(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        ))
    }

    #[test]
    fn attribute_builder_creates_required_string() {
        let attr = AttributeBuilder::new("name", AttributeType::String)
            .description("The name of the resource")
            .required()
            .build();

        assert_eq!(attr.name, "name");
        assert!(matches!(attr.r#type, AttributeType::String));
        assert!(attr.required);
        assert!(!attr.optional);
        assert_eq!(attr.description, "The name of the resource");
    }

    #[test]
    fn nested_attribute_type() {
        let object_type = AttributeType::object([
            ("id", AttributeType::Number),
            ("name", AttributeType::String),
        ]);

        let attr = AttributeBuilder::new("site", AttributeType::list_of(object_type))
            .optional()
            .build();

        let AttributeType::List(element) = &attr.r#type else {
            panic!("Expected List type");
        };
        let AttributeType::Object(fields) = element.as_ref() else {
            panic!("Expected Object element");
        };
        assert_eq!(fields.len(), 2);
        assert!(matches!(fields.get("name"), Some(AttributeType::String)));
    }

    #[test]
    fn validate_config_reports_missing_required() {
        let schema = department_like_schema();
        let diags = schema.validate_config(&config(&[("name", Dynamic::Null)]));

        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].summary, "Missing required argument");
        assert_eq!(diags[0].attribute, Some(AttributePath::new("name")));
    }

    #[test]
    fn validate_config_runs_validators_on_known_values() {
        let schema = department_like_schema();

        let diags = schema.validate_config(&config(&[
            ("name", Dynamic::String("Engineering".into())),
            ("enabled", Dynamic::String("Maybe".into())),
        ]));
        assert_eq!(diags.len(), 1);

        let diags = schema.validate_config(&config(&[
            ("name", Dynamic::String("Engineering".into())),
            ("enabled", Dynamic::Unknown),
        ]));
        assert!(diags.is_empty());
    }

    #[test]
    fn validate_config_rejects_computed_only_values() {
        let schema = department_like_schema();
        let diags = schema.validate_config(&config(&[
            ("id", Dynamic::String("1".into())),
            ("name", Dynamic::String("Engineering".into())),
        ]));

        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].attribute, Some(AttributePath::new("id")));
    }

    #[test]
    fn plan_change_marks_computed_unknown_on_create() {
        let schema = department_like_schema();
        let planned = schema.plan_change(
            &config(&[("name", Dynamic::String("Engineering".into()))]),
            &DynamicValue::null(),
        );

        assert!(planned.diagnostics.is_empty());
        assert_eq!(
            planned.planned_state.get(&AttributePath::new("id")),
            Some(&Dynamic::Unknown)
        );
        assert_eq!(
            planned.planned_state.get(&AttributePath::new("directory_user")),
            Some(&Dynamic::Bool(false))
        );
    }

    #[test]
    fn plan_change_keeps_known_id_on_update() {
        let schema = department_like_schema();
        let prior = config(&[
            ("id", Dynamic::String("42".into())),
            ("name", Dynamic::String("Engineering".into())),
        ]);

        let planned = schema.plan_change(
            &config(&[("name", Dynamic::String("Platform".into()))]),
            &prior,
        );

        assert_eq!(
            planned
                .planned_state
                .get_string(&AttributePath::new("id"))
                .unwrap(),
            "42"
        );
        assert!(planned.requires_replace.is_empty());
    }

    fn groups_schema() -> Schema {
        SchemaBuilder::new()
            .attribute(
                AttributeBuilder::list_nested(
                    "groups",
                    vec![
                        AttributeBuilder::new("name", AttributeType::String)
                            .required()
                            .build(),
                        AttributeBuilder::new("id", AttributeType::Number)
                            .computed()
                            .build(),
                        AttributeBuilder::new("tags", AttributeType::list_of(AttributeType::String))
                            .optional()
                            .default(StaticDefault::empty_list())
                            .build(),
                    ],
                )
                .optional()
                .build(),
            )
            .build()
    }

    fn group(fields: &[(&str, Dynamic)]) -> Dynamic {
        Dynamic::Map(
            fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    fn groups_config(groups: Vec<Dynamic>) -> DynamicValue {
        config(&[("groups", Dynamic::List(groups))])
    }

    #[test]
    fn list_nested_builds_object_element_type() {
        let schema = groups_schema();
        let attr = schema.attribute("groups").unwrap();

        let AttributeType::List(element) = &attr.r#type else {
            panic!("Expected List type");
        };
        let AttributeType::Object(fields) = element.as_ref() else {
            panic!("Expected Object element");
        };
        assert_eq!(fields.get("id"), Some(&AttributeType::Number));
        assert!(attr.nested[1].computed);
    }

    #[test]
    fn validate_config_checks_nested_fields() {
        let schema = groups_schema();
        let diags = schema.validate_config(&groups_config(vec![
            group(&[("name", Dynamic::String("Helpdesk".into()))]),
            group(&[("id", Dynamic::Number(3.0))]),
        ]));

        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].summary, "Missing required argument");
        assert_eq!(
            diags[0].attribute,
            Some(AttributePath::new("groups").index(1).attribute("name"))
        );
        assert_eq!(
            diags[1].attribute,
            Some(AttributePath::new("groups").index(1).attribute("id"))
        );

        let unknown = schema.validate_config(&groups_config(vec![Dynamic::Unknown]));
        assert!(unknown.is_empty());
    }

    #[test]
    fn plan_change_marks_nested_computed_unknown_on_create() {
        let schema = groups_schema();
        let planned = schema.plan_change(
            &groups_config(vec![group(&[("name", Dynamic::String("Helpdesk".into()))])]),
            &DynamicValue::null(),
        );

        let element = AttributePath::new("groups").index(0);
        let state = &planned.planned_state;
        assert_eq!(state.get(&element.clone().attribute("id")), Some(&Dynamic::Unknown));
        assert_eq!(
            state.get(&element.attribute("tags")),
            Some(&Dynamic::List(vec![]))
        );
    }

    #[test]
    fn plan_change_keeps_nested_computed_when_unchanged() {
        let schema = groups_schema();
        let prior = groups_config(vec![group(&[
            ("name", Dynamic::String("Helpdesk".into())),
            ("id", Dynamic::Number(3.0)),
            ("tags", Dynamic::List(vec![])),
        ])]);

        let unchanged = schema.plan_change(
            &groups_config(vec![group(&[("name", Dynamic::String("Helpdesk".into()))])]),
            &prior,
        );
        assert_eq!(unchanged.planned_state, prior);

        let renamed = schema.plan_change(
            &groups_config(vec![group(&[("name", Dynamic::String("Admins".into()))])]),
            &prior,
        );
        assert_eq!(
            renamed
                .planned_state
                .get(&AttributePath::new("groups").index(0).attribute("id")),
            Some(&Dynamic::Unknown)
        );
    }
}
