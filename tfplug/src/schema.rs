//! Schemas, builders and the hooks attached to attributes
//!
//! A [`Schema`] is both a description sent to Terraform and the thing that
//! checks a configuration: [`Schema::validate`] runs required checks,
//! validators and block cardinality, and [`Schema::requires_replace`] runs
//! plan modifiers against a prior/planned pair.

use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use std::collections::HashMap;

/// Terraform attribute types
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
    pub fn list_of_strings() -> Self {
        AttributeType::List(Box::new(AttributeType::String))
    }

    pub fn map_of_strings() -> Self {
        AttributeType::Map(Box::new(AttributeType::String))
    }
}

/// Root schema of a provider, resource or data source
#[derive(Debug, Clone)]
pub struct Schema {
    pub version: i64, // Increment when schema changes require migration
    pub block: Block, // Root block containing all attributes
}

impl Schema {
    /// Run every attribute validator and nested block cardinality check
    /// against a configuration value
    pub fn validate(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        self.block
            .validate(&config.value, &AttributePath::root(), &mut diagnostics);
        diagnostics
    }

    /// Paths of attributes and blocks whose change forces a new resource
    pub fn requires_replace(
        &self,
        prior_state: &DynamicValue,
        planned_state: &DynamicValue,
    ) -> Vec<AttributePath> {
        if prior_state.is_null() || planned_state.is_null() {
            return Vec::new();
        }

        let mut paths = Vec::new();

        for attr in &self.block.attributes {
            let path = AttributePath::new(&attr.name);
            let state_value = value_at(prior_state, &path);
            let plan_value = value_at(planned_state, &path);

            for modifier in &attr.plan_modifiers {
                let response = modifier.modify(PlanModifierRequest {
                    config_value: plan_value.clone(),
                    state_value: state_value.clone(),
                    plan_value: plan_value.clone(),
                    path: path.clone(),
                });
                if response.requires_replace {
                    paths.push(path.clone());
                    break;
                }
            }
        }

        for nested in self.block.block_types.iter().filter(|b| b.requires_replace) {
            let path = AttributePath::new(&nested.type_name);
            let before = value_at(prior_state, &path);
            let after = value_at(planned_state, &path);
            if after.value.is_known_value() && before.value != after.value {
                paths.push(path);
            }
        }

        paths
    }

    /// Fill top-level attributes that are absent or null from their defaults
    pub fn apply_defaults(&self, config: &mut DynamicValue) -> crate::Result<()> {
        for attr in &self.block.attributes {
            let Some(default) = &attr.default else {
                continue;
            };
            let path = AttributePath::new(&attr.name);
            if value_at(config, &path).value.is_null() {
                let response = default.default_value(DefaultRequest { path: path.clone() });
                if !response.value.is_null() {
                    config.set(&path, response.value.value)?;
                }
            }
        }
        Ok(())
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.block.attributes.iter().find(|a| a.name == name)
    }

    pub fn nested_block(&self, name: &str) -> Option<&NestedBlock> {
        self.block.block_types.iter().find(|b| b.type_name == name)
    }
}

fn value_at(value: &DynamicValue, path: &AttributePath) -> DynamicValue {
    value
        .get(path)
        .cloned()
        .map(DynamicValue::new)
        .unwrap_or_else(|_| DynamicValue::null())
}

/// Attributes plus nested block types at one level of the schema
#[derive(Debug, Clone)]
pub struct Block {
    pub version: i64,
    pub attributes: Vec<Attribute>,
    pub block_types: Vec<NestedBlock>,
    pub description: String,
    pub description_kind: StringKind,
    pub deprecated: bool,
}

impl Block {
    fn empty() -> Self {
        Self {
            version: 0,
            attributes: Vec::new(),
            block_types: Vec::new(),
            description: String::new(),
            description_kind: StringKind::Plain,
            deprecated: false,
        }
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        let object = match value {
            Dynamic::Map(m) => m,
            // Unknown objects are validated again once they are known
            _ => return,
        };

        for attr in &self.attributes {
            let attr_path = child_path(path, &attr.name);
            let attr_value = object.get(&attr.name).unwrap_or(&Dynamic::Null);

            if attr.required && attr_value.is_null() {
                diagnostics.push(
                    Diagnostic::error(
                        "Missing required argument",
                        format!("The argument \"{}\" is required", attr_path),
                    )
                    .with_attribute(attr_path.clone()),
                );
                continue;
            }

            if !attr_value.is_known_value() {
                continue;
            }

            for validator in &attr.validators {
                let response = validator.validate(ValidatorRequest {
                    config_value: DynamicValue::new(attr_value.clone()),
                    path: attr_path.clone(),
                });
                diagnostics.extend(response.diagnostics);
            }
        }

        for nested in &self.block_types {
            let nested_path = child_path(path, &nested.type_name);
            let items = match object.get(&nested.type_name) {
                Some(Dynamic::List(items)) => items.as_slice(),
                Some(Dynamic::Unknown) => continue,
                _ => &[],
            };

            let count = items.len() as i64;
            if count < nested.min_items || (nested.max_items > 0 && count > nested.max_items) {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid number of blocks",
                        format!(
                            "Block \"{}\" must appear between {} and {} times, got {}",
                            nested_path, nested.min_items, nested.max_items, count
                        ),
                    )
                    .with_attribute(nested_path.clone()),
                );
            }

            for (idx, item) in items.iter().enumerate() {
                nested
                    .block
                    .validate(item, &nested_path.clone().index(idx as i64), diagnostics);
            }
        }
    }
}

fn child_path(parent: &AttributePath, name: &str) -> AttributePath {
    if parent.steps.is_empty() {
        AttributePath::new(name)
    } else {
        parent.clone().attribute(name)
    }
}

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
}

// Trait objects are summarised by count
impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("description", &self.description)
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
            .field("deprecated", &self.deprecated)
            .finish()
    }
}

// Validators, modifiers and defaults are trait objects and do not survive a
// clone; schemas are rebuilt from their builders when behavior is needed.
impl Clone for Attribute {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            r#type: self.r#type.clone(),
            description: self.description.clone(),
            required: self.required,
            optional: self.optional,
            computed: self.computed,
            sensitive: self.sensitive,
            validators: vec![],
            plan_modifiers: vec![],
            default: None,
            deprecated: self.deprecated,
        }
    }
}

/// Repeated child block such as `notification { ... }`
#[derive(Debug, Clone)]
pub struct NestedBlock {
    pub type_name: String,
    pub block: Block,
    pub nesting: NestingMode,
    pub min_items: i64,
    pub max_items: i64,
    pub requires_replace: bool,
}

/// How repeated blocks are carried; both arrive as `Dynamic::List`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NestingMode {
    List,
    /// Unordered; duplicates collapse
    Set,
}

/// Format of description strings
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StringKind {
    Plain,
    Markdown,
}

/// Checks a single known attribute value
///
/// Null and unknown values never reach a validator; required-ness is checked
/// by the block itself.
pub trait Validator: Send + Sync {
    fn description(&self) -> String;
    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse;
}

pub struct ValidatorRequest {
    pub config_value: DynamicValue,
    pub path: AttributePath,
}

pub struct ValidatorResponse {
    pub diagnostics: Vec<Diagnostic>,
}

/// Adjusts one attribute's planned value and may flag replacement
pub trait PlanModifier: Send + Sync {
    fn description(&self) -> String;
    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse;
}

pub struct PlanModifierRequest {
    pub config_value: DynamicValue,
    pub state_value: DynamicValue,
    pub plan_value: DynamicValue,
    pub path: AttributePath,
}

pub struct PlanModifierResponse {
    pub plan_value: DynamicValue,
    pub requires_replace: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Value used when the configuration leaves an attribute null
pub trait Default: Send + Sync {
    fn description(&self) -> String;
    /// A null response leaves the attribute unset
    fn default_value(&self, request: DefaultRequest) -> DefaultResponse;
}

pub struct DefaultRequest {
    pub path: AttributePath,
}

pub struct DefaultResponse {
    pub value: DynamicValue,
}

/// Fluent construction of an [`Attribute`]
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
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
            },
        }
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

    /// Redacted in plan output
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

    pub fn default(mut self, default: Box<dyn Default>) -> Self {
        self.attribute.default = Some(default);
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// NestedBlockBuilder builds repeated configuration blocks such as
/// `time_period { ... }` or `notification { ... }`
pub struct NestedBlockBuilder {
    nested: NestedBlock,
}

impl NestedBlockBuilder {
    pub fn new(type_name: &str, nesting: NestingMode) -> Self {
        Self {
            nested: NestedBlock {
                type_name: type_name.to_string(),
                block: Block::empty(),
                nesting,
                min_items: 0,
                max_items: 0,
                requires_replace: false,
            },
        }
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.nested.block.description = desc.to_string();
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.nested.block.attributes.push(attr);
        self
    }

    pub fn block(mut self, block: NestedBlock) -> Self {
        self.nested.block.block_types.push(block);
        self
    }

    pub fn min_items(mut self, min: i64) -> Self {
        self.nested.min_items = min;
        self
    }

    pub fn max_items(mut self, max: i64) -> Self {
        self.nested.max_items = max;
        self
    }

    /// Any change to the block's contents forces a new resource
    pub fn requires_replace(mut self) -> Self {
        self.nested.requires_replace = true;
        self
    }

    pub fn build(self) -> NestedBlock {
        self.nested
    }
}

pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            schema: Schema {
                version: 0,
                block: Block::empty(),
            },
        }
    }

    /// Bump when stored state needs migrating
    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self.schema.block.version = version;
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.schema.block.attributes.push(attr);
        self
    }

    pub fn block(mut self, block: NestedBlock) -> Self {
        self.schema.block.block_types.push(block);
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.schema.block.description = desc.to_string();
        self
    }

    pub fn description_kind(mut self, kind: StringKind) -> Self {
        self.schema.block.description_kind = kind;
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
