//! # JSON Schema Facade
//!
//! Normalizes a JSON Schema (Draft 2020-12) document into a tree of
//! [`JsonSchema`] nodes implementing the [`Schema`] contract.
//!
//! ## Kind Mapping
//!
//! | Document shape                                   | Kind        |
//! |--------------------------------------------------|-------------|
//! | `type: object` with `properties`                 | `Object`    |
//! | `type: array` with `prefixItems`                 | `Tuple`     |
//! | `type: array` with an object-valued `items`      | `Array`     |
//! | any other `type`                                 | `Primitive` |
//! | no `type`, boolean schema                        | `Unknown`   |
//!
//! Without a `type`, the structural keywords alone decide (`properties`
//! means object, and so on).
//!
//! ## Validation
//!
//! Each node compiles two validators. The *full* validator is the node's
//! subschema as written. The *root* validator (objects and tuples only) is
//! the same subschema with the field keywords removed (`properties`,
//! `patternProperties`, `additionalProperties`, `unevaluatedProperties`,
//! `prefixItems`, `items`, `unevaluatedItems`), so it checks whole-value
//! constraints such as `required`, `minProperties`, or `dependentRequired`
//! without descending into fields.
//!
//! An object handler reports every declared field, holding `null` where
//! nothing was assigned. Root validation of an object therefore drops the
//! `null`-valued declared fields first, so `required` and the other
//! presence keywords see those fields as missing. Refinements still receive
//! the value as given.
//!
//! ## Refinements
//!
//! JSON Schema cannot express cross-field rules ("start precedes end") or
//! rules that depend on caller context. [`JsonSchema::refine`] and
//! [`JsonSchema::refine_at`] attach such rules to a node. A node's rules run
//! in both [`Schema::validate`] and [`Schema::validate_root`]; full
//! validation also runs the rules of every descendant on the matching slice
//! of the value.
//!
//! ## `$ref` Resolution
//!
//! Local references (`#/$defs/...`, `#/definitions/...`) are resolved while
//! the tree is built. Sibling keywords of a `$ref` override the target's.
//! Remote references are rejected at load time.
//!
//! A `$ref` that re-enters a definition already being expanded (a tree node
//! whose `children` are tree nodes) is not expanded again: that position
//! becomes an `Unknown` leaf whose validator still follows the reference,
//! so the recursive subtree is validated as a whole value.

use std::fmt;
use std::path::Path;
use std::rc::Rc;

use indexmap::IndexMap;
use jsonschema::Validator;
use serde_json::{Map, Value};

use valstate_core::{FieldKey, FieldPath};

use crate::contract::{
    Schema, SchemaError, SchemaFields, SchemaKind, SchemaRef, ValidateOptions, ValidationFailure,
};
use crate::load::load_document;

/// Maximum chain of `$ref` indirections followed for one node.
const MAX_REF_DEPTH: usize = 32;

/// Keywords removed from object subschemas to form the root validator.
const OBJECT_FIELD_KEYWORDS: &[&str] = &[
    "properties",
    "patternProperties",
    "additionalProperties",
    "unevaluatedProperties",
];

/// Keywords removed from tuple subschemas to form the root validator.
const TUPLE_FIELD_KEYWORDS: &[&str] = &["prefixItems", "items", "unevaluatedItems"];

/// Keywords holding reusable definitions, copied into every compiled node
/// so that nested local `$ref`s keep resolving.
const DEFINITION_KEYWORDS: &[&str] = &["$defs", "definitions"];

/// A refinement rule: whole-value check with access to the caller context.
///
/// Return [`SchemaError::Invalid`] (see [`SchemaError::invalid`]) to report
/// validation messages. Any other error aborts validation and propagates.
pub type RefinementFn = Rc<dyn Fn(&Value, &ValidateOptions) -> Result<(), SchemaError>>;

#[derive(Clone)]
struct Refinement {
    name: String,
    check: RefinementFn,
}

enum Children {
    None,
    Object(IndexMap<String, Rc<JsonSchema>>),
    Array(Rc<JsonSchema>),
    Tuple(Vec<Rc<JsonSchema>>),
}

/// One node of a normalized JSON Schema document.
pub struct JsonSchema {
    kind: SchemaKind,
    pointer: String,
    document: Value,
    default: Option<Value>,
    children: Children,
    full: Validator,
    root: Option<Validator>,
    refinements: Vec<Refinement>,
}

impl fmt::Debug for JsonSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("JsonSchema");
        s.field("kind", &self.kind)
            .field("pointer", &self.pointer)
            .field("default", &self.default);
        match &self.children {
            Children::None => {}
            Children::Object(fields) => {
                s.field("fields", &fields.keys().collect::<Vec<_>>());
            }
            Children::Array(element) => {
                s.field("element", &element.kind);
            }
            Children::Tuple(slots) => {
                s.field("slots", &slots.len());
            }
        }
        s.field(
            "refinements",
            &self.refinements.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
        )
        .finish()
    }
}

impl JsonSchema {
    /// Normalize a parsed schema document.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Load`] for unresolvable `$ref`s and
    /// [`SchemaError::Build`] if a node's validator cannot be compiled.
    pub fn from_value(document: Value) -> Result<Self, SchemaError> {
        let definitions = collect_definitions(&document);
        let mut expanding = Vec::new();
        let schema = build_node(
            &document,
            &document,
            String::new(),
            &definitions,
            &mut expanding,
        )?;
        tracing::debug!(kind = %schema.kind, "normalized schema document");
        Ok(schema)
    }

    /// Load and normalize a schema document from a `.json`, `.yaml`, or
    /// `.yml` file.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Load`] if the file cannot be read or parsed,
    /// plus everything [`JsonSchema::from_value`] can return.
    pub fn from_file(path: &Path) -> Result<Self, SchemaError> {
        let document = load_document(path)?;
        Self::from_value(document).map_err(|e| match e {
            SchemaError::Load { source_name, reason } => SchemaError::Load {
                source_name: format!("{} ({source_name})", path.display()),
                reason,
            },
            other => other,
        })
    }

    /// Wrap this node as a shared [`SchemaRef`].
    pub fn into_ref(self) -> SchemaRef {
        Rc::new(self)
    }

    /// Attach a refinement rule to this node.
    pub fn refine<F>(mut self, name: &str, check: F) -> Self
    where
        F: Fn(&Value, &ValidateOptions) -> Result<(), SchemaError> + 'static,
    {
        self.refinements.push(Refinement {
            name: name.to_string(),
            check: Rc::new(check),
        });
        self
    }

    /// Attach a refinement rule to the descendant at `path`.
    ///
    /// Path segments name object fields or tuple slots; any segment selects
    /// the element schema of an array (`items.*` and `items.0` are
    /// equivalent).
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownPath`] if the path does not exist and
    /// [`SchemaError::Shared`] if a node on the path has already been
    /// handed out through [`Schema::fields`].
    pub fn refine_at<F>(mut self, path: &str, name: &str, check: F) -> Result<Self, SchemaError>
    where
        F: Fn(&Value, &ValidateOptions) -> Result<(), SchemaError> + 'static,
    {
        let keys = parse_refine_path(path)?;
        let node = self.node_mut(&keys, path)?;
        node.refinements.push(Refinement {
            name: name.to_string(),
            check: Rc::new(check),
        });
        Ok(self)
    }

    /// JSON pointer of this node within the original document.
    pub fn pointer(&self) -> &str {
        &self.pointer
    }

    /// The resolved subschema this node was built from.
    pub fn document(&self) -> &Value {
        &self.document
    }

    fn node_mut(&mut self, keys: &[FieldKey], path: &str) -> Result<&mut JsonSchema, SchemaError> {
        let Some((first, rest)) = keys.split_first() else {
            return Ok(self);
        };
        let unknown = || SchemaError::UnknownPath {
            path: path.to_string(),
        };
        let child = match &mut self.children {
            Children::None => None,
            Children::Object(fields) => fields.get_mut(&*first.as_name()),
            Children::Array(element) => Some(element),
            Children::Tuple(slots) => first.as_index().and_then(|i| slots.get_mut(i)),
        }
        .ok_or_else(unknown)?;
        Rc::get_mut(child)
            .ok_or_else(|| SchemaError::Shared {
                path: path.to_string(),
            })?
            .node_mut(rest, path)
    }

    /// `value` without its `null`-valued declared fields, or `None` when
    /// there is nothing to drop.
    fn present_fields(&self, value: &Value) -> Option<Value> {
        let (Children::Object(fields), Value::Object(map)) = (&self.children, value) else {
            return None;
        };
        let absent = |(name, v): &(&String, &Value)| v.is_null() && fields.contains_key(*name);
        if !map.iter().any(|entry| absent(&entry)) {
            return None;
        }
        Some(Value::Object(
            map.iter()
                .filter(|entry| !absent(entry))
                .map(|(name, v)| (name.clone(), v.clone()))
                .collect(),
        ))
    }

    /// Run the compiled validator, returning messages in evaluation order.
    fn schema_messages(validator: &Validator, value: &Value, options: &ValidateOptions) -> Vec<String> {
        let messages = validator.iter_errors(value).map(|e| {
            let path = e.instance_path.to_string();
            if path.is_empty() {
                e.to_string()
            } else {
                format!("{path}: {e}")
            }
        });
        if options.abort_early {
            messages.take(1).collect()
        } else {
            messages.collect()
        }
    }

    fn apply_refinements(
        &self,
        value: &Value,
        options: &ValidateOptions,
        messages: &mut Vec<String>,
    ) -> Result<(), SchemaError> {
        for rule in &self.refinements {
            if options.abort_early && !messages.is_empty() {
                return Ok(());
            }
            tracing::trace!(rule = %rule.name, pointer = %self.pointer, "applying refinement");
            match (rule.check)(value, options) {
                Ok(()) => {}
                Err(SchemaError::Invalid(failure)) => messages.extend(failure.errors),
                Err(other) => return Err(other),
            }
        }
        Ok(())
    }

    /// Apply this node's refinements and those of every descendant.
    fn apply_refinements_deep(
        &self,
        value: &Value,
        options: &ValidateOptions,
        messages: &mut Vec<String>,
    ) -> Result<(), SchemaError> {
        self.apply_refinements(value, options, messages)?;
        match &self.children {
            Children::None => {}
            Children::Object(fields) => {
                for (name, child) in fields {
                    let slice = value.get(name.as_str()).unwrap_or(&Value::Null);
                    child.apply_refinements_deep(slice, options, messages)?;
                }
            }
            Children::Array(element) => {
                if let Some(items) = value.as_array() {
                    for item in items {
                        element.apply_refinements_deep(item, options, messages)?;
                    }
                }
            }
            Children::Tuple(slots) => {
                for (i, slot) in slots.iter().enumerate() {
                    let slice = value.get(i).unwrap_or(&Value::Null);
                    slot.apply_refinements_deep(slice, options, messages)?;
                }
            }
        }
        Ok(())
    }
}

fn finish(messages: Vec<String>) -> Result<(), SchemaError> {
    if messages.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::Invalid(ValidationFailure::from(messages)))
    }
}

impl Schema for JsonSchema {
    fn kind(&self) -> SchemaKind {
        self.kind
    }

    fn fields(&self) -> SchemaFields {
        match &self.children {
            Children::None => SchemaFields::None,
            Children::Object(fields) => SchemaFields::Object(
                fields
                    .iter()
                    .map(|(name, child)| (name.clone(), Rc::clone(child) as SchemaRef))
                    .collect(),
            ),
            Children::Array(element) => SchemaFields::Array(Rc::clone(element) as SchemaRef),
            Children::Tuple(slots) => SchemaFields::Tuple(
                slots
                    .iter()
                    .map(|slot| Rc::clone(slot) as SchemaRef)
                    .collect(),
            ),
        }
    }

    fn default_value(&self) -> Option<Value> {
        self.default.clone()
    }

    fn validate(&self, value: &Value, options: &ValidateOptions) -> Result<(), SchemaError> {
        tracing::trace!(pointer = %self.pointer, "validating");
        let mut messages = Self::schema_messages(&self.full, value, options);
        self.apply_refinements_deep(value, options, &mut messages)?;
        finish(messages)
    }

    fn validate_root(&self, value: &Value, options: &ValidateOptions) -> Result<(), SchemaError> {
        let Some(root) = &self.root else {
            return self.validate(value, options);
        };
        tracing::trace!(pointer = %self.pointer, "validating root");
        let present = self.present_fields(value);
        let mut messages = Self::schema_messages(root, present.as_ref().unwrap_or(value), options);
        self.apply_refinements(value, options, &mut messages)?;
        finish(messages)
    }
}

// ── Tree construction ──────────────────────────────────────────────

fn collect_definitions(document: &Value) -> Map<String, Value> {
    let mut definitions = Map::new();
    if let Some(obj) = document.as_object() {
        for keyword in DEFINITION_KEYWORDS {
            if let Some(defs) = obj.get(*keyword) {
                definitions.insert((*keyword).to_string(), defs.clone());
            }
        }
    }
    definitions
}

/// A node with its `$ref` chain followed.
struct Resolved {
    node: Value,
    /// Pointers of every definition the chain passed through.
    targets: Vec<String>,
}

/// Follow local `$ref`s until a node without one is reached, layering
/// sibling keywords over the target.
fn resolve_refs(document: &Value, node: &Value, pointer: &str) -> Result<Resolved, SchemaError> {
    let mut current = node.clone();
    let mut targets = Vec::new();
    for _ in 0..MAX_REF_DEPTH {
        let Some(reference) = current.get("$ref").and_then(Value::as_str) else {
            return Ok(Resolved {
                node: current,
                targets,
            });
        };
        let Some(target_pointer) = reference.strip_prefix('#') else {
            return Err(SchemaError::Load {
                source_name: pointer.to_string(),
                reason: format!("only local $ref is supported, found '{reference}'"),
            });
        };
        let target = document
            .pointer(target_pointer)
            .ok_or_else(|| SchemaError::Load {
                source_name: pointer.to_string(),
                reason: format!("unresolvable $ref '{reference}'"),
            })?;
        targets.push(target_pointer.to_string());
        let mut merged = match target {
            Value::Object(map) => map.clone(),
            Value::Bool(true) => Map::new(),
            other => {
                return Ok(Resolved {
                    node: other.clone(),
                    targets,
                })
            }
        };
        if let Value::Object(siblings) = &current {
            for (k, v) in siblings {
                if k != "$ref" {
                    merged.insert(k.clone(), v.clone());
                }
            }
        }
        current = Value::Object(merged);
    }
    Err(SchemaError::Load {
        source_name: pointer.to_string(),
        reason: format!("$ref chain deeper than {MAX_REF_DEPTH}"),
    })
}

fn detect_kind(node: &Value) -> SchemaKind {
    let Some(obj) = node.as_object() else {
        return SchemaKind::Unknown;
    };
    let has_properties = obj.get("properties").is_some_and(Value::is_object);
    let has_prefix_items = obj.get("prefixItems").is_some_and(Value::is_array);
    let has_items = obj.get("items").is_some_and(Value::is_object);

    match obj.get("type").and_then(Value::as_str) {
        Some("object") if has_properties => SchemaKind::Object,
        Some("array") if has_prefix_items => SchemaKind::Tuple,
        Some("array") if has_items => SchemaKind::Array,
        Some(_) => SchemaKind::Primitive,
        None if obj.contains_key("type") => SchemaKind::Primitive,
        None if has_properties => SchemaKind::Object,
        None if has_prefix_items => SchemaKind::Tuple,
        None if has_items => SchemaKind::Array,
        None => SchemaKind::Unknown,
    }
}

/// Copy the document's definitions into `node` so that local `$ref`s inside
/// it resolve when it is compiled on its own.
fn with_definitions(node: &Value, definitions: &Map<String, Value>) -> Value {
    match node {
        Value::Object(map) => {
            let mut map = map.clone();
            for (k, v) in definitions {
                map.entry(k.clone()).or_insert_with(|| v.clone());
            }
            Value::Object(map)
        }
        other => other.clone(),
    }
}

fn without_keywords(node: &Value, keywords: &[&str]) -> Value {
    match node {
        Value::Object(map) => {
            let mut map = map.clone();
            for k in keywords {
                map.remove(*k);
            }
            Value::Object(map)
        }
        other => other.clone(),
    }
}

fn compile(schema: &Value, pointer: &str) -> Result<Validator, SchemaError> {
    let mut opts = jsonschema::options();
    opts.with_draft(jsonschema::Draft::Draft202012);
    opts.build(schema).map_err(|e| SchemaError::Build {
        pointer: display_pointer(pointer),
        reason: e.to_string(),
    })
}

fn display_pointer(pointer: &str) -> String {
    if pointer.is_empty() {
        "#".to_string()
    } else {
        format!("#{pointer}")
    }
}

fn escape_pointer_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

fn parse_refine_path(path: &str) -> Result<Vec<FieldKey>, SchemaError> {
    FieldPath::parse(path)
        .map(|p| p.keys().to_vec())
        .map_err(|_| SchemaError::UnknownPath {
            path: path.to_string(),
        })
}

/// Build the node at `pointer`. `expanding` holds the definitions whose
/// expansion encloses this node.
fn build_node(
    document: &Value,
    node: &Value,
    pointer: String,
    definitions: &Map<String, Value>,
    expanding: &mut Vec<String>,
) -> Result<JsonSchema, SchemaError> {
    let Resolved {
        node: resolved,
        targets,
    } = resolve_refs(document, node, &pointer)?;
    if let Some(target) = targets.iter().find(|t| expanding.contains(t)) {
        tracing::debug!(
            pointer = %display_pointer(&pointer),
            definition = %target,
            "recursive $ref kept as a leaf"
        );
        return recursive_leaf(node, resolved, pointer, definitions);
    }
    let enclosing = expanding.len();
    expanding.extend(targets);
    let built = build_expanded(document, resolved, pointer, definitions, expanding);
    expanding.truncate(enclosing);
    built
}

/// Leaf for a `$ref` back into an enclosing definition. Compiled from the
/// unexpanded node so the validator follows the reference itself.
fn recursive_leaf(
    node: &Value,
    resolved: Value,
    pointer: String,
    definitions: &Map<String, Value>,
) -> Result<JsonSchema, SchemaError> {
    let full = compile(&with_definitions(node, definitions), &pointer)?;
    Ok(JsonSchema {
        kind: SchemaKind::Unknown,
        default: resolved.get("default").cloned(),
        pointer,
        document: resolved,
        children: Children::None,
        full,
        root: None,
        refinements: Vec::new(),
    })
}

fn build_expanded(
    document: &Value,
    resolved: Value,
    pointer: String,
    definitions: &Map<String, Value>,
    expanding: &mut Vec<String>,
) -> Result<JsonSchema, SchemaError> {
    let kind = detect_kind(&resolved);

    let children = match kind {
        SchemaKind::Object => {
            let mut fields = IndexMap::new();
            if let Some(props) = resolved.get("properties").and_then(Value::as_object) {
                for (name, sub) in props {
                    let child_pointer =
                        format!("{pointer}/properties/{}", escape_pointer_token(name));
                    let child = build_node(document, sub, child_pointer, definitions, expanding)?;
                    fields.insert(name.clone(), Rc::new(child));
                }
            }
            Children::Object(fields)
        }
        SchemaKind::Array => {
            let items = resolved.get("items").unwrap_or(&Value::Bool(true));
            let child = build_node(
                document,
                items,
                format!("{pointer}/items"),
                definitions,
                expanding,
            )?;
            Children::Array(Rc::new(child))
        }
        SchemaKind::Tuple => {
            let mut slots = Vec::new();
            if let Some(prefix) = resolved.get("prefixItems").and_then(Value::as_array) {
                for (i, sub) in prefix.iter().enumerate() {
                    let child = build_node(
                        document,
                        sub,
                        format!("{pointer}/prefixItems/{i}"),
                        definitions,
                        expanding,
                    )?;
                    slots.push(Rc::new(child));
                }
            }
            Children::Tuple(slots)
        }
        SchemaKind::Primitive | SchemaKind::Unknown => Children::None,
    };

    let compiled_source = with_definitions(&resolved, definitions);
    let full = compile(&compiled_source, &pointer)?;
    let root = match kind {
        SchemaKind::Object => Some(compile(
            &without_keywords(&compiled_source, OBJECT_FIELD_KEYWORDS),
            &pointer,
        )?),
        SchemaKind::Tuple => Some(compile(
            &without_keywords(&compiled_source, TUPLE_FIELD_KEYWORDS),
            &pointer,
        )?),
        SchemaKind::Array | SchemaKind::Primitive | SchemaKind::Unknown => None,
    };

    Ok(JsonSchema {
        kind,
        default: resolved.get("default").cloned(),
        pointer,
        document: resolved,
        children,
        full,
        root,
        refinements: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn person_schema() -> JsonSchema {
        JsonSchema::from_value(json!({
            "type": "object",
            "required": ["name"],
            "properties": {
                "name": {"type": "string", "minLength": 1, "default": "anonymous"},
                "age": {"type": "integer", "minimum": 0},
                "tags": {"type": "array", "items": {"type": "string"}},
                "span": {
                    "type": "array",
                    "prefixItems": [{"type": "number"}, {"type": "number"}],
                    "items": false
                }
            }
        }))
        .unwrap()
    }

    fn messages(result: Result<(), SchemaError>) -> Vec<String> {
        match result {
            Ok(()) => Vec::new(),
            Err(SchemaError::Invalid(f)) => f.errors,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn kinds_are_detected() {
        let schema = person_schema();
        assert_eq!(schema.kind(), SchemaKind::Object);
        let SchemaFields::Object(fields) = schema.fields() else {
            panic!("expected object fields");
        };
        let kinds: Vec<(&str, SchemaKind)> =
            fields.iter().map(|(n, s)| (n.as_str(), s.kind())).collect();
        assert_eq!(
            kinds,
            vec![
                ("name", SchemaKind::Primitive),
                ("age", SchemaKind::Primitive),
                ("tags", SchemaKind::Array),
                ("span", SchemaKind::Tuple),
            ]
        );
    }

    #[test]
    fn untyped_and_boolean_schemas_are_unknown() {
        assert_eq!(JsonSchema::from_value(json!({})).unwrap().kind(), SchemaKind::Unknown);
        assert_eq!(JsonSchema::from_value(json!(true)).unwrap().kind(), SchemaKind::Unknown);
    }

    #[test]
    fn object_without_properties_is_primitive() {
        let schema = JsonSchema::from_value(json!({"type": "object"})).unwrap();
        assert_eq!(schema.kind(), SchemaKind::Primitive);
    }

    #[test]
    fn defaults_are_exposed() {
        let schema = person_schema();
        let SchemaFields::Object(fields) = schema.fields() else {
            panic!("expected object fields");
        };
        assert_eq!(fields[0].1.default_value(), Some(json!("anonymous")));
        assert_eq!(fields[1].1.default_value(), None);
    }

    #[test]
    fn leaf_validation_reports_messages() {
        let schema = JsonSchema::from_value(json!({"type": "string", "minLength": 3})).unwrap();
        let opts = ValidateOptions::default();
        assert!(schema.validate(&json!("abcd"), &opts).is_ok());
        assert_eq!(messages(schema.validate(&json!("ab"), &opts)).len(), 1);
        assert_eq!(messages(schema.validate(&Value::Null, &opts)).len(), 1);
    }

    #[test]
    fn root_validation_ignores_fields() {
        let schema = person_schema();
        let opts = ValidateOptions::default();
        let value = json!({"name": "", "age": -1, "tags": [1], "span": [1, 2]});
        assert!(schema.validate_root(&value, &opts).is_ok());
        assert!(!messages(schema.validate(&value, &opts)).is_empty());

        let missing = json!({"age": 3});
        let errors = messages(schema.validate_root(&missing, &opts));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("name"), "got: {errors:?}");
    }

    #[test]
    fn abort_early_keeps_first_message() {
        let schema = JsonSchema::from_value(json!({
            "type": "string",
            "minLength": 5,
            "pattern": "^[0-9]+$"
        }))
        .unwrap();
        let all = messages(schema.validate(&json!("ab"), &ValidateOptions::default()));
        assert_eq!(all.len(), 2);
        let first = messages(schema.validate(
            &json!("ab"),
            &ValidateOptions {
                abort_early: true,
                context: None,
            },
        ));
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn tuple_refinement_runs_in_root_validation() {
        let schema = JsonSchema::from_value(json!({
            "type": "array",
            "prefixItems": [{"type": "number"}, {"type": "number"}]
        }))
        .unwrap()
        .refine("ordered", |value, _| {
            let a = value.get(0).and_then(Value::as_f64).unwrap_or(0.0);
            let b = value.get(1).and_then(Value::as_f64).unwrap_or(0.0);
            if a < b {
                Ok(())
            } else {
                Err(SchemaError::invalid("first element must be less than second"))
            }
        });
        let opts = ValidateOptions::default();
        assert!(schema.validate_root(&json!([1, 2]), &opts).is_ok());
        assert_eq!(
            messages(schema.validate_root(&json!([3, 2]), &opts)),
            vec!["first element must be less than second"]
        );
    }

    #[test]
    fn refine_at_reaches_nested_nodes() {
        let schema = person_schema()
            .refine_at("tags.*", "no-spaces", |value, _| match value.as_str() {
                Some(s) if s.contains(' ') => Err(SchemaError::invalid("tag contains a space")),
                _ => Ok(()),
            })
            .unwrap();
        let opts = ValidateOptions::default();
        let value = json!({"name": "x", "tags": ["ok", "not ok"]});
        assert_eq!(
            messages(schema.validate(&value, &opts)),
            vec!["tag contains a space"]
        );
        // Root validation does not descend into field refinements.
        assert!(schema.validate_root(&value, &opts).is_ok());
    }

    #[test]
    fn refine_at_unknown_path_fails() {
        let err = person_schema()
            .refine_at("missing", "x", |_, _| Ok(()))
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownPath { .. }), "got: {err}");
    }

    #[test]
    fn refinement_sees_context() {
        let schema = JsonSchema::from_value(json!({"type": "integer"}))
            .unwrap()
            .refine("below-limit", |value, opts| {
                let limit = opts
                    .context
                    .as_ref()
                    .and_then(|c| c.get("limit"))
                    .and_then(Value::as_i64)
                    .unwrap_or(i64::MAX);
                if value.as_i64().is_some_and(|v| v <= limit) {
                    Ok(())
                } else {
                    Err(SchemaError::invalid("over limit"))
                }
            });
        let opts = ValidateOptions {
            abort_early: false,
            context: Some(json!({"limit": 10})),
        };
        assert!(schema.validate(&json!(5), &opts).is_ok());
        assert_eq!(messages(schema.validate(&json!(11), &opts)), vec!["over limit"]);
    }

    #[test]
    fn refinement_fault_propagates() {
        let schema = JsonSchema::from_value(json!({"type": "string"}))
            .unwrap()
            .refine("lookup", |_, _| {
                Err(SchemaError::Rule {
                    rule: "lookup".into(),
                    reason: "backend unavailable".into(),
                })
            });
        let err = schema
            .validate(&json!("x"), &ValidateOptions::default())
            .unwrap_err();
        assert!(matches!(err, SchemaError::Rule { .. }), "got: {err}");
    }

    #[test]
    fn local_refs_resolve() {
        let schema = JsonSchema::from_value(json!({
            "$defs": {
                "amount": {"type": "number", "minimum": 0, "default": 0},
                "line": {
                    "type": "object",
                    "properties": {"amount": {"$ref": "#/$defs/amount"}}
                }
            },
            "type": "object",
            "properties": {
                "total": {"$ref": "#/$defs/amount", "default": 10},
                "lines": {"type": "array", "items": {"$ref": "#/$defs/line"}}
            }
        }))
        .unwrap();
        let SchemaFields::Object(fields) = schema.fields() else {
            panic!("expected object fields");
        };
        assert_eq!(fields[0].1.kind(), SchemaKind::Primitive);
        assert_eq!(fields[0].1.default_value(), Some(json!(10)));
        let SchemaFields::Array(line) = fields[1].1.fields() else {
            panic!("expected array element");
        };
        assert_eq!(line.kind(), SchemaKind::Object);
        let opts = ValidateOptions::default();
        assert!(line.validate(&json!({"amount": 3}), &opts).is_ok());
        assert!(line.validate(&json!({"amount": -3}), &opts).is_err());
    }

    #[test]
    fn remote_ref_is_rejected() {
        let err = JsonSchema::from_value(json!({
            "type": "object",
            "properties": {"a": {"$ref": "https://example.com/a.json"}}
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::Load { .. }), "got: {err}");
    }

    #[test]
    fn invalid_schema_is_build_error() {
        let err = JsonSchema::from_value(json!({"type": "string", "pattern": "("})).unwrap_err();
        assert!(matches!(err, SchemaError::Build { .. }), "got: {err}");
    }

    #[test]
    fn pointers_track_document_location() {
        let schema = person_schema();
        let SchemaFields::Object(fields) = schema.fields() else {
            panic!("expected object fields");
        };
        assert!(format!("{:?}", fields[3].1).contains("/properties/span"));
        assert_eq!(schema.pointer(), "");
    }

    fn tree_document() -> Value {
        json!({
            "$defs": {
                "node": {
                    "type": "object",
                    "properties": {
                        "label": {"type": "string"},
                        "children": {"type": "array", "items": {"$ref": "#/$defs/node"}}
                    }
                }
            },
            "$ref": "#/$defs/node"
        })
    }

    #[test]
    fn recursive_ref_becomes_unknown_leaf() {
        let schema = JsonSchema::from_value(tree_document()).unwrap();
        assert_eq!(schema.kind(), SchemaKind::Object);
        let SchemaFields::Object(fields) = schema.fields() else {
            panic!("expected object fields");
        };
        assert_eq!(fields[1].0, "children");
        let SchemaFields::Array(child) = fields[1].1.fields() else {
            panic!("expected array element");
        };
        assert_eq!(child.kind(), SchemaKind::Unknown);
        assert!(matches!(child.fields(), SchemaFields::None));

        let opts = ValidateOptions::default();
        let good = json!({"label": "leaf", "children": []});
        let bad = json!({"label": "leaf", "children": [{"label": 3}]});
        assert!(child.validate(&good, &opts).is_ok());
        assert_eq!(messages(child.validate(&bad, &opts)).len(), 1);
        assert!(schema.validate(&json!({"children": [bad]}), &opts).is_err());
    }

    #[test]
    fn mutually_recursive_refs_terminate() {
        let schema = JsonSchema::from_value(json!({
            "$defs": {
                "a": {"type": "object", "properties": {"b": {"$ref": "#/$defs/b"}}},
                "b": {"type": "object", "properties": {"a": {"$ref": "#/$defs/a"}}}
            },
            "type": "object",
            "properties": {"root": {"$ref": "#/$defs/a"}}
        }))
        .unwrap();
        let SchemaFields::Object(fields) = schema.fields() else {
            panic!("expected object fields");
        };
        let SchemaFields::Object(a) = fields[0].1.fields() else {
            panic!("expected a");
        };
        let SchemaFields::Object(b) = a[0].1.fields() else {
            panic!("expected b");
        };
        assert_eq!(b[0].1.kind(), SchemaKind::Unknown);
    }

    #[test]
    fn self_referencing_ref_chain_is_rejected() {
        let err = JsonSchema::from_value(json!({
            "$defs": {"loop": {"$ref": "#/$defs/loop"}},
            "type": "object",
            "properties": {"x": {"$ref": "#/$defs/loop"}}
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::Load { .. }), "got: {err}");
    }

    #[test]
    fn root_validation_treats_null_fields_as_missing() {
        let schema = JsonSchema::from_value(json!({
            "type": "object",
            "required": ["nick"],
            "minProperties": 1,
            "properties": {"nick": {"type": ["string", "null"]}}
        }))
        .unwrap();
        let opts = ValidateOptions::default();
        let errors = messages(schema.validate_root(&json!({"nick": null}), &opts));
        assert_eq!(errors.len(), 2, "got: {errors:?}");
        assert!(schema.validate_root(&json!({"nick": "ada"}), &opts).is_ok());
        // Full validation judges the value as written.
        assert!(schema.validate(&json!({"nick": null}), &opts).is_ok());
    }
}
