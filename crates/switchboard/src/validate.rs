//! Validation of payloads against JSON Schema.
//!
//! Structural checks are done by `jsonschema` (draft-07). Before checking,
//! the payload is walked once to apply the only conversions we allow: the
//! ones a schema asks for with the `x-coerce` keyword.
//!
//! | `x-coerce` | converts                                    |
//! |------------|---------------------------------------------|
//! | `string`   | numbers and booleans to their text form     |
//! | `integer`  | strings holding a whole number              |
//! | `number`   | strings holding any number                  |
//! | `array`    | `null` to `[]`, any other lone value to a   |
//! |            | one-element list                            |
//!
//! The first violation is reported as a [`SchemaViolation`] whose `field` is
//! a dotted path with `[n]` indices, `$` for the root.

use crate::failure::SchemaViolation;
use jsonschema::{Draft, JSONSchema};
use serde_json::{Map, Number, Value};

pub const COERCE_KEYWORD: &str = "x-coerce";

/// Check `payload` against `schema` and return it with declared conversions applied.
///
/// Pure and deterministic: the same inputs always give the same outcome.
pub fn validate(payload: &Value, schema: &Value) -> Result<Value, SchemaViolation> {
    if !(schema.is_object() || schema.is_boolean()) {
        return Err(SchemaViolation::new("$", "a JSON Schema", type_name(schema)));
    }

    let coerced = coerce_tree(payload, schema);
    check(&coerced, schema, &Path::default())?;
    Ok(coerced)
}

#[derive(Debug, Default, Clone)]
struct Path(Vec<Segment>);

#[derive(Debug, Clone)]
enum Segment {
    Key(String),
    Index(usize),
}

impl Path {
    fn render(&self) -> String {
        if self.0.is_empty() {
            return "$".to_string();
        }

        let mut out = String::new();
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => out.push_str(key),
                Segment::Key(key) => {
                    out.push('.');
                    out.push_str(key);
                }
                Segment::Index(index) => {
                    if i == 0 {
                        out.push('$');
                    }
                    out.push_str(&format!("[{index}]"));
                }
            }
        }
        out
    }

    fn child(&self, key: &str) -> String {
        let mut path = self.clone();
        path.0.push(Segment::Key(key.to_string()));
        path.render()
    }
}

fn compile(schema: &Value) -> Result<JSONSchema, String> {
    JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(schema)
        .map_err(|e| e.to_string())
}

fn is_valid(instance: &Value, schema: &Value) -> bool {
    compile(schema).is_ok_and(|compiled| compiled.is_valid(instance))
}

/// Validate `instance` (found at `base`) and explain the first error.
fn check(instance: &Value, schema: &Value, base: &Path) -> Result<(), SchemaViolation> {
    let compiled = compile(schema)
        .map_err(|e| SchemaViolation::new(base.render(), "a valid JSON Schema", e))?;

    let first = match compiled.validate(instance) {
        Ok(()) => None,
        Err(mut errors) => errors.next().map(|error| {
            (
                pointer_tokens(&error.instance_path.to_string()),
                pointer_tokens(&error.schema_path.to_string()),
            )
        }),
    };

    match first {
        Some((at, rule)) => Err(explain(instance, schema, base, &at, &rule)),
        None => Ok(()),
    }
}

fn pointer_tokens(pointer: &str) -> Vec<String> {
    pointer
        .split('/')
        .skip(1)
        .map(|token| token.replace("~1", "/").replace("~0", "~"))
        .collect()
}

/// Follow instance pointer tokens, telling array indices from object keys.
fn locate<'v>(root: &'v Value, base: &Path, tokens: &[String]) -> (Path, Option<&'v Value>) {
    let mut path = base.clone();
    let mut current = Some(root);
    for token in tokens {
        match current {
            Some(Value::Array(items)) => match token.parse::<usize>() {
                Ok(index) => {
                    path.0.push(Segment::Index(index));
                    current = items.get(index);
                }
                Err(_) => {
                    path.0.push(Segment::Key(token.clone()));
                    current = None;
                }
            },
            Some(Value::Object(map)) => {
                path.0.push(Segment::Key(token.clone()));
                current = map.get(token);
            }
            _ => {
                path.0.push(Segment::Key(token.clone()));
                current = None;
            }
        }
    }
    (path, current)
}

fn schema_at<'s>(schema: &'s Value, tokens: &[String]) -> Option<&'s Value> {
    tokens.iter().try_fold(schema, |node, token| match node {
        // An item index under `items` names the instance, not the schema.
        Value::Object(map) if !map.contains_key(token) && token.parse::<usize>().is_ok() => {
            Some(node)
        }
        Value::Object(map) => map.get(token),
        Value::Array(items) => token.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn explain(
    root: &Value,
    schema: &Value,
    base: &Path,
    at: &[String],
    rule: &[String],
) -> SchemaViolation {
    let (path, value) = locate(root, base, at);
    let value = value.unwrap_or(&Value::Null);
    let violation = |expected: String, actual: String| SchemaViolation::new(path.render(), expected, actual);

    let Some((keyword, owner_tokens)) = rule.split_last() else {
        return violation(describe(schema), type_name(value).to_string());
    };
    let owner_schema = schema_at(schema, owner_tokens);
    let owner = owner_schema.and_then(Value::as_object);
    let fallback = || {
        schema_at(schema, rule)
            .or(owner_schema)
            .map(describe)
            .unwrap_or_else(|| "value".to_string())
    };
    let Some(setting) = owner.and_then(|o| o.get(keyword.as_str())) else {
        return violation(fallback(), type_name(value).to_string());
    };
    let properties = owner.and_then(|o| o.get("properties")).and_then(Value::as_object);

    match keyword.as_str() {
        "required" => {
            let object = value.as_object();
            let missing = setting
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(Value::as_str)
                .find(|name| !object.is_some_and(|o| o.contains_key(*name)));
            match missing {
                Some(name) => {
                    let expected = properties
                        .and_then(|p| p.get(name))
                        .map(describe)
                        .unwrap_or_else(|| "value".to_string());
                    SchemaViolation::new(path.child(name), expected, "missing")
                }
                None => violation("required properties".to_string(), type_name(value).to_string()),
            }
        }
        "additionalProperties" => {
            let extra = value.as_object().and_then(|object| {
                object
                    .iter()
                    .find(|(key, _)| !properties.is_some_and(|p| p.contains_key(key.as_str())))
            });
            match extra {
                Some((key, child)) => SchemaViolation::new(
                    path.child(key),
                    "no additional properties",
                    type_name(child),
                ),
                None => violation("no additional properties".to_string(), type_name(value).to_string()),
            }
        }
        "type" => violation(type_list(setting).join(" or "), type_name(value).to_string()),
        "enum" => violation(
            format!("one of {}", render_list(setting.as_array().map(Vec::as_slice).unwrap_or_default())),
            value.to_string(),
        ),
        "const" => violation(setting.to_string(), value.to_string()),
        "pattern" => violation(format!("string matching {setting}"), value.to_string()),
        "minimum" => violation(format!("number >= {setting}"), value.to_string()),
        "maximum" => violation(format!("number <= {setting}"), value.to_string()),
        "exclusiveMinimum" => violation(format!("number > {setting}"), value.to_string()),
        "exclusiveMaximum" => violation(format!("number < {setting}"), value.to_string()),
        "minLength" | "maxLength" => {
            let bound = if keyword == "minLength" { "at least" } else { "at most" };
            let len = value.as_str().map(|s| s.chars().count()).unwrap_or_default();
            violation(
                format!("string of {bound} {setting} characters"),
                format!("string of {len} characters"),
            )
        }
        "minItems" | "maxItems" => {
            let bound = if keyword == "minItems" { "at least" } else { "at most" };
            let len = value.as_array().map(Vec::len).unwrap_or_default();
            violation(
                format!("array of {bound} {setting} items"),
                format!("array of {len} items"),
            )
        }
        "anyOf" | "oneOf" => {
            let branches = setting.as_array().map(Vec::as_slice).unwrap_or_default();
            explain_alternatives(value, branches, &path, keyword == "oneOf")
        }
        _ => violation(
            owner_schema.map(describe).unwrap_or_else(fallback),
            type_name(value).to_string(),
        ),
    }
}

fn explain_alternatives(
    value: &Value,
    branches: &[Value],
    path: &Path,
    exclusive: bool,
) -> SchemaViolation {
    let matches = branches.iter().filter(|branch| is_valid(value, branch)).count();
    if exclusive && matches > 1 {
        return SchemaViolation::new(
            path.render(),
            "exactly one matching alternative",
            format!("{matches} matching alternatives"),
        );
    }

    // `T | null` unions: report the real branch's error for non-null values
    let real: Vec<&Value> = branches.iter().filter(|b| !is_null_schema(b)).collect();
    if let [only] = real.as_slice() {
        if !value.is_null() {
            if let Err(inner) = check(value, only, path) {
                return inner;
            }
        }
    }

    SchemaViolation::new(path.render(), describe_any(branches), type_name(value))
}

/// Apply every `x-coerce` conversion the schema declares along the payload.
fn coerce_tree(value: &Value, schema: &Value) -> Value {
    let Value::Object(schema) = schema else {
        return value.clone();
    };

    let mut current = match schema.get(COERCE_KEYWORD).and_then(Value::as_str) {
        Some(target) => coerce(value, target),
        None => value.clone(),
    };

    if let Some(branches) = schema.get("allOf").and_then(Value::as_array) {
        for branch in branches {
            current = coerce_tree(&current, branch);
        }
    }
    for key in ["anyOf", "oneOf"] {
        if let Some(branches) = schema.get(key).and_then(Value::as_array) {
            if let Some(branch) = branches.iter().find(|b| admits(b, &current)) {
                current = coerce_tree(&current, branch);
            }
        }
    }

    match current {
        Value::Object(map) => {
            let properties = schema.get("properties").and_then(Value::as_object);
            let additional = schema.get("additionalProperties");
            let out: Map<String, Value> = map
                .into_iter()
                .map(|(key, child)| {
                    let child = match properties.and_then(|p| p.get(&key)).or(additional) {
                        Some(child_schema) => coerce_tree(&child, child_schema),
                        None => child,
                    };
                    (key, child)
                })
                .collect();
            Value::Object(out)
        }
        Value::Array(items) => match schema.get("items").filter(|s| s.is_object()) {
            Some(item_schema) => Value::Array(
                items
                    .iter()
                    .map(|item| coerce_tree(item, item_schema))
                    .collect(),
            ),
            None => Value::Array(items),
        },
        other => other,
    }
}

/// Whether a union branch could take `value`, after its own conversion.
fn admits(branch: &Value, value: &Value) -> bool {
    let Some(declared) = branch.get("type") else {
        return branch.is_object();
    };
    let candidate = match branch.get(COERCE_KEYWORD).and_then(Value::as_str) {
        Some(target) => coerce(value, target),
        None => value.clone(),
    };
    type_list(declared).iter().any(|t| matches_type(&candidate, t))
}

fn coerce(value: &Value, target: &str) -> Value {
    match (target, value) {
        ("string", Value::Number(n)) => Value::String(n.to_string()),
        ("string", Value::Bool(b)) => Value::String(b.to_string()),
        ("integer", Value::String(s)) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                Value::Number(i.into())
            } else if let Ok(u) = s.parse::<u64>() {
                Value::Number(u.into())
            } else {
                value.clone()
            }
        }
        ("number", Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| value.clone()),
        ("array", Value::Array(_)) => value.clone(),
        ("array", Value::Null) => Value::Array(Vec::new()),
        ("array", other) => Value::Array(vec![other.clone()]),
        _ => value.clone(),
    }
}

fn type_list(declared: &Value) -> Vec<&str> {
    match declared {
        Value::String(s) => vec![s.as_str()],
        Value::Array(types) => types.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "null" => value.is_null(),
        "boolean" => value.is_boolean(),
        "string" => value.is_string(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "number" => value.is_number(),
        "integer" => match value {
            Value::Number(n) => {
                n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            _ => false,
        },
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_null_schema(schema: &Value) -> bool {
    schema.get("type").and_then(Value::as_str) == Some("null")
}

/// Short human description of what a schema accepts.
fn describe(schema: &Value) -> String {
    match schema {
        Value::Bool(true) => "any value".to_string(),
        Value::Bool(false) => "no value".to_string(),
        Value::Object(map) => {
            if let Some(declared) = map.get("type") {
                let types = type_list(declared);
                if !types.is_empty() {
                    return types.join(" or ");
                }
            }
            if let Some(options) = map.get("enum").and_then(Value::as_array) {
                return format!("one of {}", render_list(options));
            }
            if let Some(expected) = map.get("const") {
                return expected.to_string();
            }
            for key in ["anyOf", "oneOf"] {
                if let Some(branches) = map.get(key).and_then(Value::as_array) {
                    return describe_any(branches);
                }
            }
            "value".to_string()
        }
        _ => "value".to_string(),
    }
}

fn describe_any(branches: &[Value]) -> String {
    let mut parts: Vec<String> = Vec::new();
    for part in branches.iter().map(describe) {
        if !parts.contains(&part) {
            parts.push(part);
        }
    }
    parts.join(" or ")
}

fn render_list(options: &[Value]) -> String {
    let rendered: Vec<String> = options.iter().map(Value::to_string).collect();
    format!("[{}]", rendered.join(", "))
}
