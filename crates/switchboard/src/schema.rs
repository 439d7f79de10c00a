//! JSON Schema generation for tool inputs and outputs.

use schemars::JsonSchema;
use serde_json::Value;

/// Generate an inline draft-07 schema for `T`.
///
/// Subschemas are inlined so that clients never have to chase `$ref`s, and so
/// that [`crate::validate`] can check payloads without a definitions table.
pub fn schema_for<T: JsonSchema>() -> Value {
    let settings = schemars::generate::SchemaSettings::draft07().with(|s| {
        s.inline_subschemas = true;
    });
    let gen = settings.into_generator();
    gen.into_root_schema_for::<T>().to_value()
}
