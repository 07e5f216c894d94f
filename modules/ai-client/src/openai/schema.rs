use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Types usable as OpenAI strict structured output.
///
/// Blanket-implemented for every `JsonSchema + DeserializeOwned` type. Strict mode
/// requires `additionalProperties: false` and every property listed in `required`
/// on every object, and it cannot follow `$ref`, so the schemars output is inlined
/// and normalised before it is sent.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    fn openai_schema() -> Value {
        let mut root = serde_json::to_value(schema_for!(Self)).unwrap_or_default();

        let definitions = match root {
            Value::Object(ref mut map) => {
                map.remove("$schema");
                map.remove("definitions").unwrap_or(Value::Null)
            }
            _ => Value::Null,
        };

        strictify(&mut root, &definitions);
        root
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

/// Keywords schemars emits that strict mode rejects or that add nothing for the model.
const DROPPED_KEYWORDS: &[&str] = &["format", "default"];

fn strictify(value: &mut Value, definitions: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(resolved) = resolve(map, definitions) {
                *value = resolved;
                strictify(value, definitions);
                return;
            }

            if map.contains_key("type") {
                for keyword in DROPPED_KEYWORDS {
                    map.remove(*keyword);
                }
            }

            if map.get("type").and_then(Value::as_str) == Some("object") {
                close_object(map);
            }

            for (_, child) in map.iter_mut() {
                strictify(child, definitions);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                strictify(item, definitions);
            }
        }
        _ => {}
    }
}

/// Replace a `$ref` (or a single-element `allOf` wrapper) with what it points to.
fn resolve(map: &Map<String, Value>, definitions: &Value) -> Option<Value> {
    if let Some(Value::String(path)) = map.get("$ref") {
        let name = path.strip_prefix("#/definitions/")?;
        return definitions.get(name).cloned();
    }

    match map.get("allOf") {
        Some(Value::Array(all_of)) if all_of.len() == 1 => all_of.first().cloned(),
        _ => None,
    }
}

fn close_object(map: &mut Map<String, Value>) {
    map.insert("additionalProperties".to_string(), Value::Bool(false));

    let required: Vec<Value> = match map.get("properties") {
        Some(Value::Object(props)) => props.keys().cloned().map(Value::String).collect(),
        _ => Vec::new(),
    };
    map.insert("required".to_string(), Value::Array(required));
}
