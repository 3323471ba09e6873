//! JSON Schema → [`SchemaField`] tree.

use serde::Serialize;
use serde_json::{Map, Value};

/// Nesting limit for `$ref` chains and recursive definitions.
const MAX_DEPTH: usize = 12;

/// Strings longer than this are edited in a textarea.
const MULTILINE_MAX_LENGTH: u64 = 256;

/// One field of a tool's input, with its nested children.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaField {
    /// Property name; empty for the root object and array items.
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub required: bool,
    pub default: Option<Value>,
    pub kind: FieldKind,
}

/// Closed set of field shapes the dashboard knows how to edit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    String {
        multiline: bool,
    },
    Number {
        integer: bool,
        minimum: Option<f64>,
        maximum: Option<f64>,
    },
    Boolean,
    Enum {
        choices: Vec<Value>,
    },
    Array {
        items: Box<SchemaField>,
        min_items: Option<usize>,
        max_items: Option<usize>,
    },
    Object {
        fields: Vec<SchemaField>,
    },
}

impl FieldKind {
    /// Name shown in the field table.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String { .. } => "string",
            Self::Number { integer: true, .. } => "integer",
            Self::Number { .. } => "number",
            Self::Boolean => "boolean",
            Self::Enum { .. } => "enum",
            Self::Array { .. } => "array",
            Self::Object { .. } => "object",
        }
    }
}

impl SchemaField {
    /// Label used by widgets: title, else the property name.
    #[must_use]
    pub fn label(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.name)
    }

    /// Children of an object field; empty for every other kind.
    #[must_use]
    pub fn fields(&self) -> &[SchemaField] {
        match &self.kind {
            FieldKind::Object { fields } => fields,
            _ => &[],
        }
    }

    fn with_kind(kind: FieldKind) -> Self {
        Self {
            name: String::new(),
            title: None,
            description: None,
            required: false,
            default: None,
            kind,
        }
    }
}

/// Parse a tool's `inputSchema` into a root object field.
///
/// A root that is not an object produces an object with no fields, so tools
/// without inputs still get a (button-only) form.
pub fn parse_input_schema(schema: &Value) -> Result<SchemaField, String> {
    let Some(obj) = schema.as_object() else {
        return Ok(SchemaField::with_kind(FieldKind::Object { fields: Vec::new() }));
    };
    let mut root = Parser { root: schema }.field(obj, "", 0)?;
    if !matches!(root.kind, FieldKind::Object { .. }) {
        root.kind = FieldKind::Object { fields: Vec::new() };
    }
    root.required = true;
    Ok(root)
}

struct Parser<'a> {
    root: &'a Value,
}

impl Parser<'_> {
    fn field(&self, obj: &Map<String, Value>, name: &str, depth: usize) -> Result<SchemaField, String> {
        let obj = self.resolve(obj, name, depth)?;
        let obj = &obj;

        let mut field = SchemaField {
            name: name.to_string(),
            title: str_key(obj, "title"),
            description: str_key(obj, "description"),
            required: false,
            default: obj.get("default").filter(|d| !d.is_null()).cloned(),
            kind: FieldKind::Boolean,
        };

        if depth > MAX_DEPTH {
            field.kind = FieldKind::String { multiline: true };
            return Ok(field);
        }

        if let Some(choices) = obj.get("enum") {
            let choices = choices
                .as_array()
                .ok_or_else(|| format!("'{name}': 'enum' must be a list"))?;
            field.kind = FieldKind::Enum {
                choices: choices.iter().filter(|c| !c.is_null()).cloned().collect(),
            };
            return Ok(field);
        }
        if let Some(constant) = obj.get("const") {
            field.kind = FieldKind::Enum {
                choices: vec![constant.clone()],
            };
            return Ok(field);
        }

        field.kind = match declared_type(obj, name)?.as_deref() {
            Some("string") => FieldKind::String {
                multiline: is_long_form(obj),
            },
            Some("number") => number_kind(obj, false),
            Some("integer") => number_kind(obj, true),
            Some("boolean") => FieldKind::Boolean,
            Some("array") => self.array_kind(obj, name, depth)?,
            Some("object") => self.object_kind(obj, name, depth)?,
            Some(_) | None => {
                if obj.contains_key("properties") {
                    self.object_kind(obj, name, depth)?
                } else if obj.contains_key("items") {
                    self.array_kind(obj, name, depth)?
                } else {
                    FieldKind::String {
                        multiline: is_long_form(obj),
                    }
                }
            }
        };
        Ok(field)
    }

    /// Follow `$ref` and pick the non-null member of `anyOf`/`oneOf`.
    /// Keys on the outer schema (title, default, ...) win over the member's.
    fn resolve(
        &self,
        obj: &Map<String, Value>,
        name: &str,
        depth: usize,
    ) -> Result<Map<String, Value>, String> {
        if depth > MAX_DEPTH {
            return Ok(obj.clone());
        }

        let inner = if let Some(reference) = obj.get("$ref").and_then(Value::as_str) {
            let target = reference
                .strip_prefix('#')
                .and_then(|pointer| self.root.pointer(pointer))
                .and_then(Value::as_object)
                .ok_or_else(|| format!("'{name}': unresolvable $ref '{reference}'"))?;
            Some(self.resolve(target, name, depth + 1)?)
        } else if let Some(members) = obj
            .get("anyOf")
            .or_else(|| obj.get("oneOf"))
            .and_then(Value::as_array)
        {
            members
                .iter()
                .filter_map(Value::as_object)
                .find(|m| m.get("type").and_then(Value::as_str) != Some("null"))
                .map(|m| self.resolve(m, name, depth + 1))
                .transpose()?
        } else if let Some(Value::Array(all)) = obj.get("allOf") {
            match all.as_slice() {
                [Value::Object(single)] => Some(self.resolve(single, name, depth + 1)?),
                _ => None,
            }
        } else {
            None
        };

        let Some(mut merged) = inner else {
            return Ok(obj.clone());
        };
        for (k, v) in obj {
            if !matches!(k.as_str(), "$ref" | "anyOf" | "oneOf" | "allOf") {
                merged.insert(k.clone(), v.clone());
            }
        }
        Ok(merged)
    }

    fn array_kind(
        &self,
        obj: &Map<String, Value>,
        name: &str,
        depth: usize,
    ) -> Result<FieldKind, String> {
        let items = match obj.get("items") {
            None | Some(Value::Bool(true)) => SchemaField::with_kind(FieldKind::String {
                multiline: false,
            }),
            Some(Value::Object(items)) => self.field(items, "", depth + 1)?,
            Some(_) => return Err(format!("'{name}': 'items' must be a schema object")),
        };
        Ok(FieldKind::Array {
            items: Box::new(items),
            min_items: usize_key(obj, "minItems"),
            max_items: usize_key(obj, "maxItems"),
        })
    }

    fn object_kind(
        &self,
        obj: &Map<String, Value>,
        name: &str,
        depth: usize,
    ) -> Result<FieldKind, String> {
        let required: Vec<&str> = match obj.get("required") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            Some(_) => return Err(format!("'{name}': 'required' must be a list")),
        };

        let properties = match obj.get("properties") {
            None | Some(Value::Null) => return Ok(FieldKind::Object { fields: Vec::new() }),
            Some(Value::Object(props)) => props,
            Some(_) => return Err(format!("'{name}': 'properties' must be an object")),
        };

        let mut fields = Vec::with_capacity(properties.len());
        for (prop, schema) in properties {
            let mut child = match schema {
                Value::Object(child) => self.field(child, prop, depth + 1)?,
                // `"prop": true` accepts anything
                Value::Bool(_) => {
                    let mut f = SchemaField::with_kind(FieldKind::String { multiline: false });
                    f.name.clone_from(prop);
                    f
                }
                _ => return Err(format!("'{prop}': property schema must be an object")),
            };
            child.required = required.contains(&prop.as_str());
            fields.push(child);
        }
        Ok(FieldKind::Object { fields })
    }
}

fn declared_type(obj: &Map<String, Value>, name: &str) -> Result<Option<String>, String> {
    match obj.get("type") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(t)) => Ok(Some(t.clone())),
        Some(Value::Array(types)) => Ok(types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null")
            .map(str::to_string)),
        Some(_) => Err(format!("'{name}': 'type' must be a string or list")),
    }
}

fn number_kind(obj: &Map<String, Value>, integer: bool) -> FieldKind {
    FieldKind::Number {
        integer,
        minimum: obj.get("minimum").and_then(Value::as_f64),
        maximum: obj.get("maximum").and_then(Value::as_f64),
    }
}

fn is_long_form(obj: &Map<String, Value>) -> bool {
    let format_says_so = matches!(
        obj.get("format").and_then(Value::as_str),
        Some("textarea" | "multiline")
    );
    let long = obj
        .get("maxLength")
        .and_then(Value::as_u64)
        .is_some_and(|n| n > MULTILINE_MAX_LENGTH);
    format_says_so || long
}

fn str_key(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn usize_key(obj: &Map<String, Value>, key: &str) -> Option<usize> {
    obj.get(key)
        .and_then(Value::as_u64)
        .and_then(|n| usize::try_from(n).ok())
}
