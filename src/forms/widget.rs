//! Schema → widget mapping.
//!
//! | schema kind | widget                                   |
//! |-------------|------------------------------------------|
//! | string      | text input, textarea when long-form      |
//! | number      | numeric input with min/max from bounds   |
//! | boolean     | toggle                                   |
//! | enum        | single select over the declared choices  |
//! | array       | repeatable group of item widgets         |
//! | object      | nested group keyed by field name         |

use serde::Serialize;

use super::collect::choice_label;
use super::schema::{FieldKind, SchemaField};
use super::values::{FormValues, child_path};

/// One input control with its label and current value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Widget {
    /// Form field name (see [`super::values`] for the path syntax).
    pub path: String,
    pub label: String,
    pub type_name: &'static str,
    pub help: Option<String>,
    pub required: bool,
    pub control: Control,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "control", rename_all = "snake_case")]
pub enum Control {
    Text {
        value: String,
        multiline: bool,
    },
    Number {
        value: String,
        min: Option<f64>,
        max: Option<f64>,
        /// `"1"` for integers, `"any"` otherwise.
        step: &'static str,
    },
    Toggle {
        checked: bool,
    },
    Select {
        options: Vec<SelectOption>,
        /// Optional selects start with an empty option.
        allow_empty: bool,
    },
    Repeatable {
        entries: Vec<RepeatEntry>,
        /// Whether another entry may be added.
        can_add: bool,
    },
    Group {
        children: Vec<Widget>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepeatEntry {
    pub index: usize,
    pub widget: Widget,
}

/// Widgets for the fields of `root`, prefilled from `values`.
#[must_use]
pub fn render(root: &SchemaField, values: &FormValues) -> Vec<Widget> {
    root.fields()
        .iter()
        .map(|f| widget_for(f, &child_path("", &f.name), values))
        .collect()
}

/// Widget for one array entry.
fn render_entry(items: &SchemaField, array_path: &str, index: usize, values: &FormValues) -> Widget {
    let mut widget = widget_for(items, &child_path(array_path, &index.to_string()), values);
    widget.label = format!("#{}", index + 1);
    widget
}

fn widget_for(field: &SchemaField, path: &str, values: &FormValues) -> Widget {
    let current = || values.get(path).unwrap_or_default().to_string();

    let control = match &field.kind {
        FieldKind::String { multiline } => Control::Text {
            value: current(),
            multiline: *multiline,
        },
        FieldKind::Number {
            integer,
            minimum,
            maximum,
        } => Control::Number {
            value: current(),
            min: *minimum,
            max: *maximum,
            step: if *integer { "1" } else { "any" },
        },
        FieldKind::Boolean => Control::Toggle {
            checked: values
                .get(path)
                .is_some_and(|v| matches!(v.trim(), "true" | "on" | "1" | "yes")),
        },
        FieldKind::Enum { choices } => {
            let selected = values.get(path);
            Control::Select {
                options: choices
                    .iter()
                    .map(|c| {
                        let value = choice_label(c);
                        SelectOption {
                            selected: selected == Some(value.as_str()),
                            value,
                        }
                    })
                    .collect(),
                allow_empty: !field.required,
            }
        }
        FieldKind::Array {
            items, max_items, ..
        } => {
            let indices = values.array_indices(path);
            let can_add = max_items.is_none_or(|max| indices.len() < max);
            Control::Repeatable {
                entries: indices
                    .into_iter()
                    .map(|index| RepeatEntry {
                        index,
                        widget: render_entry(items, path, index, values),
                    })
                    .collect(),
                can_add,
            }
        }
        FieldKind::Object { fields } => Control::Group {
            children: fields
                .iter()
                .map(|f| widget_for(f, &child_path(path, &f.name), values))
                .collect(),
        },
    };

    Widget {
        path: path.to_string(),
        label: field.label().to_string(),
        type_name: field.kind.type_name(),
        help: field.description.clone(),
        required: field.required,
        control,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::schema::parse_input_schema;
    use serde_json::json;

    #[test]
    fn mapping_is_exhaustive_and_deterministic() {
        let root = parse_input_schema(&json!({
            "properties": {
                "s": { "type": "string", "format": "textarea" },
                "n": { "type": "integer", "minimum": 0, "maximum": 9 },
                "b": { "type": "boolean" },
                "e": { "enum": ["x", "y"] },
                "a": { "type": "array", "items": { "type": "number" } },
                "o": { "type": "object", "properties": { "k": { "type": "string" } } }
            },
            "required": ["e"]
        }))
        .unwrap();
        let values = FormValues::new();
        let first = render(&root, &values);
        assert_eq!(first, render(&root, &values));

        assert!(matches!(first[0].control, Control::Text { multiline: true, .. }));
        assert!(matches!(
            first[1].control,
            Control::Number { min: Some(_), max: Some(_), step: "1", .. }
        ));
        assert!(matches!(first[2].control, Control::Toggle { checked: false }));
        assert!(matches!(
            first[3].control,
            Control::Select { allow_empty: false, ref options } if options.len() == 2
        ));
        assert!(matches!(
            first[4].control,
            Control::Repeatable { ref entries, can_add: true } if entries.is_empty()
        ));
        match &first[5].control {
            Control::Group { children } => assert_eq!(children[0].path, "o.k"),
            other => panic!("expected group, got {other:?}"),
        }
    }

    #[test]
    fn widgets_are_prefilled_from_values() {
        let root = parse_input_schema(&json!({
            "properties": {
                "tags": { "type": "array", "items": { "type": "string" }, "maxItems": 2 },
                "unit": { "enum": ["c", "f"] },
                "on": { "type": "boolean" }
            }
        }))
        .unwrap();
        let (values, _) = FormValues::from_pairs([
            ("tags.0".to_string(), "a".to_string()),
            ("tags.4".to_string(), "b".to_string()),
            ("unit".to_string(), "f".to_string()),
            ("on".to_string(), "true".to_string()),
        ]);
        let widgets = render(&root, &values);

        let Control::Repeatable { entries, can_add } = &widgets[0].control else {
            panic!("expected repeatable");
        };
        assert!(!can_add);
        assert_eq!(entries[1].index, 4);
        assert_eq!(entries[1].widget.path, "tags.4");
        assert!(matches!(&entries[1].widget.control, Control::Text { value, .. } if value == "b"));

        let Control::Select { options, .. } = &widgets[1].control else {
            panic!("expected select");
        };
        assert!(options[1].selected && !options[0].selected);
        assert!(matches!(widgets[2].control, Control::Toggle { checked: true }));
    }
}
