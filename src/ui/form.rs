//! Widget tree → HTML form controls.

use std::fmt::Write as _;

use super::html::escape;
use crate::error::ValidationError;
use crate::forms::values::{OP_KEY, entry_marker};
use crate::forms::{Control, SchemaField, Widget};

/// Controls for every widget, with validation messages next to the
/// offending fields.
#[must_use]
pub fn controls(widgets: &[Widget], errors: Option<&ValidationError>) -> String {
    let mut out = String::new();
    for widget in widgets {
        write_widget(&mut out, widget, errors);
    }
    out
}

fn write_widget(out: &mut String, widget: &Widget, errors: Option<&ValidationError>) {
    let name = escape(&widget.path);
    let id = format!("f-{name}");
    let problem = errors.and_then(|e| field_problem(e, &widget.path));
    let class = if problem.is_some() { "field invalid" } else { "field" };
    let required = if widget.required { " *" } else { "" };
    let label = format!(
        r#"<label for="{id}">{}{required} <span class="muted">({})</span></label>"#,
        escape(&widget.label),
        widget.type_name
    );

    let _ = write!(out, r#"<div class="{class}">"#);
    match &widget.control {
        Control::Text { value, multiline } => {
            out.push_str(&label);
            if *multiline {
                let _ = write!(out, r#"<textarea id="{id}" name="{name}">{}</textarea>"#, escape(value));
            } else {
                let _ = write!(
                    out,
                    r#"<input type="text" id="{id}" name="{name}" value="{}">"#,
                    escape(value)
                );
            }
        }
        Control::Number {
            value,
            min,
            max,
            step,
        } => {
            out.push_str(&label);
            let min = min.map(|m| format!(r#" min="{m}""#)).unwrap_or_default();
            let max = max.map(|m| format!(r#" max="{m}""#)).unwrap_or_default();
            let _ = write!(
                out,
                r#"<input type="number" id="{id}" name="{name}" step="{step}"{min}{max} value="{}">"#,
                escape(value)
            );
        }
        Control::Toggle { checked } => {
            let checked = if *checked { " checked" } else { "" };
            let _ = write!(
                out,
                r#"<label for="{id}"><input type="checkbox" id="{id}" name="{name}" value="true"{checked}> {}{required}</label>"#,
                escape(&widget.label)
            );
        }
        Control::Select {
            options,
            allow_empty,
        } => {
            out.push_str(&label);
            let _ = write!(out, r#"<select id="{id}" name="{name}">"#);
            if *allow_empty {
                out.push_str(r#"<option value=""></option>"#);
            }
            for option in options {
                let selected = if option.selected { " selected" } else { "" };
                let value = escape(&option.value);
                let _ = write!(out, r#"<option value="{value}"{selected}>{value}</option>"#);
            }
            out.push_str("</select>");
        }
        Control::Repeatable { entries, can_add } => {
            let _ = write!(out, "<fieldset><legend>{}{required}</legend>", escape(&widget.label));
            write_help(out, widget);
            for entry in entries {
                let marker = escape(&entry_marker(&widget.path, entry.index));
                let _ = write!(out, r#"<div class="entry"><input type="hidden" name="{marker}" value="">"#);
                write_widget(out, &entry.widget, errors);
                let _ = write!(
                    out,
                    r#"<button type="submit" class="link" name="{OP_KEY}" value="remove:{}" formnovalidate>Remove</button></div>"#,
                    escape(&entry.widget.path)
                );
            }
            if *can_add {
                let _ = write!(
                    out,
                    r#"<button type="submit" class="secondary" name="{OP_KEY}" value="add:{name}" formnovalidate>Add entry</button>"#
                );
            }
            write_problem(out, problem.as_deref());
            out.push_str("</fieldset></div>");
            return;
        }
        Control::Group { children } => {
            let _ = write!(out, "<fieldset><legend>{}{required}</legend>", escape(&widget.label));
            write_help(out, widget);
            for child in children {
                write_widget(out, child, errors);
            }
            out.push_str("</fieldset></div>");
            return;
        }
    }
    write_help(out, widget);
    write_problem(out, problem.as_deref());
    out.push_str("</div>");
}

fn write_help(out: &mut String, widget: &Widget) {
    if let Some(help) = &widget.help {
        let _ = write!(out, r#"<p class="help">{}</p>"#, escape(help));
    }
}

fn write_problem(out: &mut String, problem: Option<&str>) {
    if let Some(problem) = problem {
        let _ = write!(out, r#"<p class="field-error">{}</p>"#, escape(problem));
    }
}

fn field_problem(errors: &ValidationError, path: &str) -> Option<String> {
    if errors.missing.iter().any(|m| m == path) {
        return Some("required".to_string());
    }
    errors
        .invalid
        .iter()
        .find(|i| i.field == path)
        .map(|i| i.reason.clone())
}

/// Field / type / required table for the top-level inputs.
#[must_use]
pub fn field_table(root: &SchemaField) -> String {
    let fields = root.fields();
    if fields.is_empty() {
        return r#"<p class="muted">This tool takes no input.</p>"#.to_string();
    }
    let rows: String = fields
        .iter()
        .map(|f| {
            format!(
                "<tr><td><code>{}</code></td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape(&f.name),
                f.kind.type_name(),
                if f.required { "yes" } else { "no" },
                escape(f.description.as_deref().unwrap_or(""))
            )
        })
        .collect();
    format!(
        "<table><thead><tr><th>Field</th><th>Type</th><th>Required</th><th>Description</th></tr></thead><tbody>{rows}</tbody></table>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::{FormValues, parse_input_schema, render};
    use serde_json::json;

    fn schema() -> SchemaField {
        parse_input_schema(&json!({
            "properties": {
                "city": { "type": "string", "description": "City <name>" },
                "days": { "type": "integer", "minimum": 1 },
                "metric": { "type": "boolean", "default": true },
                "tags": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["city"]
        }))
        .unwrap()
    }

    #[test]
    fn renders_each_control_kind() {
        let root = schema();
        let (mut values, _) = FormValues::from_pairs([("tags.0#".to_string(), String::new())]);
        values.insert("metric", "true");
        let html = controls(&render(&root, &values), None);

        assert!(html.contains(r#"<input type="text" id="f-city" name="city" value="">"#));
        assert!(html.contains(r#"step="1" min="1""#));
        assert!(html.contains(r#"name="metric" value="true" checked"#));
        assert!(html.contains(r#"<input type="hidden" name="tags.0#" value="">"#));
        assert!(html.contains(r#"value="remove:tags.0""#));
        assert!(html.contains(r#"value="add:tags""#));
        assert!(html.contains("City &lt;name&gt;"));
    }

    #[test]
    fn validation_messages_sit_next_to_fields() {
        let root = schema();
        let mut errors = ValidationError::default();
        errors.missing("city");
        errors.invalid("days", "must be at least 1");
        let html = controls(&render(&root, &FormValues::new()), Some(&errors));

        assert_eq!(html.matches("field invalid").count(), 2);
        assert!(html.contains("must be at least 1"));
    }

    #[test]
    fn field_table_lists_type_and_required() {
        let html = field_table(&schema());
        assert!(html.contains("<td><code>city</code></td><td>string</td><td>yes</td>"));
        assert!(html.contains("<td><code>days</code></td><td>integer</td><td>no</td>"));
    }
}
