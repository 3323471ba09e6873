//! Submitted values → argument payload, with local validation.

use serde_json::{Map, Number, Value};

use super::schema::{FieldKind, SchemaField};
use super::values::{FormValues, child_path};
use crate::error::ValidationError;

/// Where the values came from. An unchecked checkbox submits nothing, so a
/// form's absent boolean means `false`; in JSON it means "not given".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Form,
    Json,
}

/// Collect the argument payload for `root` from `values`.
///
/// Every required field that is absent and every value that cannot be coerced
/// to its declared type is reported at once; nothing is returned unless all
/// of them pass.
pub fn collect(root: &SchemaField, values: &FormValues) -> Result<Value, ValidationError> {
    collect_from(root, values, Source::Form)
}

fn collect_from(
    root: &SchemaField,
    values: &FormValues,
    source: Source,
) -> Result<Value, ValidationError> {
    let mut errors = ValidationError::default();
    let payload = collect_object(root.fields(), "", values, source, &mut errors);
    if errors.is_empty() {
        Ok(Value::Object(payload))
    } else {
        Err(errors)
    }
}

/// Validate a ready-made JSON argument object against `root` and return it in
/// canonical, coerced form. Properties the schema does not declare are dropped,
/// and optional properties the caller left out stay out.
pub fn collect_json(root: &SchemaField, arguments: &Value) -> Result<Value, ValidationError> {
    if !arguments.is_object() && !arguments.is_null() {
        let mut errors = ValidationError::default();
        errors.invalid("arguments", "expected a JSON object");
        return Err(errors);
    }
    collect_from(root, &FormValues::from_json(root, arguments), Source::Json)
}

fn collect_object(
    fields: &[SchemaField],
    path: &str,
    values: &FormValues,
    source: Source,
    errors: &mut ValidationError,
) -> Map<String, Value> {
    let mut out = Map::new();
    for field in fields {
        let field_path = child_path(path, &field.name);
        if let Some(v) = collect_field(field, &field_path, values, source, errors, false) {
            out.insert(field.name.clone(), v);
        }
    }
    out
}

/// `entry` is set for array items, which exist because the user added them.
fn collect_field(
    field: &SchemaField,
    path: &str,
    values: &FormValues,
    source: Source,
    errors: &mut ValidationError,
    entry: bool,
) -> Option<Value> {
    match &field.kind {
        FieldKind::Object { fields } => {
            if !field.required && !entry && !values.has_any_under(path) {
                return None;
            }
            Some(Value::Object(collect_object(fields, path, values, source, errors)))
        }
        FieldKind::Array {
            items,
            min_items,
            max_items,
        } => {
            let mut collected = Vec::new();
            for index in values.array_indices(path) {
                let item_path = child_path(path, &index.to_string());
                if is_scalar(&items.kind) && values.non_blank(&item_path).is_none() {
                    // blank rows are ignored rather than reported
                    continue;
                }
                if let Some(v) = collect_field(items, &item_path, values, source, errors, true) {
                    collected.push(v);
                }
            }
            if collected.is_empty() {
                if field.required {
                    errors.missing(path);
                }
                return None;
            }
            if let Some(min) = min_items
                && collected.len() < *min
            {
                errors.invalid(path, format!("needs at least {min} entries"));
            }
            if let Some(max) = max_items
                && collected.len() > *max
            {
                errors.invalid(path, format!("allows at most {max} entries"));
            }
            Some(Value::Array(collected))
        }
        FieldKind::Boolean => match values.non_blank(path) {
            None if source == Source::Form => Some(Value::Bool(false)),
            None => {
                if field.required || entry {
                    errors.missing(path);
                }
                None
            }
            Some(raw) => match parse_bool(raw) {
                Some(b) => Some(Value::Bool(b)),
                None => {
                    errors.invalid(path, format!("expected true or false, got '{raw}'"));
                    None
                }
            },
        },
        FieldKind::String { .. } => match values.get(path).filter(|v| !v.is_empty()) {
            Some(raw) => Some(Value::String(raw.to_string())),
            None => {
                if field.required || entry {
                    errors.missing(path);
                }
                None
            }
        },
        FieldKind::Number {
            integer,
            minimum,
            maximum,
        } => {
            let Some(raw) = values.non_blank(path) else {
                if field.required || entry {
                    errors.missing(path);
                }
                return None;
            };
            match coerce_number(raw.trim(), *integer, *minimum, *maximum) {
                Ok(n) => Some(Value::Number(n)),
                Err(reason) => {
                    errors.invalid(path, reason);
                    None
                }
            }
        }
        FieldKind::Enum { choices } => {
            let Some(raw) = values.non_blank(path) else {
                if field.required || entry {
                    errors.missing(path);
                }
                return None;
            };
            match choices.iter().find(|c| choice_label(c) == raw) {
                Some(choice) => Some(choice.clone()),
                None => {
                    let allowed: Vec<String> = choices.iter().map(choice_label).collect();
                    errors.invalid(
                        path,
                        format!("'{raw}' is not one of: {}", allowed.join(", ")),
                    );
                    None
                }
            }
        }
    }
}

fn is_scalar(kind: &FieldKind) -> bool {
    !matches!(kind, FieldKind::Object { .. } | FieldKind::Array { .. })
}

/// Text a select option submits for an enum choice.
#[must_use]
pub fn choice_label(choice: &Value) -> String {
    match choice {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "1" | "yes" => Some(true),
        "false" | "off" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Parse `raw`, enforce integrality and bounds. Integral values are emitted as
/// JSON integers even for `number` fields.
fn coerce_number(
    raw: &str,
    integer: bool,
    minimum: Option<f64>,
    maximum: Option<f64>,
) -> Result<Number, String> {
    let parsed: f64 = raw
        .parse()
        .ok()
        .filter(|n: &f64| n.is_finite())
        .ok_or_else(|| format!("expected a number, got '{raw}'"))?;

    if integer && parsed.fract() != 0.0 {
        return Err(format!("expected a whole number, got '{raw}'"));
    }
    if let Some(min) = minimum
        && parsed < min
    {
        return Err(format!("must be at least {min}"));
    }
    if let Some(max) = maximum
        && parsed > max
    {
        return Err(format!("must be at most {max}"));
    }

    if let Ok(i) = raw.parse::<i64>() {
        return Ok(Number::from(i));
    }
    if let Some(i) = integral(parsed) {
        return Ok(Number::from(i));
    }
    Number::from_f64(parsed).ok_or_else(|| format!("expected a number, got '{raw}'"))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn integral(n: f64) -> Option<i64> {
    (n.fract() == 0.0 && n.abs() < i64::MAX as f64).then_some(n as i64)
}
