//! Run results and history.

use std::fmt::Write as _;

use serde_json::Value;

use super::html::escape;
use crate::execution::{InvocationResult, Outcome};
use crate::forms::collect::choice_label;
use crate::mcp::ContentBlock;

/// One run: header line plus its output or error.
#[must_use]
pub fn result_card(result: &InvocationResult) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        r#"<div class="card result"><p class="muted"><strong>{}/{}</strong> · {} · {} ms</p>"#,
        escape(&result.server_name),
        escape(&result.tool_name),
        result.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        result.elapsed.as_millis()
    );

    match &result.outcome {
        Outcome::Success { output } => {
            if output.content.is_empty() && output.structured.is_none() {
                out.push_str(r#"<p class="muted">The tool returned no content.</p>"#);
            }
            for block in &output.content {
                out.push_str(&content_block(block));
            }
            if let Some(structured) = &output.structured {
                out.push_str("<h4>Structured content</h4>");
                out.push_str(&json_view(structured));
            }
        }
        Outcome::Error { kind, message } => {
            let _ = write!(
                out,
                r#"<div class="notice error"><strong>{}</strong>: {}</div>"#,
                kind.replace('_', " "),
                escape(message)
            );
        }
    }

    let _ = write!(
        out,
        "<details><summary>Arguments</summary><pre>{}</pre></details></div>",
        escape(&pretty(&result.arguments))
    );
    out
}

fn content_block(block: &ContentBlock) -> String {
    match block {
        ContentBlock::Text { text } => format!(r#"<pre class="text">{}</pre>"#, escape(text)),
        ContentBlock::Json { value } => json_view(value),
        ContentBlock::Image { mime_type, data } => format!(
            r#"<img alt="tool output" src="data:{};base64,{}">"#,
            escape(mime_type),
            escape(data)
        ),
        ContentBlock::Resource { uri, text } => {
            let body = text
                .as_deref()
                .map(|t| format!("<pre>{}</pre>", escape(t)))
                .unwrap_or_default();
            format!(r#"<p>Resource <code>{}</code></p>{body}"#, escape(uri))
        }
        ContentBlock::Other { raw } => format!("<pre>{}</pre>", escape(&pretty(raw))),
    }
}

/// Lists of flat objects render as a table, anything else as indented JSON.
fn json_view(value: &Value) -> String {
    table(value).unwrap_or_else(|| format!(r#"<pre class="json">{}</pre>"#, escape(&pretty(value))))
}

fn table(value: &Value) -> Option<String> {
    let rows = value.as_array().filter(|rows| !rows.is_empty())?;
    let mut columns: Vec<&str> = Vec::new();
    for row in rows {
        for (key, cell) in row.as_object()? {
            if cell.is_object() || cell.is_array() {
                return None;
            }
            if !columns.contains(&key.as_str()) {
                columns.push(key);
            }
        }
    }

    let head: String = columns.iter().map(|c| format!("<th>{}</th>", escape(c))).collect();
    let body: String = rows
        .iter()
        .filter_map(Value::as_object)
        .map(|row| {
            let cells: String = columns
                .iter()
                .map(|c| {
                    let cell = row.get(*c).map(choice_label).unwrap_or_default();
                    format!("<td>{}</td>", escape(&cell))
                })
                .collect();
            format!("<tr>{cells}</tr>")
        })
        .collect();
    Some(format!("<table><thead><tr>{head}</tr></thead><tbody>{body}</tbody></table>"))
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Most recent first.
#[must_use]
pub fn history_list(history: &[InvocationResult]) -> String {
    if history.is_empty() {
        return r#"<p class="muted">No runs yet.</p>"#.to_string();
    }
    history.iter().map(result_card).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flat_object_lists_become_tables() {
        let html = json_view(&json!([{ "name": "a", "n": 1 }, { "name": "b", "extra": null }]));
        assert!(html.starts_with("<table>"));
        assert!(html.contains("<th>name</th><th>n</th><th>extra</th>"));
        assert!(html.contains("<td>b</td><td></td><td>null</td>"));
    }

    #[test]
    fn nested_json_is_pretty_printed() {
        let html = json_view(&json!({ "a": { "b": "<x>" } }));
        assert!(html.starts_with(r#"<pre class="json">"#));
        assert!(html.contains("&lt;x&gt;"));
    }
}
