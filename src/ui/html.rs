//! HTML building blocks: escaping, the page shell and small fragments.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::dashboard::ServerStatus;
use crate::theme::Theme;

/// Escape text for element content and quoted attribute values.
#[must_use]
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Everything but RFC 3986 unreserved characters.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// Absolute path from raw segments, each percent-encoded.
#[must_use]
pub fn path(segments: &[&str]) -> String {
    segments
        .iter()
        .map(|segment| format!("/{}", utf8_percent_encode(segment, PATH_SEGMENT)))
        .collect()
}

/// Navigation entries: (href, label).
const NAV: [(&str, &str); 5] = [
    ("/", "Dashboard"),
    ("/servers", "Servers"),
    ("/settings", "Settings"),
    ("/share", "Share URL"),
    ("/about", "About"),
];

/// Full page around `content`.
#[must_use]
pub fn shell(title: &str, active: &str, theme: &Theme, content: &str) -> String {
    let nav: String = NAV
        .iter()
        .map(|(href, label)| {
            let class = if *href == active { " class=\"active\"" } else { "" };
            format!(r#"<a href="{href}"{class}>{label}</a>"#)
        })
        .collect();
    let title = escape(title);
    let vars = theme.css_variables();
    let mode = theme.mode;

    format!(
        r#"<!DOCTYPE html>
<html lang="en" data-theme="{mode}">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="description" content="Dashboard for Model Context Protocol servers">
    <title>{title} - MCP Dashboard</title>
    <style>{vars}
{STYLES}</style>
</head>
<body>
    <header class="topbar">
        <a href="/" class="brand">MCP Dashboard</a>
        <nav>{nav}</nav>
    </header>
    <main>
        {content}
    </main>
    <div id="busy" class="busy" hidden><div class="spinner"></div><span>Waiting for the server…</span></div>
    <script>{BUSY_SCRIPT}</script>
</body>
</html>"#
    )
}

/// Forms marked `data-busy` show the indicator while the request is pending.
const BUSY_SCRIPT: &str = r"
document.addEventListener('submit', function (e) {
    if (e.target.matches('form[data-busy]') && !(e.submitter && e.submitter.name === '__op')) {
        document.getElementById('busy').hidden = false;
    }
});
window.addEventListener('pageshow', function () { document.getElementById('busy').hidden = true; });
";

const STYLES: &str = r"
* { box-sizing: border-box; }
body { margin: 0; font-family: system-ui, -apple-system, 'Segoe UI', sans-serif; background: var(--bg); color: var(--text); }
a { color: var(--button); }
.topbar { display: flex; align-items: center; justify-content: space-between; padding: 0.75rem 1.5rem; background: var(--surface); border-bottom: 1px solid var(--border); }
.topbar .brand { font-weight: 600; color: var(--text); text-decoration: none; }
.topbar nav a { margin-left: 1rem; color: var(--muted); text-decoration: none; }
.topbar nav a.active, .topbar nav a:hover { color: var(--text); }
main { max-width: 72rem; margin: 0 auto; padding: 1.5rem; }
.layout { display: grid; grid-template-columns: 18rem 1fr; gap: 1.5rem; }
.card { background: var(--surface); border: 1px solid var(--border); border-radius: 0.75rem; padding: 1rem 1.25rem; margin-bottom: 1rem; }
.muted { color: var(--muted); }
button, .button { background: var(--button); color: #fff; border: 0; border-radius: 0.5rem; padding: 0.5rem 1rem; cursor: pointer; font: inherit; text-decoration: none; display: inline-block; }
button:hover, .button:hover { background: var(--button-hover); }
button.secondary { background: transparent; color: var(--text); border: 1px solid var(--border); }
button.link { background: none; color: var(--button); padding: 0; }
input[type=text], input[type=number], textarea, select { width: 100%; padding: 0.45rem 0.6rem; border: 1px solid var(--border); border-radius: 0.4rem; background: var(--bg); color: var(--text); font: inherit; }
textarea { min-height: 6rem; font-family: ui-monospace, monospace; }
label { display: block; font-weight: 500; margin: 0.75rem 0 0.25rem; }
fieldset { border: 1px solid var(--border); border-radius: 0.5rem; margin: 0.75rem 0; }
.field.invalid input, .field.invalid textarea, .field.invalid select { border-color: #d1242f; }
.field-error { color: #d1242f; font-size: 0.85rem; }
.help { color: var(--muted); font-size: 0.85rem; margin: 0.15rem 0; }
.notice { border-radius: 0.5rem; padding: 0.6rem 0.9rem; margin-bottom: 0.75rem; }
.notice.error { background: #ffebe9; color: #82071e; }
.notice.warning { background: #fff8c5; color: #4d2d00; }
.notice.info { background: #ddf4ff; color: #0a3069; }
.badge { font-size: 0.75rem; padding: 0.1rem 0.5rem; border-radius: 1rem; border: 1px solid var(--border); }
.badge.ready { border-color: var(--button); color: var(--button); }
.badge.busy { border-color: #bf8700; color: #bf8700; }
table { width: 100%; border-collapse: collapse; }
th, td { text-align: left; padding: 0.35rem 0.5rem; border-bottom: 1px solid var(--border); vertical-align: top; }
pre { background: var(--bg); border: 1px solid var(--border); border-radius: 0.4rem; padding: 0.75rem; overflow-x: auto; }
.tool-list a { display: block; padding: 0.3rem 0.4rem; border-radius: 0.3rem; text-decoration: none; color: var(--text); }
.tool-list a.selected { background: var(--bg); font-weight: 600; }
.inline { display: inline; }
.busy { position: fixed; inset: 0; background: rgba(0,0,0,0.25); display: flex; align-items: center; justify-content: center; gap: 0.75rem; color: #fff; }
.busy[hidden] { display: none; }
.spinner { width: 2rem; height: 2rem; border: 3px solid rgba(255,255,255,0.4); border-top-color: #fff; border-radius: 50%; animation: spin 0.8s linear infinite; }
@keyframes spin { to { transform: rotate(360deg); } }
";

/// Inline message box; `kind` is `error`, `warning` or `info`.
#[must_use]
pub fn notice(kind: &str, message: &str) -> String {
    format!(r#"<div class="notice {kind}">{}</div>"#, escape(message))
}

#[must_use]
pub fn status_badge(status: ServerStatus) -> String {
    let class = match status {
        ServerStatus::Ready => "ready",
        s if s.is_busy() => "busy",
        _ => "",
    };
    format!(r#"<span class="badge {class}">{status}</span>"#)
}

/// A button posting to `action`, optionally with the busy indicator.
#[must_use]
pub fn post_button(action: &str, label: &str, class: &str, busy: bool) -> String {
    let busy = if busy { " data-busy" } else { "" };
    format!(
        r#"<form method="post" action="{}" class="inline"{busy}><button type="submit" class="{class}">{}</button></form>"#,
        escape(action),
        escape(label)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn path_segments_are_encoded() {
        assert_eq!(path(&["tools", "my server", "a/b"]), "/tools/my%20server/a%2Fb");
        assert_eq!(path(&["tools", "docs", "search_v2"]), "/tools/docs/search_v2");
        assert_eq!(path(&["tools", "café", "a~b.c"]), "/tools/caf%C3%A9/a~b.c");
        assert_eq!(path(&["tools", "50%", "q?x#y"]), "/tools/50%25/q%3Fx%23y");
    }

    #[test]
    fn shell_marks_active_page() {
        let html = shell("Servers", "/servers", &Theme::default(), "<p>x</p>");
        assert!(html.contains(r#"<a href="/servers" class="active">Servers</a>"#));
        assert!(html.contains("--button: #4caf50"));
        assert!(html.contains("<p>x</p>"));
    }
}
