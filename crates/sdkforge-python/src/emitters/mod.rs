pub mod api;
pub mod client;
pub mod models;
pub mod package;

use minijinja::Environment;

/// Template environment shared by every emitter.
pub(crate) fn environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_keep_trailing_newline(true);
    env
}

/// Escape sequences that would end a docstring early or form escapes.
fn escape_docstring(value: &str) -> String {
    value.replace('\\', "\\\\").replace("\"\"\"", "\\\"\\\"\\\"")
}

/// A complete docstring literal whose continuation lines are indented by
/// `indent` spaces. `None` when there is nothing to say.
pub(crate) fn docstring(paragraphs: &[Option<&str>], indent: usize) -> Option<String> {
    let text: Vec<String> = paragraphs
        .iter()
        .flatten()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(escape_docstring)
        .collect();
    if text.is_empty() {
        return None;
    }
    let pad = " ".repeat(indent);
    let body = text.join("\n\n");
    let mut lines = body.lines();
    let mut out = format!("\"\"\"{}", lines.next().unwrap_or_default());
    let mut multiline = false;
    for line in lines {
        multiline = true;
        out.push('\n');
        if !line.trim().is_empty() {
            out.push_str(&pad);
            out.push_str(line);
        }
    }
    if multiline {
        out.push('\n');
        out.push_str(&pad);
    }
    // A trailing quote would merge with the closing delimiter.
    if out.ends_with('"') {
        out.push(' ');
    }
    out.push_str("\"\"\"");
    Some(out)
}
