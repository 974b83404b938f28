//! Turns generated report text into an HTML fragment.
//!
//! Single pass only: feeding already formatted markup back in escapes it.

use serde_json::Value;

const FALLBACK_NOTICE: &str =
    "Generated in fallback mode: the report workflow was unavailable.";

/// Blank lines separate blocks, `#`..`######` lines become headings, `**x**`
/// becomes `<strong>`, and remaining line breaks inside a block become `<br>`.
/// All text is HTML-escaped before markers are substituted.
#[tracing::instrument(
    name = "pipeline_stage format",
    skip(text),
    fields(pipeline.stage = "format", format.input_len = text.len(), format.blocks)
)]
pub fn format_report(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n");

    let mut blocks = Vec::new();
    for paragraph in split_paragraphs(&normalized) {
        render_paragraph(&paragraph, &mut blocks);
    }

    tracing::Span::current().record("format.blocks", blocks.len());

    blocks.join("\n")
}

/// Wraps fallback-generated markup so the caller can tell it apart from a
/// workflow-produced report.
pub fn wrap_fallback(markup: &str) -> String {
    format!(
        "<div class=\"report report-fallback\" data-mode=\"fallback\">\n\
         <p class=\"report-notice\">{FALLBACK_NOTICE}</p>\n\
         {markup}\n\
         </div>"
    )
}

/// Diagnostic rendering for a JSON payload that has no `html` field.
pub fn render_json(value: &Value) -> serde_json::Result<String> {
    let pretty = serde_json::to_string_pretty(value)?;
    Ok(format!(
        "<pre class=\"report-json\">{}</pre>",
        escape_html(&pretty)
    ))
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn split_paragraphs(text: &str) -> Vec<Vec<&str>> {
    let mut paragraphs = Vec::new();
    let mut current = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line.trim());
        }
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }

    paragraphs
}

fn render_paragraph(lines: &[&str], blocks: &mut Vec<String>) {
    let mut pending: Vec<String> = Vec::new();

    for line in lines {
        match heading(line) {
            Some((level, title)) => {
                flush_paragraph(&mut pending, blocks);
                blocks.push(format!("<h{level}>{}</h{level}>", render_inline(title)));
            }
            None => pending.push(render_inline(line)),
        }
    }

    flush_paragraph(&mut pending, blocks);
}

fn flush_paragraph(pending: &mut Vec<String>, blocks: &mut Vec<String>) {
    if pending.is_empty() {
        return;
    }
    blocks.push(format!("<p>{}</p>", pending.join("<br>")));
    pending.clear();
}

fn heading(line: &str) -> Option<(usize, &str)> {
    let level = line.chars().take_while(|&c| c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &line[level..];
    if !rest.starts_with(' ') {
        return None;
    }
    let title = rest.trim();
    if title.is_empty() {
        None
    } else {
        Some((level, title))
    }
}

fn render_inline(line: &str) -> String {
    let escaped = escape_html(line);
    let parts: Vec<&str> = escaped.split("**").collect();
    let markers = parts.len() - 1;
    // An unmatched trailing marker stays literal.
    let paired = markers - markers % 2;

    let mut out = String::with_capacity(escaped.len() + 16);
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            let marker = i - 1;
            if marker >= paired {
                out.push_str("**");
            } else if marker % 2 == 0 {
                out.push_str("<strong>");
            } else {
                out.push_str("</strong>");
            }
        }
        out.push_str(part);
    }
    out
}
