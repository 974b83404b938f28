use serde_json::Value;

/// Shape of a webhook response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifiedPayload {
    Html(String),
    JsonWithHtml(String),
    JsonGeneric(Value),
    PlainText(String),
    /// Body was not valid UTF-8; carries a lossy decoding.
    Unparseable(String),
}

impl ClassifiedPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifiedPayload::Html(_) => "html",
            ClassifiedPayload::JsonWithHtml(_) => "json_with_html",
            ClassifiedPayload::JsonGeneric(_) => "json_generic",
            ClassifiedPayload::PlainText(_) => "plain_text",
            ClassifiedPayload::Unparseable(_) => "unparseable",
        }
    }
}

/// Rules, first match wins:
///
/// 1. body starts with `<!doctype html` or `<html` (case-insensitive) → `Html`
/// 2. body parses as JSON: object with a string `html` field → `JsonWithHtml`,
///    anything else → `JsonGeneric`
/// 3. otherwise `PlainText`, unless the declared content type is `text/html`,
///    in which case the body is an HTML fragment → `Html`
///
/// HTML is returned verbatim, without trimming.
pub fn classify(body: &[u8], content_type: Option<&str>) -> ClassifiedPayload {
    let text = match std::str::from_utf8(body) {
        Ok(text) => text,
        Err(_) => return ClassifiedPayload::Unparseable(String::from_utf8_lossy(body).into_owned()),
    };

    if looks_like_html_document(text) {
        return ClassifiedPayload::Html(text.to_string());
    }

    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return match value.get("html").and_then(Value::as_str) {
            Some(markup) => ClassifiedPayload::JsonWithHtml(markup.to_string()),
            None => ClassifiedPayload::JsonGeneric(value),
        };
    }

    if declares_html(content_type) {
        ClassifiedPayload::Html(text.to_string())
    } else {
        ClassifiedPayload::PlainText(text.to_string())
    }
}

fn looks_like_html_document(text: &str) -> bool {
    let head = text.trim_start().trim_start_matches('\u{feff}');
    starts_with_ignore_case(head, "<!doctype html") || starts_with_tag(head, "html")
}

fn starts_with_tag(text: &str, tag: &str) -> bool {
    let Some(rest) = text.strip_prefix('<') else {
        return false;
    };
    if !starts_with_ignore_case(rest, tag) {
        return false;
    }
    // `<html>`, `<html lang=..>` but not `<htmlish>`
    matches!(
        rest[tag.len()..].chars().next(),
        Some(c) if c == '>' || c == '/' || c.is_ascii_whitespace()
    )
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.len() >= prefix.len()
        && text.is_char_boundary(prefix.len())
        && text[..prefix.len()].eq_ignore_ascii_case(prefix)
}

fn declares_html(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("text/html"))
}
