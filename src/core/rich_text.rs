//! Rich text → inline Markdown.
//!
//! Rendering is a pure function of the segments. Code styling is applied
//! first, then bold, italic, strikethrough and underline, and finally the
//! hyperlink wraps everything.

use crate::domain::RichText;

/// Render a run of segments, concatenated in order
pub fn render_rich_text(segments: &[RichText]) -> String {
    segments.iter().map(render_segment).collect()
}

/// Render one segment
pub fn render_segment(segment: &RichText) -> String {
    if let Some(expression) = &segment.equation {
        return wrap_link(format!("${}$", expression.trim()), segment.href.as_deref());
    }

    let text = &segment.plain_text;
    if text.is_empty() {
        return String::new();
    }

    // Markdown emphasis cannot open or close on whitespace; keep it outside
    let (lead, core, trail) = split_whitespace_edges(text);
    if core.is_empty() {
        return text.clone();
    }

    let a = segment.annotations;
    let mut out = if a.code {
        code_span(core)
    } else {
        core.to_string()
    };

    if a.bold {
        out = format!("**{}**", out);
    }
    if a.italic {
        out = format!("_{}_", out);
    }
    if a.strikethrough {
        out = format!("~~{}~~", out);
    }
    if a.underline {
        out = format!("<u>{}</u>", out);
    }

    let out = wrap_link(out, segment.href.as_deref());
    format!("{}{}{}", lead, out, trail)
}

/// Wrap text in an inline code span, widening the fence past any backtick run
fn code_span(text: &str) -> String {
    let longest_run = text
        .split(|c: char| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest_run + 1);

    if text.starts_with('`') || text.ends_with('`') {
        format!("{} {} {}", fence, text, fence)
    } else {
        format!("{}{}{}", fence, text, fence)
    }
}

fn wrap_link(text: String, href: Option<&str>) -> String {
    match href.map(str::trim).filter(|h| !h.is_empty()) {
        Some(href) => format!("[{}]({})", text, href),
        None => text,
    }
}

fn split_whitespace_edges(text: &str) -> (&str, &str, &str) {
    let start = text.len() - text.trim_start().len();
    let end = text.trim_end().len();
    if start >= end {
        return (text, "", "");
    }
    (&text[..start], &text[start..end], &text[end..])
}
