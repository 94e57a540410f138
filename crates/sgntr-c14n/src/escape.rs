#![forbid(unsafe_code)]

//! Character escaping for canonical output.
//!
//! Text nodes escape `&`, `<`, `>` and CR. Attribute values escape `&`,
//! `<`, `"` and the whitespace characters TAB, LF, CR. PI data only
//! escapes CR.

/// Where an escaped string ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Text,
    Attr,
}

fn escape_into(out: &mut Vec<u8>, s: &str, ctx: Context) {
    for ch in s.chars() {
        let replacement = match (ch, ctx) {
            ('&', _) => "&amp;",
            ('<', _) => "&lt;",
            ('>', Context::Text) => "&gt;",
            ('"', Context::Attr) => "&quot;",
            ('\t', Context::Attr) => "&#x9;",
            ('\n', Context::Attr) => "&#xA;",
            ('\r', _) => "&#xD;",
            _ => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                continue;
            }
        };
        out.extend_from_slice(replacement.as_bytes());
    }
}

/// Append text node content, escaped.
pub fn write_text(out: &mut Vec<u8>, s: &str) {
    escape_into(out, s, Context::Text);
}

/// Append an attribute value, escaped.
pub fn write_attr_value(out: &mut Vec<u8>, s: &str) {
    escape_into(out, s, Context::Attr);
}

/// Append processing instruction data, escaped.
pub fn write_pi_data(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(s.replace('\r', "&#xD;").as_bytes());
}
