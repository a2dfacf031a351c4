//! Shared HTML vocabulary: escaping, void elements, and the hydration
//! marker attribute. Both renderers speak exactly this dialect, which is
//! what keeps server output and client expectations addressably identical.

/// Attribute carrying a node's hierarchical address in server output.
///
/// Dot-separated positional path (`"0"`, `"0.1"`, `"0.1.0"`), stamped on
/// every primitive element by the string renderer and stripped by the
/// client on a successful hydration claim.
pub const HYDRATION_ATTR: &str = "data-rill";

/// Elements that cannot have children and render self-closed.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Whether `tag` is a void element (`<img />`, `<br />`, ...).
#[must_use]
pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Escape text for a markup context, appending to `out`.
///
/// Exactly five entities: `&` `<` `>` `"` `'`. The same escaping is used
/// for text nodes and attribute values, so renderer output is safe against
/// markup injection from either position.
pub fn escape_into(out: &mut String, input: &str) {
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            other => out.push(other),
        }
    }
}

/// Escape text for a markup context.
#[must_use]
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    escape_into(&mut out, input);
    out
}

/// Decode the five entities produced by [`escape_into`], plus decimal and
/// hexadecimal numeric references. Unknown entities pass through verbatim.
#[must_use]
pub fn unescape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        // An entity name is short and alphanumeric; anything else after
        // the '&' means it was a bare ampersand. Byte-wise search keeps the
        // window clear of char boundaries.
        let candidate = rest
            .bytes()
            .take(12)
            .position(|b| b == b';')
            .map(|semi| &rest[1..semi]);
        let Some(entity) = candidate.filter(|entity| {
            entity
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '#')
        }) else {
            out.push('&');
            rest = &rest[1..];
            continue;
        };
        match decode_entity(entity) {
            Some(ch) => out.push(ch),
            None => out.push_str(&rest[..entity.len() + 2]),
        }
        rest = &rest[entity.len() + 2..];
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let num = entity.strip_prefix('#')?;
            let code = if let Some(hex) = num.strip_prefix(['x', 'X']) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                num.parse::<u32>().ok()?
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_all_five_entities() {
        assert_eq!(
            escape_html(r#"<a href="x" title='y'> & </a>"#),
            "&lt;a href=&quot;x&quot; title=&#039;y&#039;&gt; &amp; &lt;/a&gt;"
        );
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(escape_html("plain text 123"), "plain text 123");
    }

    #[test]
    fn script_tag_cannot_escape_text_position() {
        let escaped = escape_html("<script>alert(1)</script>");
        assert!(!escaped.contains('<'));
        assert_eq!(escaped, "&lt;script&gt;alert(1)&lt;/script&gt;");
    }

    #[test]
    fn unescape_reverses_escape() {
        let original = r#"<a href="x" title='y'> & </a>"#;
        assert_eq!(unescape_html(&escape_html(original)), original);
    }

    #[test]
    fn unescape_handles_numeric_references() {
        assert_eq!(unescape_html("&#65;&#x42;&#039;"), "AB'");
    }

    #[test]
    fn unescape_leaves_unknown_entities_alone() {
        assert_eq!(unescape_html("a &unknown; b &"), "a &unknown; b &");
    }

    #[test]
    fn unescape_treats_distant_semicolon_as_bare_ampersand() {
        assert_eq!(unescape_html("tom & jerry; the end"), "tom & jerry; the end");
        assert_eq!(unescape_html("a & b &amp; c"), "a & b & c");
    }

    #[test]
    fn unescape_survives_multibyte_text_after_an_ampersand() {
        assert_eq!(unescape_html("&aaaaaaaaaa€"), "&aaaaaaaaaa€");
        assert_eq!(unescape_html("caf&eacute;… &amp; más"), "caf&eacute;… & más");
    }

    #[test]
    fn void_elements_match_the_html_list() {
        assert!(is_void_element("img"));
        assert!(is_void_element("br"));
        assert!(is_void_element("input"));
        assert!(!is_void_element("div"));
        assert!(!is_void_element("span"));
    }
}
