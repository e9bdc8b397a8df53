//! Markup stripping for descriptions and metafield values.

/// Elements whose text content is never visible.
const HIDDEN_ELEMENTS: [&str; 2] = ["script", "style"];

/// Strip HTML tags from a string, decode common entities, and normalize
/// whitespace.
///
/// Tags are replaced by a space so adjacent block elements do not run
/// together (`<p>a</p><p>b</p>` becomes `a b`). `<script>` and `<style>`
/// bodies are dropped. A `<` not followed by a letter, `/`, `!` or `?` is
/// plain text (`ages <3`, `wrists < 18cm`) and is kept.
#[must_use]
pub fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];
        if !opens_tag(after_open) {
            out.push('<');
            rest = after_open;
            continue;
        }
        let Some(close) = after_open.find('>') else {
            // Unterminated tag: treat the remainder as markup.
            rest = "";
            break;
        };
        let tag = &after_open[..close];
        rest = &after_open[close + 1..];
        out.push(' ');

        if let Some(hidden) = hidden_element(tag) {
            rest = skip_past_closing_tag(rest, hidden);
        }
    }
    out.push_str(rest);

    decode_entities(&out)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn opens_tag(after_open: &str) -> bool {
    after_open
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?'))
}

fn hidden_element(tag: &str) -> Option<&'static str> {
    let name: String = tag
        .trim_start()
        .chars()
        .take_while(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_ascii_lowercase();
    HIDDEN_ELEMENTS.into_iter().find(|h| *h == name)
}

fn skip_past_closing_tag<'a>(rest: &'a str, element: &str) -> &'a str {
    let closing = format!("</{element}");
    let lower = rest.to_ascii_lowercase();
    match lower.find(&closing) {
        Some(pos) => match rest[pos..].find('>') {
            Some(end) => &rest[pos + end + 1..],
            None => "",
        },
        None => "",
    }
}

/// Decodes named entities commonly emitted by rich-text editors plus decimal
/// and hex character references. Unknown entities are left untouched.
fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp + 1..];
        let decoded = candidate
            .find(';')
            .filter(|&semi| semi > 0 && semi <= 10)
            .and_then(|semi| decode_entity(&candidate[..semi]).map(|c| (c, semi)));

        match decoded {
            Some((ch, semi)) => {
                out.push(ch);
                rest = &candidate[semi + 1..];
            }
            None => {
                out.push('&');
                rest = candidate;
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        "ndash" => Some('\u{2013}'),
        "mdash" => Some('\u{2014}'),
        "rsquo" => Some('\u{2019}'),
        "lsquo" => Some('\u{2018}'),
        "hellip" => Some('\u{2026}'),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_collapses_whitespace() {
        assert_eq!(
            strip_html("<p>Soft  cotton</p>\n<ul><li>Machine wash</li></ul>"),
            "Soft cotton Machine wash"
        );
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(strip_html("Already plain"), "Already plain");
    }

    #[test]
    fn inline_tags_do_not_glue_words() {
        assert_eq!(strip_html("Made in<br/>Portugal"), "Made in Portugal");
    }

    #[test]
    fn decodes_entities() {
        assert_eq!(
            strip_html("Salt &amp; Pepper &lt;3 &#8482; &#x2764;"),
            "Salt & Pepper <3 \u{2122} \u{2764}"
        );
    }

    #[test]
    fn unknown_entity_is_left_alone() {
        assert_eq!(strip_html("R&D &bogus; dept"), "R&D &bogus; dept");
    }

    #[test]
    fn drops_script_and_style_bodies() {
        assert_eq!(
            strip_html("<style>p{color:red}</style>Hello<script>var x = 1;</script> world"),
            "Hello world"
        );
    }

    #[test]
    fn less_than_in_plain_text_is_kept() {
        assert_eq!(
            strip_html("Suitable for ages <3 and up. Soft cotton."),
            "Suitable for ages <3 and up. Soft cotton."
        );
        assert_eq!(
            strip_html("Fits wrists < 18cm. Strap width > 2cm, adjustable"),
            "Fits wrists < 18cm. Strap width > 2cm, adjustable"
        );
    }

    #[test]
    fn comments_and_closing_tags_still_strip() {
        assert_eq!(strip_html("a<!-- note -->b</p>c"), "a b c");
        assert_eq!(strip_html("1 <2 <b>bold</b>"), "1 <2 bold");
    }

    #[test]
    fn unterminated_tag_is_dropped() {
        assert_eq!(strip_html("Visible <span class="), "Visible");
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert_eq!(strip_html(""), "");
        assert_eq!(strip_html("<p> </p>"), "");
    }
}
