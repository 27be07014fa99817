// HTML Tokenizer
// Turns the markup exchanged with the embedder into a flat token stream.
// Only the subset produced by rich text surfaces is understood; anything
// else degrades to text or is skipped.

use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq)]
pub enum HtmlToken {
    StartTag {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    EndTag {
        name: String,
    },
    Text(String),
}

impl HtmlToken {
    /// Look up an attribute of a start tag
    pub fn attr(&self, key: &str) -> Option<&str> {
        match self {
            HtmlToken::StartTag { attrs, .. } => attrs
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }

    /// Whether the start tag carries `class` among its class names
    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }
}

/// Tokenize markup. Tag and attribute names are lowercased, entities are
/// decoded in text and attribute values, comments and doctypes are dropped.
pub fn parse_html(input: &str) -> Vec<HtmlToken> {
    let mut tokens = Vec::new();
    let bytes = input.as_bytes();
    let mut i = 0;
    let mut text_start = 0;

    while i < bytes.len() {
        if bytes[i] != b'<' {
            i += 1;
            continue;
        }

        let rest = &input[i..];
        let consumed = if rest.starts_with("<!--") {
            Some(rest.find("-->").map(|end| end + 3).unwrap_or(rest.len()))
        } else if rest.starts_with("<!") || rest.starts_with("<?") {
            Some(rest.find('>').map(|end| end + 1).unwrap_or(rest.len()))
        } else if let Some(tail) = rest.strip_prefix("</") {
            if tail.starts_with(|c: char| c.is_ascii_alphabetic()) {
                let name_len = tag_name_len(tail);
                let end = rest.find('>').map(|end| end + 1).unwrap_or(rest.len());
                flush_text(&mut tokens, &input[text_start..i]);
                tokens.push(HtmlToken::EndTag {
                    name: tail[..name_len].to_ascii_lowercase(),
                });
                text_start = i + end;
                i += end;
                continue;
            }
            None
        } else if rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
            let (token, len) = parse_start_tag(rest);
            flush_text(&mut tokens, &input[text_start..i]);
            tokens.push(token);
            text_start = i + len;
            i += len;
            continue;
        } else {
            None
        };

        match consumed {
            Some(len) => {
                flush_text(&mut tokens, &input[text_start..i]);
                i += len;
                text_start = i;
            }
            // A stray '<' is literal text
            None => i += 1,
        }
    }

    flush_text(&mut tokens, &input[text_start..]);
    tokens
}

fn flush_text(tokens: &mut Vec<HtmlToken>, raw: &str) {
    if raw.is_empty() {
        return;
    }
    let text = decode_entities(raw).into_owned();
    // Adjacent text tokens can appear around dropped comments
    if let Some(HtmlToken::Text(prev)) = tokens.last_mut() {
        prev.push_str(&text);
    } else {
        tokens.push(HtmlToken::Text(text));
    }
}

fn tag_name_len(s: &str) -> usize {
    s.find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
        .unwrap_or(s.len())
}

/// Parse `<name attr=value ...>` at the start of `s`; returns the token and
/// the number of bytes consumed.
fn parse_start_tag(s: &str) -> (HtmlToken, usize) {
    let name_len = tag_name_len(&s[1..]);
    let name = s[1..1 + name_len].to_ascii_lowercase();
    let mut attrs = Vec::new();
    let mut self_closing = false;
    let mut i = 1 + name_len;

    loop {
        let rest = &s[i..];
        let trimmed = rest.trim_start();
        i += rest.len() - trimmed.len();

        if trimmed.is_empty() {
            break;
        }
        if trimmed.starts_with('>') {
            i += 1;
            break;
        }
        if trimmed.starts_with("/>") {
            self_closing = true;
            i += 2;
            break;
        }
        if trimmed.starts_with('/') {
            i += 1;
            continue;
        }

        let key_len = trimmed
            .find(|c: char| c.is_whitespace() || c == '=' || c == '>' || c == '/')
            .unwrap_or(trimmed.len())
            .max(1);
        let key = trimmed[..key_len].to_ascii_lowercase();
        i += key_len;

        let after_key = &s[i..];
        let after_ws = after_key.trim_start();
        if let Some(value_part) = after_ws.strip_prefix('=') {
            let value_trimmed = value_part.trim_start();
            i += after_key.len() - value_trimmed.len();
            let (value, len) = match value_trimmed.chars().next() {
                Some(quote @ ('"' | '\'')) => {
                    let body = &value_trimmed[1..];
                    match body.find(quote) {
                        Some(end) => (&body[..end], end + 2),
                        None => (body, value_trimmed.len()),
                    }
                }
                _ => {
                    let end = value_trimmed
                        .find(|c: char| c.is_whitespace() || c == '>')
                        .unwrap_or(value_trimmed.len());
                    (&value_trimmed[..end], end)
                }
            };
            attrs.push((key, decode_entities(value).into_owned()));
            i += len;
        } else {
            attrs.push((key, String::new()));
        }
    }

    (
        HtmlToken::StartTag {
            name,
            attrs,
            self_closing,
        },
        i.min(s.len()),
    )
}

/// Decode character references. Unknown references stay literal.
pub fn decode_entities(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp..];
        match candidate.find(';').filter(|end| *end <= 10) {
            Some(end) => match decode_reference(&candidate[1..end]) {
                Some(ch) => {
                    out.push(ch);
                    rest = &candidate[end + 1..];
                }
                None => {
                    out.push('&');
                    rest = &candidate[1..];
                }
            },
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn decode_reference(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{00A0}'),
        _ => {
            let number = name.strip_prefix('#')?;
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Escape text content
pub fn escape_text(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    Cow::Owned(out)
}

/// Escape an attribute value (always written double-quoted)
pub fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}
