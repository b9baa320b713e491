use crate::document::{Document, NodeId, NodeKind};
use crate::ns;

const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

fn is_raw_text(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

/// Lenient hand-rolled markup parser appending into `parent`:
/// - nested elements, void elements and self-closing tags (`<input/>`)
/// - quoted, unquoted and bare (boolean) attributes, names kept verbatim
///   including any `prefix:`
/// - comments and doctype/processing instructions are dropped
/// - `<svg>` and `<math>` switch the namespace of their subtree
pub(crate) fn parse_into(doc: &mut Document, parent: NodeId, input: &str) {
    let bytes = input.as_bytes();
    let mut i = 0usize;
    // Open elements; the base is never popped.
    let mut stack: Vec<NodeId> = vec![parent];

    while i < bytes.len() {
        let current = stack.last().copied().unwrap_or(parent);
        let rest = &bytes[i..];

        if rest.starts_with(b"<!--") {
            i = find(bytes, i + 4, b"-->").map_or(bytes.len(), |end| end + 3);
            continue;
        }
        if rest.starts_with(b"<!") || rest.starts_with(b"<?") {
            i = find(bytes, i, b">").map_or(bytes.len(), |end| end + 1);
            continue;
        }

        if rest.starts_with(b"</") {
            i += 2;
            let tag = read_name(input, &mut i);
            i = find(bytes, i, b">").map_or(bytes.len(), |end| end + 1);
            // pop until matching tag
            let open = stack
                .iter()
                .skip(1)
                .rposition(|&n| doc.tag_name(n).is_some_and(|t| t.eq_ignore_ascii_case(&tag)));
            match open {
                Some(pos) => stack.truncate(pos + 1),
                None => tracing::trace!(tag, "dropping unmatched closing tag"),
            }
            continue;
        }

        if bytes[i] == b'<' && bytes.get(i + 1).is_some_and(u8::is_ascii_alphabetic) {
            i += 1;
            let tag = read_name(input, &mut i);
            let mut attrs: Vec<(String, String)> = Vec::new();
            let mut self_closing = false;

            loop {
                skip_ws(bytes, &mut i);
                if i >= bytes.len() {
                    break;
                }
                match bytes[i] {
                    b'/' => {
                        // possible "/>"
                        self_closing = true;
                        i += 1;
                        skip_ws(bytes, &mut i);
                        if i < bytes.len() && bytes[i] == b'>' {
                            i += 1;
                            break;
                        }
                    }
                    b'>' => {
                        i += 1;
                        break;
                    }
                    _ => match read_attribute(input, &mut i) {
                        Some((name, value)) => {
                            if !attrs.iter().any(|(k, _)| *k == name) {
                                attrs.push((name, value));
                            }
                        }
                        // skip unknown token
                        None => i += 1,
                    },
                }
            }

            let namespace = element_namespace(doc, current, &tag);
            let el = doc.create_element_ns(namespace.as_deref(), &tag);
            for (name, value) in &attrs {
                doc.set_attribute(el, name, value);
            }
            doc.append_child(current, el);

            if self_closing || (namespace.is_none() && is_void(&tag)) {
                continue;
            }
            if namespace.is_none() && is_raw_text(&tag) {
                let end = find_closing(bytes, i, &tag).unwrap_or(bytes.len());
                if end > i {
                    let t = doc.create_text(&input[i..end]);
                    doc.append_child(el, t);
                }
                i = find(bytes, end, b">").map_or(bytes.len(), |close| close + 1);
                continue;
            }
            stack.push(el);
            continue;
        }

        // text until the next '<'
        let start = i;
        i += 1;
        while i < bytes.len() && bytes[i] != b'<' {
            i += 1;
        }
        let t = doc.create_text(&decode_entities(&input[start..i]));
        doc.append_child(current, t);
    }
}

fn element_namespace(doc: &Document, parent: NodeId, tag: &str) -> Option<String> {
    if tag.eq_ignore_ascii_case("svg") {
        return Some(ns::SVG.to_string());
    }
    if tag.eq_ignore_ascii_case("math") {
        return Some(ns::MATHML.to_string());
    }
    doc.namespace(parent).map(str::to_string)
}

fn find(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from >= bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|off| from + off)
}

/// Position of `</tag` (any case) at or after `from`.
fn find_closing(bytes: &[u8], from: usize, tag: &str) -> Option<usize> {
    let mut at = from;
    while let Some(pos) = find(bytes, at, b"</") {
        let name = &bytes[pos + 2..];
        if name.len() >= tag.len() && name[..tag.len()].eq_ignore_ascii_case(tag.as_bytes()) {
            return Some(pos);
        }
        at = pos + 2;
    }
    None
}

fn skip_ws(bytes: &[u8], i: &mut usize) {
    while *i < bytes.len() && bytes[*i].is_ascii_whitespace() {
        *i += 1;
    }
}

fn read_name(input: &str, i: &mut usize) -> String {
    let bytes = input.as_bytes();
    let start = *i;
    while *i < bytes.len() {
        let c = bytes[*i];
        if c.is_ascii_alphanumeric() || matches!(c, b'_' | b'-' | b':' | b'.') {
            *i += 1;
        } else {
            break;
        }
    }
    input[start..*i].to_string()
}

fn read_attribute(input: &str, i: &mut usize) -> Option<(String, String)> {
    let bytes = input.as_bytes();
    let name_start = *i;
    while *i < bytes.len() {
        let c = bytes[*i];
        if c.is_ascii_whitespace() || matches!(c, b'/' | b'>' | b'=' | b'"' | b'\'') {
            break;
        }
        *i += 1;
    }
    if *i == name_start {
        return None;
    }
    let name = input[name_start..*i].to_string();

    skip_ws(bytes, i);
    let mut value = String::new();
    if *i < bytes.len() && bytes[*i] == b'=' {
        *i += 1;
        skip_ws(bytes, i);
        value = read_value(input, i);
    }
    Some((name, value))
}

fn read_value(input: &str, i: &mut usize) -> String {
    let bytes = input.as_bytes();
    match bytes.get(*i) {
        Some(&quote @ (b'"' | b'\'')) => {
            let start = *i + 1;
            let end = bytes[start..]
                .iter()
                .position(|&b| b == quote)
                .map_or(bytes.len(), |off| start + off);
            *i = (end + 1).min(bytes.len());
            decode_entities(&input[start..end])
        }
        _ => {
            let start = *i;
            while *i < bytes.len() && !bytes[*i].is_ascii_whitespace() && bytes[*i] != b'>' {
                *i += 1;
            }
            decode_entities(&input[start..*i])
        }
    }
}

pub(crate) fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').filter(|&semi| semi <= 10).and_then(|semi| {
            let c = match &rest[1..semi] {
                "amp" => '&',
                "lt" => '<',
                "gt" => '>',
                "quot" => '"',
                "apos" => '\'',
                "nbsp" => '\u{a0}',
                entity => {
                    let code = match entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                        None => entity.strip_prefix('#')?.parse().ok()?,
                    };
                    char::from_u32(code)?
                }
            };
            Some((c, semi + 1))
        });
        match decoded {
            Some((c, len)) => {
                out.push(c);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn escape_text(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}

fn escape_attr(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}

pub(crate) fn write_node(doc: &Document, id: NodeId, out: &mut String) {
    match doc.kind(id) {
        NodeKind::Text(t) => {
            let raw = doc
                .parent(id)
                .and_then(|p| doc.element(p))
                .is_some_and(|el| el.namespace.is_none() && is_raw_text(&el.name));
            if raw {
                out.push_str(t);
            } else {
                escape_text(t, out);
            }
        }
        NodeKind::Fragment => {
            for &child in doc.children(id) {
                write_node(doc, child, out);
            }
        }
        NodeKind::Element(el) => {
            out.push('<');
            out.push_str(&el.name);
            for (k, v) in &el.attrs {
                out.push(' ');
                out.push_str(k);
                out.push_str("=\"");
                escape_attr(v, out);
                out.push('"');
            }
            out.push('>');
            if el.namespace.is_none() && is_void(&el.name) {
                return;
            }
            for &child in doc.children(id) {
                write_node(doc, child, out);
            }
            out.push_str("</");
            out.push_str(&el.name);
            out.push('>');
        }
    }
}
