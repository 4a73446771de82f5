//! Lexical helpers over caller-supplied field lists and expressions.

/// Split on `sep` outside parentheses and quotes; parts are trimmed and
/// empty parts dropped.
pub(crate) fn split_top_level(raw: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (idx, ch) in raw.char_indices() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' => quote = Some(ch),
            '(' => depth += 1,
            ')' => depth -= 1,
            c if c == sep && depth <= 0 => {
                parts.push(raw[start..idx].trim());
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(raw[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

/// Split a select item into expression and optional output alias at its
/// last top-level `AS`.
pub(crate) fn split_alias(item: &str) -> (&str, Option<&str>) {
    let bytes = item.as_bytes();
    let mut depth = 0i32;
    let mut quote: Option<u8> = None;
    let mut found = None;
    for (idx, &b) in bytes.iter().enumerate() {
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'\'' | b'"' => quote = Some(b),
            b'(' => depth += 1,
            b')' => depth -= 1,
            _ if depth == 0 && is_as_keyword(bytes, idx) => found = Some(idx),
            _ => {}
        }
    }
    let Some(idx) = found else {
        return (item.trim(), None);
    };
    let expr = item[..idx].trim();
    let alias = unquote(item[idx + 4..].trim());
    if expr.is_empty() || alias.is_empty() {
        return (item.trim(), None);
    }
    (expr, Some(alias))
}

// whitespace, `as` in any case, whitespace
fn is_as_keyword(bytes: &[u8], idx: usize) -> bool {
    idx + 3 < bytes.len()
        && bytes[idx].is_ascii_whitespace()
        && bytes[idx + 1].eq_ignore_ascii_case(&b'a')
        && bytes[idx + 2].eq_ignore_ascii_case(&b's')
        && bytes[idx + 3].is_ascii_whitespace()
}

fn unquote(alias: &str) -> &str {
    alias
        .strip_prefix('"')
        .and_then(|a| a.strip_suffix('"'))
        .unwrap_or(alias)
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Table qualifiers of every `qualifier.column` reference in `expr`, in
/// order of first appearance. Quoted text is skipped.
pub(crate) fn qualifiers(expr: &str) -> Vec<&str> {
    let bytes = expr.as_bytes();
    let mut found: Vec<&str> = Vec::new();
    let mut quote: Option<u8> = None;
    let mut idx = 0;
    while idx < bytes.len() {
        let b = bytes[idx];
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            idx += 1;
            continue;
        }
        if b == b'\'' || b == b'"' {
            quote = Some(b);
            idx += 1;
        } else if is_ident_start(b) {
            let start = idx;
            while idx < bytes.len() && is_ident_char(bytes[idx]) {
                idx += 1;
            }
            if idx < bytes.len() && bytes[idx] == b'.' {
                let qualifier = &expr[start..idx];
                idx += 1;
                while idx < bytes.len()
                    && (is_ident_char(bytes[idx]) || bytes[idx] == b'.' || bytes[idx] == b'*')
                {
                    idx += 1;
                }
                if !found.contains(&qualifier) {
                    found.push(qualifier);
                }
            }
        } else if b.is_ascii_digit() {
            // numeric literal such as 1.5
            while idx < bytes.len() && (is_ident_char(bytes[idx]) || bytes[idx] == b'.') {
                idx += 1;
            }
        } else {
            idx += 1;
        }
    }
    found
}
