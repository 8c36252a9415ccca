/// escape_once
///
/// HTML-escapes `text` for safe embedding, leaving existing character references intact.
///
/// `<`, `>`, `"` and `'` are always escaped. `&` is escaped unless it already starts a named
/// (`&amp;`), decimal (`&#39;`) or hexadecimal (`&#x27;`) reference. Applying the function to its own
/// output is a no-op, so a value that is loaded into an edit form and saved again keeps a single
/// level of escaping.
pub fn escape_once(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for (index, ch) in text.char_indices() {
        match ch {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '&' if starts_char_reference(&text[index..]) => escaped.push('&'),
            '&' => escaped.push_str("&amp;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

// `rest` begins with '&'. Scanning stops at the first byte that cannot belong to the reference.
fn starts_char_reference(rest: &str) -> bool {
    let body = &rest.as_bytes()[1..];
    let (prefix, accepts): (usize, fn(&u8) -> bool) = match body {
        [b'#', b'x' | b'X', ..] => (2, u8::is_ascii_hexdigit),
        [b'#', ..] => (1, u8::is_ascii_digit),
        [first, ..] if first.is_ascii_alphabetic() => (1, u8::is_ascii_alphanumeric),
        _ => return false,
    };

    let len = body[prefix..]
        .iter()
        .take_while(|&byte| accepts(byte))
        .count();
    // Numeric references need at least one digit; a named one already has its first letter.
    let named = body[0] != b'#';
    (named || len > 0) && body.get(prefix + len) == Some(&b';')
}
