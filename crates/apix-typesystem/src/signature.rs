//! Helpers for normalized C++ function signatures.
//!
//! Signatures are compared in a whitespace-free normal form where a single
//! space survives only between two identifier characters:
//! `foo(const QString &, int) const` becomes `foo(const QString&,int)const`.

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Normalize a signature or type spelling for comparison.
#[must_use]
pub fn normalize_signature(signature: &str) -> String {
    let mut out = String::with_capacity(signature.len());
    let mut pending_space = false;
    for c in signature.trim().chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space
            && out.chars().last().is_some_and(is_ident_char)
            && is_ident_char(c)
        {
            out.push(' ');
        }
        pending_space = false;
        out.push(c);
    }
    out
}

/// Split `text` on `separator` where it is not nested inside `<>`, `()`,
/// `[]` or `{}`. Parts are trimmed; empty input yields no parts.
#[must_use]
pub fn split_top_level(text: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in text.chars() {
        match c {
            '<' | '(' | '[' | '{' => depth += 1,
            '>' | ')' | ']' | '}' => depth -= 1,
            _ => {}
        }
        if c == separator && depth == 0 {
            parts.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(c);
        }
    }
    if !current.trim().is_empty() || !parts.is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

/// Function name part of a signature (`"foo(int)"` -> `"foo"`).
#[must_use]
pub fn signature_name(signature: &str) -> &str {
    signature
        .find('(')
        .map_or(signature, |pos| &signature[..pos])
        .trim()
}

/// Strip template arguments from a name: `QList<int>` -> `QList`.
#[must_use]
pub fn strip_template_args(name: &str) -> &str {
    name.find('<').map_or(name, |pos| &name[..pos]).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("foo(const QString &, int) const", "foo(const QString&,int)const")]
    #[case("  bar ( ) ", "bar()")]
    #[case("baz(unsigned   int)", "baz(unsigned int)")]
    #[case("qux(QList< int >)", "qux(QList<int>)")]
    fn normalizes_whitespace(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_signature(input), expected);
    }

    #[test]
    fn splits_only_top_level_commas() {
        assert_eq!(
            split_top_level("QMap<int, QString>, int = f(1, 2)", ','),
            vec!["QMap<int, QString>".to_string(), "int = f(1, 2)".to_string()]
        );
        assert!(split_top_level("", ',').is_empty());
    }

    #[test]
    fn signature_helpers() {
        assert_eq!(signature_name("operator==(const Foo&)"), "operator==");
        assert_eq!(strip_template_args("QList<int>"), "QList");
        assert_eq!(strip_template_args("Plain"), "Plain");
    }
}
