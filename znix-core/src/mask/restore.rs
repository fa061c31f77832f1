use super::{Placeholder, PlaceholderKind, PlaceholderMap};

/// Strip the synthetic `{ ... }` wrapper from formatter output, along with
/// the indentation level the formatter gave its contents.
#[must_use]
pub fn unwrap_formatted(formatted: &str) -> String {
    let trimmed = formatted.trim();
    let inner = trimmed
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .unwrap_or(trimmed);

    let indent = inner
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start_matches(' ').len())
        .min()
        .unwrap_or(0);

    let body = inner
        .lines()
        .map(|line| line.get(indent..).unwrap_or_else(|| line.trim_start()))
        .collect::<Vec<_>>()
        .join("\n");
    let body = body.trim();
    if body.is_empty() {
        String::new()
    } else {
        format!("{body}\n")
    }
}

pub(super) fn restore_placeholders(text: &str, placeholders: &PlaceholderMap) -> String {
    placeholders
        .iter()
        .rev()
        .fold(text.to_string(), |text, placeholder| match placeholder.kind {
            PlaceholderKind::Plain => text.replace(&placeholder.token, &placeholder.original),
            PlaceholderKind::Assignment => restore_assignment(&text, placeholder),
            PlaceholderKind::Continuation => restore_continuation(&text, placeholder),
        })
}

/// `TOKEN = ` back to `ORIGINAL `.
fn restore_assignment(text: &str, placeholder: &Placeholder) -> String {
    let mut restored = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(found) = rest.find(&placeholder.token) {
        let (before, from_token) = rest.split_at(found);
        restored.push_str(before);
        restored.push_str(&placeholder.original);

        let after_token = from_token.get(placeholder.token.len()..).unwrap_or_default();
        let after_blank = after_token.trim_start();
        rest = match after_blank.strip_prefix('=') {
            Some(after_equals) => {
                restored.push(' ');
                after_equals.trim_start()
            }
            None => after_token,
        };
    }
    restored.push_str(rest);
    restored
}

/// `; TOKEN ` back to a single space before the real `=`.
fn restore_continuation(text: &str, placeholder: &Placeholder) -> String {
    let mut restored = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(found) = rest.find(&placeholder.token) {
        let (before, from_token) = rest.split_at(found);
        let head = before.trim_end();
        let head = match head.strip_suffix(';') {
            Some(head) => head.trim_end(),
            None => before,
        };
        restored.push_str(head);
        restored.push(' ');
        rest = from_token
            .get(placeholder.token.len()..)
            .unwrap_or_default()
            .trim_start();
    }
    restored.push_str(rest);
    restored
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn map(entries: &[(&str, &str, PlaceholderKind)]) -> PlaceholderMap {
        PlaceholderMap {
            prefix: "__t".to_string(),
            entries: entries
                .iter()
                .map(|(token, original, kind)| Placeholder {
                    token: (*token).to_string(),
                    original: (*original).to_string(),
                    kind: *kind,
                })
                .collect(),
        }
    }

    #[test]
    fn unwrap_removes_braces_and_one_indent_level() {
        let formatted = "{\n  a = 1;\n  b = {\n    c = 2;\n  };\n}\n";
        assert_eq!(unwrap_formatted(formatted), "a = 1;\nb = {\n  c = 2;\n};\n");
    }

    #[test]
    fn unwrap_of_empty_set_is_empty() {
        assert_eq!(unwrap_formatted("{ }\n"), "");
    }

    #[test]
    fn plain_placeholders_are_replaced_everywhere() {
        let placeholders = map(&[("__t0__", "$ctx.a", PlaceholderKind::Plain)]);
        assert_eq!(
            restore_placeholders("x = __t0__; y = __t0__;", &placeholders),
            "x = $ctx.a; y = $ctx.a;"
        );
    }

    #[test]
    fn restoration_runs_in_reverse_insertion_order() {
        // the second placeholder's original mentions the first token
        let placeholders = map(&[
            ("__t0__", "inner", PlaceholderKind::Plain),
            ("__t1__", "(wrap __t0__)", PlaceholderKind::Plain),
        ]);
        assert_eq!(
            restore_placeholders("v = __t1__;", &placeholders),
            "v = (wrap inner);"
        );
    }

    #[test]
    fn assignment_swallows_the_synthetic_equals() {
        let placeholders = map(&[("__t0__", "@do", PlaceholderKind::Assignment)]);
        assert_eq!(
            restore_placeholders("__t0__ =\n  {\n    a = 1;\n  };", &placeholders),
            "@do {\n    a = 1;\n  };"
        );
    }

    #[test]
    fn continuation_swallows_the_synthetic_terminator() {
        let placeholders = map(&[("__t1__", "", PlaceholderKind::Continuation)]);
        assert_eq!(
            restore_placeholders("x = [ 1 ];\n__t1__ = 2;", &placeholders),
            "x = [ 1 ] = 2;"
        );
    }
}
