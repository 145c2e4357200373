//! Two-pass template rendering (§4.8): escape-protect braced environment
//! variables before Python-`str.format`-style `{field}` substitution, then
//! restore them verbatim so `${FOO}` is never mistaken for a template field.

use ahash::AHashSet;
use indexmap::IndexMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("{0}")]
    Malformed(String),
    #[error("'{0}'")]
    UnknownField(String),
}

fn field_root(field: &str) -> &str {
    let name_part = field.split([':', '!']).next().unwrap_or("");
    name_part.split(['.', '[']).next().unwrap_or("")
}

/// Extract the set of field roots a template references (`{name}` ->
/// `name`, `{name.attr}` -> `name`, `{name[0]}` -> `name`); `{{`/`}}` are
/// literal braces, not fields.
pub fn template_field_roots(template: &str) -> Result<AHashSet<String>, TemplateError> {
    let mut roots = AHashSet::default();
    let mut chars = template.char_indices().peekable();
    while let Some((_, c)) = chars.next() {
        match c {
            '{' => {
                if matches!(chars.peek(), Some((_, '{'))) {
                    chars.next();
                    continue;
                }
                let mut field = String::new();
                let mut closed = false;
                for (_, c2) in chars.by_ref() {
                    if c2 == '}' {
                        closed = true;
                        break;
                    }
                    field.push(c2);
                }
                if !closed {
                    return Err(TemplateError::Malformed(format!("unmatched '{{' near '{field}'")));
                }
                let root = field_root(&field);
                if !root.is_empty() {
                    roots.insert(root.to_string());
                }
            }
            '}' => {
                if matches!(chars.peek(), Some((_, '}'))) {
                    chars.next();
                    continue;
                }
                return Err(TemplateError::Malformed("unmatched '}'".to_string()));
            }
            _ => {}
        }
    }
    Ok(roots)
}

/// Render `template` against `values`: `{{`/`}}` are literal braces,
/// `{field}` substitutes `values[field]`. An unknown field or unmatched
/// brace is an error, mirroring `str.format_map`'s `KeyError`/`ValueError`.
pub fn format_template(template: &str, values: &IndexMap<String, String>) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();
    while let Some((_, c)) = chars.next() {
        match c {
            '{' => {
                if matches!(chars.peek(), Some((_, '{'))) {
                    chars.next();
                    out.push('{');
                    continue;
                }
                let mut field = String::new();
                let mut closed = false;
                for (_, c2) in chars.by_ref() {
                    if c2 == '}' {
                        closed = true;
                        break;
                    }
                    field.push(c2);
                }
                if !closed {
                    return Err(TemplateError::Malformed(format!("unmatched '{{' near '{field}'")));
                }
                let root = field_root(&field);
                match values.get(root) {
                    Some(value) => out.push_str(value),
                    None => return Err(TemplateError::UnknownField(root.to_string())),
                }
            }
            '}' => {
                if matches!(chars.peek(), Some((_, '}'))) {
                    chars.next();
                    out.push('}');
                    continue;
                }
                return Err(TemplateError::Malformed("unmatched '}'".to_string()));
            }
            _ => out.push(c),
        }
    }
    Ok(out)
}

/// Escape every `${...}` token to a `$__ASDL_ENVVAR_<k>__` placeholder,
/// returning the escaped text plus the placeholder→original-token table
/// needed to restore them afterward.
pub fn escape_braced_env_vars(template: &str) -> (String, Vec<(String, String)>) {
    let mut out = String::with_capacity(template.len());
    let mut vars = Vec::new();
    let mut rest = template;
    loop {
        match rest.find("${") {
            None => {
                out.push_str(rest);
                break;
            }
            Some(start) => {
                let after_open = &rest[start + 2..];
                match after_open.find('}') {
                    None => {
                        out.push_str(rest);
                        break;
                    }
                    Some(end) => {
                        out.push_str(&rest[..start]);
                        let token = &rest[start..start + 2 + end + 1];
                        let placeholder = format!("__ASDL_ENVVAR_{}__", vars.len());
                        out.push('$');
                        out.push_str(&placeholder);
                        vars.push((placeholder, token.to_string()));
                        rest = &rest[start + 2 + end + 1..];
                    }
                }
            }
        }
    }
    (out, vars)
}

/// Undo [`escape_braced_env_vars`] after `{}`-style formatting has run.
pub fn restore_braced_env_vars(rendered: &str, vars: &[(String, String)]) -> String {
    let mut out = rendered.to_string();
    for (placeholder, token) in vars {
        out = out.replace(&format!("${placeholder}"), token);
    }
    out
}

/// Collapse runs of whitespace to a single space, per rendered *line* (§4.8
/// "collapse-whitespace rule").
pub fn collapse_whitespace(rendered: &str) -> String {
    rendered
        .split('\n')
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_roots_ignore_escaped_braces() {
        let roots = template_field_roots("{{literal}} {name} {obj.attr} {arr[0]}").unwrap();
        assert!(roots.contains("name"));
        assert!(roots.contains("obj"));
        assert!(roots.contains("arr"));
        assert!(!roots.contains("literal"));
    }

    #[test]
    fn unmatched_brace_is_malformed() {
        assert!(matches!(template_field_roots("{name"), Err(TemplateError::Malformed(_))));
    }

    #[test]
    fn env_var_escape_round_trips_through_formatting() {
        let template = "R${INSTANCE} {name} {ports}";
        let (escaped, vars) = escape_braced_env_vars(template);
        assert!(!escaped.contains("${INSTANCE}"));
        let mut values = IndexMap::new();
        values.insert("name".to_string(), "x1".to_string());
        values.insert("ports".to_string(), "a b".to_string());
        let rendered = format_template(&escaped, &values).unwrap();
        let restored = restore_braced_env_vars(&rendered, &vars);
        assert_eq!(restored, "R${INSTANCE} x1 a b");
    }

    #[test]
    fn collapse_whitespace_is_per_line() {
        let input = "a   b\nc    d";
        assert_eq!(collapse_whitespace(input), "a b\nc d");
    }
}
