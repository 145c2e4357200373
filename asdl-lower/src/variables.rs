//! `{var}` substitution against a module's `variables` block, with cycle
//! detection (§4.4 step 3).

use ahash::AHashSet;
use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableError {
    Undefined(String),
    Recursive(String),
}

/// Resolve every `{name}` reference in `text` against `variables`,
/// recursively substituting until no braces remain. Each variable is
/// resolved at most once per call chain; revisiting a variable already on
/// the current resolution path is a cycle.
pub fn substitute_variables(
    text: &str,
    variables: &IndexMap<String, String>,
) -> Result<String, VariableError> {
    let mut visiting = AHashSet::new();
    resolve(text, variables, &mut visiting)
}

fn resolve(
    text: &str,
    variables: &IndexMap<String, String>,
    visiting: &mut AHashSet<String>,
) -> Result<String, VariableError> {
    let mut out = String::with_capacity(text.len());
    let bytes = text.as_bytes();
    let mut cursor = 0usize;

    while cursor < bytes.len() {
        match text[cursor..].find('{') {
            Some(offset) => {
                let brace_start = cursor + offset;
                out.push_str(&text[cursor..brace_start]);
                let close = text[brace_start..]
                    .find('}')
                    .map(|o| brace_start + o);
                let Some(brace_end) = close else {
                    out.push_str(&text[brace_start..]);
                    cursor = bytes.len();
                    break;
                };
                let name = &text[brace_start + 1..brace_end];
                let value = variables
                    .get(name)
                    .ok_or_else(|| VariableError::Undefined(name.to_string()))?;
                if !visiting.insert(name.to_string()) {
                    return Err(VariableError::Recursive(name.to_string()));
                }
                let resolved = resolve(value, variables, visiting)?;
                visiting.remove(name);
                out.push_str(&resolved);
                cursor = brace_end + 1;
            }
            None => {
                out.push_str(&text[cursor..]);
                cursor = bytes.len();
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn substitutes_a_simple_reference() {
        let variables = vars(&[("w", "10u")]);
        assert_eq!(substitute_variables("W={w}", &variables).unwrap(), "W=10u");
    }

    #[test]
    fn substitutes_transitively() {
        let variables = vars(&[("w", "{base}"), ("base", "10u")]);
        assert_eq!(substitute_variables("{w}", &variables).unwrap(), "10u");
    }

    #[test]
    fn undefined_variable_is_an_error() {
        let variables = vars(&[]);
        assert_eq!(
            substitute_variables("{missing}", &variables).unwrap_err(),
            VariableError::Undefined("missing".to_string())
        );
    }

    #[test]
    fn recursive_variable_is_an_error() {
        let variables = vars(&[("a", "{b}"), ("b", "{a}")]);
        assert_eq!(
            substitute_variables("{a}", &variables).unwrap_err(),
            VariableError::Recursive("a".to_string())
        );
    }

    #[test]
    fn text_without_braces_is_unchanged() {
        let variables = vars(&[]);
        assert_eq!(substitute_variables("plain", &variables).unwrap(), "plain");
    }
}
