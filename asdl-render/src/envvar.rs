//! Post-template environment-variable expansion (§4.8 "Environment-variable
//! expansion"). Runs after placeholder formatting and env-var restoration,
//! substituting `$VAR` / `${VAR}` from the process environment.

/// Expand `$VAR` and `${VAR}` references from the process environment.
/// Returns the expanded text, plus the list of tokens that referenced an
/// unset variable (empty when everything resolved).
pub fn expand_env_vars(text: &str) -> (String, Vec<String>) {
    let mut out = String::with_capacity(text.len());
    let mut unresolved = Vec::new();
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' && i + 1 < bytes.len() {
            if bytes[i + 1] == b'{' {
                if let Some(end) = text[i + 2..].find('}') {
                    let name = &text[i + 2..i + 2 + end];
                    let token = &text[i..i + 2 + end + 1];
                    match std::env::var(name) {
                        Ok(value) => out.push_str(&value),
                        Err(_) => {
                            out.push_str(token);
                            unresolved.push(token.to_string());
                        }
                    }
                    i += 2 + end + 1;
                    continue;
                }
            } else if is_name_start(bytes[i + 1]) {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && is_name_char(bytes[end]) {
                    end += 1;
                }
                let name = &text[start..end];
                let token = &text[i..end];
                match std::env::var(name) {
                    Ok(value) => out.push_str(&value),
                    Err(_) => {
                        out.push_str(token);
                        unresolved.push(token.to_string());
                    }
                }
                i = end;
                continue;
            }
        }
        // Safe: we only skip ahead on ASCII '$' prefixes above, so `i`
        // always lands on a char boundary here.
        let ch_len = text[i..].chars().next().map(|c| c.len_utf8()).unwrap_or(1);
        out.push_str(&text[i..i + ch_len]);
        i += ch_len;
    }
    (out, unresolved)
}

fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_bare_and_braced_forms() {
        std::env::set_var("ASDL_RENDER_TEST_VAR", "42");
        let (out, unresolved) = expand_env_vars("x=$ASDL_RENDER_TEST_VAR y=${ASDL_RENDER_TEST_VAR}");
        assert_eq!(out, "x=42 y=42");
        assert!(unresolved.is_empty());
        std::env::remove_var("ASDL_RENDER_TEST_VAR");
    }

    #[test]
    fn reports_unresolved_variable() {
        std::env::remove_var("ASDL_RENDER_DOES_NOT_EXIST");
        let (out, unresolved) = expand_env_vars("${ASDL_RENDER_DOES_NOT_EXIST}");
        assert_eq!(out, "${ASDL_RENDER_DOES_NOT_EXIST}");
        assert_eq!(unresolved, vec!["${ASDL_RENDER_DOES_NOT_EXIST}".to_string()]);
    }
}
