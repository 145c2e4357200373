//! Parsing of the `"ref key=val …"` instance expression grammar (§4.4 step 3).

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInstanceExpr {
    pub reference: String,
    /// key → value, in authored order.
    pub params: Vec<(String, String)>,
}

/// Parse `"ref k=v …"`: the first whitespace-separated token is the
/// reference, every remaining token must be `key=value` with non-empty
/// sides.
pub fn parse_instance_expr(raw: &str) -> Option<ParsedInstanceExpr> {
    let mut tokens = raw.split_whitespace();
    let reference = tokens.next()?.to_string();
    if reference.is_empty() {
        return None;
    }

    let mut params = Vec::new();
    for token in tokens {
        let (key, value) = token.split_once('=')?;
        if key.is_empty() || value.is_empty() {
            return None;
        }
        params.push((key.to_string(), value.to_string()));
    }

    Some(ParsedInstanceExpr { reference, params })
}

/// Split an endpoint's raw pattern text on its first top-level `.`
/// (outside any `<...>` group) into `(instance_part, port_part)`. Used to
/// detect whether an explicit endpoint already wires a given port, ahead
/// of full pattern atomization (§4.4.1).
pub fn split_endpoint_raw(raw: &str) -> Option<(&str, &str)> {
    let mut depth = 0i32;
    for (index, ch) in raw.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => depth -= 1,
            '.' if depth == 0 => return Some((&raw[..index], &raw[index + 1..])),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reference_and_params() {
        let parsed = parse_instance_expr("res r=10k w=1u").unwrap();
        assert_eq!(parsed.reference, "res");
        assert_eq!(
            parsed.params,
            vec![("r".to_string(), "10k".to_string()), ("w".to_string(), "1u".to_string())]
        );
    }

    #[test]
    fn rejects_malformed_param_token() {
        assert!(parse_instance_expr("res r").is_none());
        assert!(parse_instance_expr("res =10k").is_none());
        assert!(parse_instance_expr("res r=").is_none());
    }

    #[test]
    fn splits_endpoint_on_top_level_dot() {
        assert_eq!(split_endpoint_raw("m1.d"), Some(("m1", "d")));
        assert_eq!(split_endpoint_raw("m<0|1>.d"), Some(("m<0|1>", "d")));
        assert_eq!(split_endpoint_raw("nodot"), None);
    }
}
