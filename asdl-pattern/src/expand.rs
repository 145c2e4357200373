//! Expansion of parsed pattern expressions into literal atoms (§4.2.2-4.2.3).

use crate::parser::{PatternError, PatternExpr, PatternToken};

/// Default atom cap; exceeding it yields a `PAT-TOO-LARGE`-class error
/// (tunable per §9 "Open Questions").
pub const DEFAULT_MAX_ATOMS: usize = 10_000;

/// Expand every segment by cross product, concatenating segments in order.
///
/// The cap is checked both after each group token's cross product grows the
/// running segment list and again once a segment is concatenated onto the
/// total, so it can trigger mid-segment exactly like the ported algorithm.
pub fn expand_pattern(
    expr: &PatternExpr,
    max_atoms: usize,
) -> (Option<Vec<String>>, Vec<PatternError>) {
    let mut atoms: Vec<String> = Vec::new();

    for segment in &expr.segments {
        let mut segment_atoms: Vec<String> = vec![String::new()];
        for token in &segment.tokens {
            match token {
                PatternToken::Literal(lit) => {
                    for value in segment_atoms.iter_mut() {
                        value.push_str(&lit.text);
                    }
                }
                PatternToken::Group(group) => {
                    let labels: Vec<String> = group.labels.iter().map(|l| l.to_string()).collect();
                    let mut expanded = Vec::with_capacity(segment_atoms.len() * labels.len());
                    for prefix in &segment_atoms {
                        for label in &labels {
                            expanded.push(format!("{prefix}{label}"));
                        }
                    }
                    segment_atoms = expanded;
                    if segment_atoms.len() > max_atoms {
                        return (
                            None,
                            vec![PatternError::new(
                                format!(
                                    "Pattern expression '{}' exceeds {max_atoms} atoms.",
                                    expr.raw
                                ),
                                expr.span.clone(),
                            )],
                        );
                    }
                }
            }
        }
        if atoms.len() + segment_atoms.len() > max_atoms {
            return (
                None,
                vec![PatternError::new(
                    format!("Pattern expression '{}' exceeds {max_atoms} atoms.", expr.raw),
                    expr.span.clone(),
                )],
            );
        }
        atoms.extend(segment_atoms);
    }

    (Some(atoms), Vec::new())
}

/// Expand an endpoint expression and split every atom into `(inst, pin)` on
/// its single `.` (§4.2.3); atoms without exactly one `.` are an error.
pub fn expand_endpoint(
    expr: &PatternExpr,
    max_atoms: usize,
) -> (Option<Vec<(String, String)>>, Vec<PatternError>) {
    let (atoms, errors) = expand_pattern(expr, max_atoms);
    let atoms = match atoms {
        Some(atoms) => atoms,
        None => return (None, errors),
    };

    let mut endpoints = Vec::with_capacity(atoms.len());
    for atom in &atoms {
        if atom.matches('.').count() != 1 {
            return (
                None,
                vec![PatternError::new(
                    format!(
                        "Endpoint expression '{}' expands to invalid atom '{atom}'.",
                        expr.raw
                    ),
                    expr.span.clone(),
                )],
            );
        }
        let mut parts = atom.splitn(2, '.');
        let inst = parts.next().unwrap().to_string();
        let pin = parts.next().unwrap().to_string();
        endpoints.push((inst, pin));
    }

    (Some(endpoints), Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_pattern_expr;

    fn expand(raw: &str) -> Vec<String> {
        let (expr, errors) = parse_pattern_expr(raw, None, None);
        assert!(errors.is_empty(), "{errors:?}");
        let (atoms, errors) = expand_pattern(&expr.unwrap(), DEFAULT_MAX_ATOMS);
        assert!(errors.is_empty(), "{errors:?}");
        atoms.unwrap()
    }

    #[test]
    fn enum_expansion() {
        assert_eq!(expand("in<p|n>"), vec!["inp", "inn"]);
    }

    #[test]
    fn ascending_and_descending_ranges() {
        assert_eq!(expand("x<1:3>"), vec!["x1", "x2", "x3"]);
        assert_eq!(expand("x<3:1>"), vec!["x3", "x2", "x1"]);
    }

    #[test]
    fn splice_concatenates_segments() {
        assert_eq!(expand("a<0|1>;b<0|1>"), vec!["a0", "a1", "b0", "b1"]);
    }

    #[test]
    fn cap_is_enforced() {
        let (expr, _) = parse_pattern_expr("x<1:20000>", None, None);
        let (atoms, errors) = expand_pattern(&expr.unwrap(), DEFAULT_MAX_ATOMS);
        assert!(atoms.is_none());
        assert_eq!(errors.len(), 1);
    }

    /// §9 "test both below and at the boundary": exactly `DEFAULT_MAX_ATOMS`
    /// atoms must still expand (the check is `len > max_atoms`, not `>=`),
    /// while one atom over must fail.
    #[test]
    fn cap_boundary_at_exactly_max_atoms_succeeds() {
        let (expr, _) = parse_pattern_expr("x<1:10000>", None, None);
        let (atoms, errors) = expand_pattern(&expr.unwrap(), DEFAULT_MAX_ATOMS);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(atoms.unwrap().len(), DEFAULT_MAX_ATOMS);
    }

    #[test]
    fn cap_boundary_one_over_max_atoms_fails() {
        let (expr, _) = parse_pattern_expr("x<1:10001>", None, None);
        let (atoms, errors) = expand_pattern(&expr.unwrap(), DEFAULT_MAX_ATOMS);
        assert!(atoms.is_none());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn endpoint_atoms_split_on_dot() {
        let (expr, _) = parse_pattern_expr("m<0|1>.d", None, None);
        let (endpoints, errors) = expand_endpoint(&expr.unwrap(), DEFAULT_MAX_ATOMS);
        assert!(errors.is_empty());
        assert_eq!(
            endpoints.unwrap(),
            vec![("m0".to_string(), "d".to_string()), ("m1".to_string(), "d".to_string())]
        );
    }

    #[test]
    fn endpoint_without_single_dot_is_an_error() {
        let (expr, _) = parse_pattern_expr("nodot", None, None);
        let (endpoints, errors) = expand_endpoint(&expr.unwrap(), DEFAULT_MAX_ATOMS);
        assert!(endpoints.is_none());
        assert_eq!(errors.len(), 1);
    }
}
