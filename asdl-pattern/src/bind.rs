//! Binding plans between net and endpoint pattern expressions (§4.2.4).

use ahash::AHashSet;

use crate::expand::{expand_pattern, DEFAULT_MAX_ATOMS};
use crate::parser::{has_unnamed_groups, PatternError, PatternExpr};

/// The function mapping endpoint atom indices to net atom indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingPlan {
    pub net_expr_id: String,
    pub endpoint_expr_id: String,
    pub net_length: usize,
    pub endpoint_length: usize,
    pub shared_axes: Vec<String>,
    pub broadcast_axes: Vec<String>,
    pub mapping: Vec<usize>,
}

impl BindingPlan {
    pub fn map_index(&self, endpoint_index: usize) -> usize {
        self.mapping[endpoint_index]
    }
}

/// Build a binding plan for a net expression and an endpoint expression
/// (§4.2.4's three-way dispatch: identity, singleton broadcast, named-axis
/// broadcast).
pub fn bind_patterns(
    net_expr: &PatternExpr,
    endpoint_expr: &PatternExpr,
    net_expr_id: &str,
    endpoint_expr_id: &str,
    max_atoms: usize,
) -> (Option<BindingPlan>, Vec<PatternError>) {
    let (net_atoms, errors) = expand_pattern(net_expr, max_atoms);
    let net_atoms = match net_atoms {
        Some(a) => a,
        None => return (None, errors),
    };
    let (endpoint_atoms, errors) = expand_pattern(endpoint_expr, max_atoms);
    let endpoint_atoms = match endpoint_atoms {
        Some(a) => a,
        None => return (None, errors),
    };

    let net_length = net_atoms.len();
    let endpoint_length = endpoint_atoms.len();

    let endpoint_axis_ids: AHashSet<&str> =
        endpoint_expr.axes.iter().map(|a| a.axis_id.as_str()).collect();
    let shared_axes: Vec<String> = net_expr
        .axis_order
        .iter()
        .filter(|id| endpoint_axis_ids.contains(id.as_str()))
        .cloned()
        .collect();

    let net_axis_ids: AHashSet<&str> = net_expr.axes.iter().map(|a| a.axis_id.as_str()).collect();
    let broadcast_axes: Vec<String> = endpoint_expr
        .axis_order
        .iter()
        .filter(|id| !net_axis_ids.contains(id.as_str()))
        .cloned()
        .collect();

    let make_plan = |mapping: Vec<usize>| BindingPlan {
        net_expr_id: net_expr_id.to_string(),
        endpoint_expr_id: endpoint_expr_id.to_string(),
        net_length,
        endpoint_length,
        shared_axes: shared_axes.clone(),
        broadcast_axes: broadcast_axes.clone(),
        mapping,
    };

    if net_length == endpoint_length {
        return (Some(make_plan((0..net_length).collect())), Vec::new());
    }

    if net_length == 1 {
        return (Some(make_plan(vec![0; endpoint_length])), Vec::new());
    }

    let span = net_expr.span.clone().or_else(|| endpoint_expr.span.clone());

    if has_unnamed_groups(net_expr) || has_unnamed_groups(endpoint_expr) {
        return (
            None,
            vec![PatternError::new(
                "Named-axis broadcast requires named groups in both expressions.",
                span,
            )],
        );
    }

    if net_expr.segments.len() > 1 || endpoint_expr.segments.len() > 1 {
        return (
            None,
            vec![PatternError::new(
                "Named-axis broadcast is not supported for spliced expressions.",
                span,
            )],
        );
    }

    if net_expr.axis_order.is_empty() || endpoint_expr.axis_order.is_empty() {
        return (
            None,
            vec![PatternError::new(
                "Named-axis broadcast requires axis metadata for both expressions.",
                span,
            )],
        );
    }

    let (positions, missing_axis) =
        axis_subsequence_positions(&net_expr.axis_order, &endpoint_expr.axis_order);
    let positions = match positions {
        Some(p) => p,
        None => {
            return (
                None,
                vec![PatternError::new(
                    format!(
                        "Endpoint axis order does not include axis '{}' from '{}'.",
                        missing_axis.unwrap_or_default(),
                        net_expr.raw
                    ),
                    span,
                )],
            )
        }
    };

    let net_axis_sizes: std::collections::HashMap<&str, usize> = net_expr
        .axes
        .iter()
        .map(|a| (a.axis_id.as_str(), a.size))
        .collect();
    let endpoint_axis_sizes: std::collections::HashMap<&str, usize> = endpoint_expr
        .axes
        .iter()
        .map(|a| (a.axis_id.as_str(), a.size))
        .collect();

    let net_expected = axis_size_product(&net_expr.axis_order, &net_axis_sizes);
    let endpoint_expected = axis_size_product(&endpoint_expr.axis_order, &endpoint_axis_sizes);
    if net_expected != Some(net_length) || endpoint_expected != Some(endpoint_length) {
        return (
            None,
            vec![PatternError::new(
                format!(
                    "Axis broadcast requires expansion lengths to match axis-size products (net {}/{}, endpoint {}/{}).",
                    net_length,
                    net_expected.unwrap_or(0),
                    endpoint_length,
                    endpoint_expected.unwrap_or(0)
                ),
                span,
            )],
        );
    }

    for axis_id in &net_expr.axis_order {
        let net_size = net_axis_sizes.get(axis_id.as_str());
        let endpoint_size = endpoint_axis_sizes.get(axis_id.as_str());
        match (net_size, endpoint_size) {
            (Some(n), Some(e)) if n == e => {}
            (Some(n), Some(e)) => {
                return (
                    None,
                    vec![PatternError::new(
                        format!(
                            "Axis '{axis_id}' length mismatch between '{}' ({n}) and '{}' ({e}).",
                            net_expr.raw, endpoint_expr.raw
                        ),
                        span,
                    )],
                )
            }
            _ => {
                return (
                    None,
                    vec![PatternError::new(
                        format!("Axis '{axis_id}' is missing for broadcast binding."),
                        span,
                    )],
                )
            }
        }
    }

    let endpoint_sizes: Vec<usize> = endpoint_expr
        .axis_order
        .iter()
        .map(|id| endpoint_axis_sizes[id.as_str()])
        .collect();
    let net_sizes: Vec<usize> = net_expr
        .axis_order
        .iter()
        .map(|id| net_axis_sizes[id.as_str()])
        .collect();

    let mut mapping = Vec::with_capacity(endpoint_length);
    for endpoint_index in 0..endpoint_length {
        let endpoint_coords = index_to_coords(endpoint_index, &endpoint_sizes);
        let net_coords: Vec<usize> = positions.iter().map(|&pos| endpoint_coords[pos]).collect();
        mapping.push(coords_to_index(&net_coords, &net_sizes));
    }

    (Some(make_plan(mapping)), Vec::new())
}

fn axis_subsequence_positions(
    net_axes: &[String],
    endpoint_axes: &[String],
) -> (Option<Vec<usize>>, Option<String>) {
    let mut positions = Vec::with_capacity(net_axes.len());
    let mut cursor = 0usize;
    for axis_id in net_axes {
        match endpoint_axes[cursor..].iter().position(|id| id == axis_id) {
            Some(offset) => {
                let index = cursor + offset;
                positions.push(index);
                cursor = index + 1;
            }
            None => return (None, Some(axis_id.clone())),
        }
    }
    (Some(positions), None)
}

fn index_to_coords(index: usize, sizes: &[usize]) -> Vec<usize> {
    let mut coords = Vec::with_capacity(sizes.len());
    let mut remaining = index;
    for &size in sizes.iter().rev() {
        coords.push(remaining % size);
        remaining /= size;
    }
    coords.reverse();
    coords
}

fn coords_to_index(coords: &[usize], sizes: &[usize]) -> usize {
    let mut index = 0usize;
    for (coord, size) in coords.iter().zip(sizes.iter()) {
        index = index * size + coord;
    }
    index
}

fn axis_size_product(
    axis_order: &[String],
    axis_sizes: &std::collections::HashMap<&str, usize>,
) -> Option<usize> {
    let mut product = 1usize;
    for axis_id in axis_order {
        product *= *axis_sizes.get(axis_id.as_str())?;
    }
    Some(product)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_pattern_expr;
    use std::collections::HashMap;

    #[test]
    fn identity_binding_when_lengths_match() {
        let (net, _) = parse_pattern_expr("in<p|n>", None, None);
        let (endpoint, _) = parse_pattern_expr("m<0|1>.d", None, None);
        let (plan, errors) =
            bind_patterns(&net.unwrap(), &endpoint.unwrap(), "n1", "e1", DEFAULT_MAX_ATOMS);
        assert!(errors.is_empty());
        assert_eq!(plan.unwrap().mapping, vec![0, 1]);
    }

    #[test]
    fn singleton_broadcast() {
        let (net, _) = parse_pattern_expr("vdd", None, None);
        let (endpoint, _) = parse_pattern_expr("m<0|1>.vdd", None, None);
        let (plan, errors) =
            bind_patterns(&net.unwrap(), &endpoint.unwrap(), "n1", "e1", DEFAULT_MAX_ATOMS);
        assert!(errors.is_empty());
        assert_eq!(plan.unwrap().mapping, vec![0, 0]);
    }

    #[test]
    fn named_axis_broadcast_matches_spec_scenario_s4() {
        let mut patterns = HashMap::new();
        patterns.insert("A".to_string(), crate::parser::NamedPattern::with_tag("<0|1>", "row"));
        patterns.insert("B".to_string(), crate::parser::NamedPattern::with_tag("<0|1>", "col"));

        let (net, errors) = parse_pattern_expr("n<@A>", Some(&patterns), None);
        assert!(errors.is_empty());
        let (endpoint, errors) = parse_pattern_expr("m<@A><@B>.p", Some(&patterns), None);
        assert!(errors.is_empty());

        let (plan, errors) =
            bind_patterns(&net.unwrap(), &endpoint.unwrap(), "n1", "e1", DEFAULT_MAX_ATOMS);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(plan.unwrap().mapping, vec![0, 0, 1, 1]);
    }

    #[test]
    fn length_mismatch_without_axes_is_an_error() {
        let (net, _) = parse_pattern_expr("a<0|1>", None, None);
        let (endpoint, _) = parse_pattern_expr("b<0|1|2>.p", None, None);
        let (plan, errors) =
            bind_patterns(&net.unwrap(), &endpoint.unwrap(), "n1", "e1", DEFAULT_MAX_ATOMS);
        assert!(plan.is_none());
        assert!(!errors.is_empty());
    }
}
