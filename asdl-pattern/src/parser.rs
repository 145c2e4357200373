//! Parser for pattern expressions (§4.2.1).
//!
//! A single left-to-right scan over the raw expression, splitting on `;`
//! into segments and `<...>` into group tokens. No nesting, no lookahead
//! beyond finding the matching `>`.

use std::collections::HashMap;
use std::fmt;

use asdl_diagnostics::SourceSpan;
use smallvec::SmallVec;

/// Group/axis label lists are almost always a handful of enum alternatives
/// or a short numeric range; inline storage avoids a heap allocation for
/// the common case.
pub type LabelVec = SmallVec<[Label; 4]>;

/// A parse-time failure. Kept separate from [`asdl_diagnostics::Diagnostic`]
/// since pattern parsing runs standalone (e.g. from tests and tooling) and
/// the owning stage decides the final code/severity when it wraps these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternError {
    pub message: String,
    pub span: Option<SourceSpan>,
}

impl PatternError {
    pub fn new(message: impl Into<String>, span: Option<SourceSpan>) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// A single label produced by a group token: text for enum alternatives,
/// a number for range members (kept numeric so callers needing magnitude
/// don't have to re-parse it).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Label {
    Text(String),
    Number(i64),
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Text(s) => f.write_str(s),
            Label::Number(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKind {
    Enum,
    Range,
}

/// Definition of a reusable named pattern, referenced via `<@name>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedPattern {
    pub expr: String,
    pub tag: Option<String>,
}

impl NamedPattern {
    pub fn new(expr: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            tag: None,
        }
    }

    pub fn with_tag(expr: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            tag: Some(tag.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternLiteral {
    pub text: String,
    pub span: Option<SourceSpan>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternGroup {
    pub kind: GroupKind,
    pub labels: LabelVec,
    pub axis_id: Option<String>,
    pub span: Option<SourceSpan>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternToken {
    Literal(PatternLiteral),
    Group(PatternGroup),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternSegment {
    pub tokens: Vec<PatternToken>,
    pub span: Option<SourceSpan>,
}

/// Metadata for a named axis appearing in an expression, in left-to-right
/// declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisSpec {
    pub axis_id: String,
    pub kind: GroupKind,
    pub labels: LabelVec,
    pub size: usize,
    pub order: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternExpr {
    pub raw: String,
    pub segments: Vec<PatternSegment>,
    pub axes: Vec<AxisSpec>,
    pub axis_order: Vec<String>,
    pub span: Option<SourceSpan>,
}

/// Parse a raw pattern expression into segments/tokens/axis metadata.
///
/// On any grammar violation returns `(None, [error])` with exactly one
/// error describing the first failure found during the left-to-right scan.
pub fn parse_pattern_expr(
    expression: &str,
    named_patterns: Option<&HashMap<String, NamedPattern>>,
    span: Option<SourceSpan>,
) -> (Option<PatternExpr>, Vec<PatternError>) {
    if expression.is_empty() {
        return (
            None,
            vec![PatternError::new("Pattern expression is empty.", span)],
        );
    }

    let empty_map = HashMap::new();
    let pattern_map = named_patterns.unwrap_or(&empty_map);

    let chars: Vec<char> = expression.chars().collect();
    let mut tokens: Vec<PatternToken> = Vec::new();
    let mut segments: Vec<PatternSegment> = Vec::new();
    let mut axis_specs: Vec<AxisSpec> = Vec::new();
    let mut axis_order: Vec<String> = Vec::new();
    let mut axis_ids: std::collections::HashSet<String> = std::collections::HashSet::new();
    let mut literal_buffer = String::new();

    macro_rules! flush_literal {
        () => {
            if !literal_buffer.is_empty() {
                tokens.push(PatternToken::Literal(PatternLiteral {
                    text: std::mem::take(&mut literal_buffer),
                    span: None,
                }));
            }
        };
    }

    let mut index = 0usize;
    while index < chars.len() {
        let ch = chars[index];

        if ch == ';' {
            flush_literal!();
            if tokens.is_empty() {
                return (
                    None,
                    vec![PatternError::new(
                        format!("Empty splice segment in pattern expression '{expression}'."),
                        span,
                    )],
                );
            }
            segments.push(PatternSegment {
                tokens: std::mem::take(&mut tokens),
                span: None,
            });
            index += 1;
            continue;
        }

        if ch == '<' {
            flush_literal!();
            let close = chars[index + 1..].iter().position(|&c| c == '>');
            let close = match close {
                Some(offset) => index + 1 + offset,
                None => {
                    return (
                        None,
                        vec![PatternError::new(
                            format!("Unterminated pattern group in '{expression}'."),
                            span,
                        )],
                    )
                }
            };
            let content: String = chars[index + 1..close].iter().collect();

            if let Some(name) = content.strip_prefix('@') {
                if name.is_empty() {
                    return (
                        None,
                        vec![PatternError::new(
                            format!("Empty named pattern reference in '{expression}'."),
                            span,
                        )],
                    );
                }
                let definition = match pattern_map.get(name) {
                    Some(def) => def,
                    None => {
                        return (
                            None,
                            vec![PatternError::new(
                                format!("Named pattern '{name}' is undefined."),
                                span,
                            )],
                        )
                    }
                };
                let (group_kind, labels) =
                    match parse_named_group(&definition.expr, expression) {
                        Ok(parsed) => parsed,
                        Err(message) => return (None, vec![PatternError::new(message, span)]),
                    };
                let axis_id = definition.tag.clone().unwrap_or_else(|| name.to_string());
                if axis_ids.contains(&axis_id) {
                    return (
                        None,
                        vec![PatternError::new(
                            format!("Duplicate axis id '{axis_id}' in '{expression}'."),
                            span,
                        )],
                    );
                }
                axis_ids.insert(axis_id.clone());
                let order = axis_order.len();
                axis_order.push(axis_id.clone());
                axis_specs.push(AxisSpec {
                    axis_id: axis_id.clone(),
                    kind: group_kind,
                    labels: labels.clone(),
                    size: labels.len(),
                    order,
                });
                tokens.push(PatternToken::Group(PatternGroup {
                    kind: group_kind,
                    labels,
                    axis_id: Some(axis_id),
                    span: None,
                }));
            } else {
                let (group_kind, labels) = match parse_group_content(&content, expression) {
                    Ok(parsed) => parsed,
                    Err(message) => return (None, vec![PatternError::new(message, span)]),
                };
                tokens.push(PatternToken::Group(PatternGroup {
                    kind: group_kind,
                    labels,
                    axis_id: None,
                    span: None,
                }));
            }
            index = close + 1;
            continue;
        }

        if matches!(ch, '>' | '[' | ']' | '|') {
            return (
                None,
                vec![PatternError::new(
                    format!("Unexpected '{ch}' in pattern expression '{expression}'."),
                    span,
                )],
            );
        }

        literal_buffer.push(ch);
        index += 1;
    }

    flush_literal!();
    if tokens.is_empty() {
        return (
            None,
            vec![PatternError::new(
                format!("Empty splice segment in pattern expression '{expression}'."),
                span,
            )],
        );
    }
    segments.push(PatternSegment { tokens, span: None });

    (
        Some(PatternExpr {
            raw: expression.to_string(),
            segments,
            axes: axis_specs,
            axis_order,
            span,
        }),
        Vec::new(),
    )
}

fn parse_named_group(expr: &str, expression: &str) -> Result<(GroupKind, LabelVec), String> {
    if !expr.starts_with('<') || !expr.ends_with('>') || expr.len() < 2 {
        return Err(format!(
            "Named pattern definitions must be a single group token; got '{expr}' while parsing '{expression}'."
        ));
    }
    let content = &expr[1..expr.len() - 1];
    parse_group_content(content, expression)
}

fn parse_group_content(content: &str, expression: &str) -> Result<(GroupKind, LabelVec), String> {
    if content.is_empty() {
        return Err(format!("Empty pattern group in '{expression}'."));
    }
    if content.chars().any(|c| c.is_whitespace()) {
        return Err(format!("Whitespace is not allowed in '{expression}'."));
    }
    if content.chars().any(|c| matches!(c, '<' | '>' | '[' | ']' | ';')) {
        return Err(format!(
            "Nested pattern delimiters are not allowed in '{expression}'."
        ));
    }
    if content.contains(':') {
        if content.contains('|') {
            return Err(format!("Invalid range syntax in '{expression}'."));
        }
        let (start_text, end_text) = split_range_tokens(content)
            .ok_or_else(|| format!("Invalid range syntax in '{expression}'."))?;
        let start: i64 = start_text
            .parse()
            .map_err(|_| format!("Invalid range syntax in '{expression}'."))?;
        let end: i64 = end_text
            .parse()
            .map_err(|_| format!("Invalid range syntax in '{expression}'."))?;
        let labels = range_values(start, end).map(Label::Number).collect();
        return Ok((GroupKind::Range, labels));
    }
    let parts: Vec<&str> = content.split('|').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(format!("Empty enumeration in '{expression}'."));
    }
    Ok((
        GroupKind::Enum,
        parts.into_iter().map(|p| Label::Text(p.to_string())).collect(),
    ))
}

fn split_range_tokens(content: &str) -> Option<(&str, &str)> {
    if content.matches(':').count() != 1 {
        return None;
    }
    let mut parts = content.splitn(2, ':');
    let start = parts.next()?;
    let end = parts.next()?;
    if start.is_empty() || end.is_empty() {
        return None;
    }
    Some((start, end))
}

fn range_values(start: i64, end: i64) -> Box<dyn Iterator<Item = i64>> {
    if start <= end {
        Box::new(start..=end)
    } else {
        Box::new((end..=start).rev())
    }
}

/// All group tokens across every segment, in expression order.
pub fn iter_pattern_groups(expr: &PatternExpr) -> Vec<&PatternGroup> {
    expr.segments
        .iter()
        .flat_map(|segment| segment.tokens.iter())
        .filter_map(|token| match token {
            PatternToken::Group(group) => Some(group),
            PatternToken::Literal(_) => None,
        })
        .collect()
}

/// Whether any group token in the expression lacks an axis id.
pub fn has_unnamed_groups(expr: &PatternExpr) -> bool {
    iter_pattern_groups(expr).iter().any(|g| g.axis_id.is_none())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_expression_is_an_error() {
        let (expr, errors) = parse_pattern_expr("", None, None);
        assert!(expr.is_none());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn empty_segment_is_an_error() {
        let (expr, errors) = parse_pattern_expr("a;;b", None, None);
        assert!(expr.is_none());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn trailing_empty_segment_is_an_error() {
        let (expr, errors) = parse_pattern_expr("a;", None, None);
        assert!(expr.is_none());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn splice_parses_two_segments() {
        let (expr, errors) = parse_pattern_expr("a<0|1>;b<0|1>", None, None);
        assert!(errors.is_empty());
        let expr = expr.unwrap();
        assert_eq!(expr.segments.len(), 2);
    }

    #[test]
    fn numeric_range_descending() {
        let (expr, errors) = parse_pattern_expr("x<3:1>", None, None);
        assert!(errors.is_empty());
        let expr = expr.unwrap();
        let group = iter_pattern_groups(&expr)[0];
        assert_eq!(
            group.labels.as_slice(),
            [Label::Number(3), Label::Number(2), Label::Number(1)]
        );
    }

    #[test]
    fn named_reference_resolves_axis_and_rejects_duplicate() {
        let mut table = HashMap::new();
        table.insert("row".to_string(), NamedPattern::with_tag("<0|1>", "Row"));
        let (expr, errors) = parse_pattern_expr("n<@row>", Some(&table), None);
        assert!(errors.is_empty());
        let expr = expr.unwrap();
        assert_eq!(expr.axis_order, vec!["Row".to_string()]);

        let (expr2, errors2) = parse_pattern_expr("n<@row><@row>", Some(&table), None);
        assert!(expr2.is_none());
        assert_eq!(errors2.len(), 1);
    }

    #[test]
    fn whitespace_in_group_is_rejected() {
        let (expr, errors) = parse_pattern_expr("a< 0|1>", None, None);
        assert!(expr.is_none());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn stray_reserved_char_is_rejected() {
        let (expr, errors) = parse_pattern_expr("a]b", None, None);
        assert!(expr.is_none());
        assert_eq!(errors.len(), 1);
    }
}
