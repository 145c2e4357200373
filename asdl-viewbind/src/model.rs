//! External view-binding profile shape and its construction-time validation
//! (§4.6, ported from `views/models.py`'s `ViewMatch`/`ViewRule`/`ViewProfile`).

use serde::{Deserialize, Serialize};
use thiserror::Error;

fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// A module symbol's bind target: `cell` or `cell@view`.
fn is_bind_symbol(value: &str) -> bool {
    match value.split_once('@') {
        Some((cell, view)) => is_identifier(cell) && is_identifier(view),
        None => is_identifier(value),
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewBindError {
    #[error("match path must not be empty")]
    EmptyPath,
    #[error("match path must not contain empty hierarchy segments")]
    EmptyPathSegment,
    #[error("match instance must not be empty")]
    EmptyInstance,
    #[error("match instance must be a leaf name and must not include '.'")]
    DottedInstance,
    #[error("match module must be an undecorated logical cell name")]
    DecoratedModule,
    #[error("match must include at least one of 'path', 'instance', or 'module'")]
    EmptyMatch,
    #[error("'instance' and 'module' are mutually exclusive")]
    ConflictingMatch,
    #[error("rule id must not be empty")]
    EmptyRuleId,
    #[error("bind must be a module symbol in 'cell' or 'cell@view' form")]
    InvalidBindSymbol,
    #[error("view_order must be a non-empty list")]
    EmptyViewOrder,
    #[error("view_order tokens must be 'default' or identifiers")]
    InvalidViewOrderToken,
}

/// Selection predicates for one view-rule (§4.6 "rules map selection
/// predicates"). `instance` and `module` are mutually exclusive; at least
/// one predicate is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewMatch {
    pub path: Option<String>,
    pub instance: Option<String>,
    pub module: Option<String>,
}

impl ViewMatch {
    pub fn new(
        path: Option<String>,
        instance: Option<String>,
        module: Option<String>,
    ) -> Result<Self, ViewBindError> {
        if let Some(path) = &path {
            if path.trim().is_empty() {
                return Err(ViewBindError::EmptyPath);
            }
            if path.split('.').any(|segment| segment.is_empty()) {
                return Err(ViewBindError::EmptyPathSegment);
            }
        }
        if let Some(instance) = &instance {
            if instance.trim().is_empty() {
                return Err(ViewBindError::EmptyInstance);
            }
            if instance.contains('.') {
                return Err(ViewBindError::DottedInstance);
            }
        }
        if let Some(module) = &module {
            if !is_identifier(module) {
                return Err(ViewBindError::DecoratedModule);
            }
        }
        if path.is_none() && instance.is_none() && module.is_none() {
            return Err(ViewBindError::EmptyMatch);
        }
        if instance.is_some() && module.is_some() {
            return Err(ViewBindError::ConflictingMatch);
        }
        Ok(Self {
            path,
            instance,
            module,
        })
    }

    pub fn validate(&self) -> Result<(), ViewBindError> {
        Self::new(self.path.clone(), self.instance.clone(), self.module.clone())?;
        Ok(())
    }
}

/// One ordered override rule (§4.6 "rules"): later-declared matching rules
/// override earlier ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewRule {
    pub id: Option<String>,
    #[serde(rename = "match")]
    pub match_: ViewMatch,
    pub bind: String,
}

impl ViewRule {
    pub fn new(id: Option<String>, match_: ViewMatch, bind: String) -> Result<Self, ViewBindError> {
        if let Some(id) = &id {
            if id.trim().is_empty() {
                return Err(ViewBindError::EmptyRuleId);
            }
        }
        match_.validate()?;
        if !is_bind_symbol(&bind) {
            return Err(ViewBindError::InvalidBindSymbol);
        }
        Ok(Self { id, match_, bind })
    }
}

/// Baseline view precedence plus ordered override rules (§4.6 "External
/// input").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewProfile {
    pub description: Option<String>,
    pub view_order: Vec<String>,
    #[serde(default)]
    pub rules: Vec<ViewRule>,
}

impl ViewProfile {
    /// Validate and normalize a freshly-deserialized profile: missing rule
    /// ids are assigned `rule<k>` in declaration order (1-based), matching
    /// `ViewProfile._assign_default_rule_ids`.
    pub fn new(
        description: Option<String>,
        view_order: Vec<String>,
        rules: Vec<ViewRule>,
    ) -> Result<Self, ViewBindError> {
        if view_order.is_empty() {
            return Err(ViewBindError::EmptyViewOrder);
        }
        for token in &view_order {
            if token != "default" && !is_identifier(token) {
                return Err(ViewBindError::InvalidViewOrderToken);
            }
        }
        for rule in &rules {
            rule.match_.validate()?;
            if !is_bind_symbol(&rule.bind) {
                return Err(ViewBindError::InvalidBindSymbol);
            }
        }
        let rules = rules
            .into_iter()
            .enumerate()
            .map(|(index, rule)| {
                if rule.id.is_none() {
                    ViewRule {
                        id: Some(format!("rule{}", index + 1)),
                        ..rule
                    }
                } else {
                    rule
                }
            })
            .collect();
        Ok(Self {
            description,
            view_order,
            rules,
        })
    }

    /// Validate and normalize a profile that may have arrived via
    /// deserialization (so its rule ids may be absent).
    pub fn validated(mut self) -> Result<Self, ViewBindError> {
        let rules = std::mem::take(&mut self.rules);
        Self::new(self.description, self.view_order, rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_requires_at_least_one_predicate() {
        assert_eq!(ViewMatch::new(None, None, None), Err(ViewBindError::EmptyMatch));
    }

    #[test]
    fn match_rejects_instance_and_module_together() {
        assert_eq!(
            ViewMatch::new(None, Some("u1".into()), Some("inv".into())),
            Err(ViewBindError::ConflictingMatch)
        );
    }

    #[test]
    fn match_rejects_decorated_module() {
        assert_eq!(
            ViewMatch::new(None, None, Some("inv@schematic".into())),
            Err(ViewBindError::DecoratedModule)
        );
    }

    #[test]
    fn rule_missing_id_gets_assigned_sequentially() {
        let m1 = ViewMatch::new(None, Some("u1".into()), None).unwrap();
        let m2 = ViewMatch::new(None, Some("u2".into()), None).unwrap();
        let rule1 = ViewRule::new(None, m1, "inv@sch".into()).unwrap();
        let rule2 = ViewRule::new(None, m2, "inv@sch".into()).unwrap();
        let profile = ViewProfile::new(None, vec!["default".into()], vec![rule1, rule2]).unwrap();
        assert_eq!(profile.rules[0].id.as_deref(), Some("rule1"));
        assert_eq!(profile.rules[1].id.as_deref(), Some("rule2"));
    }

    #[test]
    fn view_order_rejects_decorated_tokens() {
        assert_eq!(
            ViewProfile::new(None, vec!["sch@x".into()], Vec::new()),
            Err(ViewBindError::InvalidViewOrderToken)
        );
    }
}
