//! Parameter and variable layer merging for device instance lines (§4.8
//! "merge parameter layers").

use ahash::AHashSet;
use asdl_diagnostics::Diagnostic;
use indexmap::{IndexMap, IndexSet};

use crate::diagnostics::{UNKNOWN_INSTANCE_PARAM, VARIABLE_KEY_COLLISION};

/// Merge `{device defaults, backend overrides, instance overrides}` and
/// build the `params` token, preserving key order {device keys first, then
/// backend-only keys}. An instance override naming a key absent from both
/// device and backend params is dropped with a warning, not applied.
pub fn merge_params(
    device_params: &IndexMap<String, String>,
    backend_params: &IndexMap<String, String>,
    inst_params: &IndexMap<String, String>,
    instance_name: &str,
    device_name: &str,
) -> (IndexMap<String, String>, String, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();
    let mut order: Vec<String> = device_params.keys().cloned().collect();
    let mut allowed: IndexSet<String> = order.iter().cloned().collect();
    for key in backend_params.keys() {
        if allowed.insert(key.clone()) {
            order.push(key.clone());
        }
    }

    let mut merged: IndexMap<String, String> = IndexMap::new();
    merged.extend(device_params.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged.extend(backend_params.iter().map(|(k, v)| (k.clone(), v.clone())));

    for (key, value) in inst_params {
        if !allowed.contains(key) {
            diagnostics.push(Diagnostic::warning(
                UNKNOWN_INSTANCE_PARAM,
                format!("Instance '{instance_name}' overrides unknown param '{key}' on device '{device_name}'"),
                None,
                "render",
            ));
            continue;
        }
        merged.insert(key.clone(), value.clone());
    }

    let tokens: Vec<String> = order
        .iter()
        .filter_map(|key| merged.get(key).map(|v| format!("{key}={v}")))
        .collect();
    (merged, tokens.join(" "), diagnostics)
}

/// Merge device/backend variable layers (backend overrides device); a
/// merged variable key colliding with any param or prop key across either
/// layer is an error (§4.8 "merge variables... with key-collision checks
/// against params/props").
pub fn merge_variables(
    device_vars: &IndexMap<String, String>,
    backend_vars: &IndexMap<String, String>,
    device_param_keys: &AHashSet<String>,
    backend_param_keys: &AHashSet<String>,
    backend_prop_keys: &AHashSet<String>,
    instance_name: &str,
    device_name: &str,
) -> (IndexMap<String, String>, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();
    let mut merged: IndexMap<String, String> = IndexMap::new();
    merged.extend(device_vars.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged.extend(backend_vars.iter().map(|(k, v)| (k.clone(), v.clone())));

    for key in merged.keys() {
        if device_param_keys.contains(key) || backend_param_keys.contains(key) || backend_prop_keys.contains(key) {
            diagnostics.push(Diagnostic::error(
                VARIABLE_KEY_COLLISION,
                format!(
                    "Instance '{instance_name}' on device '{device_name}': variable '{key}' \
                     collides with a param or prop key"
                ),
                None,
                "render",
            ));
        }
    }

    (merged, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn merge_params_orders_device_then_backend_only_keys() {
        let device = map(&[("w", "1u"), ("l", "0.18u")]);
        let backend = map(&[("l", "0.2u"), ("m", "1")]);
        let inst = map(&[("w", "2u")]);
        let (merged, token, diags) = merge_params(&device, &backend, &inst, "x1", "nfet");
        assert!(diags.is_empty());
        assert_eq!(merged["w"], "2u");
        assert_eq!(merged["l"], "0.2u");
        assert_eq!(token, "w=2u l=0.2u m=1");
    }

    #[test]
    fn unknown_instance_param_is_dropped_with_warning() {
        let device = map(&[("w", "1u")]);
        let backend = map(&[]);
        let inst = map(&[("bogus", "9")]);
        let (merged, _, diags) = merge_params(&device, &backend, &inst, "x1", "nfet");
        assert_eq!(merged["w"], "1u");
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn variable_colliding_with_param_key_is_an_error() {
        let device_vars = map(&[("w", "override")]);
        let backend_vars = map(&[]);
        let device_param_keys: AHashSet<String> = ["w".to_string()].into_iter().collect();
        let (_, diags) = merge_variables(
            &device_vars,
            &backend_vars,
            &device_param_keys,
            &AHashSet::default(),
            &AHashSet::default(),
            "x1",
            "nfet",
        );
        assert_eq!(diags.len(), 1);
    }
}
