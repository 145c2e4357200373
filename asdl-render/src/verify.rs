//! C9: the pre-render verify pass (§4.9). Runs entirely over the already
//! projected [`NetlistDesign`], before any template rendering is attempted.

use ahash::{AHashMap, AHashSet};
use asdl_diagnostics::Diagnostic;
use asdl_ir::netlist::{NetlistDesign, NetlistInstance, NetlistModule, NetlistRef};

use crate::backend_config::{allowed_placeholders, required_placeholders, BackendConfig, REQUIRED_SYSTEM_TEMPLATES};
use crate::diagnostics::{
    MALFORMED_TEMPLATE, MISSING_BACKEND, MISSING_CONN, MISSING_PLACEHOLDER, MISSING_TOP, UNKNOWN_CONN_PORT,
    UNKNOWN_REFERENCE,
};
use crate::params::merge_variables;
use crate::resolve::{select_reference, Resolved};
use crate::templates::{template_field_roots, TemplateError};

const MAX_PORT_PREVIEW: usize = 8;
const MAX_PORT_MATCH_SCAN: usize = 200;

fn preview_names<'a>(names: impl Iterator<Item = &'a String>, limit: usize) -> (Vec<String>, bool) {
    let mut preview = Vec::new();
    let mut names = names.peekable();
    while preview.len() < limit {
        match names.next() {
            Some(n) => preview.push(n.clone()),
            None => return (preview, false),
        }
    }
    (preview, names.peek().is_some())
}

fn case_insensitive_match<'a>(target: &str, candidates: impl Iterator<Item = &'a String>, max_scan: usize) -> Option<String> {
    let target_lower = target.to_lowercase();
    let mut found: Option<&str> = None;
    for (scanned, candidate) in candidates.enumerate() {
        if scanned >= max_scan {
            return None;
        }
        if candidate == target {
            continue;
        }
        if candidate.to_lowercase() == target_lower {
            if let Some(existing) = found {
                if existing != candidate {
                    return None;
                }
            }
            found = Some(candidate);
        }
    }
    found.map(str::to_string)
}

/// Resolve `design.top` to a module, emitting `MISSING_TOP` when the name
/// is absent and more than one module exists, or when a named top isn't
/// actually declared (§4.9 "Top module is defined if named").
pub fn resolve_top<'a>(design: &'a NetlistDesign) -> (Option<&'a NetlistModule>, Vec<Diagnostic>) {
    match &design.top {
        Some(name) => match design.module(name) {
            Some(m) => (Some(m), Vec::new()),
            None => (
                None,
                vec![Diagnostic::error(MISSING_TOP, format!("Top module '{name}' is not defined"), None, "render")],
            ),
        },
        None => {
            if design.modules.len() == 1 {
                (Some(&design.modules[0]), Vec::new())
            } else {
                (
                    None,
                    vec![Diagnostic::error(
                        MISSING_TOP,
                        "Top module is required when multiple modules exist",
                        None,
                        "render",
                    )],
                )
            }
        }
    }
}

/// Validate an instance's `conns` against the full port set of its
/// referenced module/device, returning the ordered connection list on
/// success (§4.9 "Port set of every instance...").
pub fn ordered_conns(instance: &NetlistInstance, port_order: &[String]) -> (Vec<String>, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();
    let conn_map: AHashMap<&str, &str> =
        instance.conns.iter().map(|(port, net)| (port.as_str(), net.as_str())).collect();

    let missing: Vec<&str> = port_order.iter().map(String::as_str).filter(|p| !conn_map.contains_key(p)).collect();
    if !missing.is_empty() {
        diagnostics.push(Diagnostic::error(
            MISSING_CONN,
            format!("Instance '{}' is missing conns for ports: {}", instance.name, missing.join(", ")),
            None,
            "render",
        ));
    }

    let port_set: AHashSet<&str> = port_order.iter().map(String::as_str).collect();
    let unknown: Vec<&str> = instance.conns.keys().map(String::as_str).filter(|p| !port_set.contains(p)).collect();
    if !unknown.is_empty() {
        let mut notes = Vec::new();
        let (preview, truncated) = preview_names(port_order.iter(), MAX_PORT_PREVIEW);
        if !preview.is_empty() {
            notes.push(format!("Valid ports are: {}", preview.join(", ")));
            if truncated {
                notes.push("See the symbol definition for the full port list.".to_string());
            }
        }
        for port in &unknown {
            if let Some(case_match) = case_insensitive_match(port, port_order.iter(), MAX_PORT_MATCH_SCAN) {
                notes.push(format!("Port names are case-sensitive; did you mean '{case_match}'?"));
                break;
            }
        }
        diagnostics.push(
            Diagnostic::error(
                UNKNOWN_CONN_PORT,
                format!("Instance '{}' has conns for unknown ports: {}", instance.name, unknown.join(", ")),
                None,
                "render",
            )
            .with_notes(notes)
            .with_help("Update endpoint names to match the device/module port list."),
        );
    }

    if !diagnostics.is_empty() {
        return (Vec::new(), diagnostics);
    }

    let rendered = port_order.iter().map(|port| conn_map[port.as_str()].to_string()).collect();
    (rendered, diagnostics)
}

/// Validate that every required system template is present in `config` and
/// references only allowed placeholders (§4.9 "System templates are present
/// and well-formed").
pub fn verify_system_templates(config: &BackendConfig) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for name in REQUIRED_SYSTEM_TEMPLATES {
        let Some(template) = config.template(name) else {
            diagnostics.push(Diagnostic::error(
                MISSING_PLACEHOLDER,
                format!("System device '{name}' not defined in backend config"),
                None,
                "render",
            ));
            continue;
        };
        let placeholders = match template_field_roots(template) {
            Ok(p) => p,
            Err(TemplateError::Malformed(msg)) => {
                diagnostics.push(Diagnostic::error(
                    MALFORMED_TEMPLATE,
                    format!("System device '{name}' template is malformed: {msg}"),
                    None,
                    "render",
                ));
                continue;
            }
            Err(TemplateError::UnknownField(_)) => unreachable!("template_field_roots never returns UnknownField"),
        };

        let required = required_placeholders(name);
        let mut missing: Vec<&str> = required.iter().filter(|p| !placeholders.contains(**p)).copied().collect();
        missing.sort_unstable();
        if !missing.is_empty() {
            diagnostics.push(Diagnostic::error(
                MISSING_PLACEHOLDER,
                format!("System device '{name}' template is missing required placeholders: {}", missing.join(", ")),
                None,
                "render",
            ));
        }

        let allowed = allowed_placeholders(name);
        let mut unknown: Vec<&str> = placeholders.iter().filter(|p| !allowed.contains(p.as_str())).map(String::as_str).collect();
        unknown.sort_unstable();
        if let Some(first) = unknown.first() {
            diagnostics.push(Diagnostic::error(
                UNKNOWN_REFERENCE,
                format!("System device '{name}' template references unknown placeholder '{first}'"),
                None,
                "render",
            ));
        }
    }
    diagnostics
}

/// Select a device's backend: the instance's explicit `backend=` value
/// first, then the caller's global default, then the device's sole backend
/// if it declares exactly one (§4.8 comment on [`NetlistRef::Device`]).
pub fn select_backend<'a>(
    device: &'a asdl_ast::DeviceDecl,
    instance: &NetlistInstance,
    global_default: Option<&str>,
) -> Option<&'a asdl_ast::BackendDecl> {
    let NetlistRef::Device { backend: inst_backend, .. } = &instance.reference else {
        return None;
    };
    if let Some(name) = inst_backend {
        return device.backends.get(name);
    }
    if let Some(name) = global_default {
        if let Some(backend) = device.backends.get(name) {
            return Some(backend);
        }
    }
    if device.backends.len() == 1 {
        return device.backends.values().next();
    }
    None
}

fn allowed_backend_placeholders(
    device: &asdl_ast::DeviceDecl,
    backend: &asdl_ast::BackendDecl,
) -> AHashSet<String> {
    let mut allowed: AHashSet<String> = ["name", "ports", "params"].into_iter().map(str::to_string).collect();
    allowed.extend(device.parameters.keys().cloned());
    allowed.extend(backend.parameters.keys().cloned());
    allowed.extend(device.variables.keys().cloned());
    allowed.extend(backend.variables.keys().cloned());
    allowed.extend(backend.props.keys().cloned());
    allowed
}

/// Run the full C9 pass over `design`: resolve top, check system templates,
/// then for every instance check its reference, port-set agreement, backend
/// resolution, variable/param merge collisions, and backend template
/// placeholder validity (§4.9, grounded directly on `_run_netlist_verification`).
pub fn verify_design(design: &NetlistDesign, backend_config: &BackendConfig, backend_name: Option<&str>) -> Vec<Diagnostic> {
    let (top, mut diagnostics) = resolve_top(design);
    if top.is_none() {
        return diagnostics;
    }

    diagnostics.extend(verify_system_templates(backend_config));

    for module in &design.modules {
        for instance in &module.instances {
            match select_reference(design, &instance.reference) {
                Some(Resolved::Module(target)) => {
                    let (_, conn_diags) = ordered_conns(instance, &target.port_order);
                    diagnostics.extend(conn_diags);
                }
                Some(Resolved::Device(device)) => {
                    let (_, conn_diags) = ordered_conns(instance, &device.ports);
                    diagnostics.extend(conn_diags);

                    let Some(backend) = select_backend(device, instance, backend_name) else {
                        diagnostics.push(Diagnostic::error(
                            MISSING_BACKEND,
                            format!("Device '{}' has no backend '{}'", device.name, backend_name.unwrap_or("<none>")),
                            None,
                            "render",
                        ));
                        continue;
                    };

                    let (_, variable_diags) = merge_variables(
                        &device.variables,
                        &backend.variables,
                        &device.parameters.keys().cloned().collect(),
                        &backend.parameters.keys().cloned().collect(),
                        &backend.props.keys().cloned().collect(),
                        &instance.name,
                        &device.name,
                    );
                    diagnostics.extend(variable_diags);

                    let placeholders = match template_field_roots(&backend.template) {
                        Ok(p) => p,
                        Err(TemplateError::Malformed(msg)) => {
                            diagnostics.push(Diagnostic::error(
                                MALFORMED_TEMPLATE,
                                format!("Backend template for '{}' is malformed: {msg}", device.name),
                                None,
                                "render",
                            ));
                            continue;
                        }
                        Err(TemplateError::UnknownField(_)) => unreachable!(),
                    };
                    let allowed = allowed_backend_placeholders(device, backend);
                    let mut unknown: Vec<&str> = placeholders.iter().filter(|p| !allowed.contains(p.as_str())).map(String::as_str).collect();
                    unknown.sort_unstable();
                    if let Some(first) = unknown.first() {
                        diagnostics.push(Diagnostic::error(
                            UNKNOWN_REFERENCE,
                            format!("Backend template for '{}' references unknown placeholder '{first}'", device.name),
                            None,
                            "render",
                        ));
                    }
                }
                None => {
                    diagnostics.push(Diagnostic::error(
                        UNKNOWN_REFERENCE,
                        format!("Instance '{}' references unknown symbol '{}'", instance.name, instance.reference.name()),
                        None,
                        "render",
                    ));
                }
            }
        }
    }

    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use asdl_ast::FileId;
    use asdl_ir::atomized::PatternOrigin;
    use asdl_ir::ids::ExprId;
    use indexmap::IndexMap;

    fn origin() -> PatternOrigin {
        PatternOrigin::new(ExprId::from_raw(0), 0, "x")
    }

    #[test]
    fn missing_conn_is_reported() {
        let instance = NetlistInstance {
            name: "x1".into(),
            reference: NetlistRef::Device { name: "nfet".into(), backend: None },
            conns: IndexMap::new(),
            params: IndexMap::new(),
            origin: origin(),
        };
        let (_, diags) = ordered_conns(&instance, &["d".into(), "g".into(), "s".into()]);
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn unknown_port_suggests_case_insensitive_match() {
        let mut conns = IndexMap::new();
        conns.insert("D".to_string(), "n1".to_string());
        let instance = NetlistInstance {
            name: "x1".into(),
            reference: NetlistRef::Device { name: "nfet".into(), backend: None },
            conns,
            params: IndexMap::new(),
            origin: origin(),
        };
        let (_, diags) = ordered_conns(&instance, &["d".into()]);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].notes.iter().any(|n| n.contains("did you mean 'd'")));
    }

    #[test]
    fn single_module_with_no_named_top_resolves() {
        let mut design = NetlistDesign::new(FileId::new(1));
        design.modules.push(NetlistModule {
            name: "top".into(),
            file_id: FileId::new(1),
            port_order: Vec::new(),
            instances: Vec::new(),
            nets: Vec::new(),
        });
        let (top, diags) = resolve_top(&design);
        assert!(diags.is_empty());
        assert_eq!(top.unwrap().name, "top");
    }

    #[test]
    fn ambiguous_top_is_an_error() {
        let mut design = NetlistDesign::new(FileId::new(1));
        for n in ["a", "b"] {
            design.modules.push(NetlistModule {
                name: n.into(),
                file_id: FileId::new(1),
                port_order: Vec::new(),
                instances: Vec::new(),
                nets: Vec::new(),
            });
        }
        let (top, diags) = resolve_top(&design);
        assert!(top.is_none());
        assert_eq!(diags.len(), 1);
    }
}
