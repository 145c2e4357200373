//! C8: the backend template renderer main driver (§4.8). Consumes a
//! verified [`NetlistDesign`] and produces netlist text.

use ahash::AHashSet;
use asdl_ast::FileId;
use asdl_diagnostics::Diagnostic;
use indexmap::IndexMap;

use asdl_ir::netlist::{NetlistDesign, NetlistInstance, NetlistModule, NetlistRef};

use crate::backend_config::BackendConfig;
use crate::diagnostics::{MALFORMED_TEMPLATE, MISSING_BACKEND, UNKNOWN_REFERENCE, UNRESOLVED_ENV_VAR};
use crate::envvar::expand_env_vars;
use crate::names::build_module_emitted_names;
use crate::options::EmitOptions;
use crate::params::{merge_params, merge_variables};
use crate::resolve::{select_reference, Resolved};
use crate::templates::{collapse_whitespace, escape_braced_env_vars, format_template, restore_braced_env_vars, template_field_roots, TemplateError};
use crate::verify::{ordered_conns, resolve_top, select_backend};

/// Identity key for a netlist module: there's no id type at this level
/// (unlike the upstream IRs), so `(name, file_id)` stands in.
type ModuleKey = (String, FileId);

fn module_key(module: &NetlistModule) -> ModuleKey {
    (module.name.clone(), module.file_id)
}

fn format_params_tokens(params: &IndexMap<String, String>) -> String {
    params.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join(" ")
}

/// DFS from `top`, in instance declaration order, re-sorted back into the
/// design's original module declaration order (§4.8 "Traversal order: DFS
/// from the resolved top").
fn collect_reachable_modules<'a>(design: &'a NetlistDesign, top: &'a NetlistModule) -> Vec<&'a NetlistModule> {
    let declared_order: IndexMap<ModuleKey, usize> =
        design.modules.iter().enumerate().map(|(i, m)| (module_key(m), i)).collect();

    let mut visited = AHashSet::default();
    let mut reachable: IndexMap<ModuleKey, &NetlistModule> = IndexMap::new();

    fn visit<'a>(
        module: &'a NetlistModule,
        design: &'a NetlistDesign,
        visited: &mut AHashSet<ModuleKey>,
        reachable: &mut IndexMap<ModuleKey, &'a NetlistModule>,
    ) {
        let key = module_key(module);
        if !visited.insert(key.clone()) {
            return;
        }
        reachable.insert(key, module);
        for instance in &module.instances {
            if let NetlistRef::Module { name, file_id } = &instance.reference {
                if let Some(child) = crate::resolve::select_module(design, name, *file_id) {
                    visit(child, design, visited, reachable);
                }
            }
        }
    }
    visit(top, design, &mut visited, &mut reachable);

    let mut modules: Vec<&NetlistModule> = reachable.into_values().collect();
    modules.sort_by_key(|m| declared_order.get(&module_key(m)).copied().unwrap_or(design.modules.len()));
    modules
}

fn render_system_template(
    template_name: &str,
    backend_config: &BackendConfig,
    context: &IndexMap<String, String>,
    diagnostics: &mut Vec<Diagnostic>,
) -> (Option<String>, bool) {
    let Some(template) = backend_config.template(template_name) else {
        diagnostics.push(Diagnostic::error(
            MISSING_BACKEND,
            format!("System device '{template_name}' not defined in backend config"),
            None,
            "render",
        ));
        return (None, true);
    };

    let placeholders = match template_field_roots(template) {
        Ok(p) => p,
        Err(TemplateError::Malformed(msg)) => {
            diagnostics.push(Diagnostic::error(
                MALFORMED_TEMPLATE,
                format!("System device '{template_name}' template is malformed: {msg}"),
                None,
                "render",
            ));
            return (None, true);
        }
        Err(TemplateError::UnknownField(_)) => unreachable!(),
    };

    let (escaped, env_vars) = escape_braced_env_vars(template);
    let rendered = match format_template(&escaped, context) {
        Ok(r) => r,
        Err(TemplateError::UnknownField(field)) => {
            diagnostics.push(Diagnostic::error(
                UNKNOWN_REFERENCE,
                format!("System device '{template_name}' template references unknown placeholder '{field}'"),
                None,
                "render",
            ));
            return (None, true);
        }
        Err(TemplateError::Malformed(msg)) => {
            diagnostics.push(Diagnostic::error(
                MALFORMED_TEMPLATE,
                format!("System device '{template_name}' template is malformed: {msg}"),
                None,
                "render",
            ));
            return (None, true);
        }
    };
    let mut rendered = restore_braced_env_vars(&rendered, &env_vars);

    let should_collapse =
        (placeholders.contains("ports") && context.get("ports").map(String::is_empty).unwrap_or(true))
            || (placeholders.contains("params") && context.get("params").map(String::is_empty).unwrap_or(true));
    if should_collapse {
        rendered = collapse_whitespace(&rendered);
    }

    let (rendered, unresolved) = expand_env_vars(&rendered);
    if !unresolved.is_empty() {
        diagnostics.push(Diagnostic::error(
            UNRESOLVED_ENV_VAR,
            format!(
                "System device '{template_name}' template contains unresolved environment variables: {}",
                unresolved.join(", ")
            ),
            None,
            "render",
        ));
        return (None, true);
    }
    (Some(rendered), false)
}

fn emit_instance(
    instance: &NetlistInstance,
    design: &NetlistDesign,
    module_emitted_names: &IndexMap<ModuleKey, String>,
    backend_config: &BackendConfig,
    options: &EmitOptions,
    diagnostics: &mut Vec<Diagnostic>,
) -> (Option<String>, bool) {
    match select_reference(design, &instance.reference) {
        Some(Resolved::Module(target)) => {
            let (conns, conn_diags) = ordered_conns(instance, &target.port_order);
            let had_conn_error = !conn_diags.is_empty();
            diagnostics.extend(conn_diags);
            if had_conn_error {
                return (None, true);
            }
            let ref_name = module_emitted_names.get(&module_key(target)).cloned().unwrap_or_else(|| target.name.clone());
            let params_str = format_params_tokens(&instance.params);
            let mut context = IndexMap::new();
            context.insert("name".to_string(), instance.name.clone());
            context.insert("ports".to_string(), conns.join(" "));
            context.insert("ref".to_string(), ref_name);
            context.insert("params".to_string(), params_str.clone());
            context.insert("sym_name".to_string(), target.name.clone());
            context.insert("file_id".to_string(), target.file_id.0.to_string());
            let template_name = if params_str.is_empty() { "__subckt_call__" } else { "__subckt_call_params__" };
            render_system_template(template_name, backend_config, &context, diagnostics)
        }
        Some(Resolved::Device(device)) => {
            let (conns, conn_diags) = ordered_conns(instance, &device.ports);
            let had_conn_error = !conn_diags.is_empty();
            diagnostics.extend(conn_diags);
            if had_conn_error {
                return (None, true);
            }
            let ports_str = conns.join(" ");

            let Some(backend) = select_backend(device, instance, options.backend_name.as_deref()) else {
                diagnostics.push(Diagnostic::error(
                    MISSING_BACKEND,
                    format!("Device '{}' has no usable backend", device.name),
                    None,
                    "render",
                ));
                return (None, true);
            };
            log::debug!("instance '{}' resolved device '{}' to backend '{}'", instance.name, device.name, backend.name);

            let (merged_params, params_str, param_diags) =
                merge_params(&device.parameters, &backend.parameters, &instance.params, &instance.name, &device.name);
            diagnostics.extend(param_diags);

            let (merged_vars, variable_diags) = merge_variables(
                &device.variables,
                &backend.variables,
                &device.parameters.keys().cloned().collect(),
                &backend.parameters.keys().cloned().collect(),
                &backend.props.keys().cloned().collect(),
                &instance.name,
                &device.name,
            );
            let had_variable_error = variable_diags.iter().any(Diagnostic::is_error);
            diagnostics.extend(variable_diags);
            if had_variable_error {
                return (None, true);
            }

            let (escaped_template, env_vars) = escape_braced_env_vars(&backend.template);
            let placeholders = match template_field_roots(&backend.template) {
                Ok(p) => p,
                Err(TemplateError::Malformed(msg)) => {
                    diagnostics.push(Diagnostic::error(
                        MALFORMED_TEMPLATE,
                        format!("Backend template for '{}' is malformed: {msg}", device.name),
                        None,
                        "render",
                    ));
                    return (None, true);
                }
                Err(TemplateError::UnknownField(_)) => unreachable!(),
            };

            let mut props = backend.props.clone();
            props.entry("params".to_string()).or_insert_with(|| params_str.clone());

            let mut context = IndexMap::new();
            context.insert("name".to_string(), instance.name.clone());
            context.insert("ports".to_string(), ports_str.clone());
            context.extend(merged_params);
            context.extend(merged_vars);
            context.extend(props);

            let rendered = match format_template(&escaped_template, &context) {
                Ok(r) => r,
                Err(TemplateError::UnknownField(field)) => {
                    diagnostics.push(Diagnostic::error(
                        UNKNOWN_REFERENCE,
                        format!("Backend template for '{}' references unknown placeholder '{field}'", device.name),
                        None,
                        "render",
                    ));
                    return (None, true);
                }
                Err(TemplateError::Malformed(msg)) => {
                    diagnostics.push(Diagnostic::error(
                        MALFORMED_TEMPLATE,
                        format!("Backend template for '{}' is malformed: {msg}", device.name),
                        None,
                        "render",
                    ));
                    return (None, true);
                }
            };
            let mut rendered = restore_braced_env_vars(&rendered, &env_vars);

            let should_collapse = (placeholders.contains("ports") && ports_str.is_empty())
                || (placeholders.contains("params") && params_str.is_empty());
            if should_collapse {
                rendered = collapse_whitespace(&rendered);
            }

            let (rendered, unresolved) = expand_env_vars(&rendered);
            if !unresolved.is_empty() {
                diagnostics.push(Diagnostic::error(
                    UNRESOLVED_ENV_VAR,
                    format!(
                        "Backend template for '{}' contains unresolved environment variables: {}",
                        device.name,
                        unresolved.join(", ")
                    ),
                    None,
                    "render",
                ));
                return (None, true);
            }
            (Some(rendered), false)
        }
        None => {
            diagnostics.push(Diagnostic::error(
                UNKNOWN_REFERENCE,
                format!("Instance '{}' references unknown symbol '{}'", instance.name, instance.reference.name()),
                None,
                "render",
            ));
            (None, true)
        }
    }
}

fn emit_module(
    module: &NetlistModule,
    is_top: bool,
    design: &NetlistDesign,
    module_emitted_names: &IndexMap<ModuleKey, String>,
    backend_config: &BackendConfig,
    options: &EmitOptions,
    diagnostics: &mut Vec<Diagnostic>,
) -> (Vec<String>, bool) {
    let mut lines = Vec::new();
    let mut had_error = false;
    let module_name = module_emitted_names.get(&module_key(module)).cloned().unwrap_or_else(|| module.name.clone());
    let wrap_as_subckt = !(is_top && !options.top_as_subckt);

    if wrap_as_subckt {
        let mut header_context = IndexMap::new();
        header_context.insert("name".to_string(), module_name.clone());
        header_context.insert("sym_name".to_string(), module.name.clone());
        header_context.insert("ports".to_string(), module.port_order.join(" "));
        header_context.insert("params".to_string(), String::new());
        header_context.insert("file_id".to_string(), module.file_id.0.to_string());
        let (header, header_error) = render_system_template("__subckt_header__", backend_config, &header_context, diagnostics);
        if let Some(header) = header {
            lines.push(header);
        }
        had_error |= header_error;
    }

    for instance in &module.instances {
        let (line, inst_error) = emit_instance(instance, design, module_emitted_names, backend_config, options, diagnostics);
        if let Some(line) = line {
            lines.push(line);
        }
        had_error |= inst_error;
    }

    if wrap_as_subckt {
        let mut footer_context = IndexMap::new();
        footer_context.insert("name".to_string(), module_name);
        footer_context.insert("sym_name".to_string(), module.name.clone());
        footer_context.insert("file_id".to_string(), module.file_id.0.to_string());
        let (footer, footer_error) = render_system_template("__subckt_footer__", backend_config, &footer_context, diagnostics);
        if let Some(footer) = footer {
            lines.push(footer);
        }
        had_error |= footer_error;
    }

    (lines, had_error)
}

/// Render `design` into netlist text per §4.8. Returns `None` when any
/// stage records an error, alongside the full accumulated diagnostics
/// (§7 "any error aborts module emission but continues collecting
/// diagnostics for the remaining modules").
pub fn emit_netlist(design: &NetlistDesign, backend_config: &BackendConfig, options: &EmitOptions) -> (Option<String>, Vec<Diagnostic>) {
    let (top, mut diagnostics) = resolve_top(design);
    let Some(top) = top else {
        return (None, diagnostics);
    };

    let reachable = collect_reachable_modules(design, top);
    log::debug!("rendering {} reachable module(s) from top '{}'", reachable.len(), top.name);
    let (module_emitted_names, name_diags) =
        build_module_emitted_names(&reachable.iter().map(|m| (module_key(m), m.name.as_str())).collect::<Vec<_>>());
    diagnostics.extend(name_diags);

    let top_emitted_name = module_emitted_names.get(&module_key(top)).cloned().unwrap_or_else(|| top.name.clone());

    let mut lines = Vec::new();
    let mut had_error = false;

    let mut header_context = IndexMap::new();
    header_context.insert("backend".to_string(), options.backend_name.clone().unwrap_or_default());
    header_context.insert("top".to_string(), top_emitted_name.clone());
    header_context.insert("top_sym_name".to_string(), top.name.clone());
    header_context.insert("file_id".to_string(), top.file_id.0.to_string());
    header_context.insert("emit_date".to_string(), options.emit_date.clone().unwrap_or_default());
    header_context.insert("emit_time".to_string(), options.emit_time.clone().unwrap_or_default());

    let (header, header_error) = render_system_template("__netlist_header__", backend_config, &header_context, &mut diagnostics);
    if let Some(header) = header {
        lines.push(header);
    }
    had_error |= header_error;

    for module in &reachable {
        let (module_lines, module_error) =
            emit_module(module, std::ptr::eq(*module, top), design, &module_emitted_names, backend_config, options, &mut diagnostics);
        lines.extend(module_lines);
        had_error |= module_error;
    }

    let footer_context = header_context;
    let (footer, footer_error) = render_system_template("__netlist_footer__", backend_config, &footer_context, &mut diagnostics);
    if let Some(footer) = footer {
        lines.push(footer);
    }
    had_error |= footer_error;

    if had_error {
        return (None, diagnostics);
    }
    (Some(lines.join("\n")), diagnostics)
}
