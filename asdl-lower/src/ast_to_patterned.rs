//! C4: AST → PatternedGraph lowering (§4.4).

use std::collections::HashMap;

use indexmap::IndexMap;

use asdl_ast::Document;
use asdl_diagnostics::Diagnostic;
use asdl_ir::ids::{EndpointId, EntityId, ExprId, IdAllocator, InstanceId, ModuleId, NetId};
use asdl_ir::patterned::{
    PatternedEndpoint, PatternedInstance, PatternedModule, PatternedNet, PatternedProgram,
    ResolvedRef,
};
use asdl_pattern::{parse_pattern_expr, NamedPattern};
use asdl_symbols::{resolve_reference, Definition, NameEnv, ProgramDb, SymbolError};

use crate::diagnostics::{
    AMBIGUOUS_REFERENCE, INVALID_INSTANCE_EXPR, PATTERN_PARSE_ERROR, RECURSIVE_MODULE_VARIABLE,
    UNDEFINED_MODULE_VARIABLE, UNRESOLVED_QUALIFIED, UNRESOLVED_UNQUALIFIED,
};
use crate::instance_expr::parse_instance_expr;
use crate::variables::{substitute_variables, VariableError};

/// Lower every document in `program` (walked in its stable insertion
/// order, §4.4 "For each document in stable order") into a single
/// [`PatternedProgram`].
pub fn lower_program(program: &ProgramDb) -> (Option<PatternedProgram>, Vec<Diagnostic>) {
    log::debug!("lowering {} document(s) to PatternedGraph", program.documents().count());
    let mut out = PatternedProgram::new();
    let mut diagnostics = Vec::new();
    let mut module_ids: IdAllocator<ModuleId> = IdAllocator::new();
    let mut expr_ids: IdAllocator<ExprId> = IdAllocator::new();
    let mut had_error = false;

    for document in program.documents() {
        let name_env = NameEnv::from_document(document);

        for (device_name, device) in &document.devices {
            out.devices.insert(device_name.clone(), device.clone());
        }

        for (module_name, module_decl) in &document.modules {
            let module_id = module_ids.alloc();
            let mut lowered = PatternedModule::new(module_id, module_name.clone(), document.file_id);

            let named_patterns: HashMap<String, NamedPattern> = module_decl
                .patterns
                .iter()
                .map(|(name, decl)| {
                    let pattern = match &decl.tag {
                        Some(tag) => NamedPattern::with_tag(decl.expr.clone(), tag.clone()),
                        None => NamedPattern::new(decl.expr.clone()),
                    };
                    (name.clone(), pattern)
                })
                .collect();

            let mut net_ids: IdAllocator<NetId> = IdAllocator::new();
            let mut instance_ids: IdAllocator<InstanceId> = IdAllocator::new();
            let mut endpoint_ids: IdAllocator<EndpointId> = IdAllocator::new();

            // Instance-name token → InstanceId, for instance-default matching.
            let mut instance_by_token: IndexMap<String, InstanceId> = IndexMap::new();
            let mut instance_raw_ref: IndexMap<InstanceId, String> = IndexMap::new();
            // (instance name token, port) → existing explicit net token + suppression.
            let mut explicit_bindings: IndexMap<(String, String), (String, bool)> = IndexMap::new();

            for (name_token, expr_text) in &module_decl.instances {
                let parsed = match parse_instance_expr(expr_text) {
                    Some(p) => p,
                    None => {
                        had_error = true;
                        diagnostics.push(Diagnostic::error(
                            INVALID_INSTANCE_EXPR,
                            format!("instance expression '{expr_text}' is malformed"),
                            module_decl.span.clone(),
                            "lowering",
                        ));
                        continue;
                    }
                };

                let resolved =
                    resolve_reference(program, document.file_id, &name_env, &parsed.reference);
                let reference = match resolved {
                    Ok(entry) => match entry.definition {
                        Definition::Module(m) => ResolvedRef::Module {
                            file_id: entry.file_id,
                            name: m.name.clone(),
                        },
                        Definition::Device(d) => ResolvedRef::Device {
                            file_id: entry.file_id,
                            name: d.name.clone(),
                        },
                    },
                    Err(err) => {
                        had_error = true;
                        diagnostics.push(symbol_error_diagnostic(&err, module_decl.span.clone()));
                        continue;
                    }
                };

                let (name_expr, errors) =
                    parse_pattern_expr(name_token, Some(&named_patterns), module_decl.span.clone());
                let name_expr = match name_expr {
                    Some(e) => e,
                    None => {
                        had_error = true;
                        for error in errors {
                            diagnostics.push(Diagnostic::error(
                                PATTERN_PARSE_ERROR,
                                error.message,
                                error.span,
                                "lowering",
                            ));
                        }
                        continue;
                    }
                };
                let name_expr_id = expr_ids.alloc();
                let instance_id = instance_ids.alloc();

                let mut params = IndexMap::new();
                let mut param_failed = false;
                for (key, value) in &parsed.params {
                    let substituted = match substitute_variables(value, &module_decl.variables) {
                        Ok(s) => s,
                        Err(err) => {
                            had_error = true;
                            param_failed = true;
                            diagnostics.push(variable_error_diagnostic(&err, module_decl.span.clone()));
                            break;
                        }
                    };
                    let (param_expr, errors) = parse_pattern_expr(
                        &substituted,
                        Some(&named_patterns),
                        module_decl.span.clone(),
                    );
                    let param_expr = match param_expr {
                        Some(e) => e,
                        None => {
                            had_error = true;
                            param_failed = true;
                            for error in errors {
                                diagnostics.push(Diagnostic::error(
                                    PATTERN_PARSE_ERROR,
                                    error.message,
                                    error.span,
                                    "lowering",
                                ));
                            }
                            break;
                        }
                    };
                    let param_expr_id = expr_ids.alloc();
                    out.registries.register_expr(param_expr_id, param_expr);
                    out.registries
                        .param_pattern_origins
                        .insert((instance_id, key.clone()), (param_expr_id, 0));
                    params.insert(key.clone(), param_expr_id);
                }
                if param_failed {
                    continue;
                }

                out.registries.register_expr(name_expr_id, name_expr);
                out.registries
                    .record_origin(EntityId::Instance(instance_id), name_expr_id, 0, 0);
                instance_by_token.insert(name_token.clone(), instance_id);
                instance_raw_ref.insert(instance_id, parsed.reference.clone());

                lowered.instances.insert(
                    instance_id,
                    PatternedInstance {
                        id: instance_id,
                        name_expr: name_expr_id,
                        reference,
                        params,
                    },
                );
            }

            for (net_token, net_decl) in &module_decl.nets {
                let (is_port, net_text) = match net_token.strip_prefix('$') {
                    Some(rest) => (true, rest),
                    None => (false, net_token.as_str()),
                };

                let (net_expr, errors) =
                    parse_pattern_expr(net_text, Some(&named_patterns), net_decl.span.clone());
                let net_expr = match net_expr {
                    Some(e) => e,
                    None => {
                        had_error = true;
                        for error in errors {
                            diagnostics.push(Diagnostic::error(
                                PATTERN_PARSE_ERROR,
                                error.message,
                                error.span,
                                "lowering",
                            ));
                        }
                        continue;
                    }
                };
                let net_expr_id = expr_ids.alloc();
                out.registries.register_expr(net_expr_id, net_expr);

                let net_id = net_ids.alloc();
                out.registries
                    .record_origin(EntityId::Net(net_id), net_expr_id, 0, 0);
                lowered.nets.insert(
                    net_id,
                    PatternedNet {
                        id: net_id,
                        name_expr: net_expr_id,
                        is_port,
                    },
                );
                if is_port {
                    lowered.port_order.push(net_id);
                }

                for endpoint in &net_decl.endpoints {
                    if let Some((inst_part, port_part)) =
                        crate::instance_expr::split_endpoint_raw(&endpoint.expr)
                    {
                        explicit_bindings.insert(
                            (inst_part.to_string(), port_part.to_string()),
                            (net_text.to_string(), endpoint.suppressed),
                        );
                    }

                    let (endpoint_expr, errors) = parse_pattern_expr(
                        &endpoint.expr,
                        Some(&named_patterns),
                        endpoint.span.clone(),
                    );
                    let endpoint_expr = match endpoint_expr {
                        Some(e) => e,
                        None => {
                            had_error = true;
                            for error in errors {
                                diagnostics.push(Diagnostic::error(
                                    PATTERN_PARSE_ERROR,
                                    error.message,
                                    error.span,
                                    "lowering",
                                ));
                            }
                            continue;
                        }
                    };
                    let endpoint_expr_id = expr_ids.alloc();
                    out.registries.register_expr(endpoint_expr_id, endpoint_expr);
                    let endpoint_id = endpoint_ids.alloc();
                    out.registries
                        .record_origin(EntityId::Endpoint(endpoint_id), endpoint_expr_id, 0, 0);
                    lowered.endpoints.insert(
                        endpoint_id,
                        PatternedEndpoint {
                            id: endpoint_id,
                            net_id,
                            expr: endpoint_expr_id,
                            suppressed: endpoint.suppressed,
                        },
                    );
                }
            }

            // §4.4.1 instance defaults.
            for default in &module_decl.instance_defaults {
                for (port, net_token) in &default.bindings {
                    for (name_token, instance_id) in &instance_by_token {
                        if instance_raw_ref.get(instance_id) != Some(&default.reference) {
                            continue;
                        }
                        let key = (name_token.clone(), port.clone());
                        match explicit_bindings.get(&key) {
                            Some((_, true)) => {
                                // Suppressed: drop both explicit and default (§10.3).
                            }
                            Some((existing_net, false)) => {
                                if existing_net != net_token {
                                    diagnostics.push(Diagnostic::warning(
                                        crate::diagnostics::DEFAULT_OVERRIDE,
                                        format!(
                                            "instance '{name_token}' overrides default '{port}' binding \
                                             ('{existing_net}' instead of '{net_token}')"
                                        ),
                                        module_decl.span.clone(),
                                        "lowering",
                                    ));
                                }
                            }
                            None => {
                                let (net_expr, errors) = parse_pattern_expr(
                                    net_token,
                                    Some(&named_patterns),
                                    module_decl.span.clone(),
                                );
                                let net_expr = match net_expr {
                                    Some(e) => e,
                                    None => {
                                        had_error = true;
                                        for error in errors {
                                            diagnostics.push(Diagnostic::error(
                                                PATTERN_PARSE_ERROR,
                                                error.message,
                                                error.span,
                                                "lowering",
                                            ));
                                        }
                                        continue;
                                    }
                                };
                                let net_expr_id = expr_ids.alloc();
                                out.registries.register_expr(net_expr_id, net_expr);
                                let net_id = net_ids.alloc();
                                out.registries.record_origin(
                                    EntityId::Net(net_id),
                                    net_expr_id,
                                    0,
                                    0,
                                );
                                lowered.nets.insert(
                                    net_id,
                                    PatternedNet {
                                        id: net_id,
                                        name_expr: net_expr_id,
                                        is_port: false,
                                    },
                                );

                                let endpoint_text = format!("{name_token}.{port}");
                                let (endpoint_expr, errors) = parse_pattern_expr(
                                    &endpoint_text,
                                    Some(&named_patterns),
                                    module_decl.span.clone(),
                                );
                                let endpoint_expr = match endpoint_expr {
                                    Some(e) => e,
                                    None => {
                                        had_error = true;
                                        for error in errors {
                                            diagnostics.push(Diagnostic::error(
                                                PATTERN_PARSE_ERROR,
                                                error.message,
                                                error.span,
                                                "lowering",
                                            ));
                                        }
                                        continue;
                                    }
                                };
                                let endpoint_expr_id = expr_ids.alloc();
                                out.registries.register_expr(endpoint_expr_id, endpoint_expr);
                                let endpoint_id = endpoint_ids.alloc();
                                out.registries.record_origin(
                                    EntityId::Endpoint(endpoint_id),
                                    endpoint_expr_id,
                                    0,
                                    0,
                                );
                                lowered.endpoints.insert(
                                    endpoint_id,
                                    PatternedEndpoint {
                                        id: endpoint_id,
                                        net_id,
                                        expr: endpoint_expr_id,
                                        suppressed: false,
                                    },
                                );
                            }
                        }
                    }
                }
            }

            out.modules.insert(module_id, lowered);
        }
    }

    if had_error {
        log::debug!("lowering aborted with {} diagnostic(s)", diagnostics.len());
        (None, diagnostics)
    } else {
        log::debug!("lowered {} module(s)", out.modules.len());
        (Some(out), diagnostics)
    }
}

fn symbol_error_diagnostic(err: &SymbolError, span: Option<asdl_diagnostics::SourceSpan>) -> Diagnostic {
    match err {
        SymbolError::UnresolvedUnqualified(name) => Diagnostic::error(
            UNRESOLVED_UNQUALIFIED,
            format!("unresolved reference '{name}'"),
            span,
            "lowering",
        ),
        SymbolError::UnknownAlias(alias) => Diagnostic::error(
            UNRESOLVED_QUALIFIED,
            format!("import alias '{alias}' is not declared"),
            span,
            "lowering",
        ),
        SymbolError::UnresolvedQualified { alias, symbol } => Diagnostic::error(
            UNRESOLVED_QUALIFIED,
            format!("unresolved reference '{alias}.{symbol}'"),
            span,
            "lowering",
        ),
        SymbolError::AmbiguousReference(name) => Diagnostic::error(
            AMBIGUOUS_REFERENCE,
            format!("reference '{name}' is ambiguous between a module and a device"),
            span,
            "lowering",
        ),
    }
}

fn variable_error_diagnostic(
    err: &VariableError,
    span: Option<asdl_diagnostics::SourceSpan>,
) -> Diagnostic {
    match err {
        VariableError::Undefined(name) => Diagnostic::error(
            UNDEFINED_MODULE_VARIABLE,
            format!("module variable '{name}' is undefined"),
            span,
            "lowering",
        ),
        VariableError::Recursive(name) => Diagnostic::error(
            RECURSIVE_MODULE_VARIABLE,
            format!("module variable '{name}' is recursively defined"),
            span,
            "lowering",
        ),
    }
}
