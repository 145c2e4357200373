//! C5: Pattern Atomization Pass (§4.5).

use ahash::AHashMap;
use indexmap::IndexMap;
use itertools::iproduct;

use asdl_diagnostics::Diagnostic;
use asdl_ir::atomized::{AtomizedEndpoint, AtomizedInstance, AtomizedModule, AtomizedNet, AtomizedProgram, PatternOrigin};
use asdl_ir::ids::{EndpointId, IdAllocator, InstanceId, ModuleId, NetId};
use asdl_ir::patterned::PatternedProgram;
use asdl_pattern::{bind_patterns, PatternError, PatternExpr};

use crate::diagnostics::{
    ATOMIZE_VERIFY_FAILED, LITERAL_COLLISION, PATTERN_LENGTH_MISMATCH, PATTERN_PARSE_ERROR,
    UNKNOWN_ENDPOINT_INSTANCE,
};

/// One expanded atom plus the segment/labels that produced it.
struct ExpandedAtom {
    text: String,
    segment_index: usize,
    parts: Vec<String>,
}

/// Expand a parsed pattern expression the same way [`asdl_pattern::expand_pattern`]
/// does, but additionally track which segment and which group labels
/// produced each atom, for [`PatternOrigin::pattern_parts`].
fn expand_with_origin(
    expr: &PatternExpr,
    max_atoms: usize,
) -> Result<Vec<ExpandedAtom>, PatternError> {
    use asdl_pattern::PatternToken;

    let mut atoms = Vec::new();
    for (segment_index, segment) in expr.segments.iter().enumerate() {
        let mut segment_atoms: Vec<(String, Vec<String>)> = vec![(String::new(), Vec::new())];
        for token in &segment.tokens {
            match token {
                PatternToken::Literal(lit) => {
                    for (text, _) in segment_atoms.iter_mut() {
                        text.push_str(&lit.text);
                    }
                }
                PatternToken::Group(group) => {
                    let labels: Vec<String> = group.labels.iter().map(|l| l.to_string()).collect();
                    segment_atoms = iproduct!(segment_atoms.iter(), labels.iter())
                        .map(|((prefix, parts), label)| {
                            let mut next_parts = parts.clone();
                            next_parts.push(label.clone());
                            (format!("{prefix}{label}"), next_parts)
                        })
                        .collect();
                    if segment_atoms.len() > max_atoms {
                        return Err(PatternError::new(
                            format!("Pattern expression '{}' exceeds {max_atoms} atoms.", expr.raw),
                            expr.span.clone(),
                        ));
                    }
                }
            }
        }
        if atoms.len() + segment_atoms.len() > max_atoms {
            return Err(PatternError::new(
                format!("Pattern expression '{}' exceeds {max_atoms} atoms.", expr.raw),
                expr.span.clone(),
            ));
        }
        atoms.extend(segment_atoms.into_iter().map(|(text, parts)| ExpandedAtom {
            text,
            segment_index,
            parts,
        }));
    }
    Ok(atoms)
}

/// Run the atomization pass over every module of a [`PatternedProgram`].
///
/// Per §4.5's failure policy: a module with any error-severity diagnostic
/// is dropped from the output, but atomization continues over the
/// remaining modules; the whole pass returns `None` only if at least one
/// module recorded an error.
pub fn atomize_program(
    patterned: &PatternedProgram,
    max_atoms: usize,
) -> (Option<AtomizedProgram>, Vec<Diagnostic>) {
    log::debug!("atomizing {} module(s), atom cap {max_atoms}", patterned.modules.len());
    let mut diagnostics = Vec::new();
    let mut out = AtomizedProgram::new();
    out.devices = patterned.devices.clone().into_iter().collect();

    let mut any_error = false;

    for (module_id, module) in &patterned.modules {
        match atomize_module(patterned, *module_id, module, max_atoms, &mut diagnostics) {
            Some(atomized) => {
                out.modules.insert(*module_id, atomized);
            }
            None => any_error = true,
        }
    }

    if any_error {
        log::debug!("atomization aborted with {} diagnostic(s)", diagnostics.len());
        (None, diagnostics)
    } else {
        log::debug!("atomized {} module(s)", out.modules.len());
        (Some(out), diagnostics)
    }
}

fn atomize_module(
    patterned: &PatternedProgram,
    module_id: ModuleId,
    module: &asdl_ir::patterned::PatternedModule,
    max_atoms: usize,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<AtomizedModule> {
    let mut atomized = AtomizedModule::new(module_id, module.name.clone(), module.file_id);
    let mut module_had_error = false;

    let mut net_atom_ids: IndexMap<NetId, Vec<NetId>> = IndexMap::new();
    let mut net_literal_owner: AHashMap<String, NetId> = AHashMap::new();
    let mut net_alloc: IdAllocator<NetId> = IdAllocator::new();

    for (net_id, net) in &module.nets {
        let expr = match patterned.registries.pattern_expressions.get(&net.name_expr) {
            Some(e) => e,
            None => continue,
        };
        if net.is_port && expr.segments.len() > 1 {
            diagnostics.push(Diagnostic::error(
                ATOMIZE_VERIFY_FAILED,
                format!("port net '{}' may not use splice segments", expr.raw),
                None,
                "atomize",
            ));
            module_had_error = true;
            continue;
        }
        let atoms = match expand_with_origin(expr, max_atoms) {
            Ok(atoms) => atoms,
            Err(error) => {
                diagnostics.push(Diagnostic::error(PATTERN_LENGTH_MISMATCH, error.message, error.span, "atomize"));
                module_had_error = true;
                continue;
            }
        };

        let mut ids_for_net = Vec::with_capacity(atoms.len());
        for atom in atoms {
            if let Some(owner) = net_literal_owner.get(&atom.text) {
                if *owner != *net_id {
                    diagnostics.push(Diagnostic::error(
                        LITERAL_COLLISION,
                        format!("net atom '{}' is produced by more than one net expression", atom.text),
                        None,
                        "atomize",
                    ));
                    module_had_error = true;
                    continue;
                }
            } else {
                net_literal_owner.insert(atom.text.clone(), *net_id);
            }

            let atomized_id = net_alloc.alloc();
            if net.is_port {
                atomized.port_order.push(atomized_id);
            }
            atomized.nets.insert(
                atomized_id,
                AtomizedNet {
                    id: atomized_id,
                    name: atom.text.clone(),
                    is_port: net.is_port,
                    origin: PatternOrigin::new(net.name_expr, atom.segment_index, expr.raw.clone())
                        .with_parts(atom.parts),
                },
            );
            ids_for_net.push(atomized_id);
        }
        net_atom_ids.insert(*net_id, ids_for_net);
    }

    let mut instance_atom_ids: IndexMap<InstanceId, Vec<InstanceId>> = IndexMap::new();
    let mut instance_literal_owner: AHashMap<String, InstanceId> = AHashMap::new();
    let mut instance_name_to_id: AHashMap<String, InstanceId> = AHashMap::new();
    let mut instance_alloc: IdAllocator<InstanceId> = IdAllocator::new();

    for (inst_id, instance) in &module.instances {
        let expr = match patterned.registries.pattern_expressions.get(&instance.name_expr) {
            Some(e) => e,
            None => continue,
        };
        let atoms = match expand_with_origin(expr, max_atoms) {
            Ok(atoms) => atoms,
            Err(error) => {
                diagnostics.push(Diagnostic::error(PATTERN_LENGTH_MISMATCH, error.message, error.span, "atomize"));
                module_had_error = true;
                continue;
            }
        };
        let replica_count = atoms.len();

        // Pre-expand every param value once; verify broadcast/length agreement
        // against the instance's own atom count (§4.5 step 4).
        let mut param_atoms: IndexMap<String, Vec<ExpandedAtom>> = IndexMap::new();
        let mut params_ok = true;
        for (key, param_expr_id) in &instance.params {
            let param_expr = match patterned.registries.pattern_expressions.get(param_expr_id) {
                Some(e) => e,
                None => continue,
            };
            let expanded = match expand_with_origin(param_expr, max_atoms) {
                Ok(a) => a,
                Err(error) => {
                    diagnostics.push(Diagnostic::error(PATTERN_LENGTH_MISMATCH, error.message, error.span, "atomize"));
                    params_ok = false;
                    break;
                }
            };
            if expanded.len() != 1 && expanded.len() != replica_count {
                diagnostics.push(Diagnostic::error(
                    ATOMIZE_VERIFY_FAILED,
                    format!(
                        "parameter '{key}' on instance expression '{}' expands to {} atoms, expected 1 or {replica_count}",
                        expr.raw,
                        expanded.len()
                    ),
                    None,
                    "atomize",
                ));
                params_ok = false;
                break;
            }
            param_atoms.insert(key.clone(), expanded);
        }
        if !params_ok {
            module_had_error = true;
            continue;
        }

        let mut ids_for_instance = Vec::with_capacity(replica_count);
        for (index, atom) in atoms.into_iter().enumerate() {
            if let Some(owner) = instance_literal_owner.get(&atom.text) {
                if *owner != *inst_id {
                    diagnostics.push(Diagnostic::error(
                        LITERAL_COLLISION,
                        format!("instance atom '{}' is produced by more than one instance expression", atom.text),
                        None,
                        "atomize",
                    ));
                    module_had_error = true;
                    continue;
                }
            } else {
                instance_literal_owner.insert(atom.text.clone(), *inst_id);
            }

            let atomized_id = instance_alloc.alloc();
            let mut params = IndexMap::new();
            for (key, expanded) in &param_atoms {
                let chosen = if expanded.len() == 1 { &expanded[0] } else { &expanded[index] };
                let origin = PatternOrigin::new(instance.params[key], chosen.segment_index, chosen.text.clone())
                    .with_parts(chosen.parts.clone());
                params.insert(key.clone(), (chosen.text.clone(), origin));
            }

            atomized.instances.insert(
                atomized_id,
                AtomizedInstance {
                    id: atomized_id,
                    name: atom.text.clone(),
                    reference: instance.reference.clone(),
                    params,
                    origin: PatternOrigin::new(instance.name_expr, atom.segment_index, expr.raw.clone())
                        .with_parts(atom.parts),
                },
            );
            instance_name_to_id.insert(atom.text.clone(), atomized_id);
            ids_for_instance.push(atomized_id);
        }
        instance_atom_ids.insert(*inst_id, ids_for_instance);
    }

    let mut endpoint_alloc: IdAllocator<EndpointId> = IdAllocator::new();

    for (_endpoint_id, endpoint) in &module.endpoints {
        if endpoint.suppressed {
            continue;
        }
        let net_expr = match module
            .nets
            .get(&endpoint.net_id)
            .and_then(|n| patterned.registries.pattern_expressions.get(&n.name_expr))
        {
            Some(e) => e,
            None => continue,
        };
        let endpoint_expr = match patterned.registries.pattern_expressions.get(&endpoint.expr) {
            Some(e) => e,
            None => continue,
        };

        let (plan, errors) = bind_patterns(net_expr, endpoint_expr, "net", "endpoint", max_atoms);
        let plan = match plan {
            Some(p) => p,
            None => {
                for error in errors {
                    diagnostics.push(Diagnostic::error(PATTERN_LENGTH_MISMATCH, error.message, error.span, "atomize"));
                }
                module_had_error = true;
                continue;
            }
        };

        let atoms = match expand_with_origin(endpoint_expr, max_atoms) {
            Ok(atoms) => atoms,
            Err(error) => {
                diagnostics.push(Diagnostic::error(PATTERN_LENGTH_MISMATCH, error.message, error.span, "atomize"));
                module_had_error = true;
                continue;
            }
        };
        let net_ids_for_this_net = match net_atom_ids.get(&endpoint.net_id) {
            Some(ids) => ids,
            None => continue,
        };

        for (index, atom) in atoms.into_iter().enumerate() {
            if atom.text.matches('.').count() != 1 {
                diagnostics.push(Diagnostic::error(
                    PATTERN_PARSE_ERROR,
                    format!("endpoint expression '{}' expands to invalid atom '{}'", endpoint_expr.raw, atom.text),
                    None,
                    "atomize",
                ));
                module_had_error = true;
                continue;
            }
            let (inst_name, port) = atom.text.split_once('.').unwrap();

            let inst_id = match instance_name_to_id.get(inst_name) {
                Some(id) => *id,
                None => {
                    diagnostics.push(Diagnostic::error(
                        UNKNOWN_ENDPOINT_INSTANCE,
                        format!("endpoint references unknown instance '{inst_name}'"),
                        None,
                        "atomize",
                    ));
                    module_had_error = true;
                    continue;
                }
            };

            let net_index = plan.map_index(index);
            let net_id_atomized = match net_ids_for_this_net.get(net_index) {
                Some(id) => *id,
                None => continue,
            };

            let endpoint_id = endpoint_alloc.alloc();
            atomized.endpoints.insert(
                endpoint_id,
                AtomizedEndpoint {
                    id: endpoint_id,
                    inst_id,
                    port: port.to_string(),
                    net_id: net_id_atomized,
                    origin: PatternOrigin::new(endpoint.expr, atom.segment_index, endpoint_expr.raw.clone())
                        .with_parts(atom.parts),
                },
            );
        }
    }

    if module_had_error {
        None
    } else {
        Some(atomized)
    }
}
