//! Program-wide symbol database and per-file name environments (§4.3).

use ahash::AHashMap;
use indexmap::IndexMap;
use thiserror::Error;

use asdl_ast::{DeviceDecl, Document, FileId, ModuleDecl};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Module,
    Device,
}

/// A resolved definition: which file it lives in and a reference to the
/// declaration itself.
#[derive(Debug, Clone, Copy)]
pub enum Definition<'a> {
    Module(&'a ModuleDecl),
    Device(&'a DeviceDecl),
}

#[derive(Debug, Clone, Copy)]
pub struct SymbolEntry<'a> {
    pub kind: SymbolKind,
    pub file_id: FileId,
    pub definition: Definition<'a>,
}

/// Errors produced while resolving a reference through [`ProgramDb`] and a
/// [`NameEnv`]. These are the building blocks C4 turns into diagnostics
/// (`UNRESOLVED_UNQUALIFIED`, `UNRESOLVED_QUALIFIED`, `AMBIGUOUS_REFERENCE`);
/// kept as a `thiserror` enum here since resolution is a pure lookup that
/// either succeeds or fails outright, with no partial result to carry
/// forward.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SymbolError {
    #[error("unresolved unqualified reference '{0}'")]
    UnresolvedUnqualified(String),
    #[error("import alias '{0}' is not declared in this file")]
    UnknownAlias(String),
    #[error("unresolved qualified reference '{alias}.{symbol}'")]
    UnresolvedQualified { alias: String, symbol: String },
    #[error("reference '{0}' is ambiguous between a module and a device")]
    AmbiguousReference(String),
}

/// A whole program's documents, keyed by file id (§4.3 "ProgramDB").
///
/// Stored in an [`IndexMap`] rather than a plain hash map: §5 requires
/// declaration-order iteration to be stable across the pipeline, and
/// `documents()` is what lowering walks "in stable order" (§4.4).
#[derive(Debug, Default)]
pub struct ProgramDb {
    documents: IndexMap<FileId, Document>,
}

impl ProgramDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, document: Document) {
        self.documents.insert(document.file_id, document);
    }

    pub fn document(&self, file_id: FileId) -> Option<&Document> {
        self.documents.get(&file_id)
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    /// Resolve an unqualified name within `file_id`. A name present as both
    /// a module and a device is ambiguous (§4.3).
    pub fn lookup(&self, file_id: FileId, symbol: &str) -> Result<SymbolEntry<'_>, SymbolError> {
        let document = self
            .documents
            .get(&file_id)
            .ok_or_else(|| SymbolError::UnresolvedUnqualified(symbol.to_string()))?;

        let module = document.modules.get(symbol);
        let device = document.devices.get(symbol);

        match (module, device) {
            (Some(_), Some(_)) => Err(SymbolError::AmbiguousReference(symbol.to_string())),
            (Some(m), None) => Ok(SymbolEntry {
                kind: SymbolKind::Module,
                file_id,
                definition: Definition::Module(m),
            }),
            (None, Some(d)) => Ok(SymbolEntry {
                kind: SymbolKind::Device,
                file_id,
                definition: Definition::Device(d),
            }),
            (None, None) => Err(SymbolError::UnresolvedUnqualified(symbol.to_string())),
        }
    }
}

/// Per-file mapping from import alias to the file it resolves to, used for
/// qualified `alias.symbol` references (§4.3 "NameEnv").
#[derive(Debug, Clone, Default)]
pub struct NameEnv {
    aliases: AHashMap<String, FileId>,
}

impl NameEnv {
    pub fn from_document(document: &Document) -> Self {
        let aliases = document
            .imports
            .iter()
            .map(|(alias, file_id)| (alias.clone(), *file_id))
            .collect();
        Self { aliases }
    }

    pub fn resolve_alias(&self, alias: &str) -> Option<FileId> {
        self.aliases.get(alias).copied()
    }
}

/// Resolve a raw instance reference (`"ref"` or `"alias.ref"`) against the
/// local file first, then via `name_env` + `program` for the qualified form
/// (§4.4 step 3 "resolve ref via local table, then via NameEnv+ProgramDB").
pub fn resolve_reference<'a>(
    program: &'a ProgramDb,
    local_file_id: FileId,
    name_env: &NameEnv,
    raw_ref: &str,
) -> Result<SymbolEntry<'a>, SymbolError> {
    if let Some((alias, symbol)) = raw_ref.split_once('.') {
        let file_id = name_env
            .resolve_alias(alias)
            .ok_or_else(|| SymbolError::UnknownAlias(alias.to_string()))?;
        return program.lookup(file_id, symbol).map_err(|_| SymbolError::UnresolvedQualified {
            alias: alias.to_string(),
            symbol: symbol.to_string(),
        });
    }
    program.lookup(local_file_id, raw_ref)
}

#[cfg(test)]
mod tests {
    use super::*;
    use asdl_ast::{DeviceDecl, ModuleDecl};

    fn doc_with(file_id: u32) -> Document {
        Document::new(FileId::new(file_id))
    }

    #[test]
    fn lookup_distinguishes_module_and_device() {
        let mut doc = doc_with(1);
        doc.modules.insert("inv".to_string(), ModuleDecl::new("inv"));
        let mut db = ProgramDb::new();
        db.insert(doc);

        let entry = db.lookup(FileId::new(1), "inv").unwrap();
        assert_eq!(entry.kind, SymbolKind::Module);
    }

    #[test]
    fn lookup_reports_ambiguous_when_both_kinds_share_a_name() {
        let mut doc = doc_with(1);
        doc.modules.insert("x".to_string(), ModuleDecl::new("x"));
        doc.devices.insert("x".to_string(), DeviceDecl::new("x"));
        let mut db = ProgramDb::new();
        db.insert(doc);

        let result = db.lookup(FileId::new(1), "x");
        assert_eq!(result.unwrap_err(), SymbolError::AmbiguousReference("x".to_string()));
    }

    #[test]
    fn qualified_reference_resolves_through_alias() {
        let mut imported = doc_with(2);
        imported.devices.insert("nfet".to_string(), DeviceDecl::new("nfet"));

        let mut local = doc_with(1);
        local.imports.insert("pdk".to_string(), FileId::new(2));

        let mut db = ProgramDb::new();
        db.insert(imported);
        db.insert(local.clone());

        let env = NameEnv::from_document(&local);
        let entry = resolve_reference(&db, FileId::new(1), &env, "pdk.nfet").unwrap();
        assert_eq!(entry.kind, SymbolKind::Device);
    }

    #[test]
    fn unknown_alias_is_rejected() {
        let local = doc_with(1);
        let db = ProgramDb::new();
        let env = NameEnv::from_document(&local);
        let err = resolve_reference(&db, FileId::new(1), &env, "pdk.nfet").unwrap_err();
        assert_eq!(err, SymbolError::UnknownAlias("pdk".to_string()));
    }
}
