//! Module graph: classified files linked by their resolved imports.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;

use super::imports::ImportStatement;
use crate::core::SourceKind;
use crate::utils::path::to_slash;

/// URL prefix of stable module ids, resolved through the import map.
pub const MODULE_PREFIX: &str = "/@module/";

/// What an import statement points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportTarget {
    /// Another unit of the graph.
    Local(PathBuf),
    /// A `.json` file, inlined as a literal.
    Json(PathBuf),
    /// Left for the browser to resolve.
    External,
}

#[derive(Debug, Clone)]
pub struct Import {
    pub statement: ImportStatement,
    pub target: ImportTarget,
}

/// One classified source file.
#[derive(Debug, Clone)]
pub struct ModuleNode {
    pub path: PathBuf,
    pub kind: SourceKind,
    /// Script text as scanned; import spans index into it.
    pub source: Option<String>,
    pub imports: Vec<Import>,
}

impl ModuleNode {
    pub fn new(path: PathBuf, kind: SourceKind) -> Self {
        Self {
            path,
            kind,
            source: None,
            imports: Vec::new(),
        }
    }

    /// Local units this node depends on, in source order.
    pub fn local_imports(&self) -> impl Iterator<Item = &Path> {
        self.imports.iter().filter_map(|import| match &import.target {
            ImportTarget::Local(path) => Some(path.as_path()),
            _ => None,
        })
    }
}

/// Every unit of one build, keyed by absolute path.
#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    root: PathBuf,
    nodes: BTreeMap<PathBuf, ModuleNode>,
    entries: Vec<(String, PathBuf)>,
}

impl ModuleGraph {
    /// Empty graph; module ids are relative to `root`.
    pub fn new(root: &Path, entries: &BTreeMap<String, PathBuf>) -> Self {
        Self {
            root: root.to_path_buf(),
            nodes: BTreeMap::new(),
            entries: entries
                .iter()
                .map(|(name, path)| (name.clone(), path.clone()))
                .collect(),
        }
    }

    pub fn insert(&mut self, node: ModuleNode) {
        self.nodes.insert(node.path.clone(), node);
    }

    #[inline]
    pub fn get(&self, path: &Path) -> Option<&ModuleNode> {
        self.nodes.get(path)
    }

    #[inline]
    pub fn contains(&self, path: &Path) -> bool {
        self.nodes.contains_key(path)
    }

    pub fn get_mut(&mut self, path: &Path) -> Option<&mut ModuleNode> {
        self.nodes.get_mut(path)
    }

    /// Nodes of one kind, sorted by path.
    pub fn of_kind(&self, kind: SourceKind) -> impl Iterator<Item = &ModuleNode> {
        self.nodes.values().filter(move |node| node.kind == kind)
    }

    pub fn count(&self, kind: SourceKind) -> usize {
        self.of_kind(kind).count()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `(name, path)` of every entry, in name order.
    pub fn entries(&self) -> &[(String, PathBuf)] {
        &self.entries
    }

    pub fn entry_name(&self, path: &Path) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, entry)| entry == path)
            .map(|(name, _)| name.as_str())
    }

    /// Stable id under which a unit is imported: `/@module/<root-relative>`.
    pub fn module_id(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        format!("{MODULE_PREFIX}{}", to_slash(relative))
    }

    /// Entry key for entries, else the file name without its last extension.
    pub fn logical_name(&self, path: &Path) -> String {
        if let Some(name) = self.entry_name(path) {
            return name.to_string();
        }
        path.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".to_string())
    }

    /// Units reachable from the entries, dependencies before dependents.
    ///
    /// Post-order DFS over every import edge, entries visited in name
    /// order, imports in source order. Unreachable units are not listed.
    pub fn dependency_order(&self) -> Vec<&Path> {
        let mut visited = FxHashSet::default();
        let mut order = Vec::with_capacity(self.nodes.len());
        for (_, entry) in &self.entries {
            self.visit(entry, &mut visited, &mut order);
        }
        order
    }

    fn visit<'a>(&'a self, path: &Path, visited: &mut FxHashSet<&'a Path>, order: &mut Vec<&'a Path>) {
        let Some((key, node)) = self.nodes.get_key_value(path) else {
            return;
        };
        if !visited.insert(key.as_path()) {
            return;
        }
        for dep in node.local_imports() {
            self.visit(dep, visited, order);
        }
        order.push(key.as_path());
    }

    /// Stylesheets imported directly by an entry script.
    pub fn entry_styles(&self) -> BTreeSet<&Path> {
        self.entries
            .iter()
            .filter_map(|(_, entry)| self.nodes.get(entry))
            .flat_map(ModuleNode::local_imports)
            .filter(|dep| self.nodes.get(*dep).is_some_and(|n| n.kind.is_style()))
            .collect()
    }
}
