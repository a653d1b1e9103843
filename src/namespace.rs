//! Namespace tree (spec.md §3.2, §4.E): core-owned topology over host-owned
//! variable/command storage.
//!
//! The tree itself (parent/child path edges) is plain Rust bookkeeping, the
//! same way the teacher's `Namespaces` type owns its own `Vec<Namespace>` —
//! only the variable/command table *inside* each node crosses into
//! [`crate::hostops::HostOps`] via its [`crate::hostops::NsHandle`].

use std::collections::BTreeMap;

use crate::errors::CoreError;
use crate::hostops::{HostOps, NsHandle};

/// Index of a namespace node within [`NamespaceTree`]'s arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

struct Node {
    name: String,
    parent: Option<NodeId>,
    children: BTreeMap<String, NodeId>,
    storage: NsHandle,
    exported: Vec<String>,
}

/// The namespace tree, rooted at `::`. Namespaces are created on demand by
/// qualified-name resolution and destroyed only by explicit request
/// (`namespace delete`).
pub struct NamespaceTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl NamespaceTree {
    pub fn new<H: HostOps>(host: &mut H) -> Result<Self, CoreError> {
        let storage = host.ns_table_create().map_err(|e| CoreError::new(crate::errors::ErrorKind::Name, e.message))?;
        let root = Node { name: String::new(), parent: None, children: BTreeMap::new(), storage, exported: Vec::new() };
        Ok(Self { nodes: vec![root], root: NodeId(0) })
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[must_use]
    pub fn storage(&self, id: NodeId) -> NsHandle {
        self.nodes[id.0].storage
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Fully-qualified `::a::b::c` name of `id`.
    #[must_use]
    pub fn qualified_name(&self, id: NodeId) -> String {
        if id == self.root {
            return "::".to_string();
        }
        let mut parts = Vec::new();
        let mut cur = Some(id);
        while let Some(c) = cur {
            if c == self.root {
                break;
            }
            parts.push(self.nodes[c.0].name.clone());
            cur = self.nodes[c.0].parent;
        }
        parts.reverse();
        format!("::{}", parts.join("::"))
    }

    /// Splits a possibly-qualified name into its namespace path segments and
    /// the trailing simple name, per spec.md §3.2 addressing rules.
    #[must_use]
    pub fn split_qualified(name: &str) -> (bool, Vec<&str>, &str) {
        let absolute = name.starts_with("::");
        let trimmed = name.trim_start_matches("::");
        let mut parts: Vec<&str> = trimmed.split("::").filter(|s| !s.is_empty()).collect();
        let simple = parts.pop().unwrap_or("");
        (absolute, parts, simple)
    }

    /// Resolves a namespace path from `from`, creating intermediate
    /// namespaces as needed (spec.md: "created on demand").
    pub fn ensure_path<H: HostOps>(&mut self, host: &mut H, from: NodeId, path: &[&str], absolute: bool) -> Result<NodeId, CoreError> {
        let mut cur = if absolute { self.root } else { from };
        for seg in path {
            cur = self.ensure_child(host, cur, seg)?;
        }
        Ok(cur)
    }

    /// Resolves a path without creating anything; `None` if any segment is
    /// missing.
    #[must_use]
    pub fn resolve_path(&self, from: NodeId, path: &[&str], absolute: bool) -> Option<NodeId> {
        let mut cur = if absolute { self.root } else { from };
        for seg in path {
            cur = *self.nodes[cur.0].children.get(*seg)?;
        }
        Some(cur)
    }

    fn ensure_child<H: HostOps>(&mut self, host: &mut H, parent: NodeId, name: &str) -> Result<NodeId, CoreError> {
        if let Some(&existing) = self.nodes[parent.0].children.get(name) {
            return Ok(existing);
        }
        let storage = host.ns_table_create().map_err(|e| CoreError::new(crate::errors::ErrorKind::Name, e.message))?;
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node { name: name.to_string(), parent: Some(parent), children: BTreeMap::new(), storage, exported: Vec::new() });
        self.nodes[parent.0].children.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.nodes[parent.0].children.get(name).copied()
    }

    pub fn children(&self, parent: NodeId) -> impl Iterator<Item = (&str, NodeId)> {
        self.nodes[parent.0].children.iter().map(|(k, &v)| (k.as_str(), v))
    }

    /// Deletes a namespace subtree, releasing all of its storage handles.
    /// The node entries themselves are left as tombstones in the arena
    /// (their ids are never reused) so existing `NodeId`s elsewhere don't
    /// dangle into reused slots; they simply become unreachable from the
    /// tree once detached from their parent.
    pub fn delete<H: HostOps>(&mut self, host: &mut H, id: NodeId) {
        if id == self.root {
            return;
        }
        let child_ids: Vec<NodeId> = self.nodes[id.0].children.values().copied().collect();
        for c in child_ids {
            self.delete(host, c);
        }
        host.ns_table_delete(self.nodes[id.0].storage);
        if let Some(parent) = self.nodes[id.0].parent {
            self.nodes[parent.0].children.retain(|_, v| *v != id);
        }
    }

    pub fn set_exported(&mut self, id: NodeId, patterns: Vec<String>) {
        self.nodes[id.0].exported = patterns;
    }

    #[must_use]
    pub fn exported(&self, id: NodeId) -> &[String] {
        &self.nodes[id.0].exported
    }

    #[must_use]
    pub fn simple_name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem_hostops::MemHost;

    #[test]
    fn root_qualified_name_is_double_colon() {
        let mut host = MemHost::new();
        let tree = NamespaceTree::new(&mut host).unwrap();
        assert_eq!(tree.qualified_name(tree.root()), "::");
    }

    #[test]
    fn ensure_path_creates_nested_namespaces_on_demand() {
        let mut host = MemHost::new();
        let mut tree = NamespaceTree::new(&mut host).unwrap();
        let id = tree.ensure_path(&mut host, tree.root(), &["foo", "bar"], true).unwrap();
        assert_eq!(tree.qualified_name(id), "::foo::bar");
        assert_eq!(tree.resolve_path(tree.root(), &["foo", "bar"], true), Some(id));
    }

    #[test]
    fn split_qualified_name() {
        assert_eq!(NamespaceTree::split_qualified("::foo::bar::baz"), (true, vec!["foo", "bar"], "baz"));
        assert_eq!(NamespaceTree::split_qualified("baz"), (false, vec![], "baz"));
    }

    #[test]
    fn delete_removes_subtree_and_frees_storage() {
        let mut host = MemHost::new();
        let mut tree = NamespaceTree::new(&mut host).unwrap();
        let id = tree.ensure_path(&mut host, tree.root(), &["foo"], true).unwrap();
        tree.delete(&mut host, id);
        assert_eq!(tree.child(tree.root(), "foo"), None);
    }
}
