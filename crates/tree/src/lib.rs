//! Folder tree reconstruction from a flat recursive listing.
//!
//! The source provider returns every entry beneath a root as one flat list.
//! [`FolderTree::build`] turns that list into an arena of nodes addressed by
//! [`NodeId`], with the root at index 0 and children kept in listing order.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use docferry_model::RemoteEntry;
use tracing::debug;

/// Index of a node in the arena.
pub type NodeId = usize;

/// What a node holds.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Folder {
        children: Vec<NodeId>,
    },
    File {
        size: u64,
        remote_id: Option<String>,
        modified_time: Option<DateTime<Utc>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    /// Lowercase canonical path, unique within the tree.
    pub path: String,
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
}

impl Node {
    pub fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder { .. })
    }

    /// File size, or `None` for folders.
    pub fn size(&self) -> Option<u64> {
        match self.kind {
            NodeKind::File { size, .. } => Some(size),
            NodeKind::Folder { .. } => None,
        }
    }

    fn segment(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or_default()
    }
}

/// Rooted tree mirroring the remote hierarchy beneath a root path.
#[derive(Debug, Clone, PartialEq)]
pub struct FolderTree {
    nodes: Vec<Node>,
    by_path: HashMap<String, NodeId>,
}

impl FolderTree {
    pub const ROOT: NodeId = 0;

    /// Builds the tree for `root_path` from a flat listing.
    ///
    /// Entries outside the root and the entry denoting the root itself are
    /// dropped. Missing intermediate folders are created on the way down, so
    /// entry order does not matter.
    pub fn build<'a, I>(root_path: &str, entries: I) -> Self
    where
        I: IntoIterator<Item = &'a RemoteEntry>,
    {
        let root = root_path.trim_end_matches('/').to_lowercase();
        let root_name = root.rsplit('/').next().unwrap_or_default().to_string();
        let mut tree = Self {
            nodes: vec![Node {
                name: root_name,
                path: root.clone(),
                parent: None,
                kind: NodeKind::Folder {
                    children: Vec::new(),
                },
            }],
            by_path: HashMap::from([(root.clone(), Self::ROOT)]),
        };

        for entry in entries {
            tree.insert(&root, entry);
        }
        tree
    }

    fn insert(&mut self, root: &str, entry: &RemoteEntry) {
        let path = entry.path_lower.to_lowercase();
        if path == root {
            return;
        }
        let Some(rel) = path
            .strip_prefix(root)
            .and_then(|rest| rest.strip_prefix('/'))
        else {
            debug!(path = %entry.path_lower, root = %root, "entry outside root, ignoring");
            return;
        };

        let segments: Vec<&str> = rel.split('/').filter(|s| !s.is_empty()).collect();
        let Some((last, intermediate)) = segments.split_last() else {
            return;
        };

        let mut cursor = Self::ROOT;
        let mut current = root.to_string();
        for segment in intermediate {
            current.push('/');
            current.push_str(segment);
            match self.folder_child(cursor, segment, &current) {
                Some(id) => cursor = id,
                None => {
                    debug!(path = %entry.path_lower, "path crosses a file, ignoring");
                    return;
                }
            }
        }
        current.push('/');
        current.push_str(last);

        if entry.is_file() {
            if self.child_by_segment(cursor, last).is_some() {
                debug!(path = %current, "duplicate entry, ignoring");
                return;
            }
            self.push_child(
                cursor,
                Node {
                    name: entry.name.clone(),
                    path: current,
                    parent: Some(cursor),
                    kind: NodeKind::File {
                        size: entry.size.unwrap_or(0),
                        remote_id: entry.id.clone(),
                        modified_time: entry.modified_time,
                    },
                },
            );
        } else if let Some(id) = self.folder_child(cursor, last, &current) {
            // Folders created from a bare path segment only know the
            // lowercase name; the entry carries the display name.
            self.nodes[id].name = entry.name.clone();
        }
    }

    /// Finds the folder named `segment` under `parent`, creating it if absent.
    /// Returns `None` when a file already occupies that name.
    fn folder_child(&mut self, parent: NodeId, segment: &str, path: &str) -> Option<NodeId> {
        if let Some(id) = self.child_by_segment(parent, segment) {
            return self.nodes[id].is_folder().then_some(id);
        }
        Some(self.push_child(
            parent,
            Node {
                name: segment.to_string(),
                path: path.to_string(),
                parent: Some(parent),
                kind: NodeKind::Folder {
                    children: Vec::new(),
                },
            },
        ))
    }

    fn child_by_segment(&self, parent: NodeId, segment: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&id| self.nodes[id].segment() == segment)
    }

    fn push_child(&mut self, parent: NodeId, node: Node) -> NodeId {
        let id = self.nodes.len();
        self.by_path.insert(node.path.clone(), id);
        self.nodes.push(node);
        if let NodeKind::Folder { children } = &mut self.nodes[parent].kind {
            children.push(id);
        }
        id
    }

    pub fn root(&self) -> &Node {
        &self.nodes[Self::ROOT]
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Children of a folder in listing order. Empty for files and unknown ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.nodes.get(id).map(|n| &n.kind) {
            Some(NodeKind::Folder { children }) => children.as_slice(),
            _ => &[],
        }
    }

    /// Every folder except the root, each parent before its children.
    pub fn folders_depth_first(&self) -> Vec<NodeId> {
        self.walk(|node| node.is_folder())
    }

    /// Every file, in depth-first listing order.
    pub fn files(&self) -> Vec<NodeId> {
        self.walk(|node| !node.is_folder())
    }

    fn walk(&self, keep: impl Fn(&Node) -> bool) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(Self::ROOT).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if keep(node) {
                out.push(id);
            }
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// Looks a node up by path, case-insensitively.
    pub fn find(&self, path: &str) -> Option<NodeId> {
        self.by_path.get(&path.to_lowercase()).copied()
    }

    /// Path of the folder containing `path`, if `path` is in the tree.
    pub fn parent_path(&self, path: &str) -> Option<&str> {
        let id = self.find(path)?;
        let parent = self.nodes[id].parent?;
        Some(&self.nodes[parent].path)
    }

    /// Total number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` when the root has no descendants.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }
}
