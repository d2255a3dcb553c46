//! Tab routing filters
//!
//! The wire type [`FilterNode`] is fully recursive, but tabs only ever carry
//! the canonical two-level shape:
//!
//! ```text
//! and[ or[leaf, leaf, ...], or[leaf, ...], ... ]
//! ```
//!
//! A message belongs to a tab when it satisfies every group, and a group is
//! satisfied by any of its leaves. An empty outer `and` matches everything.
//! Matching runs in the backend; this module owns the shape, the editing
//! operations and the wire contract.
//!
//! [`FilterTree`] is the editor model: a flat list of groups, each a flat list
//! of leaves, so a non-canonical tree cannot be built through it.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Maximum number of groups in a tree (one per palette entry)
pub const GROUP_CAPACITY: usize = 5;

/// Visual identity of a filter group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupStyle {
    pub label: char,
    pub color: &'static str,
}

/// Group palette, indexed by group position
pub const GROUP_PALETTE: [GroupStyle; GROUP_CAPACITY] = [
    GroupStyle {
        label: 'A',
        color: "#D6E6FF",
    },
    GroupStyle {
        label: 'B',
        color: "#D7F9F8",
    },
    GroupStyle {
        label: 'C',
        color: "#FFFFEA",
    },
    GroupStyle {
        label: 'D',
        color: "#E5D4EF",
    },
    GroupStyle {
        label: 'E',
        color: "#FBE0E0",
    },
];

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

/// A single matchable attribute of a chat message
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum FilterLeaf {
    Channel(u32),
    Player(String),
    Word(String),
    Item(u32),
}

/// Leaf tag, used when the editor adds a blank leaf of a given kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    Channel,
    Player,
    Word,
    Item,
}

impl FilterKind {
    pub fn label(&self) -> &'static str {
        match self {
            FilterKind::Channel => "Channel",
            FilterKind::Player => "Player",
            FilterKind::Word => "Word",
            FilterKind::Item => "Item",
        }
    }
}

impl FilterLeaf {
    /// Blank leaf of the given kind, as inserted by the editor
    pub fn blank(kind: FilterKind) -> Self {
        match kind {
            FilterKind::Channel => FilterLeaf::Channel(0),
            FilterKind::Player => FilterLeaf::Player(String::new()),
            FilterKind::Word => FilterLeaf::Word(String::new()),
            FilterKind::Item => FilterLeaf::Item(0),
        }
    }

    pub fn kind(&self) -> FilterKind {
        match self {
            FilterLeaf::Channel(_) => FilterKind::Channel,
            FilterLeaf::Player(_) => FilterKind::Player,
            FilterLeaf::Word(_) => FilterKind::Word,
            FilterLeaf::Item(_) => FilterKind::Item,
        }
    }
}

/// Recursive boolean filter expression, as stored and exchanged with the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterNode {
    Leaf(FilterLeaf),
    And(Vec<FilterNode>),
    Or(Vec<FilterNode>),
}

impl FilterNode {
    /// The "match everything" sentinel
    pub fn match_all() -> Self {
        FilterNode::And(Vec::new())
    }

    /// Check that this node is `and[or[leaf*]*]` with at most
    /// [`GROUP_CAPACITY`] groups.
    ///
    /// The error names the first offending position, e.g. `and[1].or[0]`.
    pub fn validate_canonical(&self) -> Result<()> {
        let groups = match self {
            FilterNode::And(groups) => groups,
            FilterNode::Or(_) => {
                return Err(Error::invalid_filter("root", "top-level node must be and, found or"))
            }
            FilterNode::Leaf(_) => {
                return Err(Error::invalid_filter(
                    "root",
                    "top-level node must be and, found a leaf",
                ))
            }
        };

        if groups.len() > GROUP_CAPACITY {
            return Err(Error::invalid_filter(
                "root",
                format!(
                    "{} groups exceed the limit of {}",
                    groups.len(),
                    GROUP_CAPACITY
                ),
            ));
        }

        for (i, group) in groups.iter().enumerate() {
            let leaves = match group {
                FilterNode::Or(leaves) => leaves,
                FilterNode::And(_) => {
                    return Err(Error::invalid_filter(
                        format!("and[{i}]"),
                        "and is only allowed at the top level",
                    ))
                }
                FilterNode::Leaf(_) => {
                    return Err(Error::invalid_filter(
                        format!("and[{i}]"),
                        "expected an or group, found a leaf",
                    ))
                }
            };

            for (j, leaf) in leaves.iter().enumerate() {
                match leaf {
                    FilterNode::Leaf(_) => {}
                    FilterNode::And(_) => {
                        return Err(Error::invalid_filter(
                            format!("and[{i}].or[{j}]"),
                            "and is only allowed at the top level",
                        ))
                    }
                    FilterNode::Or(_) => {
                        return Err(Error::invalid_filter(
                            format!("and[{i}].or[{j}]"),
                            "or groups may only contain leaves",
                        ))
                    }
                }
            }
        }

        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Editor model
// ─────────────────────────────────────────────────────────────────────────────

/// One `or` group of leaves
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterGroup {
    leaves: Vec<FilterLeaf>,
}

impl FilterGroup {
    pub fn new(leaves: Vec<FilterLeaf>) -> Self {
        Self { leaves }
    }

    pub fn leaves(&self) -> &[FilterLeaf] {
        &self.leaves
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }
}

/// Canonical AND-of-ORs filter being edited
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterTree {
    groups: Vec<FilterGroup>,
}

impl FilterTree {
    /// Empty tree (matches everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the editor model from a wire tree, rejecting non-canonical shapes
    pub fn from_wire(node: &FilterNode) -> Result<Self> {
        node.validate_canonical()?;

        let groups = match node {
            FilterNode::And(groups) => groups
                .iter()
                .filter_map(|group| match group {
                    FilterNode::Or(leaves) => Some(FilterGroup::new(
                        leaves
                            .iter()
                            .filter_map(|leaf| match leaf {
                                FilterNode::Leaf(leaf) => Some(leaf.clone()),
                                _ => None,
                            })
                            .collect(),
                    )),
                    _ => None,
                })
                .collect::<Vec<_>>(),
            _ => Vec::new(),
        };

        Ok(Self { groups })
    }

    /// Like [`FilterTree::from_wire`], treating a missing tree as match-everything
    pub fn from_optional(node: Option<&FilterNode>) -> Result<Self> {
        match node {
            Some(node) => Self::from_wire(node),
            None => Ok(Self::new()),
        }
    }

    pub fn to_wire(&self) -> FilterNode {
        FilterNode::And(
            self.groups
                .iter()
                .map(|group| {
                    FilterNode::Or(
                        group
                            .leaves
                            .iter()
                            .cloned()
                            .map(FilterNode::Leaf)
                            .collect(),
                    )
                })
                .collect(),
        )
    }

    pub fn groups(&self) -> &[FilterGroup] {
        &self.groups
    }

    pub fn group(&self, index: usize) -> Option<&FilterGroup> {
        self.groups.get(index)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Whether another group fits in the palette
    pub fn can_add_group(&self) -> bool {
        self.groups.len() < GROUP_CAPACITY
    }

    /// Palette entry for a group position
    pub fn group_style(index: usize) -> Option<GroupStyle> {
        GROUP_PALETTE.get(index).copied()
    }

    // ─────────────────────────────────────────────────────────
    // Group operations
    // ─────────────────────────────────────────────────────────

    /// Append an empty group, returning its index
    pub fn create_group(&mut self) -> Result<usize> {
        self.ensure_capacity()?;
        self.groups.push(FilterGroup::default());
        Ok(self.groups.len() - 1)
    }

    pub fn delete_group(&mut self, index: usize) -> Result<FilterGroup> {
        self.check_group(index)?;
        Ok(self.groups.remove(index))
    }

    /// Append a deep copy of a group, returning the copy's index
    pub fn duplicate_group(&mut self, index: usize) -> Result<usize> {
        self.check_group(index)?;
        self.ensure_capacity()?;
        let copy = self.groups[index].clone();
        self.groups.push(copy);
        Ok(self.groups.len() - 1)
    }

    // ─────────────────────────────────────────────────────────
    // Leaf operations
    // ─────────────────────────────────────────────────────────

    /// Append a leaf to a group, returning its index within the group
    pub fn add_leaf(&mut self, group: usize, leaf: FilterLeaf) -> Result<usize> {
        let group = self.group_mut(group)?;
        group.leaves.push(leaf);
        Ok(group.leaves.len() - 1)
    }

    /// Replace a leaf wholesale; the kind may change
    pub fn update_leaf(&mut self, group: usize, leaf: usize, value: FilterLeaf) -> Result<()> {
        let slot = self.leaf_mut(group, leaf)?;
        *slot = value;
        Ok(())
    }

    pub fn remove_leaf(&mut self, group: usize, leaf: usize) -> Result<FilterLeaf> {
        self.leaf_mut(group, leaf)?;
        Ok(self.groups[group].leaves.remove(leaf))
    }

    /// Append a copy of a leaf to the end of its group
    pub fn duplicate_leaf(&mut self, group: usize, leaf: usize) -> Result<usize> {
        let copy = self.leaf_mut(group, leaf)?.clone();
        self.add_leaf(group, copy)
    }

    // ─────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────

    fn ensure_capacity(&self) -> Result<()> {
        if self.can_add_group() {
            Ok(())
        } else {
            Err(Error::FilterGroupLimit {
                max: GROUP_CAPACITY,
            })
        }
    }

    fn check_group(&self, index: usize) -> Result<()> {
        if index < self.groups.len() {
            Ok(())
        } else {
            Err(Error::filter_index(format!(
                "group {} (tree has {})",
                index,
                self.groups.len()
            )))
        }
    }

    fn group_mut(&mut self, index: usize) -> Result<&mut FilterGroup> {
        self.check_group(index)?;
        Ok(&mut self.groups[index])
    }

    fn leaf_mut(&mut self, group: usize, leaf: usize) -> Result<&mut FilterLeaf> {
        let group_ref = self.group_mut(group)?;
        let count = group_ref.leaves.len();
        group_ref.leaves.get_mut(leaf).ok_or_else(|| {
            Error::filter_index(format!(
                "leaf {} in group {} (group has {})",
                leaf, group, count
            ))
        })
    }
}

impl From<&FilterTree> for FilterNode {
    fn from(tree: &FilterTree) -> Self {
        tree.to_wire()
    }
}
