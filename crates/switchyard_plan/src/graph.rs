//! Compiled rule graphs.
//!
//! Nodes live in a flat vector and edges are indices into it, so cycles
//! need no shared ownership. A graph is immutable once built and can be
//! shared across threads.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use switchyard_rules::Rule;

/// Position of a node within its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeIndex(usize);

impl NodeIndex {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position as a plain integer
    pub fn get(self) -> usize {
        self.0
    }
}

/// A step bound to its rule, with both edges resolved
#[derive(Clone)]
pub struct RuleNode {
    name: String,
    rule_name: String,
    rule: Arc<dyn Rule>,
    on_true: NodeIndex,
    on_false: NodeIndex,
}

impl RuleNode {
    pub(crate) fn new(
        name: String,
        rule_name: String,
        rule: Arc<dyn Rule>,
        on_true: NodeIndex,
        on_false: NodeIndex,
    ) -> Self {
        Self {
            name,
            rule_name,
            rule,
            on_true,
            on_false,
        }
    }

    /// Step name as written, alias included
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registered rule name, alias removed
    pub fn rule_name(&self) -> &str {
        &self.rule_name
    }

    /// Bound rule
    pub fn rule(&self) -> &Arc<dyn Rule> {
        &self.rule
    }

    /// Next node when the rule returns true
    pub fn on_true(&self) -> NodeIndex {
        self.on_true
    }

    /// Next node when the rule returns false
    pub fn on_false(&self) -> NodeIndex {
        self.on_false
    }

    /// Next node for an outcome
    pub fn next(&self, outcome: bool) -> NodeIndex {
        if outcome { self.on_true } else { self.on_false }
    }
}

impl std::fmt::Debug for RuleNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleNode")
            .field("name", &self.name)
            .field("rule", &self.rule_name)
            .field("on_true", &self.on_true)
            .field("on_false", &self.on_false)
            .finish()
    }
}

/// Serializable shape of one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSummary {
    /// Step name
    pub name: String,
    /// Rule name
    pub rule: String,
    /// True target name
    pub on_true: String,
    /// False target name
    pub on_false: String,
}

/// Compiled rule set
#[derive(Debug, Clone)]
pub struct RuleGraph {
    nodes: Vec<RuleNode>,
    index: IndexMap<String, NodeIndex>,
    start: NodeIndex,
    end: NodeIndex,
    source: String,
}

impl RuleGraph {
    pub(crate) fn new(
        nodes: Vec<RuleNode>,
        index: IndexMap<String, NodeIndex>,
        start: NodeIndex,
        end: NodeIndex,
        source: String,
    ) -> Self {
        Self {
            nodes,
            index,
            start,
            end,
            source,
        }
    }

    /// Node at `index`
    pub fn get(&self, index: NodeIndex) -> Option<&RuleNode> {
        self.nodes.get(index.0)
    }

    /// Node by step name, ignoring case
    pub fn node(&self, name: &str) -> Option<&RuleNode> {
        self.index_of(name).and_then(|i| self.get(i))
    }

    /// Index of a step name, ignoring case
    pub fn index_of(&self, name: &str) -> Option<NodeIndex> {
        self.index.get(&name.to_ascii_uppercase()).copied()
    }

    /// The START node
    pub fn start(&self) -> NodeIndex {
        self.start
    }

    /// The END node
    pub fn end(&self) -> NodeIndex {
        self.end
    }

    /// Whether `index` is the END node
    pub fn is_end(&self, index: NodeIndex) -> bool {
        index == self.end
    }

    /// Nodes in definition order
    pub fn nodes(&self) -> &[RuleNode] {
        &self.nodes
    }

    /// Number of nodes, sentinels included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false; a graph holds at least START and END
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Normalized rule set text the graph was compiled from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Name of the node at `index`, or an empty string
    pub fn name_of(&self, index: NodeIndex) -> &str {
        self.get(index).map_or("", RuleNode::name)
    }

    /// Structural description of every node
    pub fn describe(&self) -> Vec<NodeSummary> {
        self.nodes
            .iter()
            .map(|node| NodeSummary {
                name: node.name.clone(),
                rule: node.rule_name.clone(),
                on_true: self.name_of(node.on_true).to_string(),
                on_false: self.name_of(node.on_false).to_string(),
            })
            .collect()
    }
}
