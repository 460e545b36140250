//! In-memory relationship and role facts
//!
//! Holds parent/child edges, gender marks and role grants behind one
//! `RwLock`. Child and parent lists keep insertion order so traversal
//! output is deterministic. For large data sets prefer a database-backed
//! store; this one targets small rule sets held entirely in memory.

use std::collections::{HashMap, HashSet, VecDeque};

use parking_lot::RwLock;

/// Transitive closure of a directed graph given as explicit edges.
///
/// Returns a map from node to the set of nodes it reaches. Every node that
/// appears in an edge gets an entry, including sinks that reach nothing.
pub fn closure_from_edges(edges: &[(&str, &str)]) -> HashMap<String, HashSet<String>> {
    let mut reach: HashMap<String, HashSet<String>> = HashMap::new();
    for (from, to) in edges {
        reach
            .entry((*from).to_string())
            .or_default()
            .insert((*to).to_string());
        reach.entry((*to).to_string()).or_default();
    }

    // Floyd-Warshall style expansion, small graphs only.
    let nodes: Vec<String> = reach.keys().cloned().collect();
    for k in &nodes {
        let via = reach.get(k).cloned().unwrap_or_default();
        for i in &nodes {
            if let Some(set) = reach.get_mut(i) {
                if set.contains(k.as_str()) {
                    set.extend(via.iter().cloned());
                }
            }
        }
    }
    reach
}

#[derive(Default)]
struct Facts {
    children: HashMap<String, Vec<String>>,
    parents: HashMap<String, Vec<String>>,
    male: HashSet<String>,
    female: HashSet<String>,
    roles: HashMap<String, HashSet<String>>,
}

/// Shared fact store for family relations and role grants.
///
/// All methods take `&self`; interior locking makes the store safe to share
/// behind an `Arc` between a dispatcher and the embedding application.
#[derive(Default)]
pub struct RuleStore {
    facts: RwLock<Facts>,
}

impl RuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a parent -> child edge. Duplicate edges are ignored.
    pub fn add_parent(&self, parent: impl Into<String>, child: impl Into<String>) {
        let parent = parent.into();
        let child = child.into();
        let mut facts = self.facts.write();
        let children = facts.children.entry(parent.clone()).or_default();
        if !children.contains(&child) {
            children.push(child.clone());
        }
        let parents = facts.parents.entry(child).or_default();
        if !parents.contains(&parent) {
            parents.push(parent);
        }
    }

    pub fn add_male(&self, name: impl Into<String>) {
        self.facts.write().male.insert(name.into());
    }

    pub fn add_female(&self, name: impl Into<String>) {
        self.facts.write().female.insert(name.into());
    }

    /// Direct children, in insertion order
    pub fn children_of(&self, person: &str) -> Vec<String> {
        self.facts
            .read()
            .children
            .get(person)
            .cloned()
            .unwrap_or_default()
    }

    /// Direct parents, in insertion order
    pub fn parents_of(&self, child: &str) -> Vec<String> {
        self.facts
            .read()
            .parents
            .get(child)
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_male(&self, name: &str) -> bool {
        self.facts.read().male.contains(name)
    }

    pub fn is_female(&self, name: &str) -> bool {
        self.facts.read().female.contains(name)
    }

    /// People sharing at least one parent with `name`, excluding `name` itself
    pub fn siblings_of(&self, name: &str) -> Vec<String> {
        let facts = self.facts.read();
        let mut siblings: Vec<String> = Vec::new();
        for parent in facts.parents.get(name).into_iter().flatten() {
            for child in facts.children.get(parent).into_iter().flatten() {
                if child.as_str() != name && !siblings.contains(child) {
                    siblings.push(child.clone());
                }
            }
        }
        siblings
    }

    /// All transitive children of `person`, in breadth-first discovery order
    pub fn descendants_of(&self, person: &str) -> Vec<String> {
        let facts = self.facts.read();
        walk(&facts.children, person)
    }

    /// All transitive parents of `person`, in breadth-first discovery order
    pub fn ancestors_of(&self, person: &str) -> Vec<String> {
        let facts = self.facts.read();
        walk(&facts.parents, person)
    }

    /// Grant `role` to `subject`
    pub fn assign_role(&self, role: impl Into<String>, subject: impl Into<String>) {
        self.facts
            .write()
            .roles
            .entry(role.into())
            .or_default()
            .insert(subject.into());
    }

    /// Grant `role` to `subject` and to every current descendant of `subject`.
    ///
    /// The grant is a snapshot: people added under `subject` later do not
    /// pick the role up retroactively.
    pub fn assign_role_inherit(&self, role: &str, subject: &str) {
        let descendants = self.descendants_of(subject);
        let mut facts = self.facts.write();
        let members = facts.roles.entry(role.to_string()).or_default();
        members.insert(subject.to_string());
        members.extend(descendants);
    }

    pub fn has_role(&self, role: &str, subject: &str) -> bool {
        self.facts
            .read()
            .roles
            .get(role)
            .map_or(false, |members| members.contains(subject))
    }

    /// Everyone holding `role`, sorted for stable output
    pub fn role_members(&self, role: &str) -> Vec<String> {
        let mut members: Vec<String> = self
            .facts
            .read()
            .roles
            .get(role)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default();
        members.sort();
        members
    }
}

/// Breadth-first reachability over an adjacency map. The start node itself
/// only appears in the output if some path leads back to it.
fn walk(edges: &HashMap<String, Vec<String>>, start: &str) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut order: Vec<String> = Vec::new();
    let mut queue: VecDeque<String> = edges.get(start).cloned().unwrap_or_default().into();
    while let Some(name) = queue.pop_front() {
        if !seen.insert(name.clone()) {
            continue;
        }
        if let Some(next) = edges.get(&name) {
            queue.extend(next.iter().cloned());
        }
        order.push(name);
    }
    order
}
