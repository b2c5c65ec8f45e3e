//! Denormalization: resolve relationship references into a graph of entities.
//!
//! Each call builds a [`ResolvedGraph`], an arena holding at most one node per
//! (type, id). The arena index doubles as the per-call memo: a reference seen
//! a second time reuses its node instead of being looked up again, which makes
//! cyclic graphs terminate and dedupes diamond-shaped ones. Identity of an
//! entity within one resolution is its [`NodeId`]. Nodes awaiting their links
//! sit on an explicit work stack, so chain length never grows the call stack.
//!
//! Missing targets:
//!
//! - singular relation, tolerant mode: the relation resolves to nothing;
//! - singular relation, strict mode: [`StoreError::NotFound`];
//! - element of a to-many relation, either mode: the element is dropped.

use std::collections::{BTreeMap, HashMap, HashSet};

use bazaar_interchange::{AttrValue, Attributes, Relationship, ResourceId, ResourceRef};
use serde_json::{json, Map, Value};

use crate::error::StoreError;
use crate::record::StoredResource;
use crate::traits::EntitySource;

/// How to treat references to resources that were never merged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strictness {
    /// Missing targets resolve to nothing. Used for list views.
    #[default]
    Tolerant,
    /// Missing roots and singular relations are an error. Used where exactly
    /// one resource is mandatory, e.g. the current user.
    Strict,
}

/// Index of a node in a [`ResolvedGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

/// A resolved relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Link {
    One(NodeId),
    Many(Vec<NodeId>),
    /// Explicitly empty, or the target is unknown in tolerant mode.
    Nothing,
}

#[derive(Debug, Clone)]
struct Node {
    reference: ResourceRef,
    attributes: Attributes,
    relationships: BTreeMap<String, Link>,
}

/// Arena of entities resolved by one call.
#[derive(Debug, Clone, Default)]
pub struct ResolvedGraph {
    nodes: Vec<Node>,
    index: HashMap<ResourceRef, NodeId>,
}

impl ResolvedGraph {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn entity(&self, id: NodeId) -> Option<Entity<'_>> {
        (id.0 < self.nodes.len()).then_some(Entity { graph: self, id })
    }

    /// Look up the node resolved for `reference` anywhere in this graph.
    pub fn find(&self, reference: &ResourceRef) -> Option<Entity<'_>> {
        let id = *self.index.get(reference)?;
        self.entity(id)
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}

/// Result of [`resolve`]: the graph plus one root slot per input reference.
#[derive(Debug, Clone)]
pub struct Resolution {
    graph: ResolvedGraph,
    roots: Vec<Option<NodeId>>,
}

impl Resolution {
    /// Entities in input order; `None` for roots missing in tolerant mode.
    pub fn entities(&self) -> Vec<Option<Entity<'_>>> {
        self.roots
            .iter()
            .map(|root| root.and_then(|id| self.graph.entity(id)))
            .collect()
    }

    pub fn get(&self, index: usize) -> Option<Entity<'_>> {
        let id = (*self.roots.get(index)?)?;
        self.graph.entity(id)
    }

    pub fn first(&self) -> Option<Entity<'_>> {
        self.get(0)
    }

    /// Number of input references.
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn graph(&self) -> &ResolvedGraph {
        &self.graph
    }

    /// Present entities rendered as nested JSON, in input order.
    pub fn to_json(&self) -> Value {
        Value::Array(
            self.entities()
                .into_iter()
                .map(|e| e.map_or(Value::Null, |e| e.to_json()))
                .collect(),
        )
    }
}

/// Borrowed view of one resolved entity.
#[derive(Debug, Clone, Copy)]
pub struct Entity<'g> {
    graph: &'g ResolvedGraph,
    id: NodeId,
}

impl PartialEq for Entity<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.graph, other.graph) && self.id == other.id
    }
}

impl Eq for Entity<'_> {}

impl<'g> Entity<'g> {
    pub fn node_id(&self) -> NodeId {
        self.id
    }

    pub fn reference(&self) -> &'g ResourceRef {
        &self.graph.node(self.id).reference
    }

    pub fn kind(&self) -> &'g str {
        &self.reference().kind
    }

    pub fn id(&self) -> &'g ResourceId {
        &self.reference().id
    }

    pub fn attributes(&self) -> &'g Attributes {
        &self.graph.node(self.id).attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&'g AttrValue> {
        self.attributes().get(key)
    }

    /// Whether the resource carries the relationship at all (even if empty).
    pub fn has_relationship(&self, name: &str) -> bool {
        self.graph.node(self.id).relationships.contains_key(name)
    }

    pub fn relationship_names(&self) -> impl Iterator<Item = &'g str> {
        self.graph
            .node(self.id)
            .relationships
            .keys()
            .map(|k| k.as_str())
    }

    /// The single related entity, if the relation is to-one and resolved.
    pub fn related(&self, name: &str) -> Option<Entity<'g>> {
        match self.graph.node(self.id).relationships.get(name)? {
            Link::One(id) => self.graph.entity(*id),
            _ => None,
        }
    }

    /// The related entities in wire order. A to-one relation yields at most one.
    pub fn related_many(&self, name: &str) -> Vec<Entity<'g>> {
        match self.graph.node(self.id).relationships.get(name) {
            Some(Link::Many(ids)) => ids.iter().filter_map(|id| self.graph.entity(*id)).collect(),
            Some(Link::One(id)) => self.graph.entity(*id).into_iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Render as `{id, type, attributes, <relation>...}`. Each entity is
    /// rendered in full at its first occurrence only; every later occurrence,
    /// cyclic or not, is an `{id, type}` stub. Output size is therefore
    /// linear in the reachable graph.
    pub fn to_json(&self) -> Value {
        let mut visited = HashSet::new();
        self.render(&mut visited)
    }

    fn render(&self, visited: &mut HashSet<NodeId>) -> Value {
        let reference = self.reference();
        if !visited.insert(self.id) {
            return ref_stub(reference);
        }

        let mut obj = Map::new();
        obj.insert("id".to_string(), json!({ "uuid": reference.id.as_str() }));
        obj.insert("type".to_string(), Value::String(reference.kind.clone()));
        obj.insert(
            "attributes".to_string(),
            Value::Object(
                self.attributes()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        );
        for (name, link) in &self.graph.node(self.id).relationships {
            let rendered = match link {
                Link::One(id) => Entity {
                    graph: self.graph,
                    id: *id,
                }
                .render(visited),
                Link::Many(ids) => Value::Array(
                    ids.iter()
                        .map(|id| {
                            Entity {
                                graph: self.graph,
                                id: *id,
                            }
                            .render(visited)
                        })
                        .collect(),
                ),
                Link::Nothing => Value::Null,
            };
            obj.insert(name.clone(), rendered);
        }

        Value::Object(obj)
    }
}

fn ref_stub(reference: &ResourceRef) -> Value {
    json!({ "id": { "uuid": reference.id.as_str() }, "type": reference.kind })
}

/// Resolve `refs` against `source`.
pub fn resolve<S>(
    source: &S,
    refs: &[ResourceRef],
    strictness: Strictness,
) -> Result<Resolution, StoreError>
where
    S: EntitySource + ?Sized,
{
    let mut resolver = Resolver {
        source,
        strictness,
        graph: ResolvedGraph::default(),
        pending: Vec::new(),
    };
    let mut roots = Vec::with_capacity(refs.len());
    for reference in refs {
        roots.push(resolver.visit(reference)?);
    }
    tracing::debug!(
        roots = refs.len(),
        nodes = resolver.graph.len(),
        "resolved entity graph"
    );
    Ok(Resolution {
        graph: resolver.graph,
        roots,
    })
}

struct Resolver<'s, S: ?Sized> {
    source: &'s S,
    strictness: Strictness,
    graph: ResolvedGraph,
    /// Registered nodes whose relationships are not linked yet.
    pending: Vec<(NodeId, &'s StoredResource)>,
}

impl<'s, S> Resolver<'s, S>
where
    S: EntitySource + ?Sized,
{
    /// Resolve one root and everything reachable from it.
    fn visit(&mut self, reference: &ResourceRef) -> Result<Option<NodeId>, StoreError> {
        let root = self.enter(reference)?;
        while let Some((id, stored)) = self.pending.pop() {
            let links = self.link(stored)?;
            self.graph.nodes[id.0].relationships = links;
        }
        Ok(root)
    }

    /// Node for `reference`, registering it (unlinked) on first sight.
    fn enter(&mut self, reference: &ResourceRef) -> Result<Option<NodeId>, StoreError> {
        if let Some(id) = self.graph.index.get(reference) {
            return Ok(Some(*id));
        }
        let source: &'s S = self.source;
        let Some(stored) = source.lookup(reference) else {
            return match self.strictness {
                Strictness::Strict => Err(StoreError::not_found(reference)),
                Strictness::Tolerant => Ok(None),
            };
        };

        // Registered before linking so back-edges find this node.
        let id = NodeId(self.graph.nodes.len());
        self.graph.nodes.push(Node {
            reference: reference.clone(),
            attributes: stored.attributes.clone(),
            relationships: BTreeMap::new(),
        });
        self.graph.index.insert(reference.clone(), id);
        self.pending.push((id, stored));
        Ok(Some(id))
    }

    fn link(&mut self, stored: &'s StoredResource) -> Result<BTreeMap<String, Link>, StoreError> {
        let source: &'s S = self.source;
        let mut links = BTreeMap::new();
        for (name, relationship) in &stored.relationships {
            let link = match relationship {
                Relationship::Empty => Link::Nothing,
                Relationship::One(target) => match self.enter(target)? {
                    Some(target_id) => Link::One(target_id),
                    None => Link::Nothing,
                },
                Relationship::Many(targets) => {
                    let mut ids = Vec::with_capacity(targets.len());
                    for target in targets {
                        // Collections are best-effort: a missing element is
                        // dropped in either mode.
                        if !self.graph.index.contains_key(target)
                            && source.lookup(target).is_none()
                        {
                            continue;
                        }
                        if let Some(target_id) = self.enter(target)? {
                            ids.push(target_id);
                        }
                    }
                    Link::Many(ids)
                }
            };
            links.insert(name.clone(), link);
        }
        Ok(links)
    }
}
