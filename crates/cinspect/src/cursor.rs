//! Cursors: handles to AST nodes, and the tri-state tree walk.

use crate::location::{SourceLocation, SourceRange};
use crate::unit::UnitRef;
use crate::{Error, Result, TranslationUnit};
use cinspect_engine::{Ast, CursorKind, Entity, NodeId, ROOT};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// What the walk does after a node was visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildVisit {
    /// Skip the node's children and go on with its next sibling
    Continue,
    /// Visit the node's children before its siblings
    Recurse,
    /// End the walk
    Stop,
}

/// A handle to one node of a unit's AST.
///
/// The kind is copied into the handle and stays readable after the unit
/// changes. Every other query fails with [`Error::StaleHandle`] once the unit
/// was reparsed or disposed.
#[derive(Clone)]
pub struct Cursor {
    unit: UnitRef,
    node: NodeId,
    kind: CursorKind,
}

impl Cursor {
    pub(crate) fn from_node(unit: &UnitRef, ast: &Ast, node: NodeId) -> Self {
        Self {
            unit: unit.clone(),
            node,
            kind: ast.nodes[node as usize].kind(),
        }
    }

    pub fn kind(&self) -> CursorKind {
        self.kind
    }

    fn ast(&self) -> Result<Arc<Ast>> {
        self.unit.ast()
    }

    /// Children as the walk sees them: in source order, without preamble
    /// declarations at the root when the index hides them.
    fn child_ids(&self, ast: &Ast, node: NodeId) -> Vec<NodeId> {
        let children = &ast.nodes[node as usize].children;
        if node != ROOT || !self.unit.hide_preamble() {
            return children.clone();
        }
        children
            .iter()
            .copied()
            .filter(|&id| {
                let file = ast.nodes[id as usize].file;
                !ast.file(file).is_some_and(|f| f.preamble)
            })
            .collect()
    }

    /// Name of the entity, or an empty string for unnamed nodes.
    pub fn spelling(&self) -> Result<String> {
        let ast = self.ast()?;
        let entity = &ast.nodes[self.node as usize].entity;
        Ok(entity.spelling().unwrap_or_default().to_string())
    }

    /// Spelling plus the parameter list for functions, e.g. `add(int, int)`.
    pub fn display_name(&self) -> Result<String> {
        let ast = self.ast()?;
        match &ast.nodes[self.node as usize].entity {
            Entity::FunctionDecl(info) | Entity::CxxMethod(info) => {
                let mut params = info.params.join(", ");
                if info.variadic {
                    if !params.is_empty() {
                        params.push_str(", ");
                    }
                    params.push_str("...");
                }
                Ok(format!("{}({})", info.name, params))
            }
            entity => Ok(entity.spelling().unwrap_or_default().to_string()),
        }
    }

    /// Per-kind data of the node.
    pub fn entity(&self) -> Result<Entity> {
        Ok(self.ast()?.nodes[self.node as usize].entity.clone())
    }

    /// Extent of the node.
    pub fn range(&self) -> Result<SourceRange> {
        let ast = self.ast()?;
        let node = &ast.nodes[self.node as usize];
        Ok(SourceRange::from_offsets(
            &self.unit, &ast, node.file, node.start, node.end,
        ))
    }

    /// Spelling location: the name for declarations, the start otherwise.
    pub fn location(&self) -> Result<SourceLocation> {
        let ast = self.ast()?;
        let node = &ast.nodes[self.node as usize];
        Ok(SourceLocation::resolved(
            self.unit.clone(),
            &ast,
            node.file,
            node.location,
        ))
    }

    /// Direct children, in source order.
    pub fn children(&self) -> Result<Vec<Cursor>> {
        let ast = self.ast()?;
        Ok(self
            .child_ids(&ast, self.node)
            .into_iter()
            .map(|id| Cursor::from_node(&self.unit, &ast, id))
            .collect())
    }

    /// The node that lexically contains this one; `None` for the root.
    pub fn lexical_parent(&self) -> Result<Option<Cursor>> {
        let ast = self.ast()?;
        Ok(ast.nodes[self.node as usize]
            .parent
            .map(|id| Cursor::from_node(&self.unit, &ast, id)))
    }

    /// The declaration context this node belongs to. Differs from the
    /// lexical parent for out-of-line member definitions.
    pub fn semantic_parent(&self) -> Result<Option<Cursor>> {
        let ast = self.ast()?;
        let node = &ast.nodes[self.node as usize];
        Ok(node
            .semantic_parent
            .or(node.parent)
            .map(|id| Cursor::from_node(&self.unit, &ast, id)))
    }

    /// The declaration a reference resolves to. Declarations refer to themselves.
    pub fn referenced(&self) -> Result<Option<Cursor>> {
        let ast = self.ast()?;
        Ok(self.referenced_id(&ast).map(|id| Cursor::from_node(&self.unit, &ast, id)))
    }

    fn referenced_id(&self, ast: &Ast) -> Option<NodeId> {
        if self.kind.is_declaration() {
            return Some(self.node);
        }
        ast.nodes[self.node as usize].referenced
    }

    /// The defining declaration of the referenced entity, if the unit has one.
    pub fn definition(&self) -> Result<Option<Cursor>> {
        let ast = self.ast()?;
        let Some(target) = self.referenced_id(&ast) else {
            return Ok(None);
        };
        let node = &ast.nodes[target as usize];
        if node.entity.is_definition() {
            return Ok(Some(Cursor::from_node(&self.unit, &ast, target)));
        }
        let Some(usr) = node.usr.as_deref() else {
            return Ok(None);
        };
        Ok(ast
            .nodes
            .iter()
            .position(|n| n.usr.as_deref() == Some(usr) && n.entity.is_definition())
            .map(|id| Cursor::from_node(&self.unit, &ast, id as NodeId)))
    }

    pub fn is_definition(&self) -> Result<bool> {
        Ok(self.ast()?.nodes[self.node as usize].entity.is_definition())
    }

    /// Unified symbol resolution: a string that names the same entity across units.
    pub fn usr(&self) -> Result<Option<String>> {
        Ok(self.ast()?.nodes[self.node as usize].usr.clone())
    }

    pub fn type_spelling(&self) -> Result<Option<String>> {
        Ok(self.ast()?.nodes[self.node as usize].entity.type_spelling())
    }

    /// First paragraph of the doc comment, when the unit was parsed with
    /// brief comments enabled.
    pub fn brief_comment(&self) -> Result<Option<String>> {
        Ok(self.ast()?.nodes[self.node as usize].brief_comment.clone())
    }

    /// Number of references the unit resolved to this declaration.
    pub fn reference_count(&self) -> Result<u32> {
        Ok(self.ast()?.nodes[self.node as usize].references)
    }

    pub fn translation_unit(&self) -> Result<TranslationUnit> {
        self.unit.unit()
    }

    /// Walk the descendants of this cursor depth-first in pre-order.
    ///
    /// The visitor decides per node whether to descend, skip the node's
    /// children, or stop.
    pub fn visit_children<F>(&self, mut visitor: F) -> Result<()>
    where
        F: FnMut(&Cursor) -> ChildVisit,
    {
        self.try_visit_children(|cursor| Ok::<_, Error>(visitor(cursor)))
    }

    /// Like [`Cursor::visit_children`]; a visitor error ends the walk and is returned.
    pub fn try_visit_children<E, F>(&self, mut visitor: F) -> std::result::Result<(), E>
    where
        E: From<Error>,
        F: FnMut(&Cursor) -> std::result::Result<ChildVisit, E>,
    {
        let ast = self.ast()?;
        let mut stack: Vec<NodeId> = self.child_ids(&ast, self.node);
        stack.reverse();

        while let Some(id) = stack.pop() {
            let cursor = Cursor::from_node(&self.unit, &ast, id);
            match visitor(&cursor)? {
                ChildVisit::Stop => break,
                ChildVisit::Continue => {}
                ChildVisit::Recurse => {
                    stack.extend(ast.nodes[id as usize].children.iter().rev());
                }
            }
        }
        Ok(())
    }

    pub(crate) fn node_id(&self) -> NodeId {
        self.node
    }
}

impl PartialEq for Cursor {
    fn eq(&self, other: &Self) -> bool {
        self.unit == other.unit && self.node == other.node
    }
}

impl Eq for Cursor {}

impl Hash for Cursor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.unit.id().hash(state);
        self.unit.generation().hash(state);
        self.node.hash(state);
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("kind", &self.kind)
            .field("node", &self.node)
            .field("unit", &self.unit)
            .finish()
    }
}
