//! Benoemde, ouder-geïndexeerde boom van joint-poses.

pub mod node;

use std::collections::VecDeque;

use thiserror::Error;

use crate::math::Pose;
use crate::parse::mapper_xml::{self, HierarchyElement, NodeElement, ParseResult};
use crate::skeleton::SkeletonSource;

pub use node::HierarchyNode;

/// Fouten bij bewerkingen op een [`Hierarchy`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    #[error("node-index {index} ligt buiten bereik (aantal nodes: {count})")]
    IndexOutOfRange { index: usize, count: usize },
    #[error("posebuffer te klein: {required} nodig, {actual} gekregen")]
    BufferTooSmall { required: usize, actual: usize },
}

/// Geordende verzameling benoemde nodes. Indices zijn stabiel: nodes worden
/// alleen achteraan toegevoegd of in één keer gewist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hierarchy {
    nodes: Vec<HierarchyNode>,
}

impl Hierarchy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Voeg een node toe of overschrijf de bestaande node met dezelfde naam.
    pub fn add_node(&mut self, name: &str, pose: Pose, parent: Option<usize>) -> usize {
        if let Some(index) = self.find_node_index(name) {
            let node = &mut self.nodes[index];
            node.pose = pose;
            node.parent = parent;
            return index;
        }

        self.nodes.push(HierarchyNode::new(name, pose, parent));
        self.nodes.len() - 1
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn node(&self, index: usize) -> Option<&HierarchyNode> {
        self.nodes.get(index)
    }

    pub fn node_mut(&mut self, index: usize) -> Option<&mut HierarchyNode> {
        self.nodes.get_mut(index)
    }

    /// Als [`Hierarchy::node`], maar met een expliciete foutmelding.
    pub fn try_node(&self, index: usize) -> Result<&HierarchyNode, HierarchyError> {
        self.nodes.get(index).ok_or(HierarchyError::IndexOutOfRange {
            index,
            count: self.nodes.len(),
        })
    }

    #[must_use]
    pub fn nodes(&self) -> &[HierarchyNode] {
        &self.nodes
    }

    /// Eerste node waarvan de naam hoofdletterongevoelig overeenkomt.
    #[must_use]
    pub fn find_node_index(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.has_name(name))
    }

    #[must_use]
    pub fn find_node(&self, name: &str) -> Option<&HierarchyNode> {
        self.find_node_index(name).and_then(|index| self.nodes.get(index))
    }

    pub fn clear_nodes(&mut self) {
        self.nodes.clear();
    }

    /// Bouw de hiërarchie opnieuw op uit een skeletasset, joint-voor-joint.
    pub fn create_from<S: SkeletonSource + ?Sized>(&mut self, skeleton: &S) {
        self.clear_nodes();

        let count = skeleton.joint_count();
        self.nodes.reserve(count);
        for id in 0..count {
            self.nodes.push(HierarchyNode::new(
                skeleton.joint_name(id),
                skeleton.default_absolute_joint(id),
                skeleton.joint_parent(id),
            ));
        }

        log::debug!("hiërarchie opgebouwd uit skelet met {count} joints");
        self.validate_references();
    }

    /// Zet ouderverwijzingen buiten bereik (en naar zichzelf) terug naar `None`.
    pub fn validate_references(&mut self) {
        let count = self.nodes.len();
        for (index, node) in self.nodes.iter_mut().enumerate() {
            if let Some(parent) = node.parent {
                if parent >= count || parent == index {
                    log::debug!(
                        "ongeldige ouder {parent} van node `{}` verwijderd",
                        node.name
                    );
                    node.parent = None;
                }
            }
        }
    }

    /// Indices van de directe kinderen van `parent`, oplopend.
    #[must_use]
    pub fn children_indices(&self, parent: usize) -> Vec<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(index, node)| (node.parent == Some(parent)).then_some(index))
            .collect()
    }

    /// Indices van alle nodes zonder ouder, oplopend.
    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(index, node)| node.is_root().then_some(index))
    }

    /// Kinderlijst per node in één doorloop; zelfverwijzingen en ongeldige
    /// ouders worden overgeslagen.
    #[must_use]
    pub fn children_table(&self) -> Vec<Vec<usize>> {
        let count = self.nodes.len();
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
        for (index, node) in self.nodes.iter().enumerate() {
            if let Some(parent) = node.parent.filter(|&parent| parent < count && parent != index) {
                children[parent].push(index);
            }
        }
        children
    }

    /// Volgorde waarin elke ouder vóór zijn kinderen komt.
    ///
    /// Nodes die vanuit geen enkele wortel bereikbaar zijn (ouderlus) komen
    /// achteraan, in indexvolgorde.
    #[must_use]
    pub fn evaluation_order(&self) -> Vec<usize> {
        let count = self.nodes.len();
        let children = self.children_table();

        let mut visited = vec![false; count];
        let mut order = Vec::with_capacity(count);
        let mut queue: VecDeque<usize> = self.roots().collect();

        while let Some(index) = queue.pop_front() {
            if std::mem::replace(&mut visited[index], true) {
                continue;
            }
            order.push(index);
            queue.extend(children[index].iter().copied());
        }

        order.extend((0..count).filter(|&index| !visited[index]));
        order
    }

    fn check_buffer(&self, actual: usize) -> Result<(), HierarchyError> {
        let required = self.nodes.len();
        if actual < required {
            return Err(HierarchyError::BufferTooSmall { required, actual });
        }
        Ok(())
    }

    /// Zet absolute poses om naar ouder-relatieve poses.
    ///
    /// Beide buffers zijn geïndexeerd zoals de nodes van deze hiërarchie.
    pub fn absolute_to_relative(
        &self,
        absolute: &[Pose],
        relative: &mut [Pose],
    ) -> Result<(), HierarchyError> {
        self.check_buffer(absolute.len())?;
        self.check_buffer(relative.len())?;

        for (index, node) in self.nodes.iter().enumerate() {
            relative[index] = match node.parent.and_then(|parent| absolute.get(parent)) {
                Some(parent) => absolute[index].relative_to(parent),
                None => absolute[index],
            };
        }

        Ok(())
    }

    /// Variant van [`Hierarchy::absolute_to_relative`] op één buffer.
    pub fn absolute_to_relative_in_place(&self, poses: &mut [Pose]) -> Result<(), HierarchyError> {
        let absolute = poses.to_vec();
        self.absolute_to_relative(&absolute, poses)
    }

    /// Accumuleert ouder-relatieve poses tot absolute poses, ouders eerst.
    pub fn relative_to_absolute(
        &self,
        relative: &[Pose],
        absolute: &mut [Pose],
    ) -> Result<(), HierarchyError> {
        self.check_buffer(relative.len())?;
        self.check_buffer(absolute.len())?;

        for index in self.evaluation_order() {
            absolute[index] = match self.nodes[index].parent.filter(|&parent| parent < self.nodes.len()) {
                Some(parent) => relative[index].to_absolute(&absolute[parent]),
                None => relative[index],
            };
        }

        Ok(())
    }

    /// Bouw de geneste elementboom (`Hierarchy` / `Node`).
    #[must_use]
    pub fn to_element(&self) -> HierarchyElement {
        HierarchyElement {
            nodes: self.roots().map(|root| self.node_element(root)).collect(),
        }
    }

    fn node_element(&self, index: usize) -> NodeElement {
        let mut element = NodeElement::new(&self.nodes[index].name);
        element.children = self
            .children_indices(index)
            .into_iter()
            .map(|child| self.node_element(child))
            .collect();
        element
    }

    pub fn to_xml(&self) -> ParseResult<String> {
        mapper_xml::write_document(&self.to_element())
    }

    /// Lees namen en nesting terug; alle poses worden identiteit.
    pub fn from_xml(input: &str) -> ParseResult<Self> {
        let document = mapper_xml::read_document(input)?;
        let mut hierarchy = Self::new();
        for element in &document.nodes {
            hierarchy.add_element(element, None);
        }
        hierarchy.validate_references();
        Ok(hierarchy)
    }

    fn add_element(&mut self, element: &NodeElement, parent: Option<usize>) {
        let index = self.add_node(&element.name, Pose::IDENTITY, parent);
        for child in &element.children {
            self.add_element(child, Some(index));
        }
    }
}
