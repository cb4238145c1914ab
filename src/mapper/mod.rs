//! Mapper: koppelt operatorgrafen aan nodes van een bronhiërarchie.
//!
//! Elke node van de hiërarchie heeft een [`MapperNode`] met optioneel een
//! position- en een orientation-operator. Daarnaast houdt de mapper een
//! register van benoemde Location-operators bij.

pub mod evaluator;
pub mod serialize;

use thiserror::Error;

use crate::hierarchy::Hierarchy;
use crate::math::Pose;
use crate::operators::{OperatorError, OperatorHandle, location};
use crate::skeleton::SkeletonSource;

pub use evaluator::EvaluationCache;

/// Operatortoewijzing van één hiërarchienode.
#[derive(Debug, Clone, Default)]
pub struct MapperNode {
    pub position: Option<OperatorHandle>,
    pub orientation: Option<OperatorHandle>,
}

impl MapperNode {
    /// `true` als een van beide operators een Location is of er direct één als invoer heeft.
    #[must_use]
    pub fn has_location(&self) -> bool {
        [&self.position, &self.orientation]
            .into_iter()
            .flatten()
            .any(|handle| {
                let operator = handle.operator();
                operator.is_of_class(location::CLASS_NAME)
                    || operator.has_links_of_class(location::CLASS_NAME) > 0
            })
    }

    fn detach(&mut self) {
        self.position = None;
        self.orientation = None;
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MapperError {
    #[error("node-index {index} ligt buiten bereik (aantal nodes: {count})")]
    IndexOutOfRange { index: usize, count: usize },
    #[error("posebuffer te klein: {required} nodig, {actual} gekregen")]
    BufferTooSmall { required: usize, actual: usize },
    #[error("onbekende location `{0}`")]
    UnknownLocation(String),
    #[error(transparent)]
    Operator(#[from] OperatorError),
}

#[derive(Debug, Clone, Default)]
pub struct Mapper {
    hierarchy: Hierarchy,
    nodes: Vec<MapperNode>,
    locations: Vec<OperatorHandle>,
}

impl Mapper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mapper over `hierarchy` zonder toewijzingen.
    #[must_use]
    pub fn from_hierarchy(hierarchy: Hierarchy) -> Self {
        let mut mapper = Self {
            hierarchy,
            ..Self::default()
        };
        mapper.create_from_hierarchy();
        mapper
    }

    #[must_use]
    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    /// Na structurele wijzigingen volgt meestal [`Mapper::create_from_hierarchy`].
    pub fn hierarchy_mut(&mut self) -> &mut Hierarchy {
        &mut self.hierarchy
    }

    /// Maakt één lege [`MapperNode`] per hiërarchienode; bestaande toewijzingen vervallen.
    pub fn create_from_hierarchy(&mut self) {
        self.nodes.clear();
        self.nodes
            .resize_with(self.hierarchy.node_count(), MapperNode::default);
    }

    /// Vult de hiërarchie uit een skelet en reset de toewijzingen.
    pub fn create_from_skeleton<S: SkeletonSource + ?Sized>(&mut self, skeleton: &S) {
        self.hierarchy.create_from(skeleton);
        self.create_from_hierarchy();
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.hierarchy.node_count()
    }

    /// Toewijzing van node `index`; `None` buiten bereik of nog niet aangemaakt.
    #[must_use]
    pub fn node(&self, index: usize) -> Option<&MapperNode> {
        self.nodes.get(index)
    }

    pub fn node_mut(&mut self, index: usize) -> Result<&mut MapperNode, MapperError> {
        let count = self.hierarchy.node_count();
        if index >= count {
            return Err(MapperError::IndexOutOfRange { index, count });
        }
        if self.nodes.len() < count {
            self.nodes.resize_with(count, MapperNode::default);
        }
        Ok(&mut self.nodes[index])
    }

    pub fn set_position(
        &mut self,
        index: usize,
        operator: Option<OperatorHandle>,
    ) -> Result<(), MapperError> {
        self.node_mut(index)?.position = operator;
        Ok(())
    }

    pub fn set_orientation(
        &mut self,
        index: usize,
        operator: Option<OperatorHandle>,
    ) -> Result<(), MapperError> {
        self.node_mut(index)?.orientation = operator;
        Ok(())
    }

    pub(crate) fn position_operator(&self, index: usize) -> Option<&OperatorHandle> {
        self.nodes.get(index).and_then(|node| node.position.as_ref())
    }

    pub(crate) fn orientation_operator(&self, index: usize) -> Option<&OperatorHandle> {
        self.nodes.get(index).and_then(|node| node.orientation.as_ref())
    }

    #[must_use]
    pub fn location_count(&self) -> usize {
        self.locations.len()
    }

    #[must_use]
    pub fn location(&self, index: usize) -> Option<&OperatorHandle> {
        self.locations.get(index)
    }

    pub fn locations(&self) -> impl Iterator<Item = &OperatorHandle> {
        self.locations.iter()
    }

    /// Hoofdletterongevoelige zoekactie in het location-register.
    #[must_use]
    pub fn find_location(&self, name: &str) -> Option<usize> {
        self.locations.iter().position(|handle| {
            handle
                .location_name()
                .is_some_and(|location| location.eq_ignore_ascii_case(name))
        })
    }

    /// Zoekt de location `name` op en maakt hem aan als hij nog niet bestaat.
    pub fn create_location(&mut self, name: &str) -> usize {
        if let Some(index) = self.find_location(name) {
            return index;
        }

        self.locations
            .push(OperatorHandle::new(location::create_named(name)));
        self.locations.len() - 1
    }

    /// Registreert `handle` onder zijn naam; een bestaande entry met die naam wordt vervangen.
    pub fn set_location(&mut self, handle: OperatorHandle) -> Result<usize, MapperError> {
        let name = handle
            .location_name()
            .ok_or_else(|| OperatorError::NotALocation(handle.class_name().to_owned()))?;

        match self.find_location(&name) {
            Some(index) => {
                self.locations[index] = handle;
                Ok(index)
            }
            None => {
                self.locations.push(handle);
                Ok(self.locations.len() - 1)
            }
        }
    }

    /// Werkt de referentiepose van location `name` bij.
    pub fn set_location_pose(&mut self, name: &str, pose: Pose) -> Result<(), MapperError> {
        let index = self
            .find_location(name)
            .ok_or_else(|| MapperError::UnknownLocation(name.to_owned()))?;
        self.locations[index].set_location_pose(pose)?;
        Ok(())
    }

    /// Ontkoppelt eerst alle nodes en leegt daarna het location-register.
    pub fn clear_locations(&mut self) {
        for node in &mut self.nodes {
            node.detach();
        }
        self.locations.clear();
    }

    #[must_use]
    pub fn children_indices(&self, parent: usize) -> Vec<usize> {
        self.hierarchy.children_indices(parent)
    }

    #[must_use]
    pub fn node_has_location(&self, index: usize) -> bool {
        self.nodes.get(index).is_some_and(MapperNode::has_location)
    }

    /// `true` als de node of een van zijn nakomelingen een location heeft.
    #[must_use]
    pub fn node_or_children_have_location(&self, index: usize) -> bool {
        let mut visited = vec![false; self.hierarchy.node_count()];
        let mut stack = vec![index];

        while let Some(current) = stack.pop() {
            match visited.get_mut(current) {
                Some(seen) if !*seen => *seen = true,
                _ => continue,
            }
            if self.node_has_location(current) {
                return true;
            }
            stack.extend(self.hierarchy.children_indices(current));
        }
        false
    }

    /// Per node of hij zelf of een nakomeling een location heeft, in één
    /// doorloop van de bladeren naar de wortels.
    #[must_use]
    pub fn subtree_location_flags(&self) -> Vec<bool> {
        let count = self.hierarchy.node_count();
        let mut flags: Vec<bool> = (0..count).map(|index| self.node_has_location(index)).collect();
        let nodes = self.hierarchy.nodes();

        for &index in self.hierarchy.evaluation_order().iter().rev() {
            let parent = nodes[index]
                .parent
                .filter(|&parent| parent < count && parent != index);
            if let (true, Some(parent)) = (flags[index], parent) {
                flags[parent] = true;
            }
        }
        flags
    }

    /// Vult `output` met alleen de nodes die een location hebben.
    ///
    /// Elke node krijgt als ouder de dichtstbijzijnde voorouder die ook in
    /// `output` staat. Alle wortels worden doorlopen.
    pub fn create_locations_hierarchy(&self, output: &mut Hierarchy) -> bool {
        output.clear_nodes();
        let roots: Vec<usize> = self.hierarchy.roots().collect();
        for root in roots {
            self.collect_locations(root, None, output);
        }
        output.validate_references();

        log::debug!(
            "locationhiërarchie met {} van {} nodes",
            output.node_count(),
            self.hierarchy.node_count()
        );
        !output.is_empty()
    }

    fn collect_locations(&self, index: usize, output_parent: Option<usize>, output: &mut Hierarchy) {
        let mut parent = output_parent;
        if self.node_has_location(index) {
            if let Some(node) = self.hierarchy.node(index) {
                parent = Some(output.add_node(&node.name, node.pose, output_parent));
            }
        }

        for child in self.hierarchy.children_indices(index) {
            self.collect_locations(child, parent, output);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Mapper, MapperError};
    use crate::hierarchy::Hierarchy;
    use crate::math::{Pose, Vec3};
    use crate::operators::{OperatorError, OperatorHandle, location, positions_to_orientation, transform};
    use crate::skeleton::SkeletonDesc;

    fn rig() -> Mapper {
        let mut skeleton = SkeletonDesc::new();
        let hips = skeleton.push("Hips", None, Pose::from_translation(Vec3::new(0.0, 1.0, 0.0)));
        let spine = skeleton.push("Spine", Some(hips), Pose::from_translation(Vec3::new(0.0, 1.2, 0.0)));
        skeleton.push("Head", Some(spine), Pose::from_translation(Vec3::new(0.0, 1.6, 0.0)));
        skeleton.push("LeftLeg", Some(hips), Pose::from_translation(Vec3::new(0.2, 0.5, 0.0)));
        skeleton.push("Prop", None, Pose::from_translation(Vec3::new(2.0, 0.0, 0.0)));

        let mut mapper = Mapper::new();
        mapper.create_from_skeleton(&skeleton);
        mapper
    }

    #[test]
    fn create_location_finds_or_creates() {
        let mut mapper = Mapper::new();
        assert_eq!(mapper.create_location("pelvis"), 0);
        assert_eq!(mapper.create_location("head"), 1);
        assert_eq!(mapper.create_location("PELVIS"), 0);
        assert_eq!(mapper.location_count(), 2);
        assert_eq!(mapper.find_location("Head"), Some(1));
        assert_eq!(mapper.find_location("hand"), None);
    }

    #[test]
    fn set_location_overwrites_by_name() {
        let mut mapper = Mapper::new();
        mapper.create_location("pelvis");
        let original = mapper.location(0).cloned().expect("location bestaat");

        let replacement = OperatorHandle::new(location::create_named("Pelvis"));
        assert_eq!(mapper.set_location(replacement.clone()), Ok(0));
        assert_eq!(mapper.location_count(), 1);
        let stored = mapper.location(0).expect("location bestaat");
        assert!(stored.ptr_eq(&replacement));
        assert!(!stored.ptr_eq(&original));

        let transform = OperatorHandle::new(transform::create());
        assert_eq!(
            mapper.set_location(transform),
            Err(MapperError::Operator(OperatorError::NotALocation("Transform".to_owned())))
        );
    }

    #[test]
    fn set_location_pose_updates_named_location() {
        let mut mapper = Mapper::new();
        mapper.create_location("pelvis");
        let pose = Pose::from_translation(Vec3::new(1.0, 2.0, 3.0));
        mapper.set_location_pose("PELVIS", pose).unwrap();
        assert_eq!(
            mapper.location(0).map(|handle| handle.compute().translation),
            Some(pose.translation)
        );

        assert_eq!(
            mapper.set_location_pose("hand", pose),
            Err(MapperError::UnknownLocation("hand".to_owned()))
        );
    }

    #[test]
    fn clear_locations_detaches_nodes_first() {
        let mut mapper = rig();
        let index = mapper.create_location("pelvis");
        let pelvis = mapper.location(index).cloned();
        mapper.set_position(0, pelvis.clone()).unwrap();
        mapper.set_orientation(0, pelvis).unwrap();

        mapper.clear_locations();
        assert_eq!(mapper.location_count(), 0);
        let node = mapper.node(0).expect("node bestaat");
        assert!(node.position.is_none() && node.orientation.is_none());
    }

    #[test]
    fn out_of_range_assignment_is_rejected() {
        let mut mapper = rig();
        assert_eq!(
            mapper.set_position(5, None),
            Err(MapperError::IndexOutOfRange { index: 5, count: 5 })
        );
    }

    #[test]
    fn has_location_is_shallow() {
        let mut mapper = rig();
        let pelvis = OperatorHandle::new(location::create_named("pelvis"));

        let direct = OperatorHandle::new(transform::create());
        direct.link_position(0, Some(pelvis.clone())).unwrap();
        let indirect = OperatorHandle::new(transform::create());
        indirect.link_position(0, Some(direct.clone())).unwrap();

        mapper.set_position(1, Some(direct)).unwrap();
        mapper.set_position(2, Some(indirect)).unwrap();
        mapper.set_orientation(3, Some(pelvis)).unwrap();

        assert!(!mapper.node_has_location(0));
        assert!(mapper.node_has_location(1));
        assert!(!mapper.node_has_location(2));
        assert!(mapper.node_has_location(3));
        assert!(mapper.node_or_children_have_location(0));
        assert!(!mapper.node_or_children_have_location(2));
        assert!(!mapper.node_or_children_have_location(4));
    }

    #[test]
    fn subtree_flags_match_the_recursive_check() {
        let mut mapper = rig();
        let head = mapper.create_location("head");
        mapper.set_position(2, mapper.location(head).cloned()).unwrap();

        let flags = mapper.subtree_location_flags();
        assert_eq!(flags, [true, true, true, false, false]);
        for (index, flag) in flags.into_iter().enumerate() {
            assert_eq!(flag, mapper.node_or_children_have_location(index), "node {index}");
        }
    }

    #[test]
    fn locations_hierarchy_skips_unmapped_ancestors() {
        let mut mapper = rig();
        let head = mapper.create_location("head");
        let head = mapper.location(head).cloned();
        mapper.set_position(2, head).unwrap();

        let frame = OperatorHandle::new(positions_to_orientation::create());
        for (slot, name) in ["a", "b", "c"].into_iter().enumerate() {
            let index = mapper.create_location(name);
            frame.link_position(slot, mapper.location(index).cloned()).unwrap();
        }
        mapper.set_orientation(0, Some(frame)).unwrap();

        let mut output = Hierarchy::new();
        assert!(mapper.create_locations_hierarchy(&mut output));

        let names: Vec<_> = output.nodes().iter().map(|node| node.name.as_str()).collect();
        assert_eq!(names, ["Hips", "Head"]);
        assert_eq!(output.node(0).and_then(|node| node.parent), None);
        assert_eq!(output.node(1).and_then(|node| node.parent), Some(0));
        assert_eq!(
            output.node(1).map(|node| node.pose.translation),
            Some(Vec3::new(0.0, 1.6, 0.0))
        );
    }

    #[test]
    fn locations_hierarchy_visits_every_root() {
        let mut mapper = rig();
        let prop = mapper.create_location("prop");
        let prop = mapper.location(prop).cloned();
        mapper.set_position(4, prop).unwrap();

        let mut output = Hierarchy::new();
        output.add_node("stale", Pose::IDENTITY, None);
        assert!(mapper.create_locations_hierarchy(&mut output));
        assert_eq!(output.node_count(), 1);
        assert_eq!(output.find_node_index("Prop"), Some(0));
    }

    #[test]
    fn growing_hierarchy_keeps_assignments_addressable() {
        let mut mapper = rig();
        let index = mapper
            .hierarchy_mut()
            .add_node("RightLeg", Pose::IDENTITY, Some(0));
        assert!(mapper.node(index).is_none());

        let hand = OperatorHandle::new(location::create_named("hand"));
        mapper.set_position(index, Some(hand)).unwrap();
        assert!(mapper.node_has_location(index));
    }
}
