//! `map`: evalueert de toegewezen operators tot absolute poses per node.

use std::collections::HashMap;

use crate::math::{Pose, Quat, rotate_inverse};
use crate::operators::OperatorHandle;

use super::{Mapper, MapperError};

/// Berekende operatorposes binnen één `map`-aanroep.
///
/// Gedeelde invoer wordt zo maar één keer berekend. Sleutels zijn
/// operatoridentiteiten en zijn alleen geldig zolang de handles leven.
#[derive(Debug, Default)]
pub struct EvaluationCache {
    poses: HashMap<usize, Pose>,
}

impl EvaluationCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&mut self, handle: &OperatorHandle) -> Pose {
        if let Some(pose) = self.poses.get(&handle.key()) {
            return *pose;
        }

        let pose = handle
            .operator()
            .compute_with(&mut |input| self.resolve(input));
        self.poses.insert(handle.key(), pose);
        pose
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }
}

impl Mapper {
    /// Schrijft de absolute pose van elke bronnode naar `output`.
    ///
    /// Zonder operators volgt een node de structuur van de bronhiërarchie;
    /// een position-operator bepaalt de translatie volledig, een
    /// orientation-operator de absolute rotatie.
    pub fn map(&self, output: &mut [Pose]) -> Result<(), MapperError> {
        let nodes = self.hierarchy.nodes();
        let count = nodes.len();
        if output.len() < count {
            return Err(MapperError::BufferTooSmall {
                required: count,
                actual: output.len(),
            });
        }

        let order = self.hierarchy.evaluation_order();
        let mut cache = EvaluationCache::new();
        let mut absolute_rotations = vec![Quat::IDENTITY; count];
        output[..count].fill(Pose::IDENTITY);

        let parent_of = |index: usize| nodes[index].parent.filter(|&parent| parent < count);

        for &index in &order {
            let node = &nodes[index];
            let parent = parent_of(index);

            if let Some(parent) = parent {
                let parent_pose = &nodes[parent].pose;
                output[index].translation = rotate_inverse(
                    node.pose.translation - parent_pose.translation,
                    parent_pose.rotation,
                );
            }

            if let Some(operator) = self.position_operator(index) {
                output[index].translation = cache.resolve(operator).translation;
            }

            absolute_rotations[index] = match (self.orientation_operator(index), parent) {
                (Some(operator), _) => cache.resolve(operator).rotation,
                (None, Some(parent)) => {
                    let structural = nodes[parent].pose.rotation.inverse() * node.pose.rotation;
                    (absolute_rotations[parent] * structural).normalize()
                }
                (None, None) => Quat::IDENTITY,
            };
        }

        for &index in &order {
            output[index].rotation = absolute_rotations[index];
            if self.position_operator(index).is_some() {
                continue;
            }
            if let Some(parent) = parent_of(index) {
                output[index].translation =
                    output[parent].translation + absolute_rotations[parent] * output[index].translation;
            }
        }

        log::debug!(
            "map: {count} nodes, {} operators berekend",
            cache.len()
        );
        Ok(())
    }

    /// Als [`Mapper::map`], met een nieuwe buffer.
    pub fn map_to_vec(&self) -> Result<Vec<Pose>, MapperError> {
        let mut output = vec![Pose::IDENTITY; self.hierarchy.node_count()];
        self.map(&mut output)?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::EvaluationCache;
    use crate::mapper::{Mapper, MapperError};
    use crate::math::{Pose, Quat, Vec3};
    use crate::operators::{OperatorHandle, ParameterValue, location, transform};
    use crate::skeleton::SkeletonDesc;

    fn assert_vec_close(actual: Vec3, expected: Vec3) {
        assert!(
            actual.abs_diff_eq(expected, 1e-5),
            "verwacht {expected:?}, kreeg {actual:?}"
        );
    }

    fn chain() -> Mapper {
        let mut skeleton = SkeletonDesc::new();
        let root = skeleton.push("Root", None, Pose::IDENTITY);
        let mid = skeleton.push("Mid", Some(root), Pose::from_translation(Vec3::new(0.0, 1.0, 0.0)));
        skeleton.push("Tip", Some(mid), Pose::from_translation(Vec3::new(0.0, 2.0, 0.0)));

        let mut mapper = Mapper::new();
        mapper.create_from_skeleton(&skeleton);
        mapper
    }

    #[test]
    fn cache_computes_shared_inputs_once() {
        let shared = OperatorHandle::new(location::create_named("shared"));
        let a = OperatorHandle::new(transform::create());
        let b = OperatorHandle::new(transform::create());
        a.link_position(0, Some(shared.clone())).unwrap();
        b.link_position(0, Some(shared)).unwrap();

        let mut cache = EvaluationCache::new();
        cache.resolve(&a);
        cache.resolve(&b);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn unmapped_nodes_follow_the_structure() {
        let poses = chain().map_to_vec().expect("map lukt");
        assert_vec_close(poses[0].translation, Vec3::ZERO);
        assert_vec_close(poses[1].translation, Vec3::new(0.0, 1.0, 0.0));
        assert_vec_close(poses[2].translation, Vec3::new(0.0, 2.0, 0.0));
        assert!(poses.iter().all(|pose| pose.rotation.abs_diff_eq(Quat::IDENTITY, 1e-6)));
    }

    #[test]
    fn rotated_joints_keep_their_relative_rotation() {
        let root_rotation = Quat::from_rotation_z(FRAC_PI_2);
        let child_rotation = root_rotation * Quat::from_rotation_x(0.5);
        let grandchild_translation = Vec3::Y + child_rotation * Vec3::Y;

        let mut skeleton = SkeletonDesc::new();
        let root = skeleton.push("Root", None, Pose::new(Vec3::ZERO, root_rotation));
        let child = skeleton.push("Child", Some(root), Pose::new(Vec3::Y, child_rotation));
        skeleton.push(
            "Grandchild",
            Some(child),
            Pose::new(grandchild_translation, child_rotation * Quat::from_rotation_y(0.4)),
        );
        let mut mapper = Mapper::new();
        mapper.create_from_skeleton(&skeleton);

        let poses = mapper.map_to_vec().expect("map lukt");
        let (sin, cos) = 0.5_f32.sin_cos();

        // De wortelrotatie valt weg, de rest draait mee.
        assert!(poses[0].rotation.abs_diff_eq(Quat::IDENTITY, 1e-6));
        assert_vec_close(poses[1].translation, Vec3::X);
        assert_vec_close(poses[1].rotation * Vec3::Y, Vec3::new(0.0, cos, sin));
        assert_vec_close(poses[2].translation, Vec3::new(1.0, cos, sin));
        assert!(poses[2].rotation.abs_diff_eq(
            Quat::from_rotation_x(0.5) * Quat::from_rotation_y(0.4),
            1e-5
        ));
    }

    #[test]
    fn position_operator_wins_outright() {
        let mut mapper = chain();
        let tip = mapper.create_location("tip");
        mapper
            .set_location_pose("tip", Pose::from_translation(Vec3::new(0.0, 5.0, 0.0)))
            .unwrap();
        let tip = mapper.location(tip).cloned();
        mapper.set_position(2, tip).unwrap();

        let poses = mapper.map_to_vec().unwrap();
        assert_eq!(poses[2].translation, Vec3::new(0.0, 5.0, 0.0));
        assert_vec_close(poses[1].translation, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn orientation_operator_rotates_descendants() {
        let mut mapper = chain();
        let bend = OperatorHandle::new(transform::create());
        bend.operator_mut()
            .parameters_mut()
            .set("rotation", ParameterValue::Vec3(Vec3::new(0.0, 0.0, 90.0)))
            .unwrap();
        mapper.set_orientation(1, Some(bend)).unwrap();

        let poses = mapper.map_to_vec().unwrap();
        assert_vec_close(poses[1].translation, Vec3::new(0.0, 1.0, 0.0));
        assert_vec_close(poses[2].translation, Vec3::new(-1.0, 1.0, 0.0));
        assert_vec_close(poses[2].rotation * Vec3::X, Vec3::Y);
    }

    #[test]
    fn map_is_deterministic() {
        let mut mapper = chain();
        let bend = OperatorHandle::new(transform::create());
        bend.operator_mut()
            .parameters_mut()
            .set("rotation", ParameterValue::Vec3(Vec3::new(10.0, 20.0, 30.0)))
            .unwrap();
        mapper.set_orientation(0, Some(bend)).unwrap();

        assert_eq!(mapper.map_to_vec().unwrap(), mapper.map_to_vec().unwrap());
    }

    #[test]
    fn short_buffer_is_rejected() {
        let mapper = chain();
        let mut output = vec![Pose::IDENTITY; 2];
        assert_eq!(
            mapper.map(&mut output),
            Err(MapperError::BufferTooSmall {
                required: 3,
                actual: 2
            })
        );
    }
}
