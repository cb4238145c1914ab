//! Koppelvlak naar het skeletasset van de engine.

use serde::{Deserialize, Serialize};

use crate::math::{Pose, Quat, Vec3};

/// Minimale interface die [`crate::hierarchy::Hierarchy::create_from`] nodig heeft.
///
/// Joint-id's lopen van `0` tot `joint_count()`; de hiërarchie neemt die volgorde
/// index-voor-index over.
pub trait SkeletonSource {
    fn joint_count(&self) -> usize;

    fn joint_name(&self, id: usize) -> &str;

    /// Absolute rustpose van de joint.
    fn default_absolute_joint(&self, id: usize) -> Pose;

    /// Ouder-id, of `None` voor een wortel. Mag buiten bereik liggen; dat wordt
    /// bij het inlezen gerepareerd.
    fn joint_parent(&self, id: usize) -> Option<usize>;
}

/// Eenvoudig skelet in geheugen, o.a. gebruikt door de wasm-facade.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkeletonDesc {
    #[serde(default)]
    pub joints: Vec<JointDesc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointDesc {
    pub name: String,
    #[serde(default)]
    pub parent: Option<usize>,
    #[serde(default)]
    pub translation: [f32; 3],
    #[serde(default = "identity_rotation")]
    pub rotation: [f32; 4],
}

fn identity_rotation() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

impl JointDesc {
    #[must_use]
    pub fn new(name: impl Into<String>, parent: Option<usize>, pose: Pose) -> Self {
        Self {
            name: name.into(),
            parent,
            translation: pose.translation.to_array(),
            rotation: pose.rotation.to_array(),
        }
    }

    #[must_use]
    pub fn pose(&self) -> Pose {
        Pose::new(
            Vec3::from_array(self.translation),
            Quat::from_array(self.rotation).normalize(),
        )
    }
}

impl SkeletonDesc {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Voeg een joint toe en geef zijn id terug.
    pub fn push(&mut self, name: impl Into<String>, parent: Option<usize>, pose: Pose) -> usize {
        self.joints.push(JointDesc::new(name, parent, pose));
        self.joints.len() - 1
    }
}

impl SkeletonSource for SkeletonDesc {
    fn joint_count(&self) -> usize {
        self.joints.len()
    }

    fn joint_name(&self, id: usize) -> &str {
        self.joints.get(id).map_or("", |joint| joint.name.as_str())
    }

    fn default_absolute_joint(&self, id: usize) -> Pose {
        self.joints.get(id).map_or(Pose::IDENTITY, JointDesc::pose)
    }

    fn joint_parent(&self, id: usize) -> Option<usize> {
        self.joints.get(id).and_then(|joint| joint.parent)
    }
}
