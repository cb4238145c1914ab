//! Definitie van een node binnen een [`super::Hierarchy`].

use crate::math::Pose;

/// Benoemde joint met pose en ouderverwijzing.
///
/// Of `pose` absoluut of ouder-relatief is, hangt af van wie de hiërarchie
/// gevuld heeft; `Hierarchy::create_from` levert absolute poses.
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyNode {
    pub name: String,
    pub pose: Pose,
    /// Index van de ouder in dezelfde hiërarchie, `None` voor een wortel.
    pub parent: Option<usize>,
}

impl HierarchyNode {
    #[must_use]
    pub fn new(name: impl Into<String>, pose: Pose, parent: Option<usize>) -> Self {
        Self {
            name: name.into(),
            pose,
            parent,
        }
    }

    /// Hoofdletterongevoelige naamvergelijking.
    #[must_use]
    pub fn has_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::HierarchyNode;
    use crate::math::Pose;

    #[test]
    fn name_comparison_ignores_case() {
        let node = HierarchyNode::new("Bip01 Spine", Pose::IDENTITY, None);
        assert!(node.has_name("bip01 spine"));
        assert!(node.has_name("BIP01 SPINE"));
        assert!(!node.has_name("Bip01 Spine1"));
        assert!(node.is_root());
    }
}
