//! Pose-wiskunde op basis van `glam`.

pub use glam::{Mat3, Quat, Vec3};

/// Rigide transformatie: eenheidsquaternion plus translatie.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    #[must_use]
    pub const fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    #[must_use]
    pub const fn from_translation(translation: Vec3) -> Self {
        Self::new(translation, Quat::IDENTITY)
    }

    /// Drukt `self` (absoluut) uit in het lokale frame van `parent` (absoluut).
    #[must_use]
    pub fn relative_to(&self, parent: &Pose) -> Pose {
        Pose {
            translation: rotate_inverse(self.translation - parent.translation, parent.rotation),
            rotation: parent.rotation.inverse() * self.rotation,
        }
    }

    /// Omgekeerde van [`Pose::relative_to`]: zet een relatieve pose terug naar absoluut.
    #[must_use]
    pub fn to_absolute(&self, parent: &Pose) -> Pose {
        Pose {
            translation: parent.translation + parent.rotation * self.translation,
            rotation: parent.rotation * self.rotation,
        }
    }
}

/// De `v * q` conventie: roteer `v` met de inverse van `q`.
///
/// Een wereld-offset wordt hiermee uitgedrukt in het lokale frame van een
/// ouder met absolute rotatie `q`.
#[must_use]
pub fn rotate_inverse(v: Vec3, q: Quat) -> Vec3 {
    q.inverse() * v
}

/// Controleert of de kolommen van `m` orthonormaal en rechtshandig zijn.
#[must_use]
pub fn is_orthonormal_rh(m: &Mat3, tolerance: f32) -> bool {
    let (x, y, z) = (m.x_axis, m.y_axis, m.z_axis);

    let unit = [x, y, z]
        .iter()
        .all(|axis| (axis.length() - 1.0).abs() <= tolerance);
    let orthogonal =
        x.dot(y).abs() <= tolerance && y.dot(z).abs() <= tolerance && z.dot(x).abs() <= tolerance;

    unit && orthogonal && (x.cross(y).dot(z) - 1.0).abs() <= tolerance
}
