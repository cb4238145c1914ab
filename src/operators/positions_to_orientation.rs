//! Leidt een orthonormaal frame af uit drie posities.

use crate::math::{Mat3, Pose, Quat, Vec3};

use super::registry::OperatorDescriptor;
use super::{Compute, Operator, OperatorInputs, OperatorKind, ParameterList};

pub const CLASS_NAME: &str = "PositionsToOrientation";

pub const REGISTRATION: OperatorDescriptor = OperatorDescriptor {
    name: CLASS_NAME,
    position_slots: 3,
    orientation_slots: 0,
    create,
};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PositionsToOrientationOperator;

#[must_use]
pub fn create() -> Operator {
    Operator::new(
        OperatorKind::PositionsToOrientation(PositionsToOrientationOperator),
        REGISTRATION.position_slots,
        REGISTRATION.orientation_slots,
        ParameterList::new(),
    )
}

/// Frame met Y van `p0` naar het midden van `p1`/`p2` en Z van `p2` naar `p1`.
///
/// Geeft `None` voor samenvallende of collineaire punten.
#[must_use]
pub fn frame_from_points(p0: Vec3, p1: Vec3, p2: Vec3) -> Option<Quat> {
    let midpoint = (p1 + p2) * 0.5;
    let y_axis = (midpoint - p0).try_normalize()?;
    let z_axis = (p1 - p2).try_normalize()?;
    let x_axis = y_axis.cross(z_axis).try_normalize()?;
    let z_axis = x_axis.cross(y_axis);

    Some(Quat::from_mat3(&Mat3::from_cols(x_axis, y_axis, z_axis)).normalize())
}

impl Compute for PositionsToOrientationOperator {
    fn compute(&self, inputs: &OperatorInputs, _parameters: &ParameterList) -> Pose {
        let (Some(p0), Some(p1), Some(p2)) =
            (inputs.position(0), inputs.position(1), inputs.position(2))
        else {
            return Pose::IDENTITY;
        };

        match frame_from_points(p0.translation, p1.translation, p2.translation) {
            Some(rotation) => Pose::new(Vec3::ZERO, rotation),
            None => {
                log::debug!("PositionsToOrientation: gedegenereerde punten, identiteit gebruikt");
                Pose::IDENTITY
            }
        }
    }
}
