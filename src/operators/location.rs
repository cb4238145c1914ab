//! Location: bladoperator met een naam, een referentiepose en een assenkeuze.
//!
//! `axis` kiest per lokale as (X, Y, Z) een kolom van de opgeslagen rotatie:
//! de grootte (1..=3) is de kolomindex, het teken de richting. `(1,2,3)` laat
//! de rotatie ongemoeid, `(2,-1,3)` draait 90 graden om Z.

use crate::math::{Mat3, Pose, Quat, Vec3, is_orthonormal_rh};

use super::registry::OperatorDescriptor;
use super::{Compute, Operator, OperatorInputs, OperatorKind, Parameter, ParameterList, ParameterValue};

pub const CLASS_NAME: &str = "Location";

pub const NAME_PARAMETER: &str = "name";
pub const AXIS_PARAMETER: &str = "axis";

/// Tolerantie waarbinnen het gekozen frame orthonormaal moet zijn.
pub const ORTHONORMAL_TOLERANCE: f32 = 0.01;

pub const REGISTRATION: OperatorDescriptor = OperatorDescriptor {
    name: CLASS_NAME,
    position_slots: 0,
    orientation_slots: 0,
    create,
};

/// Opgeslagen referentiepose; wordt van buitenaf bijgewerkt.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LocationOperator {
    pub pose: Pose,
}

#[must_use]
pub fn create() -> Operator {
    let mut parameters = ParameterList::new();
    parameters.add(Parameter::new(NAME_PARAMETER, ParameterValue::Text(String::new())).hidden());
    parameters.add(Parameter::new(
        AXIS_PARAMETER,
        ParameterValue::Vec3(Vec3::new(1.0, 2.0, 3.0)),
    ));

    Operator::new(
        OperatorKind::Location(LocationOperator::default()),
        REGISTRATION.position_slots,
        REGISTRATION.orientation_slots,
        parameters,
    )
}

#[must_use]
pub fn create_named(name: &str) -> Operator {
    let mut operator = create();
    // Bestaat altijd en is tekst, dus dit kan niet mislukken.
    let _ = operator
        .parameters_mut()
        .set(NAME_PARAMETER, ParameterValue::Text(name.to_owned()));
    operator
}

/// Zet `axis` om naar signed kolomindices; `None` bij een ongeldige keuze.
#[must_use]
pub fn axis_selection(axis: Vec3) -> Option<[i32; 3]> {
    #[allow(clippy::cast_possible_truncation)]
    let selection = [axis.x as i32, axis.y as i32, axis.z as i32];
    let [x, y, z] = selection.map(i32::unsigned_abs);

    let in_range = [x, y, z].iter().all(|magnitude| (1..=3).contains(magnitude));
    let distinct = x != y && y != z && x != z;
    (in_range && distinct).then_some(selection)
}

/// Bouwt de geherordende rotatie uit `rotation` volgens `selection`.
#[must_use]
pub fn select_axes(rotation: Quat, selection: [i32; 3]) -> Mat3 {
    let source = Mat3::from_quat(rotation);
    let column = |selector: i32| {
        let index = selector.unsigned_abs() as usize - 1;
        let axis = source.col(index);
        if selector < 0 { -axis } else { axis }
    };

    Mat3::from_cols(column(selection[0]), column(selection[1]), column(selection[2]))
}

impl Compute for LocationOperator {
    fn compute(&self, _inputs: &OperatorInputs, parameters: &ParameterList) -> Pose {
        let axis = parameters
            .vec3(AXIS_PARAMETER)
            .unwrap_or(Vec3::new(1.0, 2.0, 3.0));

        let Some(selection) = axis_selection(axis) else {
            log::debug!("Location: ongeldige assenkeuze {axis:?}, identiteit gebruikt");
            return Pose::IDENTITY;
        };

        let basis = select_axes(self.pose.rotation, selection);
        if !is_orthonormal_rh(&basis, ORTHONORMAL_TOLERANCE) {
            log::debug!("Location: assenkeuze {selection:?} geeft geen rechtshandig frame");
            return Pose::IDENTITY;
        }

        Pose::new(self.pose.translation, Quat::from_mat3(&basis).normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::{axis_selection, create_named};
    use crate::math::{Pose, Quat, Vec3};
    use crate::operators::{OperatorHandle, ParameterValue};

    fn location(axis: Vec3, pose: Pose) -> OperatorHandle {
        let handle = OperatorHandle::new(create_named("pelvis"));
        handle
            .operator_mut()
            .parameters_mut()
            .set("axis", ParameterValue::Vec3(axis))
            .unwrap();
        handle.set_location_pose(pose).unwrap();
        handle
    }

    #[test]
    fn identity_selection_keeps_the_stored_pose() {
        let stored = Pose::new(Vec3::new(0.0, 5.0, 0.0), Quat::from_rotation_y(0.3));
        let pose = location(Vec3::new(1.0, 2.0, 3.0), stored).compute();
        assert_eq!(pose.translation, stored.translation);
        assert!(pose.rotation.abs_diff_eq(stored.rotation, 1e-5));
    }

    #[test]
    fn swapped_axes_rotate_the_frame() {
        let pose = location(Vec3::new(2.0, -1.0, 3.0), Pose::IDENTITY).compute();
        assert!(pose.rotation.abs_diff_eq(Quat::from_rotation_z(90f32.to_radians()), 1e-5));
    }

    #[test]
    fn rejects_degenerate_selections() {
        let stored = Pose::new(Vec3::new(1.0, 2.0, 3.0), Quat::from_rotation_x(1.0));
        for axis in [
            Vec3::new(1.0, 1.0, 3.0),
            Vec3::new(1.0, 2.0, 2.0),
            Vec3::new(3.0, 2.0, -3.0),
            Vec3::new(1.0, 2.0, 4.0),
            Vec3::new(0.0, 2.0, 3.0),
            Vec3::new(1.0, 2.0, -3.0),
            Vec3::new(2.0, 1.0, 3.0),
        ] {
            assert_eq!(
                location(axis, stored).compute(),
                Pose::IDENTITY,
                "assenkeuze {axis:?} zou geweigerd moeten worden"
            );
        }
    }

    #[test]
    fn axis_values_are_truncated() {
        assert_eq!(axis_selection(Vec3::new(1.9, -2.2, 3.0)), Some([1, -2, 3]));
        assert_eq!(axis_selection(Vec3::new(0.5, 2.0, 3.0)), None);
    }
}
