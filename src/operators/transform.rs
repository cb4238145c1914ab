//! Transform: rotatie, offset en schaal bovenop optionele invoer.

use crate::math::{Pose, Quat, Vec3};

use super::registry::OperatorDescriptor;
use super::{Compute, Operator, OperatorInputs, OperatorKind, Parameter, ParameterList, ParameterValue};

pub const CLASS_NAME: &str = "Transform";

/// Grens (in graden) voor elke Euler-hoek van `rotation`.
pub const ROTATION_LIMIT_DEGREES: f32 = 180.0;

pub const REGISTRATION: OperatorDescriptor = OperatorDescriptor {
    name: CLASS_NAME,
    position_slots: 1,
    orientation_slots: 1,
    create,
};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransformOperator;

#[must_use]
pub fn create() -> Operator {
    let mut parameters = ParameterList::new();
    parameters.add(
        Parameter::new("rotation", ParameterValue::Vec3(Vec3::ZERO))
            .with_limits(-ROTATION_LIMIT_DEGREES, ROTATION_LIMIT_DEGREES),
    );
    parameters.add(Parameter::new("vector", ParameterValue::Vec3(Vec3::ZERO)));
    parameters.add(Parameter::new("scale", ParameterValue::Vec3(Vec3::ONE)));

    Operator::new(
        OperatorKind::Transform(TransformOperator),
        REGISTRATION.position_slots,
        REGISTRATION.orientation_slots,
        parameters,
    )
}

/// Euler-hoeken in graden, toegepast als X, dan Y, dan Z.
#[must_use]
pub fn euler_xyz_degrees(angles: Vec3) -> Quat {
    Quat::from_rotation_z(angles.z.to_radians())
        * Quat::from_rotation_y(angles.y.to_radians())
        * Quat::from_rotation_x(angles.x.to_radians())
}

impl Compute for TransformOperator {
    fn compute(&self, inputs: &OperatorInputs, parameters: &ParameterList) -> Pose {
        let vector = parameters.vec3("vector").unwrap_or(Vec3::ZERO);
        let scale = parameters.vec3("scale").unwrap_or(Vec3::ONE);
        let rotation = euler_xyz_degrees(parameters.vec3("rotation").unwrap_or(Vec3::ZERO));

        let mut pose = Pose::new(vector, rotation);
        if let Some(position) = inputs.position(0) {
            pose.translation += scale * position.translation;
        }
        if let Some(orientation) = inputs.orientation(0) {
            pose.rotation = (orientation.rotation * rotation).normalize();
        }
        pose
    }
}

#[cfg(test)]
mod tests {
    use super::{create, euler_xyz_degrees};
    use crate::math::{Pose, Quat, Vec3};
    use crate::operators::{OperatorHandle, ParameterValue, location};

    fn assert_vec_close(actual: Vec3, expected: Vec3) {
        assert!(
            actual.abs_diff_eq(expected, 1e-5),
            "verwacht {expected:?}, kreeg {actual:?}"
        );
    }

    #[test]
    fn parameters_alone_define_the_pose() {
        let mut operator = create();
        operator
            .parameters_mut()
            .set("vector", ParameterValue::Vec3(Vec3::new(1.0, 2.0, 3.0)))
            .unwrap();
        operator
            .parameters_mut()
            .set("rotation", ParameterValue::Vec3(Vec3::new(0.0, 0.0, 90.0)))
            .unwrap();

        let pose = operator.compute();
        assert_vec_close(pose.translation, Vec3::new(1.0, 2.0, 3.0));
        assert_vec_close(pose.rotation * Vec3::X, Vec3::Y);
    }

    #[test]
    fn scale_applies_to_position_input_only() {
        let handle = OperatorHandle::new(create());
        {
            let mut operator = handle.operator_mut();
            let parameters = operator.parameters_mut();
            parameters
                .set("vector", ParameterValue::Vec3(Vec3::new(0.0, 0.5, 0.0)))
                .unwrap();
            parameters
                .set("scale", ParameterValue::Vec3(Vec3::new(2.0, 2.0, -1.0)))
                .unwrap();
        }

        let source = OperatorHandle::new(location::create_named("bron"));
        source
            .set_location_pose(Pose::from_translation(Vec3::new(1.0, 1.0, 1.0)))
            .unwrap();
        handle.link_position(0, Some(source)).unwrap();

        assert_vec_close(handle.compute().translation, Vec3::new(2.0, 2.5, -1.0));
    }

    #[test]
    fn orientation_input_is_the_outer_rotation() {
        let handle = OperatorHandle::new(create());
        handle
            .operator_mut()
            .parameters_mut()
            .set("rotation", ParameterValue::Vec3(Vec3::new(90.0, 0.0, 0.0)))
            .unwrap();

        let upstream = OperatorHandle::new(create());
        upstream
            .operator_mut()
            .parameters_mut()
            .set("rotation", ParameterValue::Vec3(Vec3::new(0.0, 0.0, 90.0)))
            .unwrap();
        handle.link_orientation(0, Some(upstream)).unwrap();

        let expected = Quat::from_rotation_z(90f32.to_radians()) * Quat::from_rotation_x(90f32.to_radians());
        let rotation = handle.compute().rotation;
        assert_vec_close(rotation * Vec3::Y, expected * Vec3::Y);
        assert_vec_close(rotation * Vec3::Y, Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn euler_order_is_x_then_y_then_z() {
        let q = euler_xyz_degrees(Vec3::new(90.0, 90.0, 0.0));
        // X draait Y naar Z, daarna draait Y die Z naar X.
        assert_vec_close(q * Vec3::Y, Vec3::X);
    }

    #[test]
    fn rotation_is_clamped_to_limits() {
        let mut operator = create();
        operator
            .parameters_mut()
            .set("rotation", ParameterValue::Vec3(Vec3::new(400.0, 0.0, -181.0)))
            .unwrap();
        assert_eq!(
            operator.parameters().vec3("rotation"),
            Some(Vec3::new(180.0, 0.0, -180.0))
        );
    }
}
