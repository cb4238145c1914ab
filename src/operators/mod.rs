//! Operatorgraaf: polymorfe pose-berekeningen met gedeelde invoerkoppelingen.
//!
//! Elke operator heeft een vast aantal `position`- en `orientation`-slots die bij
//! constructie vastliggen. Slots verwijzen via een [`OperatorHandle`] naar andere
//! operators; dezelfde operator mag door meerdere slots gedeeld worden.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use crate::math::Pose;

pub mod location;
pub mod parameter;
pub mod positions_to_orientation;
pub mod registry;
pub mod transform;

pub use location::LocationOperator;
pub use parameter::{Parameter, ParameterList, ParameterValue};
pub use positions_to_orientation::PositionsToOrientationOperator;
pub use registry::{OperatorDescriptor, OperatorRegistry, registry};
pub use transform::TransformOperator;

/// Berekende invoer van een operator, één entry per slot.
///
/// `None` betekent een leeg slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperatorInputs {
    pub position: Vec<Option<Pose>>,
    pub orientation: Vec<Option<Pose>>,
}

impl OperatorInputs {
    #[must_use]
    pub fn position(&self, slot: usize) -> Option<Pose> {
        self.position.get(slot).copied().flatten()
    }

    #[must_use]
    pub fn orientation(&self, slot: usize) -> Option<Pose> {
        self.orientation.get(slot).copied().flatten()
    }
}

/// Gemeenschappelijk gedrag van alle operatorvarianten.
///
/// `compute` heeft geen foutkanaal: ongeldige parameters leveren de identiteit.
pub trait Compute {
    fn compute(&self, inputs: &OperatorInputs, parameters: &ParameterList) -> Pose;
}

/// Beschikbare operatorvarianten.
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorKind {
    Transform(TransformOperator),
    PositionsToOrientation(PositionsToOrientationOperator),
    Location(LocationOperator),
}

impl OperatorKind {
    #[must_use]
    pub fn class_name(&self) -> &'static str {
        match self {
            Self::Transform(_) => transform::CLASS_NAME,
            Self::PositionsToOrientation(_) => positions_to_orientation::CLASS_NAME,
            Self::Location(_) => location::CLASS_NAME,
        }
    }

    fn compute(&self, inputs: &OperatorInputs, parameters: &ParameterList) -> Pose {
        match self {
            Self::Transform(operator) => operator.compute(inputs, parameters),
            Self::PositionsToOrientation(operator) => operator.compute(inputs, parameters),
            Self::Location(operator) => operator.compute(inputs, parameters),
        }
    }
}

/// Een operator met zijn slots en parameters.
#[derive(Debug, Clone)]
pub struct Operator {
    kind: OperatorKind,
    position: Vec<Option<OperatorHandle>>,
    orientation: Vec<Option<OperatorHandle>>,
    parameters: ParameterList,
}

impl Operator {
    #[must_use]
    pub fn new(
        kind: OperatorKind,
        position_slots: usize,
        orientation_slots: usize,
        parameters: ParameterList,
    ) -> Self {
        Self {
            kind,
            position: vec![None; position_slots],
            orientation: vec![None; orientation_slots],
            parameters,
        }
    }

    #[must_use]
    pub fn kind(&self) -> &OperatorKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut OperatorKind {
        &mut self.kind
    }

    #[must_use]
    pub fn class_name(&self) -> &'static str {
        self.kind.class_name()
    }

    #[must_use]
    pub fn parameters(&self) -> &ParameterList {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut ParameterList {
        &mut self.parameters
    }

    #[must_use]
    pub fn position_slot_count(&self) -> usize {
        self.position.len()
    }

    #[must_use]
    pub fn orientation_slot_count(&self) -> usize {
        self.orientation.len()
    }

    #[must_use]
    pub fn position_input(&self, slot: usize) -> Option<&OperatorHandle> {
        self.position.get(slot).and_then(Option::as_ref)
    }

    #[must_use]
    pub fn orientation_input(&self, slot: usize) -> Option<&OperatorHandle> {
        self.orientation.get(slot).and_then(Option::as_ref)
    }

    pub fn position_inputs(&self) -> impl Iterator<Item = (usize, &OperatorHandle)> {
        linked(&self.position)
    }

    pub fn orientation_inputs(&self) -> impl Iterator<Item = (usize, &OperatorHandle)> {
        linked(&self.orientation)
    }

    /// Hoofdletterongevoelige vergelijking met de klassenaam.
    #[must_use]
    pub fn is_of_class(&self, name: &str) -> bool {
        self.class_name().eq_ignore_ascii_case(name)
    }

    /// Telt de directe (niet transitieve) invoer van klasse `name`.
    #[must_use]
    pub fn has_links_of_class(&self, name: &str) -> usize {
        self.position_inputs()
            .chain(self.orientation_inputs())
            .filter(|(_, input)| input.operator().is_of_class(name))
            .count()
    }

    /// Berekent de pose zonder cache; gedeelde invoer wordt opnieuw berekend.
    #[must_use]
    pub fn compute(&self) -> Pose {
        self.compute_with(&mut |input| input.compute())
    }

    /// Berekent de pose waarbij `resolve` de gekoppelde invoer oplost.
    pub fn compute_with(&self, resolve: &mut dyn FnMut(&OperatorHandle) -> Pose) -> Pose {
        let position = self
            .position
            .iter()
            .map(|slot| slot.as_ref().map(|input| resolve(input)))
            .collect();
        let orientation = self
            .orientation
            .iter()
            .map(|slot| slot.as_ref().map(|input| resolve(input)))
            .collect();

        let inputs = OperatorInputs {
            position,
            orientation,
        };
        self.kind.compute(&inputs, &self.parameters)
    }

    fn inputs(&self) -> impl Iterator<Item = &OperatorHandle> {
        self.position
            .iter()
            .chain(self.orientation.iter())
            .filter_map(Option::as_ref)
    }
}

fn linked(slots: &[Option<OperatorHandle>]) -> impl Iterator<Item = (usize, &OperatorHandle)> {
    slots
        .iter()
        .enumerate()
        .filter_map(|(slot, input)| input.as_ref().map(|handle| (slot, handle)))
}

/// Welk type slot gekoppeld wordt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Position,
    Orientation,
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Position => f.write_str("position"),
            Self::Orientation => f.write_str("orientation"),
        }
    }
}

/// Gedeelde, identiteitsvergelijkbare verwijzing naar een [`Operator`].
#[derive(Debug, Clone)]
pub struct OperatorHandle(Rc<RefCell<Operator>>);

impl OperatorHandle {
    #[must_use]
    pub fn new(operator: Operator) -> Self {
        Self(Rc::new(RefCell::new(operator)))
    }

    /// Leent de operator.
    ///
    /// # Panics
    ///
    /// Als de operator op hetzelfde moment mutabel geleend is.
    #[must_use]
    pub fn operator(&self) -> Ref<'_, Operator> {
        self.0.borrow()
    }

    /// Leent de operator mutabel.
    ///
    /// # Panics
    ///
    /// Als de operator op hetzelfde moment al geleend is.
    #[must_use]
    pub fn operator_mut(&self) -> RefMut<'_, Operator> {
        self.0.borrow_mut()
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Identiteitssleutel, geldig zolang de handle leeft.
    #[must_use]
    pub fn key(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    #[must_use]
    pub fn class_name(&self) -> &'static str {
        self.operator().class_name()
    }

    #[must_use]
    pub fn is_of_class(&self, name: &str) -> bool {
        self.operator().is_of_class(name)
    }

    #[must_use]
    pub fn compute(&self) -> Pose {
        self.operator().compute()
    }

    pub fn link_position(
        &self,
        slot: usize,
        input: Option<OperatorHandle>,
    ) -> Result<(), OperatorError> {
        self.link(SlotKind::Position, slot, input)
    }

    pub fn link_orientation(
        &self,
        slot: usize,
        input: Option<OperatorHandle>,
    ) -> Result<(), OperatorError> {
        self.link(SlotKind::Orientation, slot, input)
    }

    /// Koppelt `input` aan een slot; weigert koppelingen die een cyclus maken.
    pub fn link(
        &self,
        kind: SlotKind,
        slot: usize,
        input: Option<OperatorHandle>,
    ) -> Result<(), OperatorError> {
        let count = match kind {
            SlotKind::Position => self.operator().position_slot_count(),
            SlotKind::Orientation => self.operator().orientation_slot_count(),
        };
        if slot >= count {
            return Err(OperatorError::SlotOutOfRange { kind, slot, count });
        }

        if let Some(input) = &input {
            if input.ptr_eq(self) || input.depends_on(self) {
                log::warn!(
                    "koppeling van {} naar {} {kind}-slot {slot} geweigerd: cyclus",
                    input.class_name(),
                    self.class_name(),
                );
                return Err(OperatorError::Cycle);
            }
        }

        let mut operator = self.operator_mut();
        match kind {
            SlotKind::Position => operator.position[slot] = input,
            SlotKind::Orientation => operator.orientation[slot] = input,
        }
        Ok(())
    }

    /// `true` als `target` ergens stroomopwaarts van `self` voorkomt.
    #[must_use]
    pub fn depends_on(&self, target: &OperatorHandle) -> bool {
        self.operator()
            .inputs()
            .any(|input| input.ptr_eq(target) || input.depends_on(target))
    }

    /// Naam van een Location-operator.
    #[must_use]
    pub fn location_name(&self) -> Option<String> {
        let operator = self.operator();
        match operator.kind() {
            OperatorKind::Location(_) => Some(
                operator
                    .parameters()
                    .text(location::NAME_PARAMETER)
                    .unwrap_or_default()
                    .to_owned(),
            ),
            _ => None,
        }
    }

    /// Zet de opgeslagen referentiepose van een Location-operator.
    pub fn set_location_pose(&self, pose: Pose) -> Result<(), OperatorError> {
        let mut operator = self.operator_mut();
        match operator.kind_mut() {
            OperatorKind::Location(location) => {
                location.pose = pose;
                Ok(())
            }
            other => Err(OperatorError::NotALocation(other.class_name().to_owned())),
        }
    }
}

/// Fouten bij het opbouwen en configureren van operators.
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorError {
    SlotOutOfRange {
        kind: SlotKind,
        slot: usize,
        count: usize,
    },
    Cycle,
    UnknownParameter(String),
    ParameterType {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },
    InvalidParameterText(String),
    NotALocation(String),
}

impl fmt::Display for OperatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SlotOutOfRange { kind, slot, count } => {
                write!(f, "{kind}-slot {slot} buiten bereik (aantal slots: {count})")
            }
            Self::Cycle => f.write_str("koppeling zou een cyclus in de operatorgraaf maken"),
            Self::UnknownParameter(name) => write!(f, "onbekende parameter `{name}`"),
            Self::ParameterType {
                name,
                expected,
                actual,
            } => write!(
                f,
                "parameter `{name}` verwacht type {expected}, kreeg {actual}"
            ),
            Self::InvalidParameterText(raw) => write!(f, "ongeldige parameterwaarde `{raw}`"),
            Self::NotALocation(class) => write!(f, "operator van klasse {class} is geen Location"),
        }
    }
}

impl std::error::Error for OperatorError {}

#[cfg(test)]
mod tests {
    use super::{OperatorError, OperatorHandle, SlotKind, location, positions_to_orientation, transform};
    use crate::math::{Pose, Vec3};

    fn located(name: &str, translation: Vec3) -> OperatorHandle {
        let handle = OperatorHandle::new(location::create_named(name));
        handle
            .set_location_pose(Pose::from_translation(translation))
            .expect("location accepteert pose");
        handle
    }

    #[test]
    fn class_comparison_ignores_case() {
        let operator = transform::create();
        assert!(operator.is_of_class("transform"));
        assert!(operator.is_of_class("TRANSFORM"));
        assert!(!operator.is_of_class("Location"));
    }

    #[test]
    fn counts_only_direct_links_of_class() {
        let frame = OperatorHandle::new(positions_to_orientation::create());
        let left = located("left", Vec3::X);
        let shifted = OperatorHandle::new(transform::create());
        shifted.link_position(0, Some(located("deep", Vec3::Y))).unwrap();

        frame.link_position(0, Some(left.clone())).unwrap();
        frame.link_position(1, Some(shifted)).unwrap();
        frame.link_position(2, Some(left)).unwrap();

        let operator = frame.operator();
        assert_eq!(operator.has_links_of_class("location"), 2);
        assert_eq!(operator.has_links_of_class("Transform"), 1);
        assert_eq!(operator.has_links_of_class("PositionsToOrientation"), 0);
    }

    #[test]
    fn rejects_out_of_range_slots() {
        let handle = OperatorHandle::new(transform::create());
        let err = handle
            .link_position(1, Some(located("a", Vec3::ZERO)))
            .unwrap_err();
        assert_eq!(
            err,
            OperatorError::SlotOutOfRange {
                kind: SlotKind::Position,
                slot: 1,
                count: 1
            }
        );

        let location = located("b", Vec3::ZERO);
        assert!(location.link_orientation(0, None).is_err());
    }

    #[test]
    fn rejects_cycles() {
        let a = OperatorHandle::new(transform::create());
        let b = OperatorHandle::new(transform::create());
        a.link_position(0, Some(b.clone())).unwrap();

        assert_eq!(a.link_orientation(0, Some(a.clone())), Err(OperatorError::Cycle));
        assert_eq!(b.link_position(0, Some(a.clone())), Err(OperatorError::Cycle));
        assert!(b.operator().position_input(0).is_none());
    }

    #[test]
    fn unlinking_clears_the_slot() {
        let a = OperatorHandle::new(transform::create());
        a.link_position(0, Some(located("a", Vec3::ONE))).unwrap();
        assert_eq!(a.compute().translation, Vec3::ONE);

        a.link_position(0, None).unwrap();
        assert_eq!(a.compute().translation, Vec3::ZERO);
    }

    #[test]
    fn set_location_pose_requires_location() {
        let handle = OperatorHandle::new(transform::create());
        assert_eq!(
            handle.set_location_pose(Pose::IDENTITY),
            Err(OperatorError::NotALocation("Transform".to_owned()))
        );
        assert_eq!(handle.location_name(), None);
        assert_eq!(located("hand", Vec3::ZERO).location_name().as_deref(), Some("hand"));
    }
}
