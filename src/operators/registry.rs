//! Registry van operatorklassen: naam → fabriek.

use once_cell::sync::OnceCell;

use super::{Operator, location, positions_to_orientation, transform};

/// Beschrijft een operatorklasse en hoe je er een aanmaakt.
#[derive(Debug, Clone, Copy)]
pub struct OperatorDescriptor {
    pub name: &'static str,
    pub position_slots: usize,
    pub orientation_slots: usize,
    pub create: fn() -> Operator,
}

/// Alle ingebouwde operatorklassen, in vaste volgorde.
pub const REGISTRATIONS: &[OperatorDescriptor] = &[
    transform::REGISTRATION,
    positions_to_orientation::REGISTRATION,
    location::REGISTRATION,
];

static REGISTRY: OnceCell<OperatorRegistry> = OnceCell::new();

/// De procesbrede registry, bij eerste gebruik opgebouwd.
#[must_use]
pub fn registry() -> &'static OperatorRegistry {
    REGISTRY.get_or_init(OperatorRegistry::default)
}

#[derive(Debug, Clone)]
pub struct OperatorRegistry {
    descriptors: Vec<OperatorDescriptor>,
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        for descriptor in REGISTRATIONS {
            registry.register(*descriptor);
        }
        registry
    }
}

impl OperatorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            descriptors: Vec::new(),
        }
    }

    /// Voegt een klasse toe; een bestaande naam wordt vervangen.
    pub fn register(&mut self, descriptor: OperatorDescriptor) {
        match self.find(descriptor.name) {
            Some(index) => {
                log::warn!("operatorklasse {} opnieuw geregistreerd", descriptor.name);
                self.descriptors[index] = descriptor;
            }
            None => self.descriptors.push(descriptor),
        }
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.descriptors.len()
    }

    #[must_use]
    pub fn name(&self, index: usize) -> Option<&'static str> {
        self.descriptors.get(index).map(|descriptor| descriptor.name)
    }

    #[must_use]
    pub fn descriptor(&self, index: usize) -> Option<&OperatorDescriptor> {
        self.descriptors.get(index)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.descriptors.iter().map(|descriptor| descriptor.name)
    }

    /// Hoofdletterongevoelige zoekactie op klassenaam.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.descriptors
            .iter()
            .position(|descriptor| descriptor.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn create(&self, index: usize) -> Option<Operator> {
        self.descriptors
            .get(index)
            .map(|descriptor| (descriptor.create)())
    }

    #[must_use]
    pub fn create_by_name(&self, name: &str) -> Option<Operator> {
        self.find(name).and_then(|index| self.create(index))
    }
}
