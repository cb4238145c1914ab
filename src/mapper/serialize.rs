//! Opslaan en laden van mapperconfiguraties als geneste XML.
//!
//! Alleen nodes waarvan de subboom een location bevat worden geschreven.
//! Operators worden met hun volledige invoergraaf genest; gedeelde invoer
//! wordt daarbij per pad herhaald. Bij het laden worden Location-operators
//! op naam samengevoegd, zodat gedeelde locations weer gedeeld zijn.

use std::path::Path;

use crate::math::Pose;
use crate::operators::{OperatorError, OperatorHandle, SlotKind, location, registry};
use crate::parse::mapper_xml::{
    self, HierarchyElement, LinkElement, NodeElement, OperatorElement, ParameterElement,
    ParseError, ParseResult,
};

use super::Mapper;

/// Eenmalig berekende structuur voor het wegschrijven.
struct WriteTree {
    children: Vec<Vec<usize>>,
    mapped: Vec<bool>,
}

/// Schrijft een operator met zijn parameters en alle gekoppelde invoer.
#[must_use]
pub fn operator_to_element(handle: &OperatorHandle) -> OperatorElement {
    let operator = handle.operator();
    let link = |(slot, input): (usize, &OperatorHandle)| LinkElement {
        index: Some(slot),
        operator: operator_to_element(input),
    };

    OperatorElement {
        class: operator.class_name().to_owned(),
        parameters: operator
            .parameters()
            .iter()
            .map(|parameter| ParameterElement {
                name: parameter.name.clone(),
                value: parameter.value.to_string(),
            })
            .collect(),
        position: operator.position_inputs().map(link).collect(),
        orientation: operator.orientation_inputs().map(link).collect(),
    }
}

impl Mapper {
    #[must_use]
    pub fn to_element(&self) -> HierarchyElement {
        let tree = WriteTree {
            children: self.hierarchy.children_table(),
            mapped: self.subtree_location_flags(),
        };
        HierarchyElement {
            nodes: self
                .hierarchy
                .roots()
                .filter(|&root| tree.mapped[root])
                .map(|root| self.node_element(&tree, root))
                .collect(),
        }
    }

    fn node_element(&self, tree: &WriteTree, index: usize) -> NodeElement {
        let mut element = NodeElement::new(
            self.hierarchy
                .node(index)
                .map_or_else(String::new, |node| node.name.clone()),
        );
        element.position = self.position_operator(index).map(|handle| LinkElement {
            index: None,
            operator: operator_to_element(handle),
        });
        element.orientation = self.orientation_operator(index).map(|handle| LinkElement {
            index: None,
            operator: operator_to_element(handle),
        });
        element.children = tree.children[index]
            .iter()
            .filter(|&&child| tree.mapped[child])
            .map(|&child| self.node_element(tree, child))
            .collect();
        element
    }

    pub fn to_xml(&self) -> ParseResult<String> {
        mapper_xml::write_document(&self.to_element())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> ParseResult<()> {
        mapper_xml::write_file(path, &self.to_element())
    }

    /// Vervangt alle toewijzingen en locations door die uit `document`.
    ///
    /// Nodes worden op naam gevonden; onbekende namen worden onder de
    /// omsluitende node aan de hiërarchie toegevoegd. Bij een fout blijft de
    /// mapper ongewijzigd.
    pub fn load_element(&mut self, document: &HierarchyElement) -> ParseResult<()> {
        let mut loaded = Mapper::from_hierarchy(self.hierarchy.clone());
        for element in &document.nodes {
            loaded.load_node(element, None)?;
        }

        loaded.hierarchy.validate_references();
        log::debug!(
            "mapper geladen: {} nodes, {} locations",
            loaded.hierarchy.node_count(),
            loaded.locations.len()
        );
        *self = loaded;
        Ok(())
    }

    pub fn load_xml(&mut self, input: &str) -> ParseResult<()> {
        let document = mapper_xml::read_document(input)?;
        self.load_element(&document)
    }

    pub fn load(&mut self, path: impl AsRef<Path>) -> ParseResult<()> {
        let document = mapper_xml::read_file(path)?;
        self.load_element(&document)
    }

    fn load_node(&mut self, element: &NodeElement, parent: Option<usize>) -> ParseResult<()> {
        let index = match self.hierarchy.find_node_index(&element.name) {
            Some(index) => index,
            None => {
                log::warn!(
                    "node `{}` staat niet in de hiërarchie en wordt toegevoegd",
                    element.name
                );
                self.hierarchy
                    .add_node(&element.name, Pose::IDENTITY, parent)
            }
        };

        if let Some(link) = &element.position {
            let handle = self.operator_from_element(&link.operator)?;
            self.set_position(index, Some(handle))?;
        }
        if let Some(link) = &element.orientation {
            let handle = self.operator_from_element(&link.operator)?;
            self.set_orientation(index, Some(handle))?;
        }

        for child in &element.children {
            self.load_node(child, Some(index))?;
        }
        Ok(())
    }

    /// Bouwt een operator en zijn invoer op via de registry.
    pub fn operator_from_element(&mut self, element: &OperatorElement) -> ParseResult<OperatorHandle> {
        let mut operator = registry()
            .create_by_name(&element.class)
            .ok_or_else(|| ParseError::UnknownClass(element.class.clone()))?;

        for parameter in &element.parameters {
            match operator
                .parameters_mut()
                .set_from_str(&parameter.name, &parameter.value)
            {
                Ok(()) => {}
                Err(OperatorError::UnknownParameter(name)) => {
                    log::warn!("{}: onbekende parameter `{name}` genegeerd", element.class);
                }
                Err(err) => return Err(err.into()),
            }
        }

        if operator.is_of_class(location::CLASS_NAME) {
            let name = operator
                .parameters()
                .text(location::NAME_PARAMETER)
                .unwrap_or_default()
                .to_owned();
            if !name.is_empty() {
                if let Some(existing) = self.find_location(&name) {
                    let existing = self.locations[existing].clone();
                    let dropped = operator.parameters().vec3(location::AXIS_PARAMETER);
                    let kept = existing.operator().parameters().vec3(location::AXIS_PARAMETER);
                    if dropped != kept {
                        log::warn!(
                            "location `{name}` bestaat al met een andere `{}`; waarden uit het document genegeerd",
                            location::AXIS_PARAMETER
                        );
                    }
                    return Ok(existing);
                }
            }
            let handle = OperatorHandle::new(operator);
            self.locations.push(handle.clone());
            return Ok(handle);
        }

        let handle = OperatorHandle::new(operator);
        for (kind, links) in [
            (SlotKind::Position, &element.position),
            (SlotKind::Orientation, &element.orientation),
        ] {
            for (ordinal, link) in links.iter().enumerate() {
                let input = self.operator_from_element(&link.operator)?;
                handle.link(kind, link.index.unwrap_or(ordinal), Some(input))?;
            }
        }
        Ok(handle)
    }
}
