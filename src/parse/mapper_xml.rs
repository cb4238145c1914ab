//! XML-formaat voor hiërarchieën en mapperconfiguraties.
//!
//! Het document is een geneste boom onder een `Hierarchy`-root:
//! `Node`-elementen (attribuut `name`) volgen de ouder/kind-structuur, een
//! gemapte node draagt `Position`/`Orientation` met daarin één `Operator`, en
//! operators nesten hun invoer weer als `Position`/`Orientation` met een
//! `index`-attribuut voor het slot.

use std::fs;
use std::path::Path;

use quick_xml::de::from_str;
use quick_xml::se::to_string_with_root;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mapper::MapperError;
use crate::operators::OperatorError;

/// Naam van het root-element.
pub const ROOT_TAG: &str = "Hierarchy";

/// Result type voor het lezen en schrijven van mapperdocumenten.
pub type ParseResult<T> = Result<T, ParseError>;

/// Beschrijft fouten tijdens het (de)serialiseren.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Het XML-document kon niet ge(de)serialiseerd worden.
    #[error("XML fout: {0}")]
    Xml(#[from] quick_xml::DeError),
    /// Het document heeft geen `Hierarchy`-root.
    #[error("document mist het `Hierarchy` root-element")]
    MissingHierarchy,
    /// De operatorklasse staat niet in de registry.
    #[error("onbekende operatorklasse `{0}`")]
    UnknownClass(String),
    /// Een operator kon niet worden opgebouwd of gekoppeld.
    #[error("operatorfout: {0}")]
    Operator(#[from] OperatorError),
    /// Een node-toewijzing uit het document kon niet worden toegepast.
    #[error("mapperfout: {0}")]
    Mapper(#[from] MapperError),
    /// Lezen of schrijven van het bestand is mislukt.
    #[error("I/O fout: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HierarchyElement {
    #[serde(rename = "Node", default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<NodeElement>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeElement {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "Position", default, skip_serializing_if = "Option::is_none")]
    pub position: Option<LinkElement>,
    #[serde(rename = "Orientation", default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<LinkElement>,
    #[serde(rename = "Node", default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeElement>,
}

impl NodeElement {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Verwijzing naar een operator, op een node of als invoer van een andere operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkElement {
    #[serde(rename = "@index", default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(rename = "Operator")]
    pub operator: OperatorElement,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperatorElement {
    #[serde(rename = "@class")]
    pub class: String,
    #[serde(rename = "Parameter", default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterElement>,
    #[serde(rename = "Position", default, skip_serializing_if = "Vec::is_empty")]
    pub position: Vec<LinkElement>,
    #[serde(rename = "Orientation", default, skip_serializing_if = "Vec::is_empty")]
    pub orientation: Vec<LinkElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterElement {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@value")]
    pub value: String,
}

/// Leest een document en controleert dat de root `Hierarchy` is.
pub fn read_document(input: &str) -> ParseResult<HierarchyElement> {
    if !has_hierarchy_root(input) {
        return Err(ParseError::MissingHierarchy);
    }

    let document: HierarchyElement = from_str(input)?;
    log::debug!("document met {} top-level nodes gelezen", document.nodes.len());
    Ok(document)
}

pub fn write_document(document: &HierarchyElement) -> ParseResult<String> {
    Ok(to_string_with_root(ROOT_TAG, document)?)
}

pub fn read_file(path: impl AsRef<Path>) -> ParseResult<HierarchyElement> {
    let input = fs::read_to_string(path)?;
    read_document(&input)
}

pub fn write_file(path: impl AsRef<Path>, document: &HierarchyElement) -> ParseResult<()> {
    let xml = write_document(document)?;
    fs::write(path, xml)?;
    Ok(())
}

fn has_hierarchy_root(input: &str) -> bool {
    let body = strip_xml_preamble(input);
    let Some(rest) = body.strip_prefix('<') else {
        return false;
    };

    let tag_end = rest
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .unwrap_or(rest.len());
    rest[..tag_end].eq_ignore_ascii_case(ROOT_TAG)
}

fn strip_xml_preamble(input: &str) -> &str {
    let mut rest = input.trim_start_matches(|c: char| c == '\u{feff}' || c.is_whitespace());
    loop {
        let skipped = if let Some(decl) = rest.strip_prefix("<?") {
            decl.find("?>").map(|idx| &decl[idx + 2..])
        } else if let Some(comment) = rest.strip_prefix("<!--") {
            comment.find("-->").map(|idx| &comment[idx + 3..])
        } else {
            None
        };

        match skipped {
            Some(next) => rest = next.trim_start(),
            None => return rest,
        }
    }
}
