//! Inlezen en wegschrijven van hiërarchie- en mapperdocumenten.

pub mod mapper_xml;
