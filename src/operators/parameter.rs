//! Benoemde, getypeerde operatorparameters.

use std::fmt;

use crate::math::Vec3;

use super::OperatorError;

/// Waarde van een parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Float(f32),
    Vec3(Vec3),
    Text(String),
}

impl ParameterValue {
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Float(_) => "Float",
            Self::Vec3(_) => "Vec3",
            Self::Text(_) => "Text",
        }
    }

    /// Parseert `raw` als hetzelfde type als `self`.
    pub fn parse_like(&self, raw: &str) -> Result<Self, OperatorError> {
        match self {
            Self::Float(_) => parse_f32(raw).map(Self::Float),
            Self::Vec3(_) => parse_vec3(raw).map(Self::Vec3),
            Self::Text(_) => Ok(Self::Text(raw.to_owned())),
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float(value) => write!(f, "{value}"),
            Self::Vec3(value) => write!(f, "{},{},{}", value.x, value.y, value.z),
            Self::Text(value) => f.write_str(value),
        }
    }
}

fn parse_f32(raw: &str) -> Result<f32, OperatorError> {
    raw.trim()
        .parse::<f32>()
        .map_err(|_| OperatorError::InvalidParameterText(raw.to_owned()))
}

fn parse_vec3(raw: &str) -> Result<Vec3, OperatorError> {
    let parts = raw
        .split(',')
        .map(parse_f32)
        .collect::<Result<Vec<_>, _>>()?;
    match parts.as_slice() {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(OperatorError::InvalidParameterText(raw.to_owned())),
    }
}

/// Parameter zoals een editor hem ziet.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: ParameterValue,
    /// Verborgen voor generieke UI-enumeratie, maar wel geserialiseerd.
    pub hidden: bool,
    /// Bereik per component; waarden worden bij het zetten geklemd.
    pub limits: Option<(f32, f32)>,
}

impl Parameter {
    #[must_use]
    pub fn new(name: impl Into<String>, value: ParameterValue) -> Self {
        Self {
            name: name.into(),
            value,
            hidden: false,
            limits: None,
        }
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    #[must_use]
    pub fn with_limits(mut self, min: f32, max: f32) -> Self {
        self.limits = Some((min, max));
        self
    }

    fn clamp(&self, value: ParameterValue) -> ParameterValue {
        let Some((min, max)) = self.limits else {
            return value;
        };
        match value {
            ParameterValue::Float(v) => ParameterValue::Float(v.clamp(min, max)),
            ParameterValue::Vec3(v) => {
                ParameterValue::Vec3(v.clamp(Vec3::splat(min), Vec3::splat(max)))
            }
            text @ ParameterValue::Text(_) => text,
        }
    }
}

/// Parameterlijst in invoegvolgorde.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterList {
    entries: Vec<Parameter>,
}

impl ParameterList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, parameter: Parameter) {
        self.entries.push(parameter);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.entries
            .iter()
            .find(|parameter| parameter.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn vec3(&self, name: &str) -> Option<Vec3> {
        match self.get(name).map(|parameter| &parameter.value) {
            Some(ParameterValue::Vec3(value)) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn float(&self, name: &str) -> Option<f32> {
        match self.get(name).map(|parameter| &parameter.value) {
            Some(ParameterValue::Float(value)) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name).map(|parameter| &parameter.value) {
            Some(ParameterValue::Text(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Overschrijf een bestaande parameter; het type moet gelijk blijven.
    pub fn set(&mut self, name: &str, value: ParameterValue) -> Result<(), OperatorError> {
        let parameter = self
            .entries
            .iter_mut()
            .find(|parameter| parameter.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| OperatorError::UnknownParameter(name.to_owned()))?;

        if std::mem::discriminant(&parameter.value) != std::mem::discriminant(&value) {
            return Err(OperatorError::ParameterType {
                name: parameter.name.clone(),
                expected: parameter.value.type_name(),
                actual: value.type_name(),
            });
        }

        parameter.value = parameter.clamp(value);
        Ok(())
    }

    /// Zet een parameter vanuit zijn tekstuele (XML) vorm.
    pub fn set_from_str(&mut self, name: &str, raw: &str) -> Result<(), OperatorError> {
        let value = self
            .get(name)
            .ok_or_else(|| OperatorError::UnknownParameter(name.to_owned()))?
            .value
            .parse_like(raw)?;
        self.set(name, value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.entries.iter()
    }

    /// Parameters die een editor mag tonen.
    pub fn visible(&self) -> impl Iterator<Item = &Parameter> {
        self.entries.iter().filter(|parameter| !parameter.hidden)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
