use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use thiserror::Error;

use crate::ast::{Literal, SourceSpan};
use crate::diagnostics::DiagnosticCode;
use crate::types::{EnumId, PrimitiveKind};

#[derive(Debug, Clone, PartialEq)]
pub enum EnumValue {
    Int(i128),
    Float(f64),
    Str(String),
}

impl EnumValue {
    fn same_kind(&self, other: &EnumValue) -> bool {
        matches!(
            (self, other),
            (EnumValue::Int(_), EnumValue::Int(_))
                | (EnumValue::Float(_), EnumValue::Float(_))
                | (EnumValue::Str(_), EnumValue::Str(_))
        )
    }
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnumValue::Int(value) => write!(f, "{value}"),
            EnumValue::Float(value) => write!(f, "{value}"),
            EnumValue::Str(value) => write!(f, "{value:?}"),
        }
    }
}

/// An enum declaration as handed to [`EnumRegistry::define`].
#[derive(Debug, Clone)]
pub struct EnumDef {
    pub name: String,
    pub backing: PrimitiveKind,
    pub variants: Vec<VariantDef>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct VariantDef {
    pub name: String,
    pub value: Option<Literal>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumVariant {
    pub name: String,
    pub value: EnumValue,
}

#[derive(Debug, Clone)]
pub struct EnumInfo {
    pub name: String,
    pub backing: PrimitiveKind,
    pub variants: Vec<EnumVariant>,
    pub span: SourceSpan,
}

impl EnumInfo {
    pub fn variant(&self, name: &str) -> Option<(usize, &EnumVariant)> {
        self.variants
            .iter()
            .enumerate()
            .find(|(_, variant)| variant.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnumError {
    #[error("enum '{enum_name}' declares variant '{variant}' more than once")]
    DuplicateName {
        enum_name: String,
        variant: String,
        span: SourceSpan,
    },
    #[error("variants '{first}' and '{second}' of enum '{enum_name}' share the value {value}")]
    DuplicateValue {
        enum_name: String,
        first: String,
        second: String,
        value: EnumValue,
        span: SourceSpan,
    },
    #[error("variant '{variant}' of {backing}-backed enum '{enum_name}' needs an explicit value")]
    MissingValue {
        enum_name: String,
        variant: String,
        backing: PrimitiveKind,
        span: SourceSpan,
    },
    #[error("value of variant '{variant}' does not fit the {backing} backing of enum '{enum_name}'")]
    ValueMismatch {
        enum_name: String,
        variant: String,
        backing: PrimitiveKind,
        span: SourceSpan,
    },
    #[error("enum '{enum_name}' cannot be backed by {backing}")]
    InvalidBacking {
        enum_name: String,
        backing: PrimitiveKind,
        span: SourceSpan,
    },
}

impl EnumError {
    pub fn code(&self) -> DiagnosticCode {
        match self {
            EnumError::DuplicateName { .. } | EnumError::DuplicateValue { .. } => {
                DiagnosticCode::DuplicateVariant
            }
            _ => DiagnosticCode::EnumValueMismatch,
        }
    }

    pub fn span(&self) -> SourceSpan {
        match self {
            EnumError::DuplicateName { span, .. }
            | EnumError::DuplicateValue { span, .. }
            | EnumError::MissingValue { span, .. }
            | EnumError::ValueMismatch { span, .. }
            | EnumError::InvalidBacking { span, .. } => *span,
        }
    }
}

#[derive(Debug, Default)]
pub struct EnumRegistry {
    entries: Vec<EnumSlot>,
}

#[derive(Debug)]
enum EnumSlot {
    Reserved { name: String },
    Defined(EnumInfo),
    Rejected { name: String },
}

impl EnumRegistry {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Validates and registers `def` in one step.
    pub fn define(&mut self, def: EnumDef) -> Result<EnumId, EnumError> {
        let id = self.reserve(def.name.clone());
        self.install(id, Self::validate(&def))?;
        Ok(id)
    }

    /// Hands out an id before the declaration body is validated, so other
    /// declarations can name the enum while validation runs elsewhere.
    pub fn reserve(&mut self, name: impl Into<String>) -> EnumId {
        let id = EnumId(self.entries.len() as u32);
        self.entries.push(EnumSlot::Reserved { name: name.into() });
        id
    }

    pub fn install(
        &mut self,
        id: EnumId,
        validated: Result<EnumInfo, EnumError>,
    ) -> Result<(), EnumError> {
        let Some(slot) = self.entries.get_mut(id.0 as usize) else {
            return Ok(());
        };
        match validated {
            Ok(info) => {
                *slot = EnumSlot::Defined(info);
                Ok(())
            }
            Err(error) => {
                let name = match slot {
                    EnumSlot::Reserved { name } | EnumSlot::Rejected { name } => name.clone(),
                    EnumSlot::Defined(info) => info.name.clone(),
                };
                *slot = EnumSlot::Rejected { name };
                Err(error)
            }
        }
    }

    /// Checks variant names and values, filling in implicit integer values.
    pub fn validate(def: &EnumDef) -> Result<EnumInfo, EnumError> {
        let backing = def.backing;
        if !(backing.is_numeric() || backing == PrimitiveKind::Str) {
            return Err(EnumError::InvalidBacking {
                enum_name: def.name.clone(),
                backing,
                span: def.span,
            });
        }

        let mut names = HashSet::new();
        let mut variants: Vec<EnumVariant> = Vec::with_capacity(def.variants.len());
        let mut previous: Option<i128> = None;

        for variant in &def.variants {
            if !names.insert(variant.name.as_str()) {
                return Err(EnumError::DuplicateName {
                    enum_name: def.name.clone(),
                    variant: variant.name.clone(),
                    span: variant.span,
                });
            }

            let value = match &variant.value {
                Some(literal) => literal_value(literal, backing).ok_or_else(|| {
                    EnumError::ValueMismatch {
                        enum_name: def.name.clone(),
                        variant: variant.name.clone(),
                        backing,
                        span: variant.span,
                    }
                })?,
                None if backing.is_integer() => {
                    EnumValue::Int(previous.map(|value| value + 1).unwrap_or(0))
                }
                None => {
                    return Err(EnumError::MissingValue {
                        enum_name: def.name.clone(),
                        variant: variant.name.clone(),
                        backing,
                        span: variant.span,
                    })
                }
            };

            if let EnumValue::Int(number) = value {
                let in_range = backing
                    .integer_range()
                    .map(|(min, max)| number >= min && number <= max)
                    .unwrap_or(true);
                if !in_range {
                    return Err(EnumError::ValueMismatch {
                        enum_name: def.name.clone(),
                        variant: variant.name.clone(),
                        backing,
                        span: variant.span,
                    });
                }
                previous = Some(number);
            }

            if let Some(existing) = variants.iter().find(|existing| existing.value == value) {
                return Err(EnumError::DuplicateValue {
                    enum_name: def.name.clone(),
                    first: existing.name.clone(),
                    second: variant.name.clone(),
                    value,
                    span: variant.span,
                });
            }

            variants.push(EnumVariant {
                name: variant.name.clone(),
                value,
            });
        }

        Ok(EnumInfo {
            name: def.name.clone(),
            backing,
            variants,
            span: def.span,
        })
    }

    pub fn get(&self, id: EnumId) -> Option<&EnumInfo> {
        match self.entries.get(id.0 as usize) {
            Some(EnumSlot::Defined(info)) => Some(info),
            _ => None,
        }
    }

    pub fn is_rejected(&self, id: EnumId) -> bool {
        matches!(self.entries.get(id.0 as usize), Some(EnumSlot::Rejected { .. }))
    }

    /// Variant indices from smallest to largest backing value.
    pub fn ordering(&self, id: EnumId) -> Vec<usize> {
        let Some(info) = self.get(id) else {
            return Vec::new();
        };
        let mut order: Vec<usize> = (0..info.variants.len()).collect();
        order.sort_by(|a, b| {
            Self::compare(&info.variants[*a].value, &info.variants[*b].value)
                .unwrap_or(Ordering::Equal)
                .then(a.cmp(b))
        });
        order
    }

    /// Compares two backing values; `None` when they are of different kinds.
    pub fn compare(a: &EnumValue, b: &EnumValue) -> Option<Ordering> {
        if !a.same_kind(b) {
            return None;
        }
        Some(match (a, b) {
            (EnumValue::Int(a), EnumValue::Int(b)) => a.cmp(b),
            (EnumValue::Float(a), EnumValue::Float(b)) => a.total_cmp(b),
            (EnumValue::Str(a), EnumValue::Str(b)) => a.cmp(b),
            _ => return None,
        })
    }

    pub fn compare_variants(&self, id: EnumId, a: &str, b: &str) -> Option<Ordering> {
        let info = self.get(id)?;
        let (_, left) = info.variant(a)?;
        let (_, right) = info.variant(b)?;
        Self::compare(&left.value, &right.value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn literal_value(literal: &Literal, backing: PrimitiveKind) -> Option<EnumValue> {
    match literal {
        Literal::Integer(value) if backing.is_integer() => Some(EnumValue::Int(*value)),
        Literal::Integer(value) if backing.is_float() => Some(EnumValue::Float(*value as f64)),
        Literal::Float(value) if backing.is_float() => Some(EnumValue::Float(*value)),
        Literal::String(value) if backing == PrimitiveKind::Str => {
            Some(EnumValue::Str(value.clone()))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(name: &str, value: Option<Literal>) -> VariantDef {
        VariantDef {
            name: name.to_string(),
            value,
            span: SourceSpan::default(),
        }
    }

    fn def(backing: PrimitiveKind, variants: Vec<VariantDef>) -> EnumDef {
        EnumDef {
            name: "Kind".to_string(),
            backing,
            variants,
            span: SourceSpan::default(),
        }
    }

    fn values(info: &EnumInfo) -> Vec<EnumValue> {
        info.variants.iter().map(|v| v.value.clone()).collect()
    }

    #[test]
    fn continues_from_explicit_values() {
        let info = EnumRegistry::validate(&def(
            PrimitiveKind::Int32,
            vec![
                variant("A", Some(Literal::Integer(10))),
                variant("B", None),
                variant("C", Some(Literal::Integer(20))),
                variant("D", None),
            ],
        ))
        .unwrap();
        assert_eq!(
            values(&info),
            vec![
                EnumValue::Int(10),
                EnumValue::Int(11),
                EnumValue::Int(20),
                EnumValue::Int(21)
            ]
        );
    }

    #[test]
    fn rejects_float_enum_with_implicit_value() {
        let error = EnumRegistry::validate(&def(
            PrimitiveKind::Float64,
            vec![variant("Half", Some(Literal::Float(0.5))), variant("One", None)],
        ))
        .unwrap_err();
        assert!(matches!(error, EnumError::MissingValue { .. }));
    }

    #[test]
    fn rejects_implicit_value_colliding_with_explicit_one() {
        let error = EnumRegistry::validate(&def(
            PrimitiveKind::Int64,
            vec![
                variant("A", Some(Literal::Integer(1))),
                variant("B", Some(Literal::Integer(0))),
                variant("C", None),
            ],
        ))
        .unwrap_err();
        assert_eq!(error.code(), DiagnosticCode::DuplicateVariant);
    }

    #[test]
    fn range_checks_against_backing_kind() {
        let error = EnumRegistry::validate(&def(
            PrimitiveKind::UInt8,
            vec![variant("Big", Some(Literal::Integer(300)))],
        ))
        .unwrap_err();
        assert_eq!(error.code(), DiagnosticCode::EnumValueMismatch);
    }

    #[test]
    fn ordering_follows_backing_values() {
        let mut registry = EnumRegistry::new();
        let id = registry
            .define(def(
                PrimitiveKind::Int32,
                vec![
                    variant("High", Some(Literal::Integer(9))),
                    variant("Low", Some(Literal::Integer(1))),
                    variant("Mid", Some(Literal::Integer(5))),
                ],
            ))
            .unwrap();
        assert_eq!(registry.ordering(id), vec![1, 2, 0]);
        assert_eq!(
            registry.compare_variants(id, "Low", "High"),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn bool_cannot_back_an_enum() {
        let mut registry = EnumRegistry::new();
        let error = registry
            .define(def(PrimitiveKind::Bool, vec![variant("Yes", None)]))
            .unwrap_err();
        assert!(matches!(error, EnumError::InvalidBacking { .. }));
        assert!(registry.is_rejected(EnumId(0)));
    }
}
