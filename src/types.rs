//! Shared types and enums used across numpytile.
//! Includes the eight supported `ElementType` encodings and the built-in
//! `StylePreset` names.
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Numeric encoding of the samples in an NPY buffer.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F32,
    F64,
}

impl ElementType {
    pub const ALL: [ElementType; 8] = [
        ElementType::U8,
        ElementType::I8,
        ElementType::U16,
        ElementType::I16,
        ElementType::U32,
        ElementType::I32,
        ElementType::F32,
        ElementType::F64,
    ];

    /// NPY `descr` tag for this encoding.
    pub fn descr(self) -> &'static str {
        match self {
            ElementType::U8 => "|u1",
            ElementType::I8 => "|i1",
            ElementType::U16 => "<u2",
            ElementType::I16 => "<i2",
            ElementType::U32 => "<u4",
            ElementType::I32 => "<i4",
            ElementType::F32 => "<f4",
            ElementType::F64 => "<f8",
        }
    }

    /// Only the exact tags above are recognised; anything else is unsupported.
    pub fn from_descr(descr: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.descr() == descr)
    }

    pub fn size_bytes(self) -> usize {
        match self {
            ElementType::U8 | ElementType::I8 => 1,
            ElementType::U16 | ElementType::I16 => 2,
            ElementType::U32 | ElementType::I32 | ElementType::F32 => 4,
            ElementType::F64 => 8,
        }
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ElementType::U8 => "uint8",
            ElementType::I8 => "int8",
            ElementType::U16 => "uint16",
            ElementType::I16 => "int16",
            ElementType::U32 => "uint32",
            ElementType::I32 => "int32",
            ElementType::F32 => "float32",
            ElementType::F64 => "float64",
        };
        write!(f, "{}", s)
    }
}

/// Built-in, hand-coded pixel styles selectable by name.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StylePreset {
    Rgb,
    Gray,
    Pending,
    #[value(name = "onlyRed")]
    OnlyRed,
    Value,
}

impl std::fmt::Display for StylePreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StylePreset::Rgb => write!(f, "rgb"),
            StylePreset::Gray => write!(f, "gray"),
            StylePreset::Pending => write!(f, "pending"),
            StylePreset::OnlyRed => write!(f, "onlyRed"),
            StylePreset::Value => write!(f, "value"),
        }
    }
}

impl std::str::FromStr for StylePreset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rgb" => Ok(StylePreset::Rgb),
            "gray" => Ok(StylePreset::Gray),
            "pending" => Ok(StylePreset::Pending),
            "onlyRed" => Ok(StylePreset::OnlyRed),
            "value" => Ok(StylePreset::Value),
            other => Err(Error::UnknownPreset {
                name: other.to_string(),
            }),
        }
    }
}
