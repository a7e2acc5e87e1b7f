//! Numeric data type of a channel.

use std::fmt;
use std::str::FromStr;

use crate::error::{CisError, Result};

/// Numeric type of the samples recorded for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// 16-bit signed integer.
    Int16,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 32-bit float.
    Float32,
    /// 64-bit float.
    Float64,
    /// Complex number made of two 32-bit floats.
    Complex64,
}

/// Rust types with a matching [`DataType`].
pub trait NativeType {
    /// The data type of this Rust type.
    const DATA_TYPE: DataType;
}

impl NativeType for i16 {
    const DATA_TYPE: DataType = DataType::Int16;
}

impl NativeType for i32 {
    const DATA_TYPE: DataType = DataType::Int32;
}

impl NativeType for i64 {
    const DATA_TYPE: DataType = DataType::Int64;
}

impl NativeType for f32 {
    const DATA_TYPE: DataType = DataType::Float32;
}

impl NativeType for f64 {
    const DATA_TYPE: DataType = DataType::Float64;
}

impl DataType {
    /// Returns the data type matching the Rust type `T`.
    #[must_use]
    pub const fn of<T: NativeType>() -> Self {
        T::DATA_TYPE
    }

    /// Decodes the service's integer enum. Code `0` means "no type".
    ///
    /// # Errors
    ///
    /// Returns `CisError::InvalidDataType` for codes outside `0..=6`.
    pub fn from_code(code: i64) -> Result<Option<Self>> {
        match code {
            0 => Ok(None),
            1 => Ok(Some(Self::Int16)),
            2 => Ok(Some(Self::Int32)),
            3 => Ok(Some(Self::Int64)),
            4 => Ok(Some(Self::Float32)),
            5 => Ok(Some(Self::Float64)),
            6 => Ok(Some(Self::Complex64)),
            _ => Err(CisError::InvalidDataType { code }),
        }
    }

    /// Integer code used by the service.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Int16 => 1,
            Self::Int32 => 2,
            Self::Int64 => 3,
            Self::Float32 => 4,
            Self::Float64 => 5,
            Self::Complex64 => 6,
        }
    }

    /// Canonical lowercase name, e.g. `float32`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Complex64 => "complex64",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = CisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int16" | "i16" | "short" => Ok(Self::Int16),
            "int32" | "i32" | "int" => Ok(Self::Int32),
            "int64" | "i64" | "long" => Ok(Self::Int64),
            "float32" | "f32" | "float" | "single" => Ok(Self::Float32),
            "float64" | "f64" | "double" => Ok(Self::Float64),
            "complex64" | "c64" => Ok(Self::Complex64),
            _ => Err(CisError::UnknownDataTypeName {
                name: String::from(s),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_code_4_matches_native_f32() {
        // Arrange & Act
        let from_code = DataType::from_code(4).unwrap();

        // Assert
        assert_eq!(from_code, Some(DataType::of::<f32>()));
    }

    #[test]
    fn test_code_0_is_unset() {
        assert_eq!(DataType::from_code(0).unwrap(), None);
    }

    #[test]
    fn test_unknown_code_is_rejected() {
        assert!(matches!(
            DataType::from_code(7),
            Err(CisError::InvalidDataType { code: 7 })
        ));
        assert!(DataType::from_code(-1).is_err());
    }

    #[test]
    fn test_codes_match_enum_table() {
        for code in 1..=6_i64 {
            let dtype = DataType::from_code(code).unwrap().unwrap();
            assert_eq!(i64::from(dtype.code()), code);
        }
        assert_eq!(DataType::from_code(5).unwrap(), Some(DataType::of::<f64>()));
        assert_eq!(DataType::from_code(1).unwrap(), Some(DataType::of::<i16>()));
    }

    #[test]
    fn test_from_str_aliases() {
        assert_eq!("double".parse::<DataType>().unwrap(), DataType::Float64);
        assert_eq!("Float32".parse::<DataType>().unwrap(), DataType::Float32);
        assert_eq!("complex64".parse::<DataType>().unwrap(), DataType::Complex64);
        assert!("quaternion".parse::<DataType>().is_err());
    }

    #[test]
    fn test_display_uses_canonical_name() {
        assert_eq!(DataType::Int32.to_string(), "int32");
    }
}
