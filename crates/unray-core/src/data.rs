//! Typed data arrays and their association with the mesh.
//!
//! Everything that enters the core from the widget/serialization layer is a
//! named, homogeneous numeric array. Arrays are reference counted so that
//! resource specs can hold on to them without copying the samples.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, UnrayError};

/// Element type of a [`TypedArray`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    Int8,
    Int16,
    Int32,
    Uint8,
    Uint16,
    Uint32,
    Float32,
    Float64,
}

impl DType {
    /// Returns the conventional lowercase name (`"int32"`, `"float32"`, ...).
    pub fn name(self) -> &'static str {
        match self {
            DType::Int8 => "int8",
            DType::Int16 => "int16",
            DType::Int32 => "int32",
            DType::Uint8 => "uint8",
            DType::Uint16 => "uint16",
            DType::Uint32 => "uint32",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
        }
    }

    /// Returns true for the integer element types.
    pub fn is_integer(self) -> bool {
        !matches!(self, DType::Float32 | DType::Float64)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A homogeneous numeric array shared by reference count.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedArray {
    Int8(Arc<[i8]>),
    Int16(Arc<[i16]>),
    Int32(Arc<[i32]>),
    Uint8(Arc<[u8]>),
    Uint16(Arc<[u16]>),
    Uint32(Arc<[u32]>),
    Float32(Arc<[f32]>),
    Float64(Arc<[f64]>),
}

macro_rules! typed_array_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<Vec<$t>> for TypedArray {
                fn from(values: Vec<$t>) -> Self {
                    TypedArray::$variant(values.into())
                }
            }

            impl From<&[$t]> for TypedArray {
                fn from(values: &[$t]) -> Self {
                    TypedArray::$variant(values.into())
                }
            }
        )*
    };
}

typed_array_from!(
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    u8 => Uint8,
    u16 => Uint16,
    u32 => Uint32,
    f32 => Float32,
    f64 => Float64,
);

impl TypedArray {
    /// Returns the element type.
    pub fn dtype(&self) -> DType {
        match self {
            TypedArray::Int8(_) => DType::Int8,
            TypedArray::Int16(_) => DType::Int16,
            TypedArray::Int32(_) => DType::Int32,
            TypedArray::Uint8(_) => DType::Uint8,
            TypedArray::Uint16(_) => DType::Uint16,
            TypedArray::Uint32(_) => DType::Uint32,
            TypedArray::Float32(_) => DType::Float32,
            TypedArray::Float64(_) => DType::Float64,
        }
    }

    /// Returns the number of scalar elements.
    pub fn len(&self) -> usize {
        match self {
            TypedArray::Int8(v) => v.len(),
            TypedArray::Int16(v) => v.len(),
            TypedArray::Int32(v) => v.len(),
            TypedArray::Uint8(v) => v.len(),
            TypedArray::Uint16(v) => v.len(),
            TypedArray::Uint32(v) => v.len(),
            TypedArray::Float32(v) => v.len(),
            TypedArray::Float64(v) => v.len(),
        }
    }

    /// Returns true if the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns element `i` widened to `f64`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of bounds.
    pub fn get_f64(&self, i: usize) -> f64 {
        match self {
            TypedArray::Int8(v) => f64::from(v[i]),
            TypedArray::Int16(v) => f64::from(v[i]),
            TypedArray::Int32(v) => f64::from(v[i]),
            TypedArray::Uint8(v) => f64::from(v[i]),
            TypedArray::Uint16(v) => f64::from(v[i]),
            TypedArray::Uint32(v) => f64::from(v[i]),
            TypedArray::Float32(v) => f64::from(v[i]),
            TypedArray::Float64(v) => v[i],
        }
    }

    /// Iterates over all elements widened to `f64`.
    pub fn iter_f64(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.len()).map(move |i| self.get_f64(i))
    }

    /// Copies the elements into a `Vec<f32>`, casting as needed.
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_f32_vec(&self) -> Vec<f32> {
        match self {
            TypedArray::Float32(v) => v.to_vec(),
            _ => self.iter_f64().map(|x| x as f32).collect(),
        }
    }

    /// Copies the elements into a `Vec<i32>`, casting as needed.
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_i32_vec(&self) -> Vec<i32> {
        match self {
            TypedArray::Int32(v) => v.to_vec(),
            _ => self.iter_f64().map(|x| x as i32).collect(),
        }
    }

    /// Computes `[min, max]` with a linear scan, or `None` for an empty array.
    pub fn range(&self) -> Option<[f64; 2]> {
        let mut values = self.iter_f64();
        let first = values.next()?;
        Some(values.fold([first, first], |[lo, hi], x| [lo.min(x), hi.max(x)]))
    }
}

/// Association space of a field relative to the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Space {
    /// One value per cell, piecewise constant.
    P0,
    /// One value per vertex, linearly interpolated.
    P1,
    /// Four values per cell, discontinuous across cells.
    D1,
    /// Indicator over vertices.
    I0,
    /// Indicator over edges.
    I1,
    /// Indicator over faces.
    I2,
    /// Indicator over cells.
    I3,
}

impl Space {
    /// Returns the name used in encodings.
    pub fn name(self) -> &'static str {
        match self {
            Space::P0 => "P0",
            Space::P1 => "P1",
            Space::D1 => "D1",
            Space::I0 => "I0",
            Space::I1 => "I1",
            Space::I2 => "I2",
            Space::I3 => "I3",
        }
    }

    /// Returns the array length a field in this space must have, if it only
    /// depends on vertex and cell counts.
    ///
    /// Edge and face indicators depend on mesh connectivity and return `None`.
    pub fn expected_len(self, num_vertices: usize, num_cells: usize) -> Option<usize> {
        match self {
            Space::P1 | Space::I0 => Some(num_vertices),
            Space::P0 | Space::I3 => Some(num_cells),
            Space::D1 => Some(4 * num_cells),
            Space::I1 | Space::I2 => None,
        }
    }
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The data dictionary: named arrays supplied alongside an encoding.
#[derive(Debug, Clone, Default)]
pub struct PlotData {
    arrays: BTreeMap<String, TypedArray>,
}

impl PlotData {
    /// Creates an empty data dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an array, replacing any previous array with the same name.
    pub fn insert(&mut self, name: impl Into<String>, array: impl Into<TypedArray>) -> &mut Self {
        self.arrays.insert(name.into(), array.into());
        self
    }

    /// Builder-style variant of [`PlotData::insert`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, array: impl Into<TypedArray>) -> Self {
        self.insert(name, array);
        self
    }

    /// Gets an array by name.
    pub fn get(&self, name: &str) -> Option<&TypedArray> {
        self.arrays.get(name)
    }

    /// Gets an array by name, failing with [`UnrayError::MissingData`].
    pub fn require(&self, name: &str) -> Result<&TypedArray> {
        self.get(name)
            .ok_or_else(|| UnrayError::MissingData(name.to_string()))
    }

    /// Returns true if an array with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.arrays.contains_key(name)
    }

    /// Returns the number of arrays.
    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    /// Returns true if there are no arrays.
    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }

    /// Iterates over `(name, array)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypedArray)> {
        self.arrays.iter().map(|(k, v)| (k.as_str(), v))
    }
}
