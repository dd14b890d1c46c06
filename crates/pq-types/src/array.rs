//! Decoded array values.

use pq_protocol::{Dimension, Oid};

use crate::error::TypeError;
use crate::value::SqlValue;

/// An array of decoded values.
///
/// Elements are kept flattened in row-major order. Subscripts follow the
/// server's convention: they start at the dimension's lower bound, which is
/// 1 unless the array was built with an explicit bound.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlArray {
    element_type: Oid,
    dimensions: Vec<Dimension>,
    elements: Vec<SqlValue>,
}

impl SqlArray {
    /// Create an array, checking that the dimensions account for every
    /// element.
    pub fn new(
        element_type: Oid,
        dimensions: Vec<Dimension>,
        elements: Vec<SqlValue>,
    ) -> Result<Self, TypeError> {
        let expected = if dimensions.is_empty() {
            0
        } else {
            dimensions
                .iter()
                .try_fold(1usize, |acc, d| acc.checked_mul(d.len))
                .ok_or_else(|| {
                    TypeError::InvalidBinary("array dimensions overflow the element count".into())
                })?
        };
        if expected != elements.len() {
            return Err(TypeError::InvalidBinary(format!(
                "array dimensions describe {expected} elements, got {}",
                elements.len()
            )));
        }
        Ok(Self {
            element_type,
            dimensions,
            elements,
        })
    }

    /// Create a one-dimensional array with subscripts starting at 1.
    #[must_use]
    pub fn from_elements(element_type: Oid, elements: Vec<SqlValue>) -> Self {
        let dimensions = if elements.is_empty() {
            Vec::new()
        } else {
            vec![Dimension::new(elements.len())]
        };
        Self {
            element_type,
            dimensions,
            elements,
        }
    }

    /// Type id of the elements.
    #[must_use]
    pub fn element_type(&self) -> Oid {
        self.element_type
    }

    /// Dimensions, outermost first. Empty for an empty array.
    #[must_use]
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Total number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check if the array has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Subscript of the first element of the outermost dimension.
    #[must_use]
    pub fn lower_bound(&self) -> i32 {
        self.dimensions.first().map_or(1, |d| d.lower_bound)
    }

    /// Element at `subscript` of the flattened sequence.
    ///
    /// For a one-dimensional array this is plain subscripting, so
    /// `get(1)` is the first element of a default array.
    #[must_use]
    pub fn get(&self, subscript: i32) -> Option<&SqlValue> {
        let offset = i64::from(subscript) - i64::from(self.lower_bound());
        usize::try_from(offset).ok().and_then(|i| self.elements.get(i))
    }

    /// Element at one subscript per dimension.
    #[must_use]
    pub fn get_at(&self, subscripts: &[i32]) -> Option<&SqlValue> {
        if subscripts.len() != self.dimensions.len() {
            return None;
        }
        let mut index = 0usize;
        for (dim, &subscript) in self.dimensions.iter().zip(subscripts) {
            let offset = i64::from(subscript) - i64::from(dim.lower_bound);
            let offset = usize::try_from(offset).ok().filter(|&o| o < dim.len)?;
            index = index.checked_mul(dim.len)?.checked_add(offset)?;
        }
        self.elements.get(index)
    }

    /// Elements in row-major order.
    #[must_use]
    pub fn elements(&self) -> &[SqlValue] {
        &self.elements
    }

    /// Iterate over the elements in row-major order.
    pub fn iter(&self) -> std::slice::Iter<'_, SqlValue> {
        self.elements.iter()
    }

    /// Take the elements.
    #[must_use]
    pub fn into_elements(self) -> Vec<SqlValue> {
        self.elements
    }
}

impl<'a> IntoIterator for &'a SqlArray {
    type Item = &'a SqlValue;
    type IntoIter = std::slice::Iter<'a, SqlValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}
