//! Row handles.
//!
//! A [`Row`] names one row of a [`ResultSet`](crate::ResultSet). It holds
//! no data of its own: every access decodes from the result buffer, and
//! fails with [`Error::InvalidHandle`] once that buffer is released.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use pq_types::{FromSql, SqlValue};

use crate::error::{Error, Result};
use crate::result::{Column, ResultInner};
use crate::transport::RawResult;

const RELEASED: &str = "referenced result set is released";

/// Shared between all handles to the same row and the result set's cache.
#[derive(Debug)]
pub(crate) struct RowState {
    index: usize,
    valid: Cell<bool>,
}

impl RowState {
    pub(crate) fn new(index: usize) -> Self {
        Self {
            index,
            valid: Cell::new(true),
        }
    }

    pub(crate) fn invalidate(&self) {
        self.valid.set(false);
    }
}

/// A handle to one row of a result set.
pub struct Row<R: RawResult> {
    state: Rc<RowState>,
    result: Weak<ResultInner<R>>,
}

impl<R: RawResult> Row<R> {
    pub(crate) fn new(state: Rc<RowState>, result: Weak<ResultInner<R>>) -> Self {
        Self { state, result }
    }

    fn result(&self) -> Result<Rc<ResultInner<R>>> {
        if !self.state.valid.get() {
            return Err(Error::InvalidHandle(RELEASED));
        }
        match self.result.upgrade() {
            Some(result) if !result.is_released() => Ok(result),
            _ => Err(Error::InvalidHandle(RELEASED)),
        }
    }

    fn column_index(result: &ResultInner<R>, name: &str) -> Result<usize> {
        result
            .column_index(name)
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))
    }

    /// Zero-based position of this row in its result set.
    #[must_use]
    pub fn index(&self) -> usize {
        self.state.index
    }

    /// Check if the owning result set is still alive.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.result().is_ok()
    }

    /// Number of columns.
    pub fn len(&self) -> Result<usize> {
        Ok(self.result()?.columns().len())
    }

    /// Check if the row has no columns.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Column metadata.
    pub fn columns(&self) -> Result<Vec<Column>> {
        Ok(self.result()?.columns().to_vec())
    }

    /// Get a value by zero-based column index.
    ///
    /// NULL converts only into `Option<T>`.
    pub fn get<T: FromSql>(&self, index: usize) -> Result<T> {
        let value = self.get_raw(index)?;
        Ok(T::from_sql(&value)?)
    }

    /// Get a value by column name.
    ///
    /// If several columns share the name, the last one is used.
    pub fn get_by_name<T: FromSql>(&self, name: &str) -> Result<T> {
        let value = self.get_raw_by_name(name)?;
        Ok(T::from_sql(&value)?)
    }

    /// Get a value, returning `None` for NULL and conversion failures.
    ///
    /// An invalid handle or missing column is still an error.
    pub fn try_get<T: FromSql>(&self, index: usize) -> Result<Option<T>> {
        let value = self.get_raw(index)?;
        Ok(T::from_sql_nullable(&value).ok().flatten())
    }

    /// Get the decoded value by zero-based column index.
    pub fn get_raw(&self, index: usize) -> Result<SqlValue> {
        self.result()?.decode(self.state.index, index)
    }

    /// Get the decoded value by column name.
    pub fn get_raw_by_name(&self, name: &str) -> Result<SqlValue> {
        let result = self.result()?;
        let index = Self::column_index(&result, name)?;
        result.decode(self.state.index, index)
    }

    /// Check if a column is NULL.
    pub fn is_null(&self, index: usize) -> Result<bool> {
        self.result()?.is_null(self.state.index, index)
    }

    /// Check if a named column is NULL.
    pub fn is_null_by_name(&self, name: &str) -> Result<bool> {
        let result = self.result()?;
        let index = Self::column_index(&result, name)?;
        result.is_null(self.state.index, index)
    }

    /// Decode every column in order.
    pub fn values(&self) -> Result<Vec<SqlValue>> {
        self.result()?.decode_row(self.state.index)
    }
}

impl<R: RawResult> Clone for Row<R> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
            result: Weak::clone(&self.result),
        }
    }
}

impl<R: RawResult> PartialEq for Row<R> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl<R: RawResult> std::fmt::Debug for Row<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Row")
            .field("index", &self.state.index)
            .field("valid", &self.state.valid.get())
            .finish()
    }
}
