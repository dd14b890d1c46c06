//! Result sets.
//!
//! A [`ResultSet`] owns one result buffer. Rows handed out by it are
//! handles back into that buffer; releasing the result set invalidates
//! every row first, then releases the buffer exactly once. Metadata such
//! as the status and command tag is copied out at construction and stays
//! readable after release.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use pq_protocol::Oid;
use pq_types::{SqlValue, TypeRegistry, decode_value_with};

use crate::error::{Error, Result};
use crate::row::{Row, RowState};
use crate::transport::{ExecStatus, RawResult};

const RELEASED: &str = "result set is released";

/// Metadata for one result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Zero-based position.
    pub index: usize,
    /// Column type.
    pub type_id: Oid,
    /// Type modifier, -1 when none.
    pub modifier: i32,
}

pub(crate) struct ResultInner<R: RawResult> {
    raw: RefCell<Option<R>>,
    status: ExecStatus,
    error_message: String,
    cmd_status: String,
    cmd_tuples: Option<u64>,
    ntuples: usize,
    columns: Vec<Column>,
    fields: HashMap<String, usize>,
    rows: RefCell<HashMap<usize, Weak<RowState>>>,
    registry: Option<Arc<TypeRegistry>>,
    released: Cell<bool>,
}

impl<R: RawResult> ResultInner<R> {
    fn registry(&self) -> &TypeRegistry {
        self.registry.as_deref().unwrap_or_else(|| TypeRegistry::global())
    }

    pub(crate) fn is_released(&self) -> bool {
        self.released.get()
    }

    pub(crate) fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub(crate) fn column_index(&self, name: &str) -> Option<usize> {
        self.fields.get(name).copied()
    }

    fn check_row(&self, row: usize) -> Result<()> {
        if row >= self.ntuples {
            return Err(Error::RowOutOfRange {
                index: row,
                count: self.ntuples,
            });
        }
        Ok(())
    }

    pub(crate) fn decode(&self, row: usize, column: usize) -> Result<SqlValue> {
        let raw = self.raw.borrow();
        let raw = raw.as_ref().ok_or(Error::InvalidHandle(RELEASED))?;
        self.check_row(row)?;
        let meta = self.columns.get(column).ok_or(Error::ColumnOutOfRange {
            index: column,
            count: self.columns.len(),
        })?;
        if raw.is_null(row, column) {
            return Ok(SqlValue::Null);
        }
        let bytes = raw.value(row, column).unwrap_or_default();
        Ok(decode_value_with(
            self.registry(),
            meta.type_id,
            meta.modifier,
            bytes,
        )?)
    }

    pub(crate) fn decode_row(&self, row: usize) -> Result<Vec<SqlValue>> {
        (0..self.columns.len())
            .map(|column| self.decode(row, column))
            .collect()
    }

    pub(crate) fn is_null(&self, row: usize, column: usize) -> Result<bool> {
        let raw = self.raw.borrow();
        let raw = raw.as_ref().ok_or(Error::InvalidHandle(RELEASED))?;
        self.check_row(row)?;
        if column >= self.columns.len() {
            return Err(Error::ColumnOutOfRange {
                index: column,
                count: self.columns.len(),
            });
        }
        Ok(raw.is_null(row, column))
    }

    fn release(&self) {
        if self.released.replace(true) {
            return;
        }

        let mut invalidated = 0usize;
        for state in self.rows.borrow_mut().drain().filter_map(|(_, w)| w.upgrade()) {
            state.invalidate();
            invalidated += 1;
        }

        drop(self.raw.borrow_mut().take());
        tracing::debug!(
            status = %self.status,
            rows_invalidated = invalidated,
            "released result set"
        );
    }
}

/// A query result owning its buffer.
pub struct ResultSet<R: RawResult> {
    inner: Rc<ResultInner<R>>,
}

impl<R: RawResult> ResultSet<R> {
    /// Wrap a result buffer. Cells decode through `registry`, or the
    /// process-wide registry when `None`.
    ///
    /// Error statuses are not rejected here; see
    /// [`into_checked`](Self::into_checked).
    pub fn new(raw: R, registry: Option<Arc<TypeRegistry>>) -> Self {
        let status = raw.status();
        let (ntuples, columns) = if status.has_rows() {
            let columns: Vec<Column> = (0..raw.nfields())
                .map(|index| Column {
                    name: raw.field_name(index).unwrap_or_default().to_string(),
                    index,
                    type_id: raw.field_type(index),
                    modifier: raw.field_modifier(index),
                })
                .collect();
            (raw.ntuples(), columns)
        } else {
            (0, Vec::new())
        };

        // Duplicate names resolve to the last column carrying them.
        let fields = columns
            .iter()
            .map(|c| (c.name.clone(), c.index))
            .collect();

        tracing::trace!(%status, rows = ntuples, "result set created");

        Self {
            inner: Rc::new(ResultInner {
                status,
                error_message: raw.error_message(),
                cmd_status: raw.cmd_status().to_string(),
                cmd_tuples: raw.cmd_tuples(),
                ntuples,
                columns,
                fields,
                rows: RefCell::new(HashMap::new()),
                registry,
                released: Cell::new(false),
                raw: RefCell::new(Some(raw)),
            }),
        }
    }

    /// Turn an error status into [`Error::Server`], releasing the buffer.
    pub fn into_checked(self) -> Result<Self> {
        if self.inner.status.is_error() {
            Err(Error::Server {
                status: self.inner.status,
                message: self.inner.error_message.clone(),
            })
        } else {
            Ok(self)
        }
    }

    /// Result status.
    #[must_use]
    pub fn status(&self) -> ExecStatus {
        self.inner.status
    }

    /// Error message, empty if none.
    #[must_use]
    pub fn error_message(&self) -> &str {
        &self.inner.error_message
    }

    /// Command tag, such as `SELECT 3`.
    #[must_use]
    pub fn cmd_status(&self) -> &str {
        &self.inner.cmd_status
    }

    /// Number of rows for row-returning results, otherwise the number of
    /// rows the command affected (0 when the command reports none).
    pub fn len(&self) -> Result<usize> {
        self.check()?;
        if self.inner.status.has_rows() {
            Ok(self.inner.ntuples)
        } else {
            Ok(self
                .inner
                .cmd_tuples
                .and_then(|n| usize::try_from(n).ok())
                .unwrap_or(0))
        }
    }

    /// Check if the result has no rows and affected none.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Column metadata, empty for results without rows.
    pub fn columns(&self) -> Result<&[Column]> {
        self.check()?;
        Ok(&self.inner.columns)
    }

    /// Map from column name to zero-based position.
    pub fn fields(&self) -> Result<&HashMap<String, usize>> {
        self.check()?;
        Ok(&self.inner.fields)
    }

    /// Row handle for the zero-based row index.
    ///
    /// Returns `None` past the last row or for results without rows.
    /// Asking twice for the same row while a handle is alive returns a
    /// handle to the same row.
    pub fn row(&self, index: usize) -> Result<Option<Row<R>>> {
        self.check()?;
        if !self.inner.status.has_rows() || index >= self.inner.ntuples {
            return Ok(None);
        }

        let mut cache = self.inner.rows.borrow_mut();
        if let Some(state) = cache.get(&index).and_then(Weak::upgrade) {
            return Ok(Some(Row::new(state, Rc::downgrade(&self.inner))));
        }

        let state = Rc::new(RowState::new(index));
        cache.insert(index, Rc::downgrade(&state));
        tracing::trace!(row = index, "row handle created");
        Ok(Some(Row::new(state, Rc::downgrade(&self.inner))))
    }

    /// Iterate over row handles in order.
    pub fn rows(&self) -> Result<Rows<'_, R>> {
        self.check()?;
        Ok(Rows {
            result: self,
            next: 0,
        })
    }

    /// Iterate over decoded rows in order.
    pub fn fetch(&self) -> Result<Fetch<'_, R>> {
        self.check()?;
        Ok(Fetch {
            inner: &self.inner,
            next: 0,
        })
    }

    /// Iterate over decoded rows paired with their zero-based index.
    pub fn fetch_indexed(&self) -> Result<std::iter::Enumerate<Fetch<'_, R>>> {
        Ok(self.fetch()?.enumerate())
    }

    /// Decode a single cell.
    ///
    /// Rows and columns past the end are errors, never NULL.
    pub fn value(&self, row: usize, column: usize) -> Result<SqlValue> {
        self.check()?;
        self.inner.decode(row, column)
    }

    /// Number of row handles currently alive.
    #[must_use]
    pub fn live_rows(&self) -> usize {
        self.inner
            .rows
            .borrow()
            .values()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Release the buffer. Every row handle becomes invalid. Repeated calls
    /// do nothing.
    pub fn release(&mut self) {
        self.inner.release();
    }

    /// Check if the buffer has been released.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.inner.is_released()
    }

    fn check(&self) -> Result<()> {
        if self.inner.is_released() {
            Err(Error::InvalidHandle(RELEASED))
        } else {
            Ok(())
        }
    }
}

impl<R: RawResult> Drop for ResultSet<R> {
    fn drop(&mut self) {
        self.inner.release();
    }
}

impl<R: RawResult> std::fmt::Debug for ResultSet<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultSet")
            .field("status", &self.inner.status)
            .field("rows", &self.inner.ntuples)
            .field("columns", &self.inner.columns.len())
            .field("released", &self.inner.is_released())
            .finish()
    }
}

/// Iterator over row handles. See [`ResultSet::rows`].
pub struct Rows<'a, R: RawResult> {
    result: &'a ResultSet<R>,
    next: usize,
}

impl<R: RawResult> Iterator for Rows<'_, R> {
    type Item = Row<R>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.result.row(self.next).ok().flatten()?;
        self.next += 1;
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.result.inner.ntuples.saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

/// Iterator over decoded rows. See [`ResultSet::fetch`].
pub struct Fetch<'a, R: RawResult> {
    inner: &'a ResultInner<R>,
    next: usize,
}

impl<R: RawResult> Iterator for Fetch<'_, R> {
    type Item = Result<Vec<SqlValue>>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.inner.status.has_rows() || self.next >= self.inner.ntuples {
            return None;
        }
        let row = self.inner.decode_row(self.next);
        self.next += 1;
        Some(row)
    }
}
