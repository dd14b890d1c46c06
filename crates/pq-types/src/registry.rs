//! Process-wide registry of codecs for non-built-in types.
//!
//! The codec consults the registry only for type ids it has no built-in rule
//! for: user-defined types, extension types, and catalog types this crate does
//! not model (geometric types, ranges, ...).
//!
//! ## Identity markers
//!
//! Every [`CodecEntry`] carries a [`Marker`] that is unique within the
//! process. Values produced by a codec are wrapped in a [`CustomValue`] tagged
//! with that marker, and a codec only accepts values carrying its own marker
//! for encoding. This catches a value decoded under one codec being handed to
//! another, even when both wrap the same Rust type.
//!
//! ## Example
//!
//! ```rust
//! use bytes::BufMut;
//! use pq_types::registry::{CodecEntry, TypeRegistry};
//! use pq_types::{SqlValue, TypeError};
//!
//! #[derive(Debug, PartialEq)]
//! struct Celsius(f64);
//!
//! let registry = TypeRegistry::new();
//! registry.register(CodecEntry::typed(
//!     90_001,
//!     |raw, _modifier| {
//!         let bytes: [u8; 8] = raw.try_into().map_err(|_| TypeError::InvalidBinary("celsius".into()))?;
//!         Ok(Celsius(f64::from_be_bytes(bytes)))
//!     },
//!     |value: &Celsius, buf| {
//!         buf.put_f64(value.0);
//!         Ok(())
//!     },
//! ));
//!
//! let value = pq_types::decode_value_with(&registry, 90_001, -1, &21.5f64.to_be_bytes()).unwrap();
//! let custom = value.as_custom().unwrap();
//! assert_eq!(custom.downcast_ref::<Celsius>(), Some(&Celsius(21.5)));
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU64;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::BytesMut;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use pq_protocol::{BuiltinType, Oid};

use crate::error::TypeError;
use crate::to_sql::UNSPECIFIED;

static NEXT_MARKER: AtomicU64 = AtomicU64::new(1);

static GLOBAL: Lazy<TypeRegistry> = Lazy::new(TypeRegistry::new);

/// Opaque identity token of one codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Marker(NonZeroU64);

impl Marker {
    /// Allocate a marker distinct from every other marker in the process.
    #[must_use]
    pub fn new() -> Self {
        let id = NEXT_MARKER.fetch_add(1, Ordering::Relaxed);
        Self(NonZeroU64::new(id).unwrap_or(NonZeroU64::MIN))
    }

    /// Numeric value of the marker, for diagnostics.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl Default for Marker {
    fn default() -> Self {
        Self::new()
    }
}

/// A value produced by a registered codec.
///
/// Cloning is cheap: the payload is shared.
#[derive(Clone)]
pub struct CustomValue {
    marker: Marker,
    type_id: Oid,
    payload: Arc<dyn Any + Send + Sync>,
}

impl CustomValue {
    /// Wrap `payload` under `marker`.
    ///
    /// The value has no type id until it passes through a codec's decoder
    /// or [`with_type_id`](Self::with_type_id) sets one.
    pub fn new<T: Any + Send + Sync>(marker: Marker, payload: T) -> Self {
        Self {
            marker,
            type_id: UNSPECIFIED,
            payload: Arc::new(payload),
        }
    }

    /// Set the type id the value binds as when a parameter's type is
    /// unspecified.
    #[must_use]
    pub fn with_type_id(mut self, type_id: Oid) -> Self {
        self.type_id = type_id;
        self
    }

    /// Type id of the codec the value belongs to, `0` when unknown.
    #[must_use]
    pub fn type_id(&self) -> Oid {
        self.type_id
    }

    /// The marker of the codec that produced this value.
    #[must_use]
    pub fn marker(&self) -> Marker {
        self.marker
    }

    /// Borrow the payload as `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    /// Check if the payload is a `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.payload.is::<T>()
    }
}

impl fmt::Debug for CustomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomValue")
            .field("marker", &self.marker.get())
            .field("type_id", &self.type_id)
            .finish_non_exhaustive()
    }
}

impl PartialEq for CustomValue {
    /// Two custom values are equal when they share both marker and payload.
    fn eq(&self, other: &Self) -> bool {
        self.marker == other.marker && Arc::ptr_eq(&self.payload, &other.payload)
    }
}

/// Decode function of a registered codec: `(raw bytes, type modifier)`.
pub type DecodeFn = dyn Fn(&[u8], i32) -> Result<CustomValue, TypeError> + Send + Sync;

/// Encode function of a registered codec, appending to the buffer.
pub type EncodeFn = dyn Fn(&CustomValue, &mut BytesMut) -> Result<(), TypeError> + Send + Sync;

/// Codec for one type id.
#[derive(Clone)]
pub struct CodecEntry {
    type_id: Oid,
    marker: Marker,
    decode: Arc<DecodeFn>,
    encode: Arc<EncodeFn>,
}

impl CodecEntry {
    /// Build an entry from raw decode/encode functions.
    ///
    /// `decode` must tag the values it returns with `marker`; `encode` is
    /// only ever called with values that carry it.
    pub fn new<D, E>(type_id: Oid, marker: Marker, decode: D, encode: E) -> Self
    where
        D: Fn(&[u8], i32) -> Result<CustomValue, TypeError> + Send + Sync + 'static,
        E: Fn(&CustomValue, &mut BytesMut) -> Result<(), TypeError> + Send + Sync + 'static,
    {
        Self {
            type_id,
            marker,
            decode: Arc::new(decode),
            encode: Arc::new(encode),
        }
    }

    /// Build an entry for a Rust type `T`, allocating a fresh marker.
    ///
    /// Decoded values are tagged automatically. The encoder receives the
    /// payload as `&T`.
    pub fn typed<T, D, E>(type_id: Oid, decode: D, encode: E) -> Self
    where
        T: Any + Send + Sync,
        D: Fn(&[u8], i32) -> Result<T, TypeError> + Send + Sync + 'static,
        E: Fn(&T, &mut BytesMut) -> Result<(), TypeError> + Send + Sync + 'static,
    {
        let marker = Marker::new();
        Self::new(
            type_id,
            marker,
            move |raw, modifier| decode(raw, modifier).map(|v| CustomValue::new(marker, v)),
            move |value, buf| {
                let payload = value
                    .downcast_ref::<T>()
                    .ok_or(TypeError::InconsistentCodecValue { type_id })?;
                encode(payload, buf)
            },
        )
    }

    /// Type id this codec handles.
    #[must_use]
    pub fn type_id(&self) -> Oid {
        self.type_id
    }

    /// Identity marker of this codec.
    #[must_use]
    pub fn marker(&self) -> Marker {
        self.marker
    }

    /// Decode `raw`, checking that the result carries this codec's marker.
    pub fn decode(&self, raw: &[u8], modifier: i32) -> Result<CustomValue, TypeError> {
        let value = (self.decode)(raw, modifier)?;
        if value.marker != self.marker {
            return Err(TypeError::InconsistentCodecValue {
                type_id: self.type_id,
            });
        }
        Ok(value.with_type_id(self.type_id))
    }

    /// Encode `value` after checking that it carries this codec's marker.
    ///
    /// Nothing is appended when the check fails.
    pub fn encode(&self, value: &CustomValue, buf: &mut BytesMut) -> Result<(), TypeError> {
        if value.marker != self.marker {
            return Err(TypeError::InconsistentCodecValue {
                type_id: self.type_id,
            });
        }
        (self.encode)(value, buf)
    }
}

impl fmt::Debug for CodecEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecEntry")
            .field("type_id", &self.type_id)
            .field("marker", &self.marker.get())
            .finish_non_exhaustive()
    }
}

/// Mapping from type id to codec.
///
/// Lookups return a shared handle to the entry, so a registration racing
/// with a decode never leaves the decode with half of each codec.
#[derive(Default)]
pub struct TypeRegistry {
    entries: RwLock<HashMap<Oid, Arc<CodecEntry>>>,
}

impl TypeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide registry used by [`decode_value`](crate::decode_value)
    /// and [`encode_value`](crate::encode_value).
    #[must_use]
    pub fn global() -> &'static TypeRegistry {
        &GLOBAL
    }

    /// Install or replace the codec for `entry.type_id()`.
    ///
    /// Returns the entry that was replaced, if any.
    pub fn register(&self, entry: CodecEntry) -> Option<Arc<CodecEntry>> {
        let type_id = entry.type_id;
        if BuiltinType::from_oid(type_id).is_some() {
            tracing::warn!(
                type_id,
                "codec registered for a built-in type; built-in decoding takes precedence"
            );
        }

        let previous = self.entries.write().insert(type_id, Arc::new(entry));
        tracing::debug!(type_id, replaced = previous.is_some(), "registered codec");
        previous
    }

    /// Get the codec for `type_id`.
    pub fn lookup(&self, type_id: Oid) -> Option<Arc<CodecEntry>> {
        self.entries.read().get(&type_id).map(Arc::clone)
    }

    /// Remove the codec for `type_id`.
    pub fn unregister(&self, type_id: Oid) -> Option<Arc<CodecEntry>> {
        self.entries.write().remove(&type_id)
    }

    /// Check if a codec is registered for `type_id`.
    pub fn contains(&self, type_id: Oid) -> bool {
        self.entries.read().contains_key(&type_id)
    }

    /// Remove every codec.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Number of registered codecs.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if no codec is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Registered type ids, in no particular order.
    pub fn type_ids(&self) -> Vec<Oid> {
        self.entries.read().keys().copied().collect()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.type_ids())
            .finish()
    }
}

/// Register a codec in the process-wide registry.
pub fn register(entry: CodecEntry) -> Option<Arc<CodecEntry>> {
    TypeRegistry::global().register(entry)
}

/// Look up a codec in the process-wide registry.
pub fn lookup(type_id: Oid) -> Option<Arc<CodecEntry>> {
    TypeRegistry::global().lookup(type_id)
}
