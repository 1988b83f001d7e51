//! The unit of work that flows through a pipeline.
//!
//! An [`Exchange`] carries string headers (set by whoever sent the message)
//! and a typed property bag that pipeline steps use as scratch storage while
//! the exchange is in flight. Producers in this crate never create or drop
//! exchanges, they only read headers and read/write properties.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;

use crate::error::MetricsError;
use crate::generate_exchange_id;

/// One message's full context as it traverses the pipeline.
pub struct Exchange {
    id: String,
    headers: HashMap<String, String>,
    body: Vec<u8>,
    properties: HashMap<String, Box<dyn Any + Send>>,
}

impl Exchange {
    /// Create an empty exchange with a fresh time-sortable id.
    pub fn new() -> Self {
        Self {
            id: generate_exchange_id(),
            headers: HashMap::new(),
            body: Vec::new(),
            properties: HashMap::new(),
        }
    }

    /// Builder-style header setter.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Builder-style body setter.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }

    pub fn remove_header(&mut self, name: &str) -> Option<String> {
        self.headers.remove(name)
    }

    /// Read a property, checking that it holds a `T`.
    ///
    /// Returns `Ok(None)` when the key is absent and
    /// [`MetricsError::PropertyTypeMismatch`] when it holds something else.
    pub fn property<T: Any>(&self, key: &str) -> Result<Option<&T>, MetricsError> {
        match self.properties.get(key) {
            None => Ok(None),
            Some(value) => value
                .downcast_ref::<T>()
                .map(Some)
                .ok_or_else(|| mismatch::<T>(key)),
        }
    }

    /// Store a property, replacing whatever was under `key`.
    pub fn set_property<T: Any + Send>(&mut self, key: impl Into<String>, value: T) {
        self.properties.insert(key.into(), Box::new(value));
    }

    /// Remove a property regardless of its type.
    ///
    /// Returns true if something was removed.
    pub fn remove_property(&mut self, key: &str) -> bool {
        self.properties.remove(key).is_some()
    }

    /// Remove and return a property of type `T`.
    ///
    /// On a type mismatch the property is left in place.
    pub fn take_property<T: Any>(&mut self, key: &str) -> Result<Option<T>, MetricsError> {
        match self.properties.get(key) {
            None => return Ok(None),
            Some(value) if !value.is::<T>() => return Err(mismatch::<T>(key)),
            Some(_) => {}
        }
        Ok(self
            .properties
            .remove(key)
            .and_then(|value| value.downcast::<T>().ok())
            .map(|boxed| *boxed))
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Number of properties currently attached.
    pub fn property_count(&self) -> usize {
        self.properties.len()
    }
}

impl Default for Exchange {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.properties.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("Exchange")
            .field("id", &self.id)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .field("properties", &keys)
            .finish()
    }
}

fn mismatch<T>(key: &str) -> MetricsError {
    MetricsError::PropertyTypeMismatch {
        key: key.to_string(),
        expected: type_name::<T>(),
    }
}
