//! Per-buffer extra data: a typed key/value side table.
//!
//! Values are tagged so cross-process readers can decode without schema
//! knowledge. Typed getters fail with `TypeMismatch` rather than coercing.

use std::collections::BTreeMap;

use crate::error::{SurfaceError, SurfaceResult};

/// Wire tag of an extra-data value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExtraTag {
    I32 = 0,
    I64 = 1,
    F64 = 2,
    Str = 3,
}

impl TryFrom<i32> for ExtraTag {
    type Error = SurfaceError;

    fn try_from(v: i32) -> Result<Self, SurfaceError> {
        match v {
            0 => Ok(Self::I32),
            1 => Ok(Self::I64),
            2 => Ok(Self::F64),
            3 => Ok(Self::Str),
            _ => Err(SurfaceError::InvalidArguments),
        }
    }
}

/// A tagged extra-data value.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtraValue {
    I32(i32),
    I64(i64),
    F64(f64),
    Str(String),
}

impl ExtraValue {
    pub fn tag(&self) -> ExtraTag {
        match self {
            ExtraValue::I32(_) => ExtraTag::I32,
            ExtraValue::I64(_) => ExtraTag::I64,
            ExtraValue::F64(_) => ExtraTag::F64,
            ExtraValue::Str(_) => ExtraTag::Str,
        }
    }
}

/// The key/value table attached to every surface buffer.
#[derive(Debug, Clone, Default)]
pub struct ExtraData {
    entries: BTreeMap<String, ExtraValue>,
}

impl ExtraData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value under `key`.
    pub fn set(&mut self, key: impl Into<String>, value: ExtraValue) {
        self.entries.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&ExtraValue> {
        self.entries.get(key)
    }

    pub fn get_i32(&self, key: &str) -> SurfaceResult<i32> {
        match self.entries.get(key) {
            None => Err(SurfaceError::NoEntry),
            Some(ExtraValue::I32(v)) => Ok(*v),
            Some(_) => Err(SurfaceError::TypeMismatch),
        }
    }

    pub fn get_i64(&self, key: &str) -> SurfaceResult<i64> {
        match self.entries.get(key) {
            None => Err(SurfaceError::NoEntry),
            Some(ExtraValue::I64(v)) => Ok(*v),
            Some(_) => Err(SurfaceError::TypeMismatch),
        }
    }

    pub fn get_f64(&self, key: &str) -> SurfaceResult<f64> {
        match self.entries.get(key) {
            None => Err(SurfaceError::NoEntry),
            Some(ExtraValue::F64(v)) => Ok(*v),
            Some(_) => Err(SurfaceError::TypeMismatch),
        }
    }

    pub fn get_str(&self, key: &str) -> SurfaceResult<&str> {
        match self.entries.get(key) {
            None => Err(SurfaceError::NoEntry),
            Some(ExtraValue::Str(v)) => Ok(v),
            Some(_) => Err(SurfaceError::TypeMismatch),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ExtraValue)> {
        self.entries.iter()
    }
}
