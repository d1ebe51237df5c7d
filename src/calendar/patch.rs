//! Three-state field for partial updates.
//!
//! A key missing from the payload deserializes to [`Patch::Unset`] (via
//! `#[serde(default)]`), an explicit JSON `null` to [`Patch::Clear`], and any
//! other value to [`Patch::Set`]. Serializing pairs with
//! `skip_serializing_if = "Patch::is_unset"` so untouched fields never reach
//! the wire.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CalendarError, CalendarResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    Unset,
    Clear,
    Set(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Unset
    }
}

impl<T> Patch<T> {
    pub fn is_unset(&self) -> bool {
        matches!(self, Patch::Unset)
    }

    pub fn is_present(&self) -> bool {
        !self.is_unset()
    }

    pub fn as_set(&self) -> Option<&T> {
        match self {
            Patch::Set(v) => Some(v),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Patch<U> {
        match self {
            Patch::Unset => Patch::Unset,
            Patch::Clear => Patch::Clear,
            Patch::Set(v) => Patch::Set(f(v)),
        }
    }

    /// Collapse a field that cannot be cleared: `null` is a caller error.
    pub fn into_required(self, field: &str) -> CalendarResult<Option<T>> {
        match self {
            Patch::Unset => Ok(None),
            Patch::Clear => Err(CalendarError::invalid(format!("{field} cannot be null"))),
            Patch::Set(v) => Ok(Some(v)),
        }
    }
}

impl<T: Default> Patch<T> {
    /// Collapse `Clear` into `Set(T::default())`. Used for list fields, where
    /// an explicit `null` means the same as an explicit empty list.
    pub fn clear_to_default(self) -> Patch<T> {
        match self {
            Patch::Clear => Patch::Set(T::default()),
            other => other,
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(v) => Patch::Set(v),
            None => Patch::Clear,
        })
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Patch::Set(v) => v.serialize(serializer),
            Patch::Unset | Patch::Clear => serializer.serialize_none(),
        }
    }
}
