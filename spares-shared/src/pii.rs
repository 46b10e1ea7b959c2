use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// A wrapper for contact data (customer e-mail addresses, phone numbers)
/// that masks its value in Debug and Display output.
///
/// Serialization still emits the real value: API responses and broker
/// payloads need it, log lines do not.
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct Masked<T>(pub T);

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn into_inner(self) -> T {
        self.0
    }

    pub fn inner(&self) -> &T {
        &self.0
    }
}

impl<T> From<T> for Masked<T> {
    fn from(value: T) -> Self {
        Masked(value)
    }
}

/// Recipient list as it should appear in logs: the count is visible,
/// the addresses are not.
pub struct MaskedRecipients<'a>(pub &'a [String]);

impl fmt::Display for MaskedRecipients<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} recipient(s)]", self.0.len())
    }
}
