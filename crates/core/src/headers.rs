// Delivery header access (case-insensitive, adapter-supplied)

use std::collections::HashMap;

/// Job id header: set by the queue service on delivery, and by the
/// client itself in direct mode.
pub const HEADER_ID: &str = "x-zeplo-id";
/// Delivery start time header, decimal seconds since epoch.
pub const HEADER_START: &str = "x-zeplo-start";
/// Auth token header on outbound enqueue requests (non-direct modes).
pub const HEADER_TOKEN: &str = "x-zeplo-token";

/// Case-insensitive string-keyed header map.
///
/// Adapters build one from their native header type; lookups are
/// performed on lowercased keys.
#[derive(Debug, Clone, Default)]
pub struct Headers(HashMap<String, String>);

impl Headers {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.0
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}
