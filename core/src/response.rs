//! Response descriptions handed to the script boundary

use std::collections::HashMap;

/// What a script sees of a completed response
///
/// Header names are lower-cased; a name maps to every value received, in
/// order. The body is raw bytes; interpretation is the script's business.
#[derive(Debug, Clone, Default)]
pub struct ResponseDescriptor {
    /// HTTP status code
    pub status: u16,

    /// Lower-cased header name to ordered values
    pub headers: HashMap<String, Vec<String>>,

    /// Response body bytes
    pub body: Vec<u8>,
}

impl ResponseDescriptor {
    /// Whether the status code is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Values for a header, looked up case-insensitively.
    pub fn header(&self, name: &str) -> Option<&[String]> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
    }
}
