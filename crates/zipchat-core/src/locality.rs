use std::fmt;

use crate::error::ChatError;

/// Locality used when the entry URL carries no usable code.
pub const DEFAULT_LOCALITY: &str = "00000";

/// The 5-digit postal code scoping a session's message and event visibility.
///
/// Contacts are scoped more loosely: every code sharing the first two digits
/// (the area prefix) is visible, see [`LocalityKey::contact_range`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocalityKey(String);

impl LocalityKey {
    pub fn new(code: &str) -> Result<Self, ChatError> {
        if code.len() == 5 && code.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(code.to_string()))
        } else {
            Err(ChatError::Validation(format!(
                "not a 5-digit postal code: {code:?}"
            )))
        }
    }

    /// Extracts the locality key from a page query string.
    ///
    /// Matches the first `p=` followed by five digits, anywhere in the
    /// string (`?foo=1&p=10110` works, and so does a longer run of digits,
    /// of which the first five are taken).
    pub fn from_query(query: &str) -> Option<Self> {
        for (start, _) in query.match_indices("p=") {
            let digits: String = query[start + 2..]
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .take(5)
                .collect();
            if digits.len() == 5 {
                return Some(Self(digits));
            }
        }
        None
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First two digits, shared by all detailed codes of the same area.
    pub fn prefix(&self) -> &str {
        &self.0[..2]
    }

    /// Closed range `[prefix, prefix + "999"]` bounding the contact feed.
    pub fn contact_range(&self) -> (String, String) {
        let prefix = self.prefix();
        (prefix.to_string(), format!("{prefix}999"))
    }
}

impl fmt::Display for LocalityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical URL a code-less entry is redirected to.
pub fn default_locality_url() -> String {
    format!("/?p={DEFAULT_LOCALITY}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_accepts_five_digits() {
        assert!(LocalityKey::new("10110").is_ok());
        assert!(LocalityKey::new("1011").is_err());
        assert!(LocalityKey::new("101100").is_err());
        assert!(LocalityKey::new("1011x").is_err());
    }

    #[test]
    fn test_from_query() {
        let key = LocalityKey::from_query("?foo=1&p=10110").unwrap();
        assert_eq!(key.as_str(), "10110");

        // First five of a longer digit run are taken.
        let key = LocalityKey::from_query("?p=101109").unwrap();
        assert_eq!(key.as_str(), "10110");

        assert!(LocalityKey::from_query("?p=101").is_none());
        assert!(LocalityKey::from_query("?q=10110").is_none());
    }

    #[test]
    fn test_from_query_skips_short_runs() {
        // A short run does not stop the scan if a later p= matches.
        let key = LocalityKey::from_query("?p=12&p=54321").unwrap();
        assert_eq!(key.as_str(), "54321");
    }

    #[test]
    fn test_contact_range() {
        let key = LocalityKey::new("10110").unwrap();
        assert_eq!(key.prefix(), "10");
        assert_eq!(key.contact_range(), ("10".to_string(), "10999".to_string()));
    }
}
