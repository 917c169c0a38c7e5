//! Deterministic icon identifiers.

use md5::{Digest, Md5};

use crate::properties::IconPropertyMap;

/// Hashes a style name and its extracted properties into a lowercase hex id.
///
/// The digest covers the UTF-8 bytes of the name followed by each key and
/// value in sorted key order. It is not collision-proof across different
/// templates sharing a name; callers scope it.
pub fn icon_identity(style_name: &str, properties: &IconPropertyMap) -> String {
    let mut digest = Md5::new();
    digest.update(style_name.as_bytes());
    for (key, value) in properties.iter() {
        digest.update(key.as_bytes());
        digest.update(value.as_bytes());
    }
    hex::encode(digest.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, &str)]) -> IconPropertyMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn identity_of_name_only() {
        // md5("")
        assert_eq!(
            icon_identity("", &IconPropertyMap::new()),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
    }

    #[test]
    fn identity_ignores_insertion_order() {
        let mut a = IconPropertyMap::new();
        a.insert("0.0.0", "");
        a.insert("0.0.0.opacity", "0.5");
        let mut b = IconPropertyMap::new();
        b.insert("0.0.0.opacity", "0.5");
        b.insert("0.0.0", "");

        assert_eq!(icon_identity("poi", &a), icon_identity("poi", &b));
    }

    #[test]
    fn identity_changes_with_any_entry() {
        let base = map(&[("0.0.0", ""), ("0.0.0.opacity", "0.5")]);
        let id = icon_identity("poi", &base);

        assert_ne!(id, icon_identity("other", &base));
        assert_ne!(id, icon_identity("poi", &map(&[("0.0.0", ""), ("0.0.0.opacity", "1.0")])));
        assert_ne!(id, icon_identity("poi", &map(&[("0.0.0", ""), ("0.0.0.size", "0.5")])));
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
