/// Normalize a field name: strip NUL padding and surrounding whitespace, upper-case ASCII.
///
/// dBase pads names with NULs and treats them case-insensitively, so every name entering the
/// crate (from files, configuration, or lookups) goes through here.
pub fn normalize_field_name(name: &str) -> String {
    name.trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_ascii_uppercase()
}

/// The sorted, de-duplicated set of numeric field names carried by a source layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSchema {
    names: Vec<String>,
}

impl FieldSchema {
    /// Build a schema from raw names; empty names are dropped.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names: Vec<String> = names.into_iter()
            .map(|name| normalize_field_name(name.as_ref()))
            .filter(|name| !name.is_empty())
            .collect();
        names.sort();
        names.dedup();
        Self { names }
    }

    #[inline] pub fn len(&self) -> usize { self.names.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.names.is_empty() }

    /// Iterate over field names in schema order.
    #[inline]
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.names.iter().map(String::as_str)
    }

    /// Check membership of an already-normalized name.
    #[inline]
    pub(crate) fn contains_normalized(&self, name: &str) -> bool {
        self.names.binary_search_by(|n| n.as_str().cmp(name)).is_ok()
    }

    /// Check membership of any spelling of `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.contains_normalized(&normalize_field_name(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_trims_padding_and_case() {
        assert_eq!(normalize_field_name(" TotalPop\0\0\0"), "TOTALPOP");
        assert_eq!(normalize_field_name("pm25"), "PM25");
        assert_eq!(normalize_field_name("\0\0"), "");
    }

    #[test]
    fn schema_is_sorted_and_unique() {
        let schema = FieldSchema::new(["pop", "PM25", " POP ", ""]);
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["PM25", "POP"]);
        assert_eq!(schema.len(), 2);
        assert!(schema.contains("Pop"));
        assert!(!schema.contains("NOX"));
    }
}
