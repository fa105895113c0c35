use std::env;

use smol_str::SmolStr;

/// Controls what the indexer records for each node.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Fields copied into [`Node::metadata`](crate::Node::metadata),
    /// matched ignoring ASCII case.
    pub metadata_fields: Vec<SmolStr>,
    /// Fields that turn an object into a link to another node.
    pub link_fields: Vec<SmolStr>,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            metadata_fields: vec![SmolStr::new("Class"), SmolStr::new("Type")],
            link_fields: vec![SmolStr::new("Alias")],
        }
    }
}

impl IndexOptions {
    pub(crate) fn metadata_key(&self, field: &str) -> Option<&SmolStr> {
        self.metadata_fields
            .iter()
            .find(|name| name.eq_ignore_ascii_case(field))
    }

    pub(crate) fn is_link_field(&self, field: &str) -> bool {
        self.link_fields.iter().any(|name| name == field)
    }
}

/// Directory scan settings.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Width of the parse pool.
    pub concurrency: usize,
    /// File extensions to pick up, without the leading dot.
    pub extensions: Vec<String>,
    pub follow_hidden: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            concurrency: 8,
            extensions: vec!["pcl".to_string()],
            follow_hidden: false,
        }
    }
}

impl ScanOptions {
    pub fn from_env() -> Self {
        let mut options = Self::default();

        if let Ok(value) = env::var("PCL_SCAN_CONCURRENCY") {
            match value.parse::<usize>() {
                Ok(concurrency) if concurrency > 0 => options.concurrency = concurrency,
                _ => tracing::warn!(
                    "Invalid PCL_SCAN_CONCURRENCY value '{}', using default {}",
                    value,
                    options.concurrency
                ),
            }
        }

        if let Ok(value) = env::var("PCL_SCAN_EXTENSIONS") {
            let extensions = value
                .split(',')
                .map(|s| s.trim().trim_start_matches('.').to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>();

            if extensions.is_empty() {
                tracing::warn!("Empty PCL_SCAN_EXTENSIONS value, using default {:?}", options.extensions);
            } else {
                options.extensions = extensions;
            }
        }

        options
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("class", Some("Class"))]
    #[case("TYPE", Some("Type"))]
    #[case("Period", None)]
    fn test_metadata_key(#[case] field: &str, #[case] expected: Option<&str>) {
        let options = IndexOptions::default();
        assert_eq!(options.metadata_key(field).map(|s| s.as_str()), expected);
    }

    #[test]
    fn test_scan_defaults() {
        let options = ScanOptions::default();
        assert_eq!(options.concurrency, 8);
        assert_eq!(options.extensions, vec!["pcl".to_string()]);
        assert!(!options.follow_hidden);
    }
}
