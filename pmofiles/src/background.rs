//! Background image lookup for listing pages.
//!
//! Matching is case-insensitive: configuration keys are lower-cased when the
//! configuration is loaded, so the requested path is lower-cased too.

use std::collections::BTreeMap;

/// Path fragment -> background image file name, read-only after startup.
#[derive(Debug, Clone, Default)]
pub struct Backgrounds {
    table: BTreeMap<String, String>,
}

impl Backgrounds {
    pub fn new(table: BTreeMap<String, String>) -> Self {
        let table = table
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .filter(|(k, _)| !k.is_empty())
            .collect();
        Self { table }
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Image for a relative path: the longest key contained in `rel` wins.
    ///
    /// Ties go to the first key in lexicographic order.
    pub fn select(&self, rel: &str) -> Option<&str> {
        let rel = rel.to_lowercase();
        let mut best: Option<(&String, &String)> = None;
        for (key, image) in &self.table {
            if !rel.contains(key.as_str()) {
                continue;
            }
            if best.is_none_or(|(k, _)| key.len() > k.len()) {
                best = Some((key, image));
            }
        }
        best.map(|(_, image)| image.as_str())
    }
}

impl FromIterator<(String, String)> for Backgrounds {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Backgrounds {
        [
            ("Music", "music.jpg"),
            ("Music/Disco", "disco.jpg"),
            ("Jazz", "jazz.jpg"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_longest_key_wins() {
        let bg = table();
        assert_eq!(bg.select("Music/Disco/Best of"), Some("disco.jpg"));
        assert_eq!(bg.select("Music/Rock"), Some("music.jpg"));
    }

    #[test]
    fn test_case_insensitive() {
        let bg = table();
        assert_eq!(bg.select("music/disco"), Some("disco.jpg"));
        assert_eq!(bg.select("Old JAZZ"), Some("jazz.jpg"));
    }

    #[test]
    fn test_no_match() {
        let bg = table();
        assert_eq!(bg.select("Podcasts"), None);
        assert_eq!(bg.select(""), None);
        assert_eq!(Backgrounds::default().select("Music"), None);
    }
}
