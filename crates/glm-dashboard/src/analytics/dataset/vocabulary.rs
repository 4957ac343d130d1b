use serde::Serialize;
use std::collections::HashMap;

/// Closed code ↔ label mapping for one categorical column.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Vocabulary {
    labels: Vec<String>,
    #[serde(skip)]
    codes: HashMap<String, u32>,
}

impl Vocabulary {
    /// Codes are assigned in iteration order; duplicates keep their first code.
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut vocabulary = Self::default();
        for label in labels {
            let label = label.as_ref();
            if vocabulary.codes.contains_key(label) {
                continue;
            }
            let code = vocabulary.labels.len() as u32;
            vocabulary.labels.push(label.to_string());
            vocabulary.codes.insert(label.to_string(), code);
        }
        vocabulary
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn label(&self, code: u32) -> Option<&str> {
        self.labels.get(code as usize).map(String::as_str)
    }

    pub fn code(&self, label: &str) -> Option<u32> {
        self.codes.get(label).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigns_codes_in_order_and_skips_duplicates() {
        let vocabulary = Vocabulary::new(["Diesel", "Regular", "Diesel"]);
        assert_eq!(vocabulary.len(), 2);
        assert_eq!(vocabulary.code("Regular"), Some(1));
        assert_eq!(vocabulary.label(0), Some("Diesel"));
        assert_eq!(vocabulary.label(7), None);
        assert_eq!(vocabulary.code("Electric"), None);
    }
}
