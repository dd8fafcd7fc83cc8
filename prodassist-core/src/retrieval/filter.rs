//! Keyword and model-number filtering of retrieved product documents.
//!
//! A number in a query is a model number: "iPhone 17" must not be answered
//! with an "iPhone 117" or "A17" document. Numbers therefore only match when
//! they stand alone as a whole alphanumeric run of the other text. Both
//! sides use Unicode letters and decimal digits.

use super::document::Document;
use regex::Regex;
use std::sync::LazyLock;

const TOKEN_PATTERN: &str = r"[\p{Alphabetic}\p{Nd}]+";

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d+\b").expect("valid regex"));
static KEYWORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z]+").expect("valid regex"));
static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(TOKEN_PATTERN).expect("valid regex"));

/// Standalone digit runs of `text`, in order of appearance.
pub fn numeric_tokens(text: &str) -> Vec<String> {
    NUMBER_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Lower-cased alphabetic runs of `text`.
pub fn keywords(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    KEYWORD_RE
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Whether `number` occurs in `text` as a whole alphanumeric run.
///
/// `17` matches "iPhone 17" and "17-inch", not "117" or "A17".
pub fn contains_standalone_number(text: &str, number: &str) -> bool {
    TOKEN_RE.find_iter(text).any(|m| m.as_str() == number)
}

/// Whether every number of the query stands alone somewhere in `text`.
/// Vacuously true for queries without numbers.
pub fn numbers_match(query: &str, text: &str) -> bool {
    numeric_tokens(query)
        .iter()
        .all(|n| contains_standalone_number(text, n))
}

/// Keyword-and-number predicate for a single document.
pub fn matches_query(query: &str, doc: &Document) -> bool {
    let title = doc.title().to_lowercase();
    let words = keywords(query);
    let keyword_ok = words.is_empty() || words.iter().any(|w| title.contains(w.as_str()));
    keyword_ok && numbers_match(query, &title)
}

/// Keep the documents whose title matches the query.
pub fn filter_documents(query: &str, docs: Vec<Document>) -> Vec<Document> {
    docs.into_iter()
        .filter(|doc| matches_query(query, doc))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::document::TITLE_KEY;

    fn doc(title: &str) -> Document {
        Document::new("reviews").with_meta(TITLE_KEY, title)
    }

    #[test]
    fn test_numeric_tokens() {
        assert_eq!(numeric_tokens("iPhone 17 vs 15?"), vec!["17", "15"]);
        assert!(numeric_tokens("A17 chip").is_empty());
        assert!(numeric_tokens("no numbers").is_empty());
    }

    #[test]
    fn test_keywords_lowercased() {
        assert_eq!(
            keywords("Price of iPhone 17?"),
            vec!["price", "of", "iphone"]
        );
    }

    #[test]
    fn test_standalone_number_boundaries() {
        assert!(contains_standalone_number("Apple iPhone 17", "17"));
        assert!(contains_standalone_number("17-inch laptop", "17"));
        assert!(!contains_standalone_number("Apple iPhone 117", "17"));
        assert!(!contains_standalone_number("Bionic A17 chip", "17"));
        assert!(!contains_standalone_number("170 grams", "17"));
    }

    #[test]
    fn test_non_ascii_digits_stand_alone() {
        assert_eq!(numeric_tokens("Pixel ８"), vec!["８"]);
        assert!(contains_standalone_number("Pixel ８", "８"));
        assert!(!contains_standalone_number("Pixel １８", "８"));
        assert!(numbers_match("Pixel ８", "Pixel ８"));
        let kept = filter_documents("Pixel ８", vec![doc("Pixel ８"), doc("Pixel 9")]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title(), "Pixel ８");
    }

    #[test]
    fn test_filter_rejects_longer_number() {
        let docs = vec![doc("Apple iPhone 117"), doc("Apple iPhone 17 Pro")];
        let kept = filter_documents("iPhone 17", docs);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title(), "Apple iPhone 17 Pro");
    }

    #[test]
    fn test_filter_requires_all_numbers() {
        let docs = vec![doc("Galaxy S24 Ultra 512"), doc("Galaxy 24 Ultra 512")];
        let kept = filter_documents("galaxy 24 512", docs);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title(), "Galaxy 24 Ultra 512");
    }

    #[test]
    fn test_filter_requires_a_keyword_hit() {
        let docs = vec![doc("Sony WH-1000XM5"), doc("Bose QuietComfort")];
        let kept = filter_documents("sony headphones", docs);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title(), "Sony WH-1000XM5");
    }

    #[test]
    fn test_numbers_only_query() {
        let docs = vec![doc("Pixel 8"), doc("Pixel 9")];
        let kept = filter_documents("8", docs);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_empty_query_keeps_everything() {
        let docs = vec![doc("A"), doc("B")];
        assert_eq!(filter_documents("", docs).len(), 2);
    }

    #[test]
    fn test_missing_title() {
        let docs = vec![Document::new("no title")];
        assert!(filter_documents("iphone", docs.clone()).is_empty());
        assert_eq!(filter_documents("?", docs).len(), 1);
    }
}
