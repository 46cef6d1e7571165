//! English plural and singular forms for resource names.
//!
//! Collection endpoints are addressed by the plural of the resource name, so
//! `person` is listed at `people` and `category` at `categories`.

use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

const UNCOUNTABLE: &[&str] = &[
    "access",
    "advice",
    "art",
    "baggage",
    "dances",
    "equipment",
    "fish",
    "fuel",
    "furniture",
    "food",
    "heat",
    "honey",
    "homework",
    "impatience",
    "information",
    "knowledge",
    "luggage",
    "money",
    "music",
    "news",
    "patience",
    "progress",
    "pollution",
    "research",
    "rice",
    "sand",
    "series",
    "sheep",
    "sms",
    "species",
    "staff",
    "toothpaste",
    "traffic",
    "understanding",
    "water",
    "weather",
    "work",
];

const IRREGULAR: &[(&str, &str)] = &[
    ("child", "children"),
    ("clothes", "clothing"),
    ("man", "men"),
    ("movie", "movies"),
    ("person", "people"),
    ("woman", "women"),
    ("mouse", "mice"),
    ("goose", "geese"),
    ("ox", "oxen"),
    ("leaf", "leaves"),
    ("course", "courses"),
    ("size", "sizes"),
];

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum Form {
    Plural,
    Singular,
}

fn memo() -> &'static RwLock<HashMap<(Form, String), String>> {
    static CACHE: OnceLock<RwLock<HashMap<(Form, String), String>>> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

fn cached(form: Form, word: &str, compute: fn(&str) -> String) -> String {
    let word = word.trim().to_lowercase();
    let key = (form, word);
    {
        let cache = memo().read().unwrap_or_else(|e| e.into_inner());
        if let Some(hit) = cache.get(&key) {
            return hit.clone();
        }
    }
    let result = compute(&key.1);
    memo()
        .write()
        .unwrap_or_else(|e| e.into_inner())
        .insert(key, result.clone());
    result
}

pub fn is_uncountable(word: &str) -> bool {
    UNCOUNTABLE.contains(&word.trim().to_lowercase().as_str())
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

/// Second-to-last char of `word` before `suffix`, if `word` ends with it.
fn before_suffix(word: &str, suffix: &str) -> Option<char> {
    word.strip_suffix(suffix)?.chars().last()
}

fn takes_es(stem: &str) -> bool {
    stem.ends_with(['s', 'x', 'z'])
        || before_suffix(stem, "h").is_some_and(|c| !"aeioudgkprt".contains(c))
}

fn compute_plural(word: &str) -> String {
    if UNCOUNTABLE.contains(&word) {
        return word.to_string();
    }
    if let Some((_, plural)) = IRREGULAR.iter().find(|(single, _)| *single == word) {
        return (*plural).to_string();
    }
    if takes_es(word) {
        return format!("{}es", word);
    }
    if before_suffix(word, "y").is_some_and(|c| !is_vowel(c)) {
        return format!("{}ies", &word[..word.len() - 1]);
    }
    format!("{}s", word)
}

fn compute_singular(word: &str) -> String {
    if UNCOUNTABLE.contains(&word) {
        return word.to_string();
    }
    if let Some((single, _)) = IRREGULAR.iter().find(|(_, plural)| *plural == word) {
        return (*single).to_string();
    }
    if let Some(stem) = word.strip_suffix("es") {
        if takes_es(stem) {
            return stem.to_string();
        }
    }
    if before_suffix(word, "ies").is_some_and(|c| !is_vowel(c)) {
        return format!("{}y", &word[..word.len() - 3]);
    }
    if word.ends_with('s') && !word.ends_with("ss") {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

/// Plural form, lowercased and trimmed.
pub fn plural(word: &str) -> String {
    cached(Form::Plural, word, compute_plural)
}

/// Singular form, lowercased and trimmed.
pub fn singular(word: &str) -> String {
    cached(Form::Singular, word, compute_singular)
}

/// Plural unless `count` is exactly one.
pub fn pluralize(count: i64, word: &str) -> String {
    if count == 1 {
        word.trim().to_lowercase()
    } else {
        plural(word)
    }
}

/// Singular only when `count` is exactly one.
pub fn singularize(count: i64, word: &str) -> String {
    if count == 1 {
        singular(word)
    } else {
        word.trim().to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_plurals() {
        assert_eq!(plural("book"), "books");
        assert_eq!(plural("box"), "boxes");
        assert_eq!(plural("church"), "churches");
        assert_eq!(plural("category"), "categories");
        assert_eq!(plural("day"), "days");
        assert_eq!(plural("  Order "), "orders");
    }

    #[test]
    fn irregular_and_uncountable() {
        assert_eq!(plural("person"), "people");
        assert_eq!(plural("Leaf"), "leaves");
        assert_eq!(plural("sheep"), "sheep");
        assert_eq!(singular("people"), "person");
        assert_eq!(singular("news"), "news");
        assert!(is_uncountable("Information"));
    }

    #[test]
    fn singulars_reverse_the_rules() {
        assert_eq!(singular("boxes"), "box");
        assert_eq!(singular("churches"), "church");
        assert_eq!(singular("categories"), "category");
        assert_eq!(singular("books"), "book");
        assert_eq!(singular("class"), "class");
        // "th" does not take "es", so only the "s" goes.
        assert_eq!(singular("months"), "month");
    }

    #[test]
    fn counts() {
        assert_eq!(pluralize(1, "Person"), "person");
        assert_eq!(pluralize(0, "person"), "people");
        assert_eq!(pluralize(3, "box"), "boxes");
        assert_eq!(singularize(1, "boxes"), "box");
        assert_eq!(singularize(2, "boxes"), "boxes");
    }

    #[test]
    fn repeated_calls_hit_the_cache() {
        assert_eq!(plural("query"), plural("query"));
        assert!(
            memo()
                .read()
                .unwrap()
                .contains_key(&(Form::Plural, "query".to_string()))
        );
    }
}
