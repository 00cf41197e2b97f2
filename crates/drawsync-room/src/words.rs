//! Round words: normalization and the built-in fallback list.

use rand::seq::IndexedRandom;

/// Words used when the oracle can't supply one.
pub const FALLBACK_WORDS: [&str; 10] = [
    "Casa", "Gato", "Perro", "Sol", "Flor", "Carro", "Avion", "Pelota", "Arbol", "Libro",
];

/// Cleans up a word as returned by a language model: surrounding
/// whitespace and periods are dropped.
///
/// Returns `None` if nothing is left.
pub fn normalize_word(raw: &str) -> Option<String> {
    let word: String = raw.trim().chars().filter(|c| *c != '.').collect();
    let word = word.trim();
    (!word.is_empty()).then(|| word.to_string())
}

/// A random word from [`FALLBACK_WORDS`].
pub fn fallback_word() -> String {
    FALLBACK_WORDS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or("Casa")
        .to_string()
}
