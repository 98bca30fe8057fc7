use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// Minimum token length used when no configuration says otherwise.
pub const DEFAULT_MIN_TOKEN_LEN: usize = 2;

/// A number directly followed by `%` (with optional space) or a run of word characters.
static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d+(?:[.,]\d+)*\s?%|[\p{L}\p{N}]+(?:['’\-][\p{L}\p{N}]+)*")
        .expect("valid token pattern")
});

/// Function words dropped from every document: articles, prepositions, pronouns,
/// conjunctions and filler adverbs, Portuguese first.
const STOPWORDS: &[&str] = &[
    // pt: artigos e contrações
    "o", "a", "os", "as", "um", "uma", "uns", "umas", "do", "da", "dos", "das", "no", "na",
    "nos", "nas", "ao", "aos", "à", "às", "pelo", "pela", "pelos", "pelas", "num", "numa",
    "dum", "duma", "deste", "desta", "neste", "nesta", "nesse", "nessa", "naquele",
    "naquela", "disso", "nisso", "daquele", "daquela",
    // pt: preposições
    "de", "em", "por", "para", "com", "sem", "sob", "sobre", "entre", "até", "após",
    "ante", "contra", "desde", "perante", "trás",
    // pt: pronomes
    "eu", "tu", "ele", "ela", "nós", "vós", "eles", "elas", "me", "te", "se", "lhe",
    "lhes", "nos", "vos", "meu", "minha", "meus", "minhas", "teu", "tua", "seu", "sua",
    "seus", "suas", "nosso", "nossa", "nossos", "nossas", "este", "esta", "estes",
    "estas", "esse", "essa", "esses", "essas", "aquele", "aquela", "aqueles", "aquelas",
    "isto", "isso", "aquilo", "que", "quem", "qual", "quais", "cujo", "cuja", "você",
    "vocês", "mim", "ti", "si", "conosco", "comigo",
    // pt: conjunções
    "e", "ou", "mas", "porém", "contudo", "todavia", "pois", "porque", "como", "quando",
    "embora", "nem", "logo", "portanto", "enquanto", "caso", "se",
    // pt: advérbios
    "não", "sim", "já", "ainda", "também", "muito", "pouco", "mais", "menos", "bem",
    "mal", "aqui", "ali", "lá", "cá", "hoje", "ontem", "amanhã", "sempre", "nunca",
    "talvez", "apenas", "só", "então", "agora", "depois", "antes", "assim", "quase",
    "tão", "tanto", "onde",
    // en: articles, prepositions, pronouns, conjunctions, adverbs
    "the", "an", "of", "in", "on", "at", "to", "for", "from", "by", "with", "without",
    "about", "into", "onto", "over", "under", "between", "through", "during", "after",
    "before", "i", "you", "he", "she", "it", "we", "they", "me", "him", "her", "us",
    "them", "my", "your", "his", "its", "our", "their", "this", "that", "these", "those",
    "who", "whom", "which", "what", "and", "or", "but", "nor", "so", "yet", "because",
    "if", "while", "although", "as", "than", "not", "no", "very", "also", "just", "only",
    "then", "now", "here", "there", "too", "is", "are", "was", "were", "be", "been",
];

/// Splits text into lowercase content tokens.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    stopwords: HashSet<String>,
    min_len: usize,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_TOKEN_LEN)
    }
}

impl Tokenizer {
    /// Creates a tokenizer with the built-in stopwords.
    #[must_use]
    pub fn new(min_len: usize) -> Self {
        Self {
            stopwords: STOPWORDS.iter().map(|word| (*word).to_string()).collect(),
            min_len,
        }
    }

    /// Adds stopwords on top of the built-in list.
    #[must_use]
    pub fn with_stopwords<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.stopwords
            .extend(extra.into_iter().map(|word| word.as_ref().to_lowercase()));
        self
    }

    /// Whether `word` is dropped as a function word.
    #[must_use]
    pub fn is_stopword(&self, word: &str) -> bool {
        self.stopwords.contains(word)
    }

    /// Tokens of `text` in order, lowercased and filtered. `12 %` becomes `12%`.
    #[must_use]
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        TOKEN
            .find_iter(text)
            .filter_map(|found| {
                let token: String = found
                    .as_str()
                    .chars()
                    .filter(|ch| !ch.is_whitespace())
                    .flat_map(char::to_lowercase)
                    .collect();
                let keep = token.chars().count() >= self.min_len && !self.is_stopword(&token);
                keep.then_some(token)
            })
            .collect()
    }
}
