//! TF-IDF scoring over token blobs.
//!
//! A blob is an ordered token sequence; a corpus is a collection of blobs. The scoring
//! functions reject inputs for which the score would be undefined instead of returning
//! `NaN` or infinity.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use thiserror::Error;

use crate::model::Keyword;

/// Inputs for which a TF-IDF score is undefined.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TfIdfError {
    /// Term frequency over a zero-length blob.
    #[error("term frequency is undefined for an empty blob")]
    EmptyBlob,
    /// Inverse document frequency over a corpus without documents.
    #[error("inverse document frequency is undefined for an empty corpus")]
    EmptyCorpus,
    /// Inverse document frequency of a term no corpus document contains.
    #[error("term '{0}' does not occur in any corpus document")]
    UnseenTerm(String),
}

/// `count(word in blob) / len(blob)`.
pub fn term_frequency(word: &str, blob: &[String]) -> Result<f64, TfIdfError> {
    if blob.is_empty() {
        return Err(TfIdfError::EmptyBlob);
    }
    let count = blob.iter().filter(|token| *token == word).count();
    Ok(ratio(count, blob.len()))
}

/// `ln(|corpus| / documents containing word)`.
///
/// Zero when every document contains the word.
pub fn inverse_document_frequency<B>(word: &str, corpus: &[B]) -> Result<f64, TfIdfError>
where
    B: AsRef<[String]>,
{
    if corpus.is_empty() {
        return Err(TfIdfError::EmptyCorpus);
    }
    let containing = corpus
        .iter()
        .filter(|blob| blob.as_ref().iter().any(|token| token == word))
        .count();
    idf_from_counts(word, corpus.len(), containing)
}

/// `term_frequency * inverse_document_frequency`.
pub fn tfidf<B>(word: &str, blob: &[String], corpus: &[B]) -> Result<f64, TfIdfError>
where
    B: AsRef<[String]>,
{
    let tf = term_frequency(word, blob)?;
    let idf = inverse_document_frequency(word, corpus)?;
    Ok(tf * idf)
}

/// Ranks the distinct terms of `blob` by TF-IDF against `corpus`, highest first.
///
/// Equal scores keep first-occurrence order. An empty blob ranks to an empty list.
/// `limit` truncates the result; `None` returns every term.
pub fn rank_terms<B>(
    blob: &[String],
    corpus: &[B],
    limit: Option<usize>,
) -> Result<Vec<Keyword>, TfIdfError>
where
    B: AsRef<[String]>,
{
    if blob.is_empty() {
        return Ok(Vec::new());
    }
    if corpus.is_empty() {
        return Err(TfIdfError::EmptyCorpus);
    }

    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for token in blob {
        *counts.entry(token.as_str()).or_insert(0) += 1;
    }
    let frequencies = document_frequencies(corpus);

    let mut ranked = Vec::with_capacity(counts.len());
    for (term, count) in counts {
        let containing = frequencies.get(term).copied().unwrap_or(0);
        let idf = idf_from_counts(term, corpus.len(), containing)?;
        ranked.push(Keyword {
            term: term.to_owned(),
            relevancy: ratio(count, blob.len()) * idf,
        });
    }
    // `sort_by` is stable, which gives the first-occurrence tie-break.
    ranked.sort_by(|a, b| b.relevancy.total_cmp(&a.relevancy));
    if let Some(limit) = limit {
        ranked.truncate(limit);
    }
    Ok(ranked)
}

fn document_frequencies<B>(corpus: &[B]) -> HashMap<&str, usize>
where
    B: AsRef<[String]>,
{
    let mut frequencies = HashMap::new();
    for blob in corpus {
        let distinct: HashSet<&str> = blob.as_ref().iter().map(String::as_str).collect();
        for term in distinct {
            *frequencies.entry(term).or_insert(0) += 1;
        }
    }
    frequencies
}

fn idf_from_counts(word: &str, documents: usize, containing: usize) -> Result<f64, TfIdfError> {
    if containing == 0 {
        return Err(TfIdfError::UnseenTerm(word.to_owned()));
    }
    Ok(ratio(documents, containing).ln())
}

#[allow(clippy::cast_precision_loss)]
fn ratio(numerator: usize, denominator: usize) -> f64 {
    numerator as f64 / denominator as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| (*t).to_string()).collect()
    }

    fn pets() -> Vec<Vec<String>> {
        vec![blob(&["cat", "dog", "cat"]), blob(&["dog", "dog", "fish"])]
    }

    #[test]
    fn pets_scenario() {
        let corpus = pets();
        let tf = term_frequency("cat", &corpus[0]).unwrap();
        assert!((tf - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(inverse_document_frequency("dog", &corpus).unwrap(), 0.0);
        let fish = inverse_document_frequency("fish", &corpus).unwrap();
        assert!((fish - std::f64::consts::LN_2).abs() < 1e-12);
    }

    #[test]
    fn term_frequency_bounds() {
        let only = blob(&["rust", "rust"]);
        assert_eq!(term_frequency("rust", &only).unwrap(), 1.0);
        let mixed = blob(&["rust", "go"]);
        let tf = term_frequency("rust", &mixed).unwrap();
        assert!(tf > 0.0 && tf < 1.0);
        assert_eq!(term_frequency("java", &mixed).unwrap(), 0.0);
    }

    #[test]
    fn rejects_undefined_inputs() {
        let empty: Vec<String> = Vec::new();
        assert_eq!(term_frequency("x", &empty), Err(TfIdfError::EmptyBlob));
        let no_docs: Vec<Vec<String>> = Vec::new();
        assert_eq!(
            inverse_document_frequency("x", &no_docs),
            Err(TfIdfError::EmptyCorpus)
        );
        assert_eq!(
            inverse_document_frequency("bird", &pets()),
            Err(TfIdfError::UnseenTerm("bird".into()))
        );
    }

    #[test]
    fn saturated_terms_score_zero() {
        let corpus = pets();
        assert_eq!(tfidf("dog", &corpus[1], &corpus).unwrap(), 0.0);
    }

    #[test]
    fn ranking_is_descending_and_stable() {
        let corpus = vec![
            blob(&["alpha", "beta", "gamma", "shared"]),
            blob(&["delta", "shared"]),
        ];
        let ranked = rank_terms(&corpus[0], &corpus, None).unwrap();
        let terms: Vec<_> = ranked.iter().map(|k| k.term.as_str()).collect();
        // alpha, beta, gamma tie; they keep their order ahead of the zero-score term.
        assert_eq!(terms, vec!["alpha", "beta", "gamma", "shared"]);
        assert_eq!(ranked[3].relevancy, 0.0);

        let top = rank_terms(&corpus[0], &corpus, Some(2)).unwrap();
        assert_eq!(top.len(), 2);
    }

    #[test]
    fn ranking_matches_pointwise_tfidf() {
        let corpus = pets();
        let ranked = rank_terms(&corpus[0], &corpus, None).unwrap();
        for keyword in &ranked {
            let expected = tfidf(&keyword.term, &corpus[0], &corpus).unwrap();
            assert!((keyword.relevancy - expected).abs() < 1e-12);
        }
        assert_eq!(ranked[0].term, "cat");
    }

    #[test]
    fn empty_blob_ranks_to_nothing() {
        let empty: Vec<String> = Vec::new();
        let no_docs: Vec<Vec<String>> = Vec::new();
        assert!(rank_terms(&empty, &no_docs, Some(10)).unwrap().is_empty());
    }
}
