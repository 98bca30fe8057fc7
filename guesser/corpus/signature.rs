use crate::{model::FeatureSignature, store::CorpusStore, tfidf::TfIdfError};

/// Default number of background and local keywords folded into a signature.
pub const DEFAULT_KEYWORDS: usize = 10;

/// Builds the signed feature mapping the classifier trains on and queries with.
///
/// Corpus-wide background keywords seed negative weights; the document's own keywords
/// then add their relevancy on top. The same corpus state and tokens always produce the
/// same signature, in the same term order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureBuilder {
    background: usize,
    local: usize,
}

impl Default for SignatureBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORDS, DEFAULT_KEYWORDS)
    }
}

impl SignatureBuilder {
    /// Creates a builder taking `background` corpus keywords and `local` document keywords.
    #[must_use]
    pub const fn new(background: usize, local: usize) -> Self {
        Self { background, local }
    }

    /// Number of corpus-wide keywords used.
    #[must_use]
    pub const fn background(&self) -> usize {
        self.background
    }

    /// Number of document keywords used.
    #[must_use]
    pub const fn local(&self) -> usize {
        self.local
    }

    /// Builds the signature of `tokens` against the current state of `store`.
    pub fn build(
        &self,
        store: &CorpusStore,
        tokens: &[String],
    ) -> Result<FeatureSignature, TfIdfError> {
        let mut signature = FeatureSignature::new();
        for keyword in store.top_keywords(Some(self.background))? {
            signature.insert(keyword.term, -keyword.relevancy);
        }
        for keyword in store.keywords_for(tokens, Some(self.local))? {
            signature.accumulate(&keyword.term, keyword.relevancy);
        }
        Ok(signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| (*w).to_string()).collect()
    }

    fn pets() -> CorpusStore {
        let mut store = CorpusStore::detached();
        store.upsert_document("d1", tokens(&["cat", "dog", "cat"]));
        store.upsert_document("d2", tokens(&["dog", "dog", "fish"]));
        store
    }

    #[test]
    fn background_is_negative_and_local_offsets_it() {
        let store = pets();
        let doc = tokens(&["dog", "dog", "fish"]);
        let signature = SignatureBuilder::default().build(&store, &doc).unwrap();

        let ln2 = std::f64::consts::LN_2;
        // background: cat = -(2/6) ln2, fish = -(1/6) ln2, dog = -0
        // local: fish = (1/3) ln2, dog = 0
        assert!((signature.get("cat").unwrap() + ln2 / 3.0).abs() < 1e-12);
        assert!((signature.get("fish").unwrap() - ln2 / 6.0).abs() < 1e-12);
        assert_eq!(signature.get("dog").unwrap(), 0.0);
        let order: Vec<_> = signature.iter().map(|(term, _)| term).collect();
        assert_eq!(order, vec!["cat", "fish", "dog"]);
    }

    #[test]
    fn limits_are_respected() {
        let store = pets();
        let doc = tokens(&["cat", "dog", "cat"]);
        let signature = SignatureBuilder::new(1, 1).build(&store, &doc).unwrap();
        // background top-1 is cat, local top-1 is cat: the two fold into one term.
        assert_eq!(signature.len(), 1);
        let expected = -(2.0 / 6.0) * std::f64::consts::LN_2 + (2.0 / 3.0) * std::f64::consts::LN_2;
        assert!((signature.get("cat").unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn identical_state_builds_identical_signature() {
        let store = pets();
        let doc = tokens(&["cat", "dog", "cat"]);
        let builder = SignatureBuilder::default();
        assert_eq!(
            builder.build(&store, &doc).unwrap(),
            builder.build(&store, &doc).unwrap()
        );
    }
}
