use guesser_corpus::{FeatureSignature, Label, TrainingExample};

/// Incremental binary classifier over feature signatures.
///
/// `predict` never fails. Training is mistake-driven: a correct prediction leaves the
/// model untouched.
pub trait OnlineClassifier {
    /// Predicts a label for `signature`.
    fn predict(&self, signature: &FeatureSignature) -> Label;

    /// Learns from one judgment. Returns true when the model changed.
    fn train_one(&mut self, signature: &FeatureSignature, label: Label) -> bool;

    /// Learns from every example in order. Returns how many caused an update.
    fn train_batch<'a, I>(&mut self, examples: I) -> usize
    where
        I: IntoIterator<Item = &'a TrainingExample>,
        Self: Sized,
    {
        examples
            .into_iter()
            .filter(|example| self.train_one(&example.input, example.output))
            .count()
    }
}
