use mcscore_core::{ChoiceBatch, Grouping};
use tracing::{debug, info};

use crate::MultipleChoiceModel;

/// A batch together with the index of the correct candidate of every example.
pub struct LabelledBatch {
    pub batch: ChoiceBatch,
    pub grouping: Grouping,
    pub targets: Vec<usize>,
}

/// Running accuracy over predicted vs. target candidate indices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Accuracy {
    correct: usize,
    total: usize,
}

impl Accuracy {
    pub fn update(&mut self, predictions: &[usize], targets: &[usize]) -> anyhow::Result<()> {
        if predictions.len() != targets.len() {
            anyhow::bail!(
                "Got {} predictions for {} targets.",
                predictions.len(),
                targets.len()
            );
        }
        self.correct += predictions.iter().zip(targets).filter(|(p, t)| p == t).count();
        self.total += targets.len();
        Ok(())
    }

    pub fn correct(&self) -> usize {
        self.correct
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// `None` until at least one example was seen.
    pub fn value(&self) -> Option<f64> {
        (self.total > 0).then(|| self.correct as f64 / self.total as f64)
    }
}

/// Score every batch and accumulate accuracy against its targets.
pub fn evaluate<I>(model: &MultipleChoiceModel, batches: I) -> anyhow::Result<Accuracy>
where
    I: IntoIterator<Item = LabelledBatch>,
{
    let mut accuracy = Accuracy::default();
    for (step, labelled) in batches.into_iter().enumerate() {
        let predictions = model.predict(&labelled.batch, &labelled.grouping)?;
        accuracy.update(&predictions, &labelled.targets)?;
        debug!(step, correct = accuracy.correct(), total = accuracy.total(), "Evaluated batch");
    }
    info!(
        correct = accuracy.correct(),
        total = accuracy.total(),
        accuracy = accuracy.value().unwrap_or(0.0),
        "Evaluation finished"
    );
    Ok(accuracy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy_accumulates() {
        let mut acc = Accuracy::default();
        assert_eq!(acc.value(), None);
        acc.update(&[0, 1, 2], &[0, 2, 2]).unwrap();
        acc.update(&[1], &[1]).unwrap();
        assert_eq!(acc.correct(), 3);
        assert_eq!(acc.total(), 4);
        assert_eq!(acc.value(), Some(0.75));
    }

    #[test]
    fn test_accuracy_rejects_length_mismatch() {
        let mut acc = Accuracy::default();
        assert!(acc.update(&[0, 1], &[0]).is_err());
        assert_eq!(acc.total(), 0);
    }
}
