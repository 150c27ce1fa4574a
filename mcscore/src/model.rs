use mcscore_core::{ChoiceBatch, Grouping, MultipleChoiceScorer, ScoreOptions, ScoreOutput, Scorer, Topology};
use tracing::instrument;

/// The object used to score multiple-choice batches. Create it with
/// [`ScorerBuilder`](crate::ScorerBuilder).
pub struct MultipleChoiceModel {
    scorer: Scorer,
    options: ScoreOptions,
}

impl MultipleChoiceModel {
    pub fn new(scorer: Scorer, options: ScoreOptions) -> Self {
        Self { scorer, options }
    }

    /// Score a batch with the options this model was built with.
    pub fn score(&self, batch: &ChoiceBatch, grouping: &Grouping) -> anyhow::Result<ScoreOutput> {
        self.score_with_options(batch, grouping, self.options)
    }

    /// Score a batch, overriding the default options for this call only.
    #[instrument(skip_all, fields(scorer = self.scorer.name(), examples = grouping.num_examples()))]
    pub fn score_with_options(
        &self,
        batch: &ChoiceBatch,
        grouping: &Grouping,
        options: ScoreOptions,
    ) -> anyhow::Result<ScoreOutput> {
        Ok(self.scorer.score(batch, grouping, options)?)
    }

    /// Only the winning candidate index of every example.
    pub fn predict(&self, batch: &ChoiceBatch, grouping: &Grouping) -> anyhow::Result<Vec<usize>> {
        Ok(self.score(batch, grouping)?.predictions)
    }

    pub fn topology(&self) -> Topology {
        self.scorer.topology()
    }

    pub fn options(&self) -> ScoreOptions {
        self.options
    }
}
