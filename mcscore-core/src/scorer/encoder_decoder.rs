use tracing::{debug, instrument};

use super::MultipleChoiceScorer;
use crate::batch::{ChoiceBatch, Grouping, ScoreOptions, ScoreOutput};
use crate::config::Topology;
use crate::error::{Result, ScoreError};
use crate::models::Seq2SeqLm;
use crate::selector::CandidateSelector;

/// Scores candidates with a sequence-to-sequence model.
///
/// The prompt goes to the encoder and the candidate is the label sequence, so
/// the decoder logits already line up one-to-one with candidate positions.
pub struct EncoderDecoderScorer<M> {
    model: M,
    selector: CandidateSelector,
}

impl<M: Seq2SeqLm> EncoderDecoderScorer<M> {
    pub fn new(model: M, selector: CandidateSelector) -> Self {
        Self { model, selector }
    }

    /// Prefix-LM attention has no meaning here; asking for it is a
    /// [`ScoreError::Config`].
    #[instrument(name = "score_encoder_decoder", skip_all)]
    pub fn score(&self, batch: &ChoiceBatch, grouping: &Grouping, options: ScoreOptions) -> Result<ScoreOutput> {
        if options.use_prefix_bias {
            return Err(ScoreError::Config(
                "prefix-LM attention only applies to decoder-only models".to_string(),
            ));
        }
        let (rows, prompt_len, candidate_len) = batch.validate()?;
        grouping.group_sizes(rows)?;
        debug!(rows, prompt_len, candidate_len, "encoder-decoder forward");

        let device = self.model.device();
        let prompt_ids = batch.prompt_ids.to_device(device)?;
        let prompt_mask = batch.prompt_mask.to_device(device)?;
        let candidate_ids = batch.candidate_ids.to_device(device)?;
        let candidate_mask = batch.candidate_mask.to_device(device)?;

        let logits = self.model.forward(&prompt_ids, &prompt_mask, &candidate_ids)?;

        self.selector
            .select(&logits, &candidate_ids, &candidate_mask, grouping)
    }
}

impl<M: Seq2SeqLm> MultipleChoiceScorer for EncoderDecoderScorer<M> {
    fn score(&self, batch: &ChoiceBatch, grouping: &Grouping, options: ScoreOptions) -> Result<ScoreOutput> {
        EncoderDecoderScorer::score(self, batch, grouping, options)
    }

    fn topology(&self) -> Topology {
        Topology::EncoderDecoder
    }
}
