use candle_core::{DType, Tensor, D};
use tracing::{debug, instrument};

use super::MultipleChoiceScorer;
use crate::attention::{AttentionMaskBuilder, AttentionPattern};
use crate::batch::{ChoiceBatch, Grouping, ScoreOptions, ScoreOutput};
use crate::config::Topology;
use crate::error::{shape_bail, Result};
use crate::models::{AttentionInput, CausalLm};
use crate::positions::PositionIndexer;
use crate::selector::CandidateSelector;

/// Scores candidates with a decoder-only model.
///
/// Prompt and candidate are concatenated into one sequence and run once. The
/// logit at position `t` predicts token `t + 1`, so the candidate span
/// `[prompt_len, total_len)` is predicted by logits `[prompt_len - 1, total_len - 1)`.
pub struct DecoderScorer<M> {
    model: M,
    selector: CandidateSelector,
    /// Dtype of the prefix-LM bias handed to the model.
    bias_dtype: DType,
}

impl<M: CausalLm> DecoderScorer<M> {
    pub fn new(model: M, selector: CandidateSelector) -> Self {
        Self {
            model,
            selector,
            bias_dtype: DType::F32,
        }
    }

    /// Set the dtype of the prefix-LM attention bias (the model's activation dtype).
    pub fn with_bias_dtype(mut self, dtype: DType) -> Self {
        self.bias_dtype = dtype;
        self
    }

    #[instrument(name = "score_decoder", skip_all, fields(prefix_lm = options.use_prefix_bias))]
    pub fn score(&self, batch: &ChoiceBatch, grouping: &Grouping, options: ScoreOptions) -> Result<ScoreOutput> {
        let (rows, prompt_len, candidate_len) = batch.validate()?;
        grouping.group_sizes(rows)?;
        let total_len = prompt_len + candidate_len;

        // The logit at prompt_len - 1 predicts the first candidate token, so
        // that slot has to hold a real prompt token.
        let last_prompt: Vec<u32> = batch
            .prompt_mask
            .narrow(1, prompt_len - 1, 1)?
            .to_dtype(DType::F32)?
            .ne(0f32)?
            .to_dtype(DType::U32)?
            .flatten_all()?
            .to_vec1()?;
        if let Some(row) = last_prompt.iter().position(|&real| real == 0) {
            shape_bail!("prompt of row {row} ends in padding; decoder prompts must be left-padded");
        }

        let device = self.model.device();
        let input_ids = Tensor::cat(
            &[
                &batch.prompt_ids.to_dtype(DType::U32)?,
                &batch.candidate_ids.to_dtype(DType::U32)?,
            ],
            D::Minus1,
        )?
        .to_device(device)?;
        let full_mask = Tensor::cat(
            &[
                &batch.prompt_mask.to_dtype(DType::U32)?,
                &batch.candidate_mask.to_dtype(DType::U32)?,
            ],
            D::Minus1,
        )?
        .to_device(device)?;
        let position_ids = PositionIndexer.positions(&full_mask)?;

        let pattern = AttentionPattern::from_prefix_flag(options.use_prefix_bias);
        debug!(rows, prompt_len, candidate_len, ?pattern, "decoder forward");

        let logits = match pattern {
            AttentionPattern::Causal => {
                self.model
                    .forward(&input_ids, AttentionInput::Padding(&full_mask), &position_ids)?
            }
            AttentionPattern::PrefixCausal => {
                let bias =
                    AttentionMaskBuilder.prefix_causal(&full_mask, prompt_len, candidate_len, self.bias_dtype)?;
                self.model
                    .forward(&input_ids, AttentionInput::Bias(&bias), &position_ids)?
            }
        };

        let (logit_rows, logit_len, _vocab) = logits.dims3()?;
        if logit_rows != rows || logit_len != total_len {
            shape_bail!(
                "model returned logits {:?}, expected [{rows}, {total_len}, vocab]",
                logits.dims()
            );
        }

        // Position prompt_len - 1 predicts the first candidate token,
        // total_len - 2 predicts the last one.
        let candidate_logits = logits.narrow(1, prompt_len - 1, candidate_len)?;
        debug!(start = prompt_len - 1, end = total_len - 1, "sliced candidate logits");

        self.selector.select(
            &candidate_logits,
            &batch.candidate_ids.to_device(device)?,
            &batch.candidate_mask.to_device(device)?,
            grouping,
        )
    }
}

impl<M: CausalLm> MultipleChoiceScorer for DecoderScorer<M> {
    fn score(&self, batch: &ChoiceBatch, grouping: &Grouping, options: ScoreOptions) -> Result<ScoreOutput> {
        DecoderScorer::score(self, batch, grouping, options)
    }

    fn topology(&self) -> Topology {
        Topology::Decoder
    }
}
