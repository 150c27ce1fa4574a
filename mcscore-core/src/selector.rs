//! From candidate-aligned logits to one prediction per example.

use candle_core::{DType, Tensor, D};
use tracing::trace;

use crate::batch::{Grouping, ScoreOutput};
use crate::config::{LengthNormalization, ScoreDType};
use crate::error::{shape_bail, Result};

/// Aggregates per-token log-probabilities into candidate scores and picks the
/// best candidate of every example.
#[derive(Clone, Copy, Debug)]
pub struct CandidateSelector {
    normalization: LengthNormalization,
    dtype: DType,
}

impl Default for CandidateSelector {
    fn default() -> Self {
        Self::new(LengthNormalization::Sum, ScoreDType::F32)
    }
}

impl CandidateSelector {
    pub fn new(normalization: LengthNormalization, dtype: ScoreDType) -> Self {
        Self {
            normalization,
            dtype: dtype.into(),
        }
    }

    /// Log-likelihood of every row's candidate.
    ///
    /// - `logits`: `[rows, candidate_len, vocab]`, position `t` predicting
    ///   `candidate_ids[:, t]`
    /// - `candidate_ids`, `candidate_mask`: `[rows, candidate_len]`
    ///
    /// Returns `[rows]` in the selector's score dtype. Padding positions
    /// contribute exactly zero whatever the model put there.
    pub fn candidate_scores(&self, logits: &Tensor, candidate_ids: &Tensor, candidate_mask: &Tensor) -> Result<Tensor> {
        let (rows, candidate_len, _vocab) = logits.dims3()?;
        if candidate_ids.dims() != [rows, candidate_len] || candidate_mask.dims() != [rows, candidate_len] {
            shape_bail!(
                "logits {:?} do not line up with candidate_ids {:?} / candidate_mask {:?}",
                logits.dims(),
                candidate_ids.dims(),
                candidate_mask.dims()
            );
        }

        let log_probs = candle_nn::ops::log_softmax(&logits.to_dtype(self.dtype)?, D::Minus1)?;
        let index = candidate_ids.to_dtype(DType::U32)?.unsqueeze(D::Minus1)?.contiguous()?;
        let token_log_probs = log_probs.gather(&index, D::Minus1)?.squeeze(D::Minus1)?;

        // where_cond rather than a multiply: 0 * -inf would be NaN.
        let keep = candidate_mask.to_dtype(DType::F32)?.ne(0f32)?;
        let token_log_probs = keep.where_cond(&token_log_probs, &token_log_probs.zeros_like()?)?;
        let summed = token_log_probs.sum(D::Minus1)?;

        match self.normalization {
            LengthNormalization::Sum => Ok(summed),
            LengthNormalization::Mean => {
                let lengths = keep.to_dtype(self.dtype)?.sum(D::Minus1)?.maximum(1f64)?;
                Ok(summed.div(&lengths)?)
            }
        }
    }

    /// Score every candidate and pick the argmax within each example's group.
    ///
    /// The grouping is checked before any numeric work. Ties go to the lowest
    /// index.
    pub fn select(
        &self,
        logits: &Tensor,
        candidate_ids: &Tensor,
        candidate_mask: &Tensor,
        grouping: &Grouping,
    ) -> Result<ScoreOutput> {
        let group_sizes = grouping.group_sizes(logits.dim(0)?)?;
        let scores = self.candidate_scores(logits, candidate_ids, candidate_mask)?;
        let flat: Vec<f64> = scores.to_dtype(DType::F64)?.to_vec1()?;
        Ok(group_and_argmax(&flat, &group_sizes))
    }
}

/// Split flat row scores by `group_sizes` and take the first-occurrence argmax
/// of every group.
pub(crate) fn group_and_argmax(flat: &[f64], group_sizes: &[usize]) -> ScoreOutput {
    let mut predictions = Vec::with_capacity(group_sizes.len());
    let mut scores = Vec::with_capacity(group_sizes.len());
    let mut start = 0;
    for (example, &size) in group_sizes.iter().enumerate() {
        let group = &flat[start..start + size];
        let best = argmax_first(group);
        trace!(example, best, scores = ?group, "candidate scores");
        predictions.push(best);
        scores.push(group.to_vec());
        start += size;
    }
    ScoreOutput { predictions, scores }
}

/// Index of the largest value, lowest index on ties. NaN never beats a number.
fn argmax_first(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        let current = values[best];
        if v > current || (current.is_nan() && !v.is_nan()) {
            best = i;
        }
    }
    best
}
