//! Additive attention biases built from padding masks.
//!
//! Biases are `[rows, 1, tgt_len, src_len]` tensors holding `0.0` where a query
//! may attend to a key and [`MASK_FILL`] where it may not. They are added to the
//! attention scores before softmax, so two restrictions on the same slot simply
//! accumulate.

use candle_core::{DType, Device, Tensor};

use crate::error::{shape_bail, Result};

/// Value written into masked slots. True negative infinity under softmax.
pub const MASK_FILL: f32 = f32::NEG_INFINITY;

/// Attention pattern used when running a decoder-only model over
/// `prompt ++ candidate`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AttentionPattern {
    /// Plain causal attention over the whole sequence. The model applies its
    /// own causal masking and only receives the binary padding mask.
    #[default]
    Causal,

    /// Prefix-LM: prompt tokens attend bidirectionally among themselves,
    /// candidate tokens attend to the prompt and causally to earlier
    /// candidate tokens. Passed to the model as an explicit additive bias.
    PrefixCausal,
}

impl AttentionPattern {
    pub fn from_prefix_flag(use_prefix_bias: bool) -> Self {
        if use_prefix_bias {
            Self::PrefixCausal
        } else {
            Self::Causal
        }
    }
}

/// Builds additive attention biases from binary padding masks.
///
/// # Example
/// ```ignore
/// let full_mask = Tensor::cat(&[&prompt_mask, &candidate_mask], 1)?;
/// let bias = AttentionMaskBuilder.prefix_causal(&full_mask, prompt_len, candidate_len, DType::F32)?;
/// // bias: [rows, 1, total_len, total_len]
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct AttentionMaskBuilder;

impl AttentionMaskBuilder {
    /// Expand a `[rows, src_len]` padding mask to a `[rows, 1, tgt_len, src_len]` bias.
    ///
    /// Every target row receives the same pattern: `0.0` on real source
    /// columns, [`MASK_FILL`] on padding columns. `tgt_len` defaults to
    /// `src_len`. Any non-zero mask entry counts as a real token.
    pub fn expand(&self, padding_mask: &Tensor, tgt_len: Option<usize>, dtype: DType) -> Result<Tensor> {
        let (rows, src_len) = padding_mask.dims2()?;
        let tgt_len = tgt_len.unwrap_or(src_len);

        let keep = padding_mask.to_dtype(DType::F32)?.ne(0f32)?;
        let bias = bias_from_keep(&keep, dtype, padding_mask.device())?;

        Ok(bias
            .reshape((rows, 1, 1, src_len))?
            .broadcast_as((rows, 1, tgt_len, src_len))?
            .contiguous()?)
    }

    /// Padding bias for `prompt ++ candidate`, merged with a causal
    /// restriction over the candidate span.
    ///
    /// `padding_mask` is the concatenated `[rows, prompt_len + candidate_len]`
    /// mask. In the result:
    /// - prompt rows see every real prompt column and no candidate column;
    /// - candidate row `i` sees every real prompt column and the real
    ///   candidate columns `j <= i`.
    ///
    /// The causal part is added on top of the padding part, so a column that
    /// is both padding and causally hidden stays masked.
    pub fn prefix_causal(
        &self,
        padding_mask: &Tensor,
        prompt_len: usize,
        candidate_len: usize,
        dtype: DType,
    ) -> Result<Tensor> {
        let (_, total_len) = padding_mask.dims2()?;
        if prompt_len == 0 || candidate_len == 0 {
            shape_bail!(
                "prefix-causal bias needs a non-empty prompt and candidate, got prompt_len={prompt_len}, candidate_len={candidate_len}"
            );
        }
        if prompt_len + candidate_len != total_len {
            shape_bail!(
                "padding mask has {total_len} columns but prompt_len + candidate_len = {}",
                prompt_len + candidate_len
            );
        }
        let device = padding_mask.device();

        let padding = self.expand(padding_mask, Some(total_len), dtype)?;

        // [candidate_len, candidate_len], lower triangle visible.
        let tril = Tensor::tril2(candidate_len, DType::F32, device)?.ne(0f32)?;
        let candidate_causal = bias_from_keep(&tril, dtype, device)?;

        // Prompt rows never look ahead into the candidate.
        let prompt_rows = Tensor::full(MASK_FILL, (prompt_len, candidate_len), device)?.to_dtype(dtype)?;
        let candidate_cols = Tensor::cat(&[&prompt_rows, &candidate_causal], 0)?;

        let prompt_cols = Tensor::zeros((total_len, prompt_len), dtype, device)?;
        let structure = Tensor::cat(&[&prompt_cols, &candidate_cols], 1)?
            .reshape((1, 1, total_len, total_len))?;

        Ok(padding.broadcast_add(&structure)?)
    }
}

/// Map a `u8` keep-mask to `0.0` (keep) / [`MASK_FILL`] (drop) in `dtype`.
fn bias_from_keep(keep: &Tensor, dtype: DType, device: &Device) -> Result<Tensor> {
    let zeros = Tensor::zeros(keep.shape(), dtype, device)?;
    let fill = Tensor::full(MASK_FILL, keep.shape(), device)?.to_dtype(dtype)?;
    Ok(keep.where_cond(&zeros, &fill)?)
}
