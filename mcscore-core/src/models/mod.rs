//! Model capabilities the scorers consume.
//!
//! Loading weights, picking devices and dtypes, applying adapters and
//! tokenizing all happen elsewhere. A scorer only needs a model that turns
//! token ids into per-position vocabulary logits.

use std::sync::Arc;

use candle_core::{Device, Result, Tensor};

/// Base trait for all models: weights live on a device.
pub trait Model: Send + Sync {
    /// The device where model weights reside. Scorers move their inputs here
    /// before calling `forward`.
    fn device(&self) -> &Device;
}

/// How a decoder-only model should restrict attention for one forward call.
#[derive(Clone, Copy, Debug)]
pub enum AttentionInput<'a> {
    /// Binary `[rows, seq_len]` padding mask. The model applies its own
    /// causal masking on top.
    Padding(&'a Tensor),
    /// Additive `[rows, 1, seq_len, seq_len]` bias, used verbatim in place of
    /// the model's own causal mask.
    Bias(&'a Tensor),
}

/// Decoder-only (causal) language model.
pub trait CausalLm: Model {
    /// Run the full sequence.
    ///
    /// - `input_ids`: `[rows, seq_len]` (`U32`)
    /// - `position_ids`: `[rows, seq_len]` (`U32`)
    ///
    /// Returns logits `[rows, seq_len, vocab]` where position `t` predicts
    /// token `t + 1`.
    fn forward(&self, input_ids: &Tensor, attention: AttentionInput<'_>, position_ids: &Tensor) -> Result<Tensor>;
}

/// Encoder-decoder (sequence-to-sequence) language model.
pub trait Seq2SeqLm: Model {
    /// Encode `input_ids` under `attention_mask` and decode against `labels`.
    ///
    /// The model is responsible for shifting labels right to form the decoder
    /// input. Returns logits `[rows, label_len, vocab]` where position `t`
    /// predicts `labels[:, t]`.
    fn forward(&self, input_ids: &Tensor, attention_mask: &Tensor, labels: &Tensor) -> Result<Tensor>;
}

impl<T: Model + ?Sized> Model for Arc<T> {
    fn device(&self) -> &Device {
        (**self).device()
    }
}

impl<T: Model + ?Sized> Model for Box<T> {
    fn device(&self) -> &Device {
        (**self).device()
    }
}

impl<T: CausalLm + ?Sized> CausalLm for Arc<T> {
    fn forward(&self, input_ids: &Tensor, attention: AttentionInput<'_>, position_ids: &Tensor) -> Result<Tensor> {
        (**self).forward(input_ids, attention, position_ids)
    }
}

impl<T: CausalLm + ?Sized> CausalLm for Box<T> {
    fn forward(&self, input_ids: &Tensor, attention: AttentionInput<'_>, position_ids: &Tensor) -> Result<Tensor> {
        (**self).forward(input_ids, attention, position_ids)
    }
}

impl<T: Seq2SeqLm + ?Sized> Seq2SeqLm for Arc<T> {
    fn forward(&self, input_ids: &Tensor, attention_mask: &Tensor, labels: &Tensor) -> Result<Tensor> {
        (**self).forward(input_ids, attention_mask, labels)
    }
}

impl<T: Seq2SeqLm + ?Sized> Seq2SeqLm for Box<T> {
    fn forward(&self, input_ids: &Tensor, attention_mask: &Tensor, labels: &Tensor) -> Result<Tensor> {
        (**self).forward(input_ids, attention_mask, labels)
    }
}
