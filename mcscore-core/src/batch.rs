//! Batch layout, candidate grouping and scoring outputs.

use candle_core::{Device, Tensor};

use crate::error::{shape_bail, Result};

/// One batch of (example, candidate) rows, flattened across answer choices.
///
/// Rows are grouped consecutively: the candidates of example 0 come first,
/// then those of example 1, and so on. See [`Grouping`].
#[derive(Clone, Debug)]
pub struct ChoiceBatch {
    /// `[rows, prompt_len]` token ids.
    pub prompt_ids: Tensor,
    /// `[rows, prompt_len]`, non-zero = real token. Decoder scoring needs
    /// left-padded prompts: the last column must be real in every row.
    pub prompt_mask: Tensor,
    /// `[rows, candidate_len]` token ids of the answer choices.
    pub candidate_ids: Tensor,
    /// `[rows, candidate_len]`, non-zero = real token.
    pub candidate_mask: Tensor,
}

impl ChoiceBatch {
    pub fn new(prompt_ids: Tensor, prompt_mask: Tensor, candidate_ids: Tensor, candidate_mask: Tensor) -> Self {
        Self {
            prompt_ids,
            prompt_mask,
            candidate_ids,
            candidate_mask,
        }
    }

    /// Build a batch from host-side rows.
    ///
    /// Prompts are padded on the left and candidates on the right, so the last
    /// prompt column is always a real token and a decoder sees every prompt
    /// directly followed by its candidate. Masks are derived from the original
    /// lengths. Empty rows are rejected.
    pub fn from_rows(prompts: &[Vec<u32>], candidates: &[Vec<u32>], pad_id: u32, device: &Device) -> Result<Self> {
        if prompts.len() != candidates.len() {
            shape_bail!(
                "got {} prompt rows but {} candidate rows",
                prompts.len(),
                candidates.len()
            );
        }
        let (prompt_ids, prompt_mask) = pad_rows("prompt", prompts, pad_id, PadSide::Left, device)?;
        let (candidate_ids, candidate_mask) = pad_rows("candidate", candidates, pad_id, PadSide::Right, device)?;
        Ok(Self::new(prompt_ids, prompt_mask, candidate_ids, candidate_mask))
    }

    /// Check ranks and shapes before anything touches the model.
    ///
    /// Returns `(rows, prompt_len, candidate_len)`.
    pub fn validate(&self) -> Result<(usize, usize, usize)> {
        let prompt = rank2("prompt_ids", &self.prompt_ids)?;
        let candidate = rank2("candidate_ids", &self.candidate_ids)?;

        if rank2("prompt_mask", &self.prompt_mask)? != prompt {
            shape_bail!(
                "prompt_mask shape {:?} does not match prompt_ids shape {:?}",
                self.prompt_mask.dims(),
                self.prompt_ids.dims()
            );
        }
        if rank2("candidate_mask", &self.candidate_mask)? != candidate {
            shape_bail!(
                "candidate_mask shape {:?} does not match candidate_ids shape {:?}",
                self.candidate_mask.dims(),
                self.candidate_ids.dims()
            );
        }
        if prompt.0 != candidate.0 {
            shape_bail!(
                "prompt has {} rows but candidate has {} rows",
                prompt.0,
                candidate.0
            );
        }
        if prompt.1 == 0 || candidate.1 == 0 {
            shape_bail!(
                "prompt and candidate must be non-empty, got prompt_len={}, candidate_len={}",
                prompt.1,
                candidate.1
            );
        }
        Ok((prompt.0, prompt.1, candidate.1))
    }
}

fn rank2(name: &str, t: &Tensor) -> Result<(usize, usize)> {
    match t.dims() {
        &[a, b] => Ok((a, b)),
        dims => shape_bail!("{name} must be rank 2, got shape {dims:?}"),
    }
}

#[derive(Clone, Copy)]
enum PadSide {
    Left,
    Right,
}

fn pad_rows(name: &str, rows: &[Vec<u32>], pad_id: u32, side: PadSide, device: &Device) -> Result<(Tensor, Tensor)> {
    if let Some(idx) = rows.iter().position(Vec::is_empty) {
        shape_bail!("{name} row {idx} is empty");
    }
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut ids = Vec::with_capacity(rows.len() * width);
    let mut mask = Vec::with_capacity(rows.len() * width);
    for row in rows {
        let pad = width - row.len();
        if let PadSide::Left = side {
            ids.extend(std::iter::repeat_n(pad_id, pad));
            mask.extend(std::iter::repeat_n(0u32, pad));
        }
        ids.extend_from_slice(row);
        mask.extend(std::iter::repeat_n(1u32, row.len()));
        if let PadSide::Right = side {
            ids.extend(std::iter::repeat_n(pad_id, pad));
            mask.extend(std::iter::repeat_n(0u32, pad));
        }
    }
    let shape = (rows.len(), width);
    Ok((
        Tensor::from_vec(ids, shape, device)?,
        Tensor::from_vec(mask, shape, device)?,
    ))
}

/// How flattened rows map back to examples.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Grouping {
    /// `num_examples` examples with the same number of candidates each.
    /// The row count must be an exact, non-zero multiple of `num_examples`.
    Uniform { num_examples: usize },
    /// Explicit candidate count per example, in row order.
    Ragged(Vec<usize>),
}

impl Grouping {
    pub fn uniform(num_examples: usize) -> Self {
        Self::Uniform { num_examples }
    }

    /// Resolve to one candidate count per example, checking it against `rows`.
    pub fn group_sizes(&self, rows: usize) -> Result<Vec<usize>> {
        match self {
            Self::Uniform { num_examples } => {
                if *num_examples == 0 {
                    shape_bail!("num_examples must be at least 1");
                }
                if rows == 0 || rows % num_examples != 0 {
                    shape_bail!(
                        "{rows} rows cannot be split evenly into {num_examples} examples"
                    );
                }
                Ok(vec![rows / num_examples; *num_examples])
            }
            Self::Ragged(sizes) => {
                if sizes.is_empty() {
                    shape_bail!("ragged grouping has no examples");
                }
                if let Some(idx) = sizes.iter().position(|&n| n == 0) {
                    shape_bail!("example {idx} has no candidates");
                }
                let total: usize = sizes.iter().sum();
                if total != rows {
                    shape_bail!("ragged grouping covers {total} rows, batch has {rows}");
                }
                Ok(sizes.clone())
            }
        }
    }

    pub fn num_examples(&self) -> usize {
        match self {
            Self::Uniform { num_examples } => *num_examples,
            Self::Ragged(sizes) => sizes.len(),
        }
    }
}

/// Per-call scoring options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScoreOptions {
    /// Decoder-only models: give the prompt bidirectional attention via an
    /// explicit prefix-LM bias. Ignored by encoder-decoder models.
    pub use_prefix_bias: bool,
}

/// Result of one scoring call.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoreOutput {
    /// Index of the best candidate within each example's group.
    pub predictions: Vec<usize>,
    /// Per-example candidate scores, in row order.
    pub scores: Vec<Vec<f64>>,
}
