//! Multiple-choice scoring with pretrained language models.
//!
//! This crate wraps [`mcscore_core`] with a builder that picks the scorer for a
//! model topology once, a [`MultipleChoiceModel`] handle, and an accuracy
//! evaluator.
//!
//! ```ignore
//! use mcscore::{AnyModel, ChoiceBatch, Device, Grouping, LengthNormalization, ScorerBuilder};
//!
//! let lm: Arc<dyn CausalLm> = load_my_model(&Device::Cpu)?;
//! let model = ScorerBuilder::from_model_config(&std::fs::read_to_string("config.json")?)?
//!     .with_prefix_lm(true)
//!     .with_normalization(LengthNormalization::Sum)
//!     .build(AnyModel::Causal(lm))?;
//!
//! // Two examples, two candidates each. Prompts are left-padded for you.
//! let batch = ChoiceBatch::from_rows(&prompts, &candidates, pad_id, &Device::Cpu)?;
//! let out = model.score(&batch, &Grouping::uniform(2))?;
//! println!("{:?}", out.predictions);
//! ```

mod builder;
mod eval;
mod model;

pub use builder::{AnyModel, ScorerBuilder};
pub use eval::{evaluate, Accuracy, LabelledBatch};
pub use model::MultipleChoiceModel;

pub use candle_core::{DType, Device, Tensor};

pub use mcscore_core::{
    AttentionInput, CausalLm, ChoiceBatch, Grouping, LengthNormalization, Model, ScoreDType, ScoreError,
    ScoreOptions, ScoreOutput, ScorerConfig, Seq2SeqLm, Topology,
};
