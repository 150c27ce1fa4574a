//! Multiple-choice scoring on top of candle language models.
//!
//! Given a prompt and a handful of candidate continuations, the scorers in this
//! crate compute the log-likelihood of every candidate under a pretrained model
//! and pick the best one per example. Two model topologies are supported:
//!
//! - encoder-decoder: the prompt feeds the encoder, candidates are the labels;
//! - decoder-only: prompt and candidate are concatenated and run causally,
//!   optionally with a prefix-LM attention bias over the prompt.
//!
//! ```text
//! ChoiceBatch ──► Scorer::{EncoderDecoder, Decoder}
//!                   ├─ PositionIndexer / AttentionMaskBuilder (decoder only)
//!                   ├─ model.forward(..) -> logits
//!                   └─ CandidateSelector -> ScoreOutput { predictions, scores }
//! ```

pub mod attention;
pub mod batch;
pub mod config;
mod error;
pub mod models;
pub mod positions;
pub mod scorer;
pub mod selector;

pub use attention::{AttentionMaskBuilder, AttentionPattern, MASK_FILL};
pub use batch::{ChoiceBatch, Grouping, ScoreOptions, ScoreOutput};
pub use config::{LengthNormalization, ScoreDType, ScorerConfig, Topology};
pub use error::{Result, ScoreError};
pub use models::{AttentionInput, CausalLm, Model, Seq2SeqLm};
pub use positions::PositionIndexer;
pub use scorer::{DecoderScorer, EncoderDecoderScorer, MultipleChoiceScorer, Scorer};
pub use selector::CandidateSelector;
