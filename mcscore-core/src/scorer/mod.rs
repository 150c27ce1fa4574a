//! Topology-specific scorers behind one `score` contract.
//!
//! ```text
//! Scorer::from_*(model, &config)        // topology chosen once
//!   → Scorer::EncoderDecoder(EncoderDecoderScorer<..>)
//!   → Scorer::Decoder(DecoderScorer<..>)
//! scorer.score(&batch, &grouping, options)   // statically dispatched per variant
//! ```

mod decoder;
mod encoder_decoder;

use std::sync::Arc;

pub use decoder::DecoderScorer;
pub use encoder_decoder::EncoderDecoderScorer;

use crate::batch::{ChoiceBatch, Grouping, ScoreOptions, ScoreOutput};
use crate::config::{ScorerConfig, Topology};
use crate::error::{Result, ScoreError};
use crate::models::{CausalLm, Seq2SeqLm};
use crate::selector::CandidateSelector;

/// Scores multiple-choice batches with some model topology.
///
/// Calls are stateless: the same batch on the same model weights yields the
/// same output.
pub trait MultipleChoiceScorer: Send + Sync {
    fn score(&self, batch: &ChoiceBatch, grouping: &Grouping, options: ScoreOptions) -> Result<ScoreOutput>;

    fn topology(&self) -> Topology;
}

/// Scorer selected once from configuration.
pub enum Scorer {
    EncoderDecoder(EncoderDecoderScorer<Arc<dyn Seq2SeqLm>>),
    Decoder(DecoderScorer<Arc<dyn CausalLm>>),
}

/// Dispatch a method call to the inner scorer.
///
/// Usage: `dispatch!(self, s => s.method(args))`
macro_rules! dispatch {
    ($self:expr, $s:ident => $body:expr) => {
        match $self {
            Scorer::EncoderDecoder($s) => $body,
            Scorer::Decoder($s) => $body,
        }
    };
}

impl Scorer {
    /// Wrap an encoder-decoder model. Fails if `config` asks for another topology.
    pub fn from_seq2seq(model: Arc<dyn Seq2SeqLm>, config: &ScorerConfig) -> Result<Self> {
        config.validate()?;
        expect_topology(config, Topology::EncoderDecoder)?;
        Ok(Self::EncoderDecoder(EncoderDecoderScorer::new(model, selector_for(config))))
    }

    /// Wrap a decoder-only model. Fails if `config` asks for another topology.
    pub fn from_causal(model: Arc<dyn CausalLm>, config: &ScorerConfig) -> Result<Self> {
        config.validate()?;
        expect_topology(config, Topology::Decoder)?;
        Ok(Self::Decoder(
            DecoderScorer::new(model, selector_for(config)).with_bias_dtype(config.bias_dtype.into()),
        ))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::EncoderDecoder(_) => "encoder-decoder",
            Self::Decoder(_) => "decoder",
        }
    }
}

impl MultipleChoiceScorer for Scorer {
    fn score(&self, batch: &ChoiceBatch, grouping: &Grouping, options: ScoreOptions) -> Result<ScoreOutput> {
        dispatch!(self, s => MultipleChoiceScorer::score(s, batch, grouping, options))
    }

    fn topology(&self) -> Topology {
        dispatch!(self, s => MultipleChoiceScorer::topology(s))
    }
}

fn selector_for(config: &ScorerConfig) -> CandidateSelector {
    CandidateSelector::new(config.normalization, config.score_dtype)
}

fn expect_topology(config: &ScorerConfig, wanted: Topology) -> Result<()> {
    if config.topology != wanted {
        return Err(ScoreError::Config(format!(
            "config topology is {:?} but a {:?} model was supplied",
            config.topology, wanted
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scorer_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Scorer>();
    }
}
