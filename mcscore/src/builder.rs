use std::sync::Arc;

use anyhow::Context;
use mcscore_core::{
    CausalLm, LengthNormalization, ScoreDType, ScoreOptions, Scorer, ScorerConfig, Seq2SeqLm, Topology,
};
use tracing::info;

use crate::MultipleChoiceModel;

/// A loaded model of either topology.
pub enum AnyModel {
    Causal(Arc<dyn CausalLm>),
    Seq2Seq(Arc<dyn Seq2SeqLm>),
}

impl AnyModel {
    pub fn topology(&self) -> Topology {
        match self {
            Self::Causal(_) => Topology::Decoder,
            Self::Seq2Seq(_) => Topology::EncoderDecoder,
        }
    }
}

/// Configure and build a [`MultipleChoiceModel`].
///
/// The scorer variant is fixed here, once, from the configured topology.
pub struct ScorerBuilder {
    config: ScorerConfig,
}

impl ScorerBuilder {
    pub fn new(topology: Topology) -> Self {
        Self {
            config: ScorerConfig::new(topology),
        }
    }

    pub fn from_config(config: ScorerConfig) -> Self {
        Self { config }
    }

    /// Start from a model's HuggingFace style `config.json`, detecting the topology.
    pub fn from_model_config(model_config: &str) -> anyhow::Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(model_config).context("Model config is not valid JSON")?;
        Self::from_model_config_value(&value)
    }

    pub fn from_model_config_value(model_config: &serde_json::Value) -> anyhow::Result<Self> {
        let topology = Topology::detect(model_config).context("Failed to detect model topology")?;
        Ok(Self::new(topology))
    }

    /// Give prompt tokens bidirectional attention (decoder-only models).
    pub fn with_prefix_lm(mut self, prefix_lm: bool) -> Self {
        self.config.prefix_lm = prefix_lm;
        self
    }

    pub fn with_normalization(mut self, normalization: LengthNormalization) -> Self {
        self.config.normalization = normalization;
        self
    }

    /// Dtype for log-softmax and summation.
    pub fn with_score_dtype(mut self, dtype: ScoreDType) -> Self {
        self.config.score_dtype = dtype;
        self
    }

    /// Dtype of the prefix-LM bias; match the model's activation dtype.
    pub fn with_bias_dtype(mut self, dtype: ScoreDType) -> Self {
        self.config.bias_dtype = dtype;
        self
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    pub fn build(self, model: AnyModel) -> anyhow::Result<MultipleChoiceModel> {
        if model.topology() != self.config.topology {
            anyhow::bail!(
                "Configured topology {:?} does not match the supplied {:?} model.",
                self.config.topology,
                model.topology()
            );
        }

        let scorer = match model {
            AnyModel::Causal(m) => Scorer::from_causal(m, &self.config),
            AnyModel::Seq2Seq(m) => Scorer::from_seq2seq(m, &self.config),
        }
        .context("Failed to build scorer")?;

        info!(
            scorer = scorer.name(),
            prefix_lm = self.config.prefix_lm,
            normalization = ?self.config.normalization,
            score_dtype = ?self.config.score_dtype,
            "Scorer ready"
        );

        let options = ScoreOptions {
            use_prefix_bias: self.config.prefix_lm,
        };
        Ok(MultipleChoiceModel::new(scorer, options))
    }
}
