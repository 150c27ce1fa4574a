//! Scorer configuration.
//!
//! Everything a scorer needs is passed in here at construction time: there are
//! no process-wide cache directories, tokens or paths.

use candle_core::DType;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScoreError};

fn false_default() -> bool {
    false
}

/// Model topology. Decides which scorer runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    /// Sequence-to-sequence: prompt into the encoder, candidate as labels.
    EncoderDecoder,
    /// Decoder-only: prompt and candidate concatenated into one sequence.
    Decoder,
}

impl Topology {
    /// Detect the topology from a HuggingFace style `config.json`.
    ///
    /// `is_encoder_decoder: true` wins outright; otherwise the `architectures`
    /// list is matched by suffix.
    pub fn detect(model_config: &serde_json::Value) -> Result<Self> {
        if model_config
            .get("is_encoder_decoder")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
        {
            return Ok(Self::EncoderDecoder);
        }

        let architectures: Vec<&str> = model_config
            .get("architectures")
            .and_then(serde_json::Value::as_array)
            .map(|a| a.iter().filter_map(serde_json::Value::as_str).collect())
            .unwrap_or_default();

        for arch in &architectures {
            if arch.ends_with("ForConditionalGeneration") || arch.ends_with("ForSeq2SeqLM") {
                return Ok(Self::EncoderDecoder);
            }
            if arch.ends_with("ForCausalLM") || arch.ends_with("LMHeadModel") {
                return Ok(Self::Decoder);
            }
        }

        let model_type = model_config
            .get("model_type")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("<unknown>");
        Err(ScoreError::UnsupportedArchitecture(format!(
            "model_type `{model_type}` with architectures {architectures:?}"
        )))
    }

    pub fn detect_from_str(model_config: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(model_config).map_err(|e| ScoreError::Config(e.to_string()))?;
        Self::detect(&value)
    }
}

/// How per-token log-probabilities become one candidate score.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthNormalization {
    /// Raw summed log-likelihood. Longer candidates accumulate more negative
    /// terms and are not compensated for it.
    #[default]
    Sum,
    /// Summed log-likelihood divided by the number of real candidate tokens.
    Mean,
}

/// Float dtypes usable for score accumulation and attention biases.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreDType {
    F16,
    Bf16,
    #[default]
    F32,
    F64,
}

impl From<ScoreDType> for DType {
    fn from(value: ScoreDType) -> Self {
        match value {
            ScoreDType::F16 => DType::F16,
            ScoreDType::Bf16 => DType::BF16,
            ScoreDType::F32 => DType::F32,
            ScoreDType::F64 => DType::F64,
        }
    }
}

/// Configuration for building a [`crate::Scorer`].
///
/// ```json
/// { "topology": "decoder", "prefix_lm": true, "normalization": "sum", "score_dtype": "f64" }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScorerConfig {
    pub topology: Topology,

    /// Default for [`crate::ScoreOptions::use_prefix_bias`].
    #[serde(default = "false_default")]
    pub prefix_lm: bool,

    #[serde(default)]
    pub normalization: LengthNormalization,

    /// Dtype for log-softmax and summation. Never narrower than `f32`.
    #[serde(default)]
    pub score_dtype: ScoreDType,

    /// Dtype of the prefix-LM attention bias; should match the model's
    /// activation dtype.
    #[serde(default)]
    pub bias_dtype: ScoreDType,
}

impl ScorerConfig {
    pub fn new(topology: Topology) -> Self {
        Self {
            topology,
            prefix_lm: false,
            normalization: LengthNormalization::default(),
            score_dtype: ScoreDType::default(),
            bias_dtype: ScoreDType::default(),
        }
    }

    pub fn with_prefix_lm(mut self, prefix_lm: bool) -> Self {
        self.prefix_lm = prefix_lm;
        self
    }

    pub fn with_normalization(mut self, normalization: LengthNormalization) -> Self {
        self.normalization = normalization;
        self
    }

    pub fn with_score_dtype(mut self, dtype: ScoreDType) -> Self {
        self.score_dtype = dtype;
        self
    }

    pub fn with_bias_dtype(mut self, dtype: ScoreDType) -> Self {
        self.bias_dtype = dtype;
        self
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s).map_err(|e| ScoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would silently lose precision.
    pub fn validate(&self) -> Result<()> {
        if matches!(self.score_dtype, ScoreDType::F16 | ScoreDType::Bf16) {
            return Err(ScoreError::Config(format!(
                "score_dtype {:?} is too narrow for summing log-probabilities; use f32 or f64",
                self.score_dtype
            )));
        }
        if self.prefix_lm && self.topology == Topology::EncoderDecoder {
            return Err(ScoreError::Config(
                "prefix_lm only applies to decoder-only models".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detect_encoder_decoder_flag() {
        let cfg = json!({ "model_type": "t5", "is_encoder_decoder": true });
        assert_eq!(Topology::detect(&cfg).unwrap(), Topology::EncoderDecoder);
    }

    #[test]
    fn test_detect_by_architecture() {
        let cfg = json!({ "architectures": ["BloomForCausalLM"] });
        assert_eq!(Topology::detect(&cfg).unwrap(), Topology::Decoder);
        let cfg = json!({ "architectures": ["GPT2LMHeadModel"] });
        assert_eq!(Topology::detect(&cfg).unwrap(), Topology::Decoder);
        let cfg = json!({ "architectures": ["MT5ForConditionalGeneration"] });
        assert_eq!(Topology::detect(&cfg).unwrap(), Topology::EncoderDecoder);
    }

    #[test]
    fn test_detect_unsupported() {
        let cfg = json!({ "model_type": "bert", "architectures": ["BertForMaskedLM"] });
        assert!(matches!(
            Topology::detect(&cfg),
            Err(ScoreError::UnsupportedArchitecture(_))
        ));
        assert!(Topology::detect_from_str("not json").is_err());
    }

    #[test]
    fn test_config_defaults() {
        let cfg = ScorerConfig::from_json_str(r#"{ "topology": "decoder" }"#).unwrap();
        assert_eq!(cfg, ScorerConfig::new(Topology::Decoder));
        assert!(!cfg.prefix_lm);
        assert_eq!(cfg.normalization, LengthNormalization::Sum);
        assert_eq!(DType::from(cfg.score_dtype), DType::F32);
    }

    #[test]
    fn test_config_full() {
        let cfg = ScorerConfig::from_json_str(
            r#"{ "topology": "decoder", "prefix_lm": true, "normalization": "mean",
                 "score_dtype": "f64", "bias_dtype": "bf16" }"#,
        )
        .unwrap();
        assert!(cfg.prefix_lm);
        assert_eq!(cfg.normalization, LengthNormalization::Mean);
        assert_eq!(DType::from(cfg.score_dtype), DType::F64);
        assert_eq!(DType::from(cfg.bias_dtype), DType::BF16);
    }

    #[test]
    fn test_config_rejects_narrow_score_dtype() {
        let err = ScorerConfig::from_json_str(r#"{ "topology": "decoder", "score_dtype": "f16" }"#);
        assert!(matches!(err, Err(ScoreError::Config(_))));
    }

    #[test]
    fn test_config_rejects_prefix_lm_on_seq2seq() {
        let cfg = ScorerConfig::new(Topology::EncoderDecoder).with_prefix_lm(true);
        assert!(cfg.validate().is_err());
    }
}
