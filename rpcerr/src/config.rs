//! Codec configuration

use serde::{Deserialize, Deserializer, Serialize};

/// Limits applied by [`StatusCodec`](crate::StatusCodec).
///
/// ```rust
/// use rpcerr::CodecConfig;
///
/// let config = CodecConfig::default()
///     .with_max_chain_depth(16)
///     .with_max_details_len(8 * 1024);
/// assert_eq!(config.max_chain_depth, 16);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Longest chain encoded or rebuilt, counting the outermost error.
    /// Never less than 1.
    #[serde(deserialize_with = "at_least_one")]
    pub max_chain_depth: usize,
    /// Upper bound on the encoded details payload, in bytes
    pub max_details_len: Option<usize>,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_chain_depth: 64,
            max_details_len: None,
        }
    }
}

impl CodecConfig {
    pub fn with_max_chain_depth(mut self, depth: usize) -> Self {
        self.max_chain_depth = depth.max(1);
        self
    }

    pub fn with_max_details_len(mut self, len: usize) -> Self {
        self.max_details_len = Some(len);
        self
    }

    /// The chain depth actually applied. The field is public, so a config
    /// built by hand may still hold 0.
    pub fn chain_depth(&self) -> usize {
        self.max_chain_depth.max(1)
    }
}

fn at_least_one<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(usize::deserialize(deserializer)?.max(1))
}
