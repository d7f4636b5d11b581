// token-bounded text splitter - cuts large payloads into overlapping chunks
// sized in tokenizer units so each one fits a single llm call

use std::ops::Range;

use tiktoken_rs::CoreBPE;
use tracing::{debug, warn};

use crate::error::SplitError;

/// default number of tokens per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// default number of tokens repeated between consecutive chunks
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// default tokenizer encoding
pub const DEFAULT_ENCODING: &str = "cl100k_base";

// byte-level bpe can cut a multi-byte character at a chunk edge
const MAX_EDGE_TRIM: usize = 3;

/// validated splitter parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkConfig {
    chunk_size: usize,
    chunk_overlap: usize,
    encoding: String,
}

impl ChunkConfig {
    /// build a config, rejecting parameters that would stall the splitter
    pub fn new(
        chunk_size: usize,
        chunk_overlap: usize,
        encoding: impl Into<String>,
    ) -> Result<Self, SplitError> {
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(SplitError::InvalidConfiguration {
                chunk_size,
                chunk_overlap,
            });
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            encoding: encoding.into(),
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    /// distance between the starts of two consecutive chunks
    pub fn stride(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            encoding: DEFAULT_ENCODING.to_string(),
        }
    }
}

/// anything that can turn text into token ids and back
pub trait Tokenizer {
    fn encode(&self, text: &str) -> Vec<u32>;

    /// decode a token range; lossy where the range does not end on a character boundary
    fn decode(&self, tokens: &[u32]) -> String;
}

/// tiktoken-backed tokenizer
pub struct BpeTokenizer {
    bpe: CoreBPE,
}

impl BpeTokenizer {
    /// resolve an encoding name (`cl100k_base`, `o200k_base`, ...) or a model name
    pub fn for_encoding(name: &str) -> Result<Self, SplitError> {
        let bpe = match name {
            "cl100k_base" => tiktoken_rs::cl100k_base(),
            "o200k_base" => tiktoken_rs::o200k_base(),
            "p50k_base" => tiktoken_rs::p50k_base(),
            "p50k_edit" => tiktoken_rs::p50k_edit(),
            "r50k_base" | "gpt2" => tiktoken_rs::r50k_base(),
            model => tiktoken_rs::get_bpe_from_model(model),
        }
        .map_err(|e| SplitError::TokenizerUnavailable {
            name: name.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self { bpe })
    }
}

impl Tokenizer for BpeTokenizer {
    fn encode(&self, text: &str) -> Vec<u32> {
        self.bpe
            .encode_with_special_tokens(text)
            .into_iter()
            .map(|token| token as u32)
            .collect()
    }

    fn decode(&self, tokens: &[u32]) -> String {
        // drop as few edge tokens as needed to get valid utf-8 back
        for dropped in 0..=MAX_EDGE_TRIM * 2 {
            for front in 0..=dropped.min(MAX_EDGE_TRIM) {
                let back = dropped - front;
                if back > MAX_EDGE_TRIM || front + back > tokens.len() {
                    continue;
                }

                let slice = &tokens[front..tokens.len() - back];
                let ids = slice.iter().map(|&token| token as _).collect();
                if let Ok(text) = self.bpe.decode(ids) {
                    if dropped > 0 {
                        debug!(front, back, "trimmed partial characters at chunk edge");
                    }
                    return text;
                }
            }
        }

        warn!(
            tokens = tokens.len(),
            "chunk is not valid utf-8 even after trimming its edges, dropping its text"
        );
        String::new()
    }
}

/// one decoded chunk and the token range it was cut from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub text: String,
    pub tokens: Range<usize>,
}

/// compute the token ranges a splitter with `config` cuts `total_tokens` into
///
/// input that fits in one chunk is a single range. otherwise ranges start
/// every `stride` tokens, are clipped to the input, and the walk stops once a
/// start reaches the end, so the tail can be shorter than the overlap.
pub fn chunk_ranges(total_tokens: usize, config: &ChunkConfig) -> Vec<Range<usize>> {
    if total_tokens <= config.chunk_size {
        return vec![0..total_tokens];
    }

    let mut ranges = Vec::with_capacity(total_tokens / config.stride() + 1);
    let mut start = 0;

    while start < total_tokens {
        let end = (start + config.chunk_size).min(total_tokens);
        ranges.push(start..end);
        start += config.stride();
    }

    ranges
}

/// splits text into token-bounded, overlapping chunks
pub struct TokenSplitter<T = BpeTokenizer> {
    config: ChunkConfig,
    tokenizer: T,
}

impl TokenSplitter<BpeTokenizer> {
    /// build a splitter using the tiktoken encoding named in `config`
    pub fn new(config: ChunkConfig) -> Result<Self, SplitError> {
        let tokenizer = BpeTokenizer::for_encoding(config.encoding())?;
        Ok(Self { config, tokenizer })
    }
}

impl<T: Tokenizer> TokenSplitter<T> {
    pub fn with_tokenizer(config: ChunkConfig, tokenizer: T) -> Self {
        Self { config, tokenizer }
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// split `text` into chunks in source order
    pub fn split(&self, text: &str) -> Vec<TextChunk> {
        let tokens = self.tokenizer.encode(text);
        let ranges = chunk_ranges(tokens.len(), &self.config);

        debug!(
            total_tokens = tokens.len(),
            chunks = ranges.len(),
            chunk_size = self.config.chunk_size,
            chunk_overlap = self.config.chunk_overlap,
            "split text into chunks"
        );

        ranges
            .into_iter()
            .map(|range| TextChunk {
                text: self.tokenizer.decode(&tokens[range.clone()]),
                tokens: range,
            })
            .collect()
    }

    /// same as [`split`](Self::split) keeping only the decoded text
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split(text).into_iter().map(|chunk| chunk.text).collect()
    }
}

/// chunk a payload only when it is larger than `threshold` characters
pub fn chunk_if_needed(
    text: &str,
    threshold: usize,
    config: &ChunkConfig,
) -> Result<Vec<String>, SplitError> {
    if text.chars().count() <= threshold {
        return Ok(vec![text.to_string()]);
    }

    let splitter = TokenSplitter::new(config.clone())?;
    Ok(splitter.split_text(text))
}
