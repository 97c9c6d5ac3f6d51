//! 参照用の Transform 実装
//!
//! - **WordCount**: カンマ区切りの単語を数えて `word : count` 行にする
//! - **ChannelSwap**: RGBA 画素の赤と緑を入れ替え、alpha を不透明にする

use std::collections::BTreeMap;

use crate::ports::{Transform, TransformError};

/// Counts comma-separated tokens. Output lines are sorted by word.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordCount;

impl Transform for WordCount {
    fn name(&self) -> &str {
        "word_count"
    }

    fn apply(&self, input: &[u8]) -> Result<Vec<u8>, TransformError> {
        let text = std::str::from_utf8(input)
            .map_err(|e| TransformError::Malformed(format!("not utf-8: {e}")))?;
        let text = text.trim();
        if text.is_empty() {
            return Err(TransformError::Empty);
        }

        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for word in text.split(',').map(str::trim).filter(|w| !w.is_empty()) {
            *counts.entry(word).or_default() += 1;
        }

        let mut out = String::new();
        for (word, count) in counts {
            out.push_str(&format!("{word} : {count}\n"));
        }
        Ok(out.into_bytes())
    }
}

/// Remaps raw RGBA pixels: (r, g, b, a) -> (g, r, b, 255).
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelSwap;

impl ChannelSwap {
    const PIXEL: usize = 4;
}

impl Transform for ChannelSwap {
    fn name(&self) -> &str {
        "channel_swap"
    }

    fn apply(&self, input: &[u8]) -> Result<Vec<u8>, TransformError> {
        if input.is_empty() {
            return Err(TransformError::Empty);
        }
        if input.len() % Self::PIXEL != 0 {
            return Err(TransformError::Malformed(format!(
                "{} bytes is not a whole number of RGBA pixels",
                input.len()
            )));
        }

        let mut out = Vec::with_capacity(input.len());
        for px in input.chunks_exact(Self::PIXEL) {
            out.extend_from_slice(&[px[1], px[0], px[2], u8::MAX]);
        }
        Ok(out)
    }
}
