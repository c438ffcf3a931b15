use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

/// Row-major `[rows, width]` ids and attention mask for a padded batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaddedBatch {
    pub ids: Vec<u32>,
    pub mask: Vec<u32>,
    pub rows: usize,
    pub width: usize,
}

/// Truncate every sequence to `max_len` and right-pad to the longest one left.
pub fn pad_batch(sequences: Vec<(Vec<u32>, Vec<u32>)>, max_len: usize, pad_id: u32) -> PaddedBatch {
    let rows = sequences.len();
    let width = sequences.iter().map(|(ids, _)| ids.len().min(max_len)).max().unwrap_or(0);
    let mut ids = Vec::with_capacity(rows * width);
    let mut mask = Vec::with_capacity(rows * width);
    for (row, (mut seq_ids, mut seq_mask)) in sequences.into_iter().enumerate() {
        seq_ids.truncate(max_len);
        seq_mask.truncate(max_len);
        let row_end = (row + 1) * width;
        ids.extend(seq_ids);
        ids.resize(row_end, pad_id);
        mask.extend(seq_mask);
        mask.resize(row_end, 0);
    }
    PaddedBatch { ids, mask, rows, width }
}

/// Encode `texts` and place `(input_ids, attention_mask)` on `device`.
pub fn tokenize_batch(
    tokenizer: &Tokenizer,
    texts: &[String],
    max_len: usize,
    pad_id: u32,
    device: &Device,
) -> Result<(Tensor, Tensor)> {
    let encodings = tokenizer
        .encode_batch(texts.to_vec(), true)
        .map_err(|e| anyhow!("Tokenization failed: {}", e))?;
    let sequences = encodings
        .iter()
        .map(|enc| (enc.get_ids().to_vec(), enc.get_attention_mask().to_vec()))
        .collect();
    let batch = pad_batch(sequences, max_len, pad_id);
    let shape = (batch.rows, batch.width);
    let input_ids = Tensor::from_vec(batch.ids, shape, device)?;
    let attention_mask = Tensor::from_vec(batch.mask, shape, device)?;
    Ok((input_ids, attention_mask))
}
