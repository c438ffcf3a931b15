use anyhow::{anyhow, Result};
use candle_core::{DType, Tensor};

/// Mean of the unmasked token states of each row, L2-normalised.
/// `hidden` is `[B, T, H]`, `attention_mask` is `[B, T]`; the result is `[B, H]`.
pub fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let (batch, _time, hidden_dim) = hidden.dims3().map_err(|e| anyhow!("hidden shape must be [B,T,H]: {}", e))?;

    let mask = attention_mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?;
    let mask_3d = mask.unsqueeze(2)?;
    let mask_broadcast = mask_3d.broadcast_as(hidden.shape()).or_else(|_| mask_3d.repeat((1, 1, hidden_dim)))?;
    let masked = (hidden * &mask_broadcast)?;
    let sum = masked.sum(1)?;
    // A row with no unmasked tokens would divide by zero.
    let lengths = mask.sum(1)?.unsqueeze(1)?.to_dtype(sum.dtype())?.maximum(1f32)?;
    let mean = sum.broadcast_div(&lengths)?;
    let eps_val = match hidden.dtype() {
        DType::F16 => 1e-6f32,
        _ => 1e-12f32,
    };
    let eps = Tensor::new(&[eps_val], hidden.device())?.to_dtype(hidden.dtype())?.unsqueeze(0)?;
    let norm = mean.sqr()?.sum_keepdim(1)?.sqrt()?.broadcast_add(&eps)?;
    let normalized = mean.broadcast_div(&norm)?;
    if normalized.dims() != [batch, hidden_dim] {
        return Err(anyhow!("pooled shape {:?}, expected [{}, {}]", normalized.dims(), batch, hidden_dim));
    }
    Ok(normalized)
}
