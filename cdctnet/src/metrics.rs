use candle::{DType, Result, Tensor};

/// Fraction of elements where the thresholded prediction agrees with the target.
pub fn binary_accuracy(inp: &Tensor, target: &Tensor, threshold: f64) -> Result<f32> {
    if inp.shape() != target.shape() {
        candle::bail!(
            "binary_accuracy shape mismatch, inp: {:?}, target: {:?}",
            inp.shape(),
            target.shape()
        )
    }
    let preds = inp.gt(threshold)?;
    let labels = target.to_dtype(inp.dtype())?.gt(threshold)?;
    preds
        .eq(&labels)?
        .to_dtype(DType::F32)?
        .mean_all()?
        .to_scalar::<f32>()
}
