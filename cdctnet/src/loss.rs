use candle::{Result, Tensor};

/// Probabilities are clipped to `[EPSILON, 1 - EPSILON]` before taking logarithms.
pub const EPSILON: f64 = 1e-7;

/// The binary cross-entropy loss on probabilities.
///
/// Arguments
///
/// * [inp]: The predicted probabilities, any shape, values in `[0, 1]`.
/// * [target]: The ground truth, same shape as `inp`, values in `{0, 1}`.
///
/// The resulting tensor is a scalar containing the average value over all elements.
pub fn binary_cross_entropy(inp: &Tensor, target: &Tensor) -> Result<Tensor> {
    if inp.shape() != target.shape() {
        candle::bail!(
            "binary_cross_entropy shape mismatch, inp: {:?}, target: {:?}",
            inp.shape(),
            target.shape()
        )
    }
    let inp = inp.clamp(EPSILON, 1. - EPSILON)?;
    let target = target.to_dtype(inp.dtype())?;

    let left_side = (&target * inp.log()?)?;
    let right_side = (target.affine(-1., 1.)? * inp.affine(-1., 1.)?.log()?)?;

    (left_side + right_side)?.neg()?.mean_all()
}
