use anyhow::Result;
use candle::{Device, Tensor};
use cdctnet::{CdctNet, Config};

#[test]
fn skip_connections() -> Result<()> {
    let (model, _varmap) = CdctNet::build(&Config::with_input(32, 48), &Device::Cpu)?;
    let xs = Tensor::randn(0f32, 1., (1, 3, 32, 48), &Device::Cpu)?;
    let out = model.encoder().forward_t(&xs, false)?;
    assert_eq!(out.skips.len(), 4);
    let dims: Vec<_> = out.skips.iter().map(|s| s.dims().to_vec()).collect();
    assert_eq!(
        dims,
        [
            [1, 32, 32, 48],
            [1, 64, 16, 24],
            [1, 128, 8, 12],
            [1, 256, 4, 6]
        ]
    );
    assert_eq!(out.xs.dims(), &[1, 256, 2, 3]);
    let deepest: Vec<_> = out.skips.deepest_first().map(|s| s.dims()[1]).collect();
    assert_eq!(deepest, [256, 128, 64, 32]);
    Ok(())
}

#[test]
fn skip_connections_are_relu_outputs() -> Result<()> {
    let (model, _varmap) = CdctNet::build(&Config::with_input(16, 16), &Device::Cpu)?;
    let xs = Tensor::randn(0f32, 1., (2, 3, 16, 16), &Device::Cpu)?;
    let out = model.encoder().forward_t(&xs, true)?;
    for skip in out.skips.iter() {
        let values = skip.flatten_all()?.to_vec1::<f32>()?;
        assert!(values.iter().all(|&v| v >= 0.));
    }
    Ok(())
}
