use anyhow::Result;
use candle::{DType, Device, Tensor};
use candle_nn::VarMap;
use cdctnet::compile::trainable_vars;
use cdctnet::shape::LayerKind;
use cdctnet::{loss, metrics, CdctNet, CompileConfig, Config, Metric};

fn tiny_config(h: usize, w: usize) -> Config {
    Config {
        encoder_widths: vec![4, 8, 16, 32],
        decoder_widths: vec![32, 16, 8, 4],
        ..Config::with_input(h, w)
    }
}

fn snapshot(varmap: &VarMap, name: &str) -> Result<Vec<f32>> {
    let data = varmap.data().lock().unwrap();
    let var = data.get(name).expect("missing variable");
    Ok(var.flatten_all()?.to_vec1::<f32>()?)
}

#[test]
fn binary_cross_entropy() -> Result<()> {
    let dev = &Device::Cpu;
    let inp = Tensor::new(&[0.9f32, 0.2], dev)?;
    let target = Tensor::new(&[1f32, 0.], dev)?;
    let l = loss::binary_cross_entropy(&inp, &target)?.to_scalar::<f32>()?;
    assert!((l - 0.164252).abs() < 1e-5, "{l}");

    // Saturated predictions are clipped rather than producing infinities.
    let inp = Tensor::new(&[0f32, 1.], dev)?;
    let l = loss::binary_cross_entropy(&inp, &target)?.to_scalar::<f32>()?;
    assert!(l.is_finite() && l > 10., "{l}");

    let target = Tensor::new(&[1f32, 0., 1.], dev)?;
    assert!(loss::binary_cross_entropy(&inp, &target).is_err());
    Ok(())
}

#[test]
fn binary_accuracy() -> Result<()> {
    let dev = &Device::Cpu;
    let inp = Tensor::new(&[[0.9f32, 0.2], [0.6, 0.4]], dev)?;
    let target = Tensor::new(&[[1f32, 0.], [0., 1.]], dev)?;
    assert_eq!(metrics::binary_accuracy(&inp, &target, 0.5)?, 0.5);
    assert_eq!(metrics::binary_accuracy(&target, &target, 0.5)?, 1.0);
    Ok(())
}

#[test]
fn default_summary() -> Result<()> {
    let (model, varmap) = CdctNet::build(&Config::default(), &Device::Cpu)?;
    let model = model.compile(varmap, CompileConfig::default())?;
    let summary = model.summary()?;
    assert_eq!(summary.name, "Landslide_Segmentation");
    assert_eq!(summary.total_params(), 2_466_025);
    assert_eq!(summary.non_trainable_params, 1_920);
    assert_eq!(summary.trainable_params, 2_464_105);

    let first = &summary.rows[0];
    assert_eq!(first.kind, LayerKind::Input);
    assert_eq!(first.output, (3, 256, 256));
    let last = summary.rows.last().unwrap();
    assert_eq!(last.name, "head");
    assert_eq!(last.output, (1, 256, 256));
    assert_eq!(last.params, 33);

    let gates: usize = summary
        .rows
        .iter()
        .filter(|r| r.name.contains(".gate."))
        .map(|r| r.params)
        .sum();
    assert_eq!(gates, 968);

    let text = summary.to_string();
    assert!(text.starts_with("Model: \"Landslide_Segmentation\""));
    assert!(text.contains("decoder.0.up (Conv2DTranspose)"));
    assert!(text.contains("(None, 256, 16, 16)"));
    assert!(text.contains("Total params: 2466025"));
    assert!(text.ends_with("Non-trainable params: 1920"));
    Ok(())
}

#[test]
fn optimizer_skips_running_statistics() -> Result<()> {
    let (_model, varmap) = CdctNet::build(&tiny_config(16, 16), &Device::Cpu)?;
    let all = varmap.all_vars().len();
    let trainable = trainable_vars(&varmap).len();
    // Eight batch norms, each with a running mean and a running variance.
    assert_eq!(all - trainable, 16);
    Ok(())
}

#[test]
fn evaluate_and_train_step() -> Result<()> {
    let dev = &Device::Cpu;
    let (model, varmap) = CdctNet::build(&tiny_config(16, 16), dev)?;
    let mut model = model.compile(varmap, CompileConfig::default())?;

    let xs = Tensor::randn(0f32, 1., (2, 3, 16, 16), dev)?;
    let ys = Tensor::randn(0f32, 1., (2, 1, 16, 16), dev)?
        .ge(0.)?
        .to_dtype(DType::F32)?;

    let eval = model.evaluate(&xs, &ys)?;
    assert!(eval.loss.is_finite() && eval.loss > 0.);
    assert_eq!(eval.metrics.len(), 1);
    let (metric, acc) = eval.metrics[0];
    assert_eq!(metric, Metric::Accuracy);
    assert!((0.0..=1.0).contains(&acc));

    let head = snapshot(model.varmap(), "head.weight")?;
    let running_mean = snapshot(model.varmap(), "encoder.0.bn.running_mean")?;

    let step = model.train_step(&xs, &ys)?;
    assert!(step.loss.is_finite());
    assert_ne!(snapshot(model.varmap(), "head.weight")?, head);
    assert_ne!(
        snapshot(model.varmap(), "encoder.0.bn.running_mean")?,
        running_mean
    );
    Ok(())
}
