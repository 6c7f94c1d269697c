use anyhow::Result;
use clap::Parser;

use cdctnet::{CdctNet, CompileConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Run on CPU rather than on GPU.
    #[arg(long)]
    cpu: bool,

    /// Enable tracing (generates a trace-timestamp.json file).
    #[arg(long)]
    tracing: bool,

    /// Path to a JSON model config, the defaults are used when omitted.
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Input height, overrides the config value.
    #[arg(long)]
    height: Option<usize>,

    /// Input width, overrides the config value.
    #[arg(long)]
    width: Option<usize>,

    #[arg(long, default_value = "adam")]
    optimizer: String,

    #[arg(long, default_value = "binary_crossentropy")]
    loss: String,

    #[arg(long, default_value = "accuracy")]
    metrics: Vec<String>,
}

fn main() -> Result<()> {
    use tracing_chrome::ChromeLayerBuilder;
    use tracing_subscriber::prelude::*;

    let args = Args::parse();
    let _guard = if args.tracing {
        let (chrome_layer, guard) = ChromeLayerBuilder::new().build();
        tracing_subscriber::registry().with(chrome_layer).init();
        Some(guard)
    } else {
        None
    };

    let device = cdctnet_examples::device(args.cpu)?;
    let mut config = cdctnet_examples::load_config(args.config.as_deref())?;
    if let Some(height) = args.height {
        config.input.height = height
    }
    if let Some(width) = args.width {
        config.input.width = width
    }

    let start = std::time::Instant::now();
    let (model, varmap) = CdctNet::build(&config, &device)?;
    let metrics: Vec<&str> = args.metrics.iter().map(|m| m.as_str()).collect();
    let compile_config = CompileConfig::from_names(&args.optimizer, &args.loss, &metrics)?;
    let model = model.compile(varmap, compile_config)?;
    tracing::info!("model built in {:?}", start.elapsed());

    println!("{}", model.summary()?);
    Ok(())
}
