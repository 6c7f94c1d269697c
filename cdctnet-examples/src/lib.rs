use candle::{Device, Result};

pub fn device(cpu: bool) -> Result<Device> {
    if cpu {
        Ok(Device::Cpu)
    } else if candle::utils::cuda_is_available() {
        Device::new_cuda(0)
    } else if candle::utils::metal_is_available() {
        Device::new_metal(0)
    } else {
        #[cfg(all(target_os = "macos", target_arch = "aarch64"))]
        {
            println!(
                "Running on CPU, to run on GPU(metal), build this example with `--features metal`"
            );
        }
        #[cfg(not(all(target_os = "macos", target_arch = "aarch64")))]
        {
            println!("Running on CPU, to run on GPU, build this example with `--features cuda`");
        }
        Ok(Device::Cpu)
    }
}

/// Reads a model config from a JSON file, falling back to the defaults when no path is given.
pub fn load_config(path: Option<&std::path::Path>) -> cdctnet::Result<cdctnet::Config> {
    match path {
        None => Ok(cdctnet::Config::default()),
        Some(path) => {
            let config = std::fs::read_to_string(path)?;
            cdctnet::Config::from_json(&config)
        }
    }
}
