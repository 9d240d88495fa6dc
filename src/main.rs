#![recursion_limit = "256"]

use burn::{module::AutodiffModule, optim::SgdConfig, tensor::backend::AutodiffBackend};
use clap::Parser;
use cnn_mnist::{
    inference,
    model::CnnConfig,
    training::{self, TrainingConfig},
};

/// Trains a convolutional digit classifier on MNIST, prints test metrics,
/// and renders a handful of sample predictions.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Skip training and load previously saved weights instead
    #[arg(short, long)]
    load_model: bool,

    /// Persist the trained weights once training finishes
    #[arg(short, long)]
    save_model: bool,

    /// Where config, logs, weights, and rendered samples are written
    #[arg(short, long, default_value = "/tmp/cnn-mnist")]
    artifact_dir: String,

    #[arg(long, default_value_t = 20)]
    num_epochs: usize,

    #[arg(long, default_value_t = 128)]
    batch_size: usize,

    #[arg(long, default_value_t = 0.01)]
    learning_rate: f64,

    /// How many random test digits to predict and render
    #[arg(long, default_value_t = 5)]
    samples: usize,
}

fn launch<B: AutodiffBackend>(device: B::Device, args: &Args) {
    let model = if args.load_model {
        inference::load_model::<B::InnerBackend>(&args.artifact_dir, &device)
    } else {
        let config = TrainingConfig::new(CnnConfig::new(), SgdConfig::new())
            .with_num_epochs(args.num_epochs)
            .with_batch_size(args.batch_size)
            .with_learning_rate(args.learning_rate);

        let trained = training::train::<B>(&args.artifact_dir, config, device.clone());
        if args.save_model {
            training::save_model(&args.artifact_dir, trained.clone());
        }

        trained.valid()
    };

    inference::evaluate(&model, args.batch_size, &device);
    inference::show_predictions(
        &model,
        args.samples,
        &format!("{}/samples", args.artifact_dir),
        &device,
    );
}

#[cfg(any(
    feature = "ndarray",
    feature = "ndarray-blas-accelerate",
    feature = "ndarray-blas-netlib",
    feature = "ndarray-blas-openblas"
))]
mod ndarray {
    use super::{launch, Args};
    use burn::backend::{
        ndarray::{NdArray, NdArrayDevice},
        Autodiff,
    };

    pub fn run(args: &Args) {
        launch::<Autodiff<NdArray>>(NdArrayDevice::Cpu, args);
    }
}

#[cfg(feature = "tch-cpu")]
mod tch_cpu {
    use super::{launch, Args};
    use burn::backend::{
        libtorch::{LibTorch, LibTorchDevice},
        Autodiff,
    };

    pub fn run(args: &Args) {
        launch::<Autodiff<LibTorch>>(LibTorchDevice::Cpu, args);
    }
}

#[cfg(feature = "tch-gpu")]
mod tch_gpu {
    use super::{launch, Args};
    use burn::backend::{
        libtorch::{LibTorch, LibTorchDevice},
        Autodiff,
    };

    pub fn run(args: &Args) {
        #[cfg(not(target_os = "macos"))]
        let device = LibTorchDevice::Cuda(0);
        #[cfg(target_os = "macos")]
        let device = LibTorchDevice::Mps;

        launch::<Autodiff<LibTorch>>(device, args);
    }
}

#[cfg(feature = "wgpu")]
mod wgpu {
    use super::{launch, Args};
    use burn::backend::{
        wgpu::{Wgpu, WgpuDevice},
        Autodiff,
    };

    pub fn run(args: &Args) {
        launch::<Autodiff<Wgpu>>(WgpuDevice::default(), args);
    }
}

#[cfg(feature = "cuda")]
mod cuda {
    use super::{launch, Args};
    use burn::backend::{
        cuda::{Cuda, CudaDevice},
        Autodiff,
    };

    pub fn run(args: &Args) {
        launch::<Autodiff<Cuda>>(CudaDevice::default(), args);
    }
}

#[allow(unused_variables)]
fn main() {
    let args = Args::parse();

    #[cfg(any(
        feature = "ndarray",
        feature = "ndarray-blas-accelerate",
        feature = "ndarray-blas-netlib",
        feature = "ndarray-blas-openblas"
    ))]
    ndarray::run(&args);
    #[cfg(feature = "tch-cpu")]
    tch_cpu::run(&args);
    #[cfg(feature = "tch-gpu")]
    tch_gpu::run(&args);
    #[cfg(feature = "wgpu")]
    wgpu::run(&args);
    #[cfg(feature = "cuda")]
    cuda::run(&args);
}
