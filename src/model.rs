use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Linear, LinearConfig, PaddingConfig2d, Relu,
    },
    prelude::*,
};

/// The classic LeNet-style stack: three conv/pool blocks followed by a
/// fully-connected classifier head. Softmax is left to the loss.
#[derive(Module, Debug)]
pub struct Cnn<B: Backend> {
    block1: ConvBlock<B>,
    block2: ConvBlock<B>,
    block3: ConvBlock<B>,
    fc1: Linear<B>,
    fc2: Linear<B>,
    activation: Relu,
}

#[derive(Config, Debug)]
pub struct CnnConfig {
    #[config(default = 10)]
    pub num_classes: usize,
    #[config(default = 500)]
    pub hidden_size: usize,
}

impl CnnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Cnn<B> {
        // 28x28 inputs are halved by each pool: 28 -> 14 -> 7 -> 3.
        let flattened = 100 * 3 * 3;

        Cnn {
            block1: ConvBlock::new([1, 20], device),
            block2: ConvBlock::new([20, 50], device),
            block3: ConvBlock::new([50, 100], device),
            fc1: LinearConfig::new(flattened, self.hidden_size).init(device),
            fc2: LinearConfig::new(self.hidden_size, self.num_classes).init(device),
            activation: Relu::new(),
        }
    }
}

impl<B: Backend> Cnn<B> {
    /// Maps `[batch, 1, 28, 28]` images to `[batch, num_classes]` logits.
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.block1.forward(images);
        let x = self.block2.forward(x);
        let x = self.block3.forward(x);

        let [batch_size, channels, height, width] = x.dims();
        let x = x.reshape([batch_size, channels * height * width]);

        let x = self.fc1.forward(x);
        let x = self.activation.forward(x);

        self.fc2.forward(x)
    }
}

/// 5x5 convolution with "same" padding, ReLU, then a 2x2 max-pool.
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    conv: Conv2d<B>,
    pool: MaxPool2d,
    activation: Relu,
}

impl<B: Backend> ConvBlock<B> {
    pub fn new(channels: [usize; 2], device: &B::Device) -> Self {
        let conv = Conv2dConfig::new(channels, [5, 5])
            .with_padding(PaddingConfig2d::Same)
            .init(device);
        let pool = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();

        Self {
            conv,
            pool,
            activation: Relu::new(),
        }
    }

    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(input);
        let x = self.activation.forward(x);
        self.pool.forward(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray<f32>;

    #[test]
    fn forward_produces_one_logit_per_class() {
        let device = Default::default();
        let model: Cnn<TestBackend> = CnnConfig::new().init(&device);

        let images = Tensor::zeros([4, 1, 28, 28], &device);
        let logits = model.forward(images);

        assert_eq!(logits.dims(), [4, 10]);
    }

    #[test]
    fn conv_block_halves_spatial_dims() {
        let device = Default::default();
        let block: ConvBlock<TestBackend> = ConvBlock::new([1, 20], &device);

        let out = block.forward(Tensor::zeros([1, 1, 28, 28], &device));
        assert_eq!(out.dims(), [1, 20, 14, 14]);
    }

    #[test]
    fn head_size_follows_config() {
        let device = Default::default();
        let model: Cnn<TestBackend> = CnnConfig::new().with_num_classes(5).init(&device);

        let logits = model.forward(Tensor::zeros([2, 1, 28, 28], &device));
        assert_eq!(logits.dims(), [2, 5]);
    }
}
