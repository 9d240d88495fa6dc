use burn::{
    data::{dataloader::batcher::Batcher, dataset::vision::MnistItem},
    prelude::*,
};

/// Collates raw MNIST items into `[batch, 1, 28, 28]` image tensors with
/// pixel values scaled to `[0, 1]`, paired with integer class targets.
#[derive(Clone, Default)]
pub struct MnistBatcher;

#[derive(Clone, Debug)]
pub struct MnistBatch<B: Backend> {
    pub images: Tensor<B, 4>,
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> Batcher<B, MnistItem, MnistBatch<B>> for MnistBatcher {
    fn batch(&self, items: Vec<MnistItem>, device: &B::Device) -> MnistBatch<B> {
        let images = items
            .iter()
            .map(|item| TensorData::from(item.image).convert::<B::FloatElem>())
            .map(|data| Tensor::<B, 2>::from_data(data, device))
            .map(|tensor| tensor.reshape([1, 1, 28, 28]))
            .map(|tensor| tensor / 255)
            .collect();

        let targets = items
            .iter()
            .map(|item| {
                Tensor::<B, 1, Int>::from_data(
                    [(item.label as i64).elem::<B::IntElem>()],
                    device,
                )
            })
            .collect();

        let images = Tensor::cat(images, 0);
        let targets = Tensor::cat(targets, 0);

        MnistBatch { images, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray<f32>;

    fn item(fill: u8, label: u8) -> MnistItem {
        MnistItem {
            image: [[fill as f32; 28]; 28],
            label,
        }
    }

    #[test]
    fn batch_has_image_and_target_shapes() {
        let device = Default::default();
        let batch: MnistBatch<TestBackend> =
            MnistBatcher.batch(vec![item(0, 3), item(255, 7)], &device);

        assert_eq!(batch.images.dims(), [2, 1, 28, 28]);
        assert_eq!(batch.targets.dims(), [2]);
    }

    #[test]
    fn pixels_are_scaled_to_unit_range() {
        let device = Default::default();
        let batch: MnistBatch<TestBackend> =
            MnistBatcher.batch(vec![item(255, 0)], &device);

        let max = batch.images.clone().max().into_scalar().elem::<f32>();
        let min = batch.images.min().into_scalar().elem::<f32>();
        assert_eq!(max, 1.0);
        assert_eq!(min, 1.0);
    }

    #[test]
    fn targets_keep_label_order() {
        let device = Default::default();
        let batch: MnistBatch<TestBackend> =
            MnistBatcher.batch(vec![item(0, 1), item(0, 9), item(0, 4)], &device);

        batch
            .targets
            .into_data()
            .assert_eq(&TensorData::from([1i64, 9, 4]), false);
    }
}
