use crate::{
    data::{MnistBatch, MnistBatcher},
    model::Cnn,
    show,
    training::TrainingConfig,
};
use burn::{
    data::{
        dataloader::batcher::Batcher,
        dataset::{
            vision::{MnistDataset, MnistItem},
            Dataset,
        },
    },
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use rand::seq::index::sample;

/// Rebuilds the model from the config and weights written by a training run.
pub fn load_model<B: Backend>(artifact_dir: &str, device: &B::Device) -> Cnn<B> {
    let config = TrainingConfig::load(format!("{artifact_dir}/config.json"))
        .expect("Config should exist for the model; run training first");
    let record = CompactRecorder::new()
        .load(format!("{artifact_dir}/model").into(), device)
        .expect("Trained model weights should exist; run training with --save-model first");

    config.model.init::<B>(device).load_record(record)
}

/// Runs the whole test split through the model and prints accuracy and mean
/// loss.
pub fn evaluate<B: Backend>(model: &Cnn<B>, batch_size: usize, device: &B::Device) {
    let dataset = MnistDataset::test();
    let batcher = MnistBatcher::default();

    let mut correct = 0usize;
    let mut total = 0usize;
    let mut loss_sum = 0f64;
    let mut batches = 0usize;

    let mut chunk: Vec<MnistItem> = Vec::with_capacity(batch_size);
    let mut run = |items: Vec<MnistItem>| {
        let batch: MnistBatch<B> = batcher.batch(items, device);
        let targets = batch.targets.clone();
        let item = model.forward_classification(batch.images, batch.targets);

        total += targets.dims()[0];
        correct += num_correct(item.output, targets);
        loss_sum += item.loss.into_scalar().elem::<f64>();
        batches += 1;
    };

    for item in dataset.iter() {
        chunk.push(item);
        if chunk.len() == batch_size {
            run(std::mem::take(&mut chunk));
        }
    }
    if !chunk.is_empty() {
        run(chunk);
    }

    println!(
        "Test accuracy: {:.2}% ({correct}/{total}), mean loss: {:.4}",
        correct as f64 / total as f64 * 100.0,
        loss_sum / batches as f64,
    );
}

/// Predicts a handful of random test digits, printing each outcome and
/// rendering the digit as an upscaled PNG named after both labels.
pub fn show_predictions<B: Backend>(
    model: &Cnn<B>,
    count: usize,
    output_dir: &str,
    device: &B::Device,
) {
    let dataset = MnistDataset::test();
    let mut rng = rand::rng();
    let items: Vec<_> = sample(&mut rng, dataset.len(), count.min(dataset.len()))
        .iter()
        .filter_map(|index| dataset.get(index))
        .collect();

    let batcher = MnistBatcher::default();
    let batch: MnistBatch<B> = batcher.batch(items.clone(), device);
    let predictions = model.forward(batch.images.clone()).argmax(1);

    for (position, item) in items.iter().enumerate() {
        let predicted: i64 = predictions
            .clone()
            .slice([position..position + 1])
            .into_scalar()
            .elem();

        println!("Predicted {} Expected {}", predicted, item.label);

        let digit = batch
            .images
            .clone()
            .slice([position..position + 1])
            .reshape([28, 28]);
        let path = format!(
            "{output_dir}/sample-{position}-predicted-{predicted}-actual-{}.png",
            item.label
        );
        if let Err(err) = show::save_as_img(&digit, 96, 96, &path) {
            log::warn!("Could not render {path}: {err}");
        }
    }
}

/// Number of rows whose argmax matches the target label.
fn num_correct<B: Backend>(output: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    let predictions = output.argmax(1).squeeze::<1>(1);

    predictions
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray<f32>;

    #[test]
    fn counts_argmax_matches() {
        let device = Default::default();
        let output = Tensor::<TestBackend, 2>::from_floats(
            [[0.1, 0.9, 0.0], [0.8, 0.1, 0.1], [0.2, 0.3, 0.5]],
            &device,
        );
        let targets = Tensor::<TestBackend, 1, Int>::from_ints([1, 0, 1], &device);

        assert_eq!(num_correct(output, targets), 2);
    }

    #[test]
    fn counts_zero_when_all_wrong() {
        let device = Default::default();
        let output =
            Tensor::<TestBackend, 2>::from_floats([[1.0, 0.0], [1.0, 0.0]], &device);
        let targets = Tensor::<TestBackend, 1, Int>::from_ints([1, 1], &device);

        assert_eq!(num_correct(output, targets), 0);
    }
}
