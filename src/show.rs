use burn::prelude::Backend;
use burn::tensor::{ElementConversion, Tensor};
use image::{imageops, imageops::FilterType, GrayImage, Luma};
use std::fs;
use std::path::Path;

/// Save a 2D tensor as a grayscale image, upscaled to `width` x `height`.
pub fn save_as_img<B: Backend>(
    tensor: &Tensor<B, 2>,
    width: u32,
    height: u32,
    path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(path);

    // Ensure the output directory exists
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let [rows, cols] = tensor.dims();
    let pixels = normalize(tensor.clone())
        .into_data()
        .to_vec::<f32>()
        .map_err(|err| format!("tensor data is not f32-convertible: {err:?}"))?;

    let mut img = GrayImage::new(cols as u32, rows as u32);
    for (index, pixel) in pixels.iter().enumerate() {
        let x = (index % cols) as u32;
        let y = (index / cols) as u32;
        img.put_pixel(x, y, Luma([*pixel as u8]));
    }

    let img = imageops::resize(&img, width, height, FilterType::Nearest);
    img.save(path)?;
    Ok(())
}

/// Normalize values in 2D tensor from 0 to 255
fn normalize<B: Backend>(tensor: Tensor<B, 2>) -> Tensor<B, 2> {
    let min = tensor.clone().min().into_scalar().elem::<f32>();
    let max = tensor.clone().max().into_scalar().elem::<f32>();
    let range = if max - min == 0.0 { 1.0 } else { max - min };

    tensor
        .sub_scalar(min)
        .div_scalar(range)
        .mul_scalar(255.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray<f32>;

    #[test]
    fn writes_an_upscaled_png() {
        let device = Default::default();
        let tensor = Tensor::<TestBackend, 2>::zeros([28, 28], &device);

        let dir = std::env::temp_dir().join("cnn-mnist-show-test");
        let path = dir.join("digit.png");
        let path = path.to_str().unwrap();

        save_as_img(&tensor, 96, 96, path).unwrap();

        let img = image::open(path).unwrap();
        assert_eq!((img.width(), img.height()), (96, 96));

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn normalize_spans_full_byte_range() {
        let device = Default::default();
        let tensor = Tensor::<TestBackend, 2>::from_floats([[0.0, 0.5], [1.0, 0.25]], &device);

        let out = normalize(tensor);
        assert_eq!(out.clone().max().into_scalar().elem::<f32>(), 255.0);
        assert_eq!(out.min().into_scalar().elem::<f32>(), 0.0);
    }
}
