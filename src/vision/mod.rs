/*
 * @Description  : 本模块提供训练过程中的图像输出：把一批 [N, C, H, W] 的图像张量
 *                 拼成方形网格，并把生成样本与真实样本左右并排保存为 PNG。
 *                 在本模块中，不严谨地说：“灰度”（图）等同于英文中luma、gray的概念。
 */

use std::path::Path;

use image::{GrayImage, RgbImage};
use thiserror::Error;

use crate::tensor::Tensor;

#[cfg(test)]
mod tests;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("不是图像张量: {0:?}")]
    NotImage(Vec<usize>),

    #[error("生成图与真实图的网格尺寸不同: {fake:?} vs {real:?}")]
    GridMismatch { fake: Vec<usize>, real: Vec<usize> },

    #[error("图像写入失败: {0}")]
    Image(#[from] image::ImageError),
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum ImageType {
    Gray, // 单通道，或者只有高（行）、宽（列）2个维度的图像张量
    Rgb,  // 3通道的图像张量
}

pub struct Vision;

impl Vision {
    /// 判断 [H, W] 或 [H, W, C] 张量的图像类型
    pub fn image_type(tensor: &Tensor) -> Result<ImageType, VisionError> {
        match tensor.shape() {
            [_, _] | [_, _, 1] => Ok(ImageType::Gray),
            [_, _, 3] => Ok(ImageType::Rgb),
            shape => Err(VisionError::NotImage(shape.to_vec())),
        }
    }

    /// 把 [-1, 1] 的值线性映射到 [0, 255]，越界截断
    pub fn to_pixel(value: f32) -> u8 {
        ((value + 1.0) * 127.5).round().clamp(0.0, 255.0) as u8
    }

    /// 把一批 [N, C, H, W] 图像按行优先拼成 n×n 网格（n = ⌈√N⌉），得到 [n·H, n·W, C]。
    /// 空位保持为 -1（即黑色）。
    pub fn tile_grid(batch: &Tensor) -> Result<Tensor, VisionError> {
        let &[count, channels, height, width] = batch.shape() else {
            return Err(VisionError::NotImage(batch.shape().to_vec()));
        };
        if !(channels == 1 || channels == 3) {
            return Err(VisionError::NotImage(batch.shape().to_vec()));
        }
        let n = (count as f64).sqrt().ceil() as usize;
        let mut grid = Tensor::full(-1.0, &[n * height, n * width, channels]);
        for i in 0..count {
            let (row, col) = (i / n, i % n);
            for c in 0..channels {
                for y in 0..height {
                    for x in 0..width {
                        grid[[row * height + y, col * width + x, c]] = batch[[i, c, y, x]];
                    }
                }
            }
        }
        Ok(grid)
    }

    /// 生成样本网格在左、真实样本网格在右，拼成一张图
    pub fn comparison_figure(fake: &Tensor, real: &Tensor) -> Result<Tensor, VisionError> {
        let fake_grid = Self::tile_grid(fake)?;
        let real_grid = Self::tile_grid(real)?;
        let (fake_shape, real_shape) = (fake_grid.shape(), real_grid.shape());
        if fake_shape[0] != real_shape[0] || fake_shape[2] != real_shape[2] {
            return Err(VisionError::GridMismatch {
                fake: fake_shape.to_vec(),
                real: real_shape.to_vec(),
            });
        }
        let (height, channels) = (fake_shape[0], fake_shape[2]);
        let (fake_w, real_w) = (fake_shape[1], real_shape[1]);
        let mut figure = Tensor::zeros(&[height, fake_w + real_w, channels]);
        for y in 0..height {
            for c in 0..channels {
                for x in 0..fake_w {
                    figure[[y, x, c]] = fake_grid[[y, x, c]];
                }
                for x in 0..real_w {
                    figure[[y, fake_w + x, c]] = real_grid[[y, x, c]];
                }
            }
        }
        Ok(figure)
    }

    /// 保存 [H, W] 或 [H, W, C] 的张量（值域 [-1, 1]）为图像
    pub fn save_image(tensor: &Tensor, path: &Path) -> Result<(), VisionError> {
        let image_type = Self::image_type(tensor)?;
        let (height, width) = (tensor.shape()[0], tensor.shape()[1]);
        // [H, W] 与 [H, W, 1] 统一按三维读取
        let channels = tensor.size() / (height * width).max(1);
        let view = tensor
            .reshape(&[height, width, channels])
            .map_err(|_| VisionError::NotImage(tensor.shape().to_vec()))?;

        match image_type {
            ImageType::Gray => {
                let image = GrayImage::from_fn(width as u32, height as u32, |x, y| {
                    image::Luma([Self::to_pixel(view[[y as usize, x as usize, 0]])])
                });
                image.save(path)?;
            }
            ImageType::Rgb => {
                let image = RgbImage::from_fn(width as u32, height as u32, |x, y| {
                    let (y, x) = (y as usize, x as usize);
                    image::Rgb([
                        Self::to_pixel(view[[y, x, 0]]),
                        Self::to_pixel(view[[y, x, 1]]),
                        Self::to_pixel(view[[y, x, 2]]),
                    ])
                });
                image.save(path)?;
            }
        }
        Ok(())
    }

    /// 生成/真实对比图：拼网格、并排、保存
    pub fn save_comparison(fake: &Tensor, real: &Tensor, path: &Path) -> Result<(), VisionError> {
        let figure = Self::comparison_figure(fake, real)?;
        Self::save_image(&figure, path)
    }
}
