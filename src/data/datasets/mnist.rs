//! MNIST 手写数字数据集
//!
//! 支持：
//! - IDX 二进制格式解析（支持 .gz 压缩）
//! - 训练集与测试集合并后按种子打乱，再重新切分
//! - 像素缩放 (0-255 → [-1, 1])

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use tracing::{debug, info};

use crate::data::error::DataError;
use crate::data::transforms::{permutation, scale_pixels_symmetric};
use crate::tensor::Tensor;

/// 切分后训练集的样本数
pub const MNIST_TRAIN_SIZE: usize = 60_000;

const IMAGE_MAGIC: u32 = 2051;
const LABEL_MAGIC: u32 = 2049;
const IMAGE_SIDE: usize = 28;

/// 打乱并切分后的 MNIST 图像，形状均为 [N, 1, 28, 28]，值域 [-1, 1]
#[derive(Debug, Clone)]
pub struct MnistSplit {
    pub train: Tensor,
    pub test: Tensor,
}

/// 从 `root` 读取 MNIST 的四个 IDX 文件（原始或 .gz 均可）
///
/// 训练集与测试集先合并（共 70000 张），用 `seed` 打乱后缩放到 [-1, 1]，
/// 前 60000 张为训练集，其余为测试集。样本不足 60000 时全部作为训练集。
pub fn load_mnist(root: &Path, seed: u64) -> Result<MnistSplit, DataError> {
    let mut parts = Vec::with_capacity(2);
    for prefix in ["train", "t10k"] {
        let images = parse_idx_images(&mut open_idx(root, &format!("{prefix}-images-idx3-ubyte"))?)?;
        let labels = parse_idx_labels(&mut open_idx(root, &format!("{prefix}-labels-idx1-ubyte"))?)?;
        if images.shape()[0] != labels.len() {
            return Err(DataError::ShapeMismatch {
                expected: vec![labels.len()],
                got: vec![images.shape()[0]],
            });
        }
        debug!("MNIST {}: {} 张图像", prefix, images.shape()[0]);
        parts.push(images);
    }

    let all = Tensor::concat_samples(&parts.iter().collect::<Vec<_>>())?;
    let total = all.shape()[0];
    let shuffled = all.select_samples(&permutation(total, seed));
    let scaled = scale_pixels_symmetric(&shuffled);

    let train_len = total.min(MNIST_TRAIN_SIZE);
    let split = if train_len == total {
        MnistSplit {
            train: scaled,
            test: Tensor::zeros(&[0, 1, IMAGE_SIDE, IMAGE_SIDE]),
        }
    } else {
        let train_indices: Vec<usize> = (0..train_len).collect();
        let test_indices: Vec<usize> = (train_len..total).collect();
        MnistSplit {
            train: scaled.select_samples(&train_indices),
            test: scaled.select_samples(&test_indices),
        }
    };
    info!(
        "MNIST 加载完成: 训练 {} 张，测试 {} 张",
        split.train.shape()[0],
        split.test.shape()[0]
    );
    Ok(split)
}

/// 打开 IDX 文件：优先使用未压缩版本，其次 .gz
fn open_idx(root: &Path, base_name: &str) -> Result<Box<dyn Read>, DataError> {
    let raw_path = root.join(base_name);
    if raw_path.exists() {
        return Ok(Box::new(BufReader::new(File::open(raw_path)?)));
    }
    let gz_path = root.join(format!("{base_name}.gz"));
    if gz_path.exists() {
        let file = File::open(gz_path)?;
        return Ok(Box::new(GzDecoder::new(BufReader::new(file))));
    }
    Err(DataError::FileNotFound(raw_path))
}

fn read_header<R: Read + ?Sized, const N: usize>(
    reader: &mut R,
    magic: u32,
) -> Result<[u32; N], DataError> {
    let mut fields = [0u32; N];
    for (i, field) in fields.iter_mut().enumerate() {
        let mut bytes = [0u8; 4];
        reader
            .read_exact(&mut bytes)
            .map_err(|e| DataError::FormatError(format!("读取头部失败: {e}")))?;
        // 大端序
        *field = u32::from_be_bytes(bytes);
        if i == 0 && *field != magic {
            return Err(DataError::FormatError(format!(
                "无效的 magic number: {} (期望 {})",
                field, magic
            )));
        }
    }
    Ok(fields)
}

/// 解析 IDX 图像数据
///
/// IDX 格式：
/// - [0-3] magic number (0x00000803 = 2051)
/// - [4-7] number of images
/// - [8-11] number of rows
/// - [12-15] number of columns
/// - [16+] pixel data (unsigned byte)
///
/// 返回 [N, 1, 28, 28] 的原始像素值（0-255）
pub fn parse_idx_images<R: Read + ?Sized>(reader: &mut R) -> Result<Tensor, DataError> {
    let [_, num_images, num_rows, num_cols] = read_header::<R, 4>(reader, IMAGE_MAGIC)?;
    let (num_images, num_rows, num_cols) =
        (num_images as usize, num_rows as usize, num_cols as usize);
    if num_rows != IMAGE_SIDE || num_cols != IMAGE_SIDE {
        return Err(DataError::FormatError(format!(
            "无效的图像尺寸: {}x{} (期望 28x28)",
            num_rows, num_cols
        )));
    }

    let mut pixels = vec![0u8; num_images * num_rows * num_cols];
    reader
        .read_exact(&mut pixels)
        .map_err(|e| DataError::FormatError(format!("读取像素数据失败: {e}")))?;

    let data: Vec<f32> = pixels.into_iter().map(f32::from).collect();
    Ok(Tensor::try_new(data, &[num_images, 1, num_rows, num_cols])?)
}

/// 解析 IDX 标签数据
///
/// IDX 格式：
/// - [0-3] magic number (0x00000801 = 2049)
/// - [4-7] number of labels
/// - [8+] label data (unsigned byte, 0-9)
pub fn parse_idx_labels<R: Read + ?Sized>(reader: &mut R) -> Result<Vec<u8>, DataError> {
    let [_, num_labels] = read_header::<R, 2>(reader, LABEL_MAGIC)?;
    let mut labels = vec![0u8; num_labels as usize];
    reader
        .read_exact(&mut labels)
        .map_err(|e| DataError::FormatError(format!("读取标签数据失败: {e}")))?;
    Ok(labels)
}
