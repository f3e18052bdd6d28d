/*
 * @Description  : Conv2d（2D 卷积）层
 *
 * 输入/输出形状：
 * - 输入：[batch_size, in_channels, H, W]
 * - 输出：[batch_size, out_channels, H', W']
 *
 * 输出尺寸计算：
 * H' = (H + 2*padding_h - kernel_h) / stride_h + 1
 * W' = (W + 2*padding_w - kernel_w) / stride_w + 1
 *
 * 零填充不做显式拷贝，越界位置直接跳过。使用 Rayon 在 batch 维度并行。
 */

use rayon::prelude::*;

use super::{Layer, cached, expect_rank};
use crate::nn::param::ParamKind;
use crate::nn::{NnError, Param};
use crate::tensor::Tensor;

/// 卷积的几何参数，Conv2d 与 ConvTranspose2d 共用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvGeometry {
    pub kernel: (usize, usize),
    pub stride: (usize, usize),
    pub padding: (usize, usize),
}

impl ConvGeometry {
    pub fn new(kernel: (usize, usize), stride: (usize, usize), padding: (usize, usize)) -> Self {
        Self {
            kernel,
            stride,
            padding,
        }
    }

    /// 普通卷积的输出尺寸；输入过小时返回None
    pub fn conv_output(&self, h: usize, w: usize) -> Option<(usize, usize)> {
        let padded_h = h + 2 * self.padding.0;
        let padded_w = w + 2 * self.padding.1;
        if padded_h < self.kernel.0 || padded_w < self.kernel.1 {
            return None;
        }
        Some((
            (padded_h - self.kernel.0) / self.stride.0 + 1,
            (padded_w - self.kernel.1) / self.stride.1 + 1,
        ))
    }

    /// 转置卷积的输出尺寸：(H - 1) * stride - 2 * padding + kernel；结果非正时返回None
    pub fn deconv_output(&self, h: usize, w: usize) -> Option<(usize, usize)> {
        let full_h = h.checked_sub(1)? * self.stride.0 + self.kernel.0;
        let full_w = w.checked_sub(1)? * self.stride.1 + self.kernel.1;
        let out_h = full_h.checked_sub(2 * self.padding.0)?;
        let out_w = full_w.checked_sub(2 * self.padding.1)?;
        (out_h > 0 && out_w > 0).then_some((out_h, out_w))
    }
}

/// Conv2d（2D 卷积）层：`output = conv2d(x, K)`（可选加通道偏置）
pub struct Conv2d {
    name: String,
    in_channels: usize,
    out_channels: usize,
    geometry: ConvGeometry,
    /// 卷积核 [out_channels, in_channels, kernel_h, kernel_w]
    weight: Param,
    /// 偏置 [out_channels]（可选）
    bias: Option<Param>,
    input: Option<Tensor>,
}

impl Conv2d {
    pub fn new(
        name: &str,
        in_channels: usize,
        out_channels: usize,
        geometry: ConvGeometry,
        use_bias: bool,
    ) -> Self {
        let (k_h, k_w) = geometry.kernel;
        Self {
            name: name.to_string(),
            in_channels,
            out_channels,
            geometry,
            weight: Param::new(
                format!("{name}_weight"),
                ParamKind::Weight,
                &[out_channels, in_channels, k_h, k_w],
            ),
            bias: use_bias
                .then(|| Param::new(format!("{name}_bias"), ParamKind::Bias, &[out_channels])),
            input: None,
        }
    }

    fn checked_output(&self, input_shape: &[usize]) -> Result<(usize, usize), NnError> {
        expect_rank(&self.name, input_shape, 4, Some(self.in_channels))?;
        self.geometry
            .conv_output(input_shape[2], input_shape[3])
            .ok_or_else(|| NnError::ShapeMismatch {
                layer: self.name.clone(),
                expected: vec![input_shape[0], self.in_channels, self.geometry.kernel.0, self.geometry.kernel.1],
                got: input_shape.to_vec(),
            })
    }
}

impl Layer for Conv2d {
    fn name(&self) -> &str {
        &self.name
    }

    fn forward(&mut self, input: &Tensor, is_train: bool) -> Result<Tensor, NnError> {
        let (out_h, out_w) = self.checked_output(input.shape())?;
        let (batch_size, in_c, in_h, in_w) = dims4(input.shape());
        let out_c = self.out_channels;
        let (k_h, k_w) = self.geometry.kernel;
        let (stride_h, stride_w) = self.geometry.stride;
        let (pad_h, pad_w) = (self.geometry.padding.0 as isize, self.geometry.padding.1 as isize);

        let x = input.as_slice();
        let kernel = self.weight.value().as_slice();
        let bias = self.bias.as_ref().map(|b| b.value().as_slice());
        let in_sample = in_c * in_h * in_w;
        let out_sample = out_c * out_h * out_w;

        let mut output = vec![0.0f32; batch_size * out_sample];
        output
            .par_chunks_mut(out_sample)
            .enumerate()
            .for_each(|(b, sample_out)| {
                let sample_in = &x[b * in_sample..(b + 1) * in_sample];
                for oc in 0..out_c {
                    let bias_val = bias.map_or(0.0, |bias| bias[oc]);
                    for oh in 0..out_h {
                        for ow in 0..out_w {
                            let mut sum = bias_val;
                            let h_start = (oh * stride_h) as isize - pad_h;
                            let w_start = (ow * stride_w) as isize - pad_w;
                            for ic in 0..in_c {
                                for kh in 0..k_h {
                                    let ih = h_start + kh as isize;
                                    if ih < 0 || ih >= in_h as isize {
                                        continue;
                                    }
                                    for kw in 0..k_w {
                                        let iw = w_start + kw as isize;
                                        if iw < 0 || iw >= in_w as isize {
                                            continue;
                                        }
                                        let input_val = sample_in
                                            [ic * in_h * in_w + ih as usize * in_w + iw as usize];
                                        sum += input_val
                                            * kernel[((oc * in_c + ic) * k_h + kh) * k_w + kw];
                                    }
                                }
                            }
                            sample_out[(oc * out_h + oh) * out_w + ow] = sum;
                        }
                    }
                }
            });

        if is_train {
            self.input = Some(input.clone());
        }
        Ok(Tensor::try_new(output, &[batch_size, out_c, out_h, out_w])?)
    }

    /// 对于 Y = conv(X, K):
    /// - dL/dX: 转置卷积（把上游梯度按卷积核散射回输入位置）
    /// - dL/dK: 输入与上游梯度的相关运算，跨 batch 累加（map-reduce）
    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, NnError> {
        let input = cached(&self.name, &self.input)?;
        let (batch_size, in_c, in_h, in_w) = dims4(input.shape());
        let (out_h, out_w) = self.checked_output(input.shape())?;
        let out_c = self.out_channels;
        let expected = [batch_size, out_c, out_h, out_w];
        if grad_output.shape() != expected {
            return Err(NnError::ShapeMismatch {
                layer: self.name.clone(),
                expected: expected.to_vec(),
                got: grad_output.shape().to_vec(),
            });
        }

        let (k_h, k_w) = self.geometry.kernel;
        let (stride_h, stride_w) = self.geometry.stride;
        let (pad_h, pad_w) = (self.geometry.padding.0 as isize, self.geometry.padding.1 as isize);
        let x = input.as_slice();
        let dy = grad_output.as_slice();
        let kernel = self.weight.value().as_slice();
        let in_sample = in_c * in_h * in_w;
        let out_sample = out_c * out_h * out_w;
        let kernel_size = out_c * in_c * k_h * k_w;

        // 每个样本各自求 dX 和（该样本贡献的）dK
        let per_sample: Vec<(Vec<f32>, Vec<f32>)> = (0..batch_size)
            .into_par_iter()
            .map(|b| {
                let sample_in = &x[b * in_sample..(b + 1) * in_sample];
                let sample_dy = &dy[b * out_sample..(b + 1) * out_sample];
                let mut sample_dx = vec![0.0f32; in_sample];
                let mut sample_dk = vec![0.0f32; kernel_size];
                for oc in 0..out_c {
                    for oh in 0..out_h {
                        for ow in 0..out_w {
                            let grad_val = sample_dy[(oc * out_h + oh) * out_w + ow];
                            if grad_val == 0.0 {
                                continue;
                            }
                            let h_start = (oh * stride_h) as isize - pad_h;
                            let w_start = (ow * stride_w) as isize - pad_w;
                            for ic in 0..in_c {
                                for kh in 0..k_h {
                                    let ih = h_start + kh as isize;
                                    if ih < 0 || ih >= in_h as isize {
                                        continue;
                                    }
                                    for kw in 0..k_w {
                                        let iw = w_start + kw as isize;
                                        if iw < 0 || iw >= in_w as isize {
                                            continue;
                                        }
                                        let in_idx =
                                            ic * in_h * in_w + ih as usize * in_w + iw as usize;
                                        let k_idx = ((oc * in_c + ic) * k_h + kh) * k_w + kw;
                                        sample_dx[in_idx] += grad_val * kernel[k_idx];
                                        sample_dk[k_idx] += grad_val * sample_in[in_idx];
                                    }
                                }
                            }
                        }
                    }
                }
                (sample_dx, sample_dk)
            })
            .collect();

        // Reduce: 累加所有 batch 样本的卷积核梯度
        let mut dk = vec![0.0f32; kernel_size];
        let mut dx = Vec::with_capacity(batch_size * in_sample);
        for (sample_dx, sample_dk) in per_sample {
            dx.extend(sample_dx);
            for (total, g) in dk.iter_mut().zip(sample_dk) {
                *total += g;
            }
        }
        *self.weight.grad_mut() = Tensor::try_new(dk, &[out_c, in_c, k_h, k_w])?;

        if let Some(bias) = &mut self.bias {
            *bias.grad_mut() = channel_sums(dy, batch_size, out_c, out_h * out_w)?;
        }
        Ok(Tensor::try_new(dx, &[batch_size, in_c, in_h, in_w])?)
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>, NnError> {
        let (out_h, out_w) = self.checked_output(input_shape)?;
        Ok(vec![input_shape[0], self.out_channels, out_h, out_w])
    }

    fn params(&self) -> Vec<&Param> {
        std::iter::once(&self.weight).chain(self.bias.as_ref()).collect()
    }

    fn params_mut(&mut self) -> Vec<&mut Param> {
        std::iter::once(&mut self.weight)
            .chain(self.bias.as_mut())
            .collect()
    }
}

pub(super) fn dims4(shape: &[usize]) -> (usize, usize, usize, usize) {
    (shape[0], shape[1], shape[2], shape[3])
}

/// 对 [batch, channels, spatial] 布局的梯度按通道求和，得到 [channels] 的偏置梯度
pub(super) fn channel_sums(
    grad: &[f32],
    batch_size: usize,
    channels: usize,
    spatial: usize,
) -> Result<Tensor, NnError> {
    let mut sums = vec![0.0f32; channels];
    for b in 0..batch_size {
        for (c, sum) in sums.iter_mut().enumerate() {
            let start = (b * channels + c) * spatial;
            *sum += grad[start..start + spatial].iter().sum::<f32>();
        }
    }
    Ok(Tensor::try_new(sums, &[channels])?)
}
