/*
 * @Description  : ConvTranspose2d（转置卷积/反卷积）层，DCGAN 生成器的上采样主力
 *
 * 输入/输出形状：
 * - 输入：[batch_size, in_channels, H, W]
 * - 输出：[batch_size, out_channels, H', W']
 *
 * 输出尺寸计算：
 * H' = (H - 1) * stride_h - 2 * padding_h + kernel_h
 * W' = (W - 1) * stride_w - 2 * padding_w + kernel_w
 *
 * 正向即普通卷积对输入的梯度：每个输入元素按卷积核“散射”到输出上。
 */

use rayon::prelude::*;

use super::conv2d::{ConvGeometry, channel_sums, dims4};
use super::{Layer, cached, expect_rank};
use crate::nn::param::ParamKind;
use crate::nn::{NnError, Param};
use crate::tensor::Tensor;

pub struct ConvTranspose2d {
    name: String,
    in_channels: usize,
    out_channels: usize,
    geometry: ConvGeometry,
    /// 卷积核 [in_channels, out_channels, kernel_h, kernel_w]
    weight: Param,
    bias: Option<Param>,
    input: Option<Tensor>,
}

impl ConvTranspose2d {
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
                &[in_channels, out_channels, k_h, k_w],
            ),
            bias: use_bias
                .then(|| Param::new(format!("{name}_bias"), ParamKind::Bias, &[out_channels])),
            input: None,
        }
    }

    fn checked_output(&self, input_shape: &[usize]) -> Result<(usize, usize), NnError> {
        expect_rank(&self.name, input_shape, 4, Some(self.in_channels))?;
        self.geometry
            .deconv_output(input_shape[2], input_shape[3])
            .ok_or_else(|| NnError::ShapeMismatch {
                layer: self.name.clone(),
                expected: vec![input_shape[0], self.in_channels, 1, 1],
                got: input_shape.to_vec(),
            })
    }

    /// 遍历某个输入位置 (ih, iw) 经卷积核 (kh, kw) 映射到的合法输出位置
    fn for_each_target(
        &self,
        ih: usize,
        iw: usize,
        out_hw: (usize, usize),
        mut f: impl FnMut(usize, usize, usize),
    ) {
        let (k_h, k_w) = self.geometry.kernel;
        let (stride_h, stride_w) = self.geometry.stride;
        let (pad_h, pad_w) = (self.geometry.padding.0 as isize, self.geometry.padding.1 as isize);
        let (out_h, out_w) = out_hw;
        for kh in 0..k_h {
            let oh = (ih * stride_h + kh) as isize - pad_h;
            if oh < 0 || oh >= out_h as isize {
                continue;
            }
            for kw in 0..k_w {
                let ow = (iw * stride_w + kw) as isize - pad_w;
                if ow < 0 || ow >= out_w as isize {
                    continue;
                }
                // 传出 卷积核内偏移、输出行、输出列
                f(kh * k_w + kw, oh as usize, ow as usize);
            }
        }
    }
}

impl Layer for ConvTranspose2d {
    fn name(&self) -> &str {
        &self.name
    }

    fn forward(&mut self, input: &Tensor, is_train: bool) -> Result<Tensor, NnError> {
        let (out_h, out_w) = self.checked_output(input.shape())?;
        let (batch_size, in_c, in_h, in_w) = dims4(input.shape());
        let out_c = self.out_channels;
        let (k_h, k_w) = self.geometry.kernel;
        let k_area = k_h * k_w;

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
                for ic in 0..in_c {
                    for ih in 0..in_h {
                        for iw in 0..in_w {
                            let input_val = sample_in[(ic * in_h + ih) * in_w + iw];
                            if input_val == 0.0 {
                                continue;
                            }
                            self.for_each_target(ih, iw, (out_h, out_w), |k_off, oh, ow| {
                                for oc in 0..out_c {
                                    sample_out[(oc * out_h + oh) * out_w + ow] +=
                                        input_val * kernel[(ic * out_c + oc) * k_area + k_off];
                                }
                            });
                        }
                    }
                }
                if let Some(bias) = bias {
                    for (oc, plane) in sample_out.chunks_mut(out_h * out_w).enumerate() {
                        plane.iter_mut().for_each(|v| *v += bias[oc]);
                    }
                }
            });

        if is_train {
            self.input = Some(input.clone());
        }
        Ok(Tensor::try_new(output, &[batch_size, out_c, out_h, out_w])?)
    }

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
        let k_area = k_h * k_w;
        let x = input.as_slice();
        let dy = grad_output.as_slice();
        let kernel = self.weight.value().as_slice();
        let in_sample = in_c * in_h * in_w;
        let out_sample = out_c * out_h * out_w;
        let kernel_size = in_c * out_c * k_area;

        // dX[ic, ih, iw] = Σ dY[oc, oh, ow] * K[ic, oc, kh, kw]
        // dK[ic, oc, kh, kw] = Σ_b X[ic, ih, iw] * dY[oc, oh, ow]
        let per_sample: Vec<(Vec<f32>, Vec<f32>)> = (0..batch_size)
            .into_par_iter()
            .map(|b| {
                let sample_in = &x[b * in_sample..(b + 1) * in_sample];
                let sample_dy = &dy[b * out_sample..(b + 1) * out_sample];
                let mut sample_dx = vec![0.0f32; in_sample];
                let mut sample_dk = vec![0.0f32; kernel_size];
                for ic in 0..in_c {
                    for ih in 0..in_h {
                        for iw in 0..in_w {
                            let in_idx = (ic * in_h + ih) * in_w + iw;
                            let input_val = sample_in[in_idx];
                            let mut grad_in = 0.0f32;
                            self.for_each_target(ih, iw, (out_h, out_w), |k_off, oh, ow| {
                                for oc in 0..out_c {
                                    let grad_val = sample_dy[(oc * out_h + oh) * out_w + ow];
                                    let k_idx = (ic * out_c + oc) * k_area + k_off;
                                    grad_in += grad_val * kernel[k_idx];
                                    sample_dk[k_idx] += grad_val * input_val;
                                }
                            });
                            sample_dx[in_idx] = grad_in;
                        }
                    }
                }
                (sample_dx, sample_dk)
            })
            .collect();

        let mut dk = vec![0.0f32; kernel_size];
        let mut dx = Vec::with_capacity(batch_size * in_sample);
        for (sample_dx, sample_dk) in per_sample {
            dx.extend(sample_dx);
            for (total, g) in dk.iter_mut().zip(sample_dk) {
                *total += g;
            }
        }
        *self.weight.grad_mut() = Tensor::try_new(dk, &[in_c, out_c, k_h, k_w])?;

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
