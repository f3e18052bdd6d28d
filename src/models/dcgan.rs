/*
 * @Description  : 28×28 单通道图像的 DCGAN 生成器与判别器
 *
 * 生成器：z[B, Z] → fc → bn → relu → [B, 2ngf, 7, 7] → deconv(4,2,1) → bn → relu
 *         → deconv(4,2,1) → tanh → [B, 1, 28, 28]
 * 判别器：[B, 1, 28, 28] → conv(4,2,1) → lrelu → conv(4,2,1) → bn → lrelu → fc → [B, 1]
 */

use rand::Rng;
use tracing::info;

use crate::config::Config;
use crate::config::NetworkConfig;
use crate::module::NetModule;
use crate::nn::{
    AdamConfig, BatchNorm, Conv2d, ConvGeometry, ConvTranspose2d, Flatten, LeakyRelu, Linear,
    LogisticRegressionOutput, NnError, Normal, Optimizer, Relu, Reshape, Sequential, Tanh,
};

/// 28 = 7 × 2 × 2
const BASE_SIDE: usize = 7;
const LEAKY_SLOPE: f32 = 0.2;

fn down_up() -> ConvGeometry {
    ConvGeometry::new((4, 4), (2, 2), (1, 1))
}

pub fn generator(network: &NetworkConfig) -> Sequential {
    let ngf = network.ngf;
    let base = ngf * 2 * BASE_SIDE * BASE_SIDE;
    Sequential::new("generator")
        .add(Linear::new("g_fc", network.z_dim, base, false))
        .add(BatchNorm::new("g_bn1", base, true))
        .add(Relu::new("g_relu1"))
        .add(Reshape::new("g_reshape", &[ngf * 2, BASE_SIDE, BASE_SIDE]))
        .add(ConvTranspose2d::new("g_deconv2", ngf * 2, ngf, down_up(), false))
        .add(BatchNorm::new("g_bn2", ngf, true))
        .add(Relu::new("g_relu2"))
        .add(ConvTranspose2d::new("g_deconv3", ngf, 1, down_up(), false))
        .add(Tanh::new("g_tanh"))
}

/// 输出的是 logit，sigmoid 由输出头 [`LogisticRegressionOutput`] 负责
pub fn discriminator(network: &NetworkConfig) -> Sequential {
    let ndf = network.ndf;
    Sequential::new("discriminator")
        .add(Conv2d::new("d_conv1", 1, ndf, down_up(), false))
        .add(LeakyRelu::new("d_lrelu1", LEAKY_SLOPE))
        .add(Conv2d::new("d_conv2", ndf, ndf * 2, down_up(), false))
        .add(BatchNorm::new("d_bn2", ndf * 2, true))
        .add(LeakyRelu::new("d_lrelu2", LEAKY_SLOPE))
        .add(Flatten::new("d_flatten"))
        .add(Linear::new("d_fc", ndf * 2 * BASE_SIDE * BASE_SIDE, 1, true))
}

/// 构建、绑定并初始化生成器与判别器，二者都挂上 Adam 优化器
///
/// `data_shape` 是真实数据批的形状 [B, 1, 28, 28]；生成器的输出形状必须与之一致。
pub fn build_modules<R: Rng + ?Sized>(
    config: &Config,
    data_shape: &[usize],
    rng: &mut R,
) -> Result<(NetModule, NetModule), NnError> {
    let batch_size = config.train.batch_size;
    let initializer = Normal::new(config.network.sigma);
    let optimizer = AdamConfig {
        learning_rate: config.train.lr,
        beta1: config.train.beta1,
        ..AdamConfig::default()
    };

    let mut generator = NetModule::new("generator", generator(&config.network), None);
    generator.bind(&[batch_size, config.network.z_dim], None, false)?;
    let fake_shape = generator.output_shape()?.to_vec();
    if fake_shape != data_shape {
        return Err(NnError::ShapeMismatch {
            layer: "generator".to_string(),
            expected: data_shape.to_vec(),
            got: fake_shape,
        });
    }
    generator.init_params(&initializer, &mut *rng)?;
    generator.init_optimizer(optimizer)?;

    let mut discriminator = NetModule::new(
        "discriminator",
        discriminator(&config.network),
        Some(LogisticRegressionOutput::new()),
    );
    discriminator.bind(data_shape, Some(&[batch_size]), true)?;
    discriminator.init_params(&initializer, rng)?;
    discriminator.init_optimizer(optimizer)?;

    let learning_rate = |module: &NetModule| module.optimizer().map(Optimizer::learning_rate);
    info!(
        "模块就绪: generator {} 个参数张量 (lr {:?}), discriminator {} 个参数张量 (lr {:?})",
        generator.params().len(),
        learning_rate(&generator),
        discriminator.params().len(),
        learning_rate(&discriminator)
    );
    Ok((generator, discriminator))
}
