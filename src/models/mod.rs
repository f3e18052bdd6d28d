pub mod dcgan;

pub use dcgan::{build_modules, discriminator, generator};
