use crate::tensor::Tensor;
use crate::vision::{ImageType, Vision, VisionError};

#[test]
fn test_image_type() -> Result<(), VisionError> {
    assert_eq!(Vision::image_type(&Tensor::zeros(&[4, 5]))?, ImageType::Gray);
    assert_eq!(Vision::image_type(&Tensor::zeros(&[4, 5, 1]))?, ImageType::Gray);
    assert_eq!(Vision::image_type(&Tensor::zeros(&[4, 5, 3]))?, ImageType::Rgb);
    assert!(matches!(
        Vision::image_type(&Tensor::zeros(&[4, 5, 2])),
        Err(VisionError::NotImage(_))
    ));
    Ok(())
}

#[test]
fn test_to_pixel() {
    assert_eq!(Vision::to_pixel(-1.0), 0);
    assert_eq!(Vision::to_pixel(0.0), 128);
    assert_eq!(Vision::to_pixel(1.0), 255);
    assert_eq!(Vision::to_pixel(3.0), 255);
    assert_eq!(Vision::to_pixel(-3.0), 0);
}

#[test]
fn test_tile_grid_layout() -> Result<(), VisionError> {
    // 3 张 1x2x2 图像 → 2x2 网格，最后一格空着
    let batch = Tensor::new(
        &[0.1, 0.1, 0.1, 0.1, 0.2, 0.2, 0.2, 0.2, 0.3, 0.3, 0.3, 0.3],
        &[3, 1, 2, 2],
    );
    let grid = Vision::tile_grid(&batch)?;
    assert_eq!(grid.shape(), &[4, 4, 1]);
    assert_eq!(grid[[0, 0, 0]], 0.1);
    assert_eq!(grid[[1, 3, 0]], 0.2);
    assert_eq!(grid[[3, 1, 0]], 0.3);
    assert_eq!(grid[[3, 3, 0]], -1.0);
    Ok(())
}

#[test]
fn test_comparison_figure_places_fake_left() -> Result<(), VisionError> {
    let fake = Tensor::full(0.5, &[4, 1, 3, 3]);
    let real = Tensor::full(-0.5, &[4, 1, 3, 3]);
    let figure = Vision::comparison_figure(&fake, &real)?;
    assert_eq!(figure.shape(), &[6, 12, 1]);
    assert_eq!(figure[[0, 0, 0]], 0.5);
    assert_eq!(figure[[5, 11, 0]], -0.5);

    let rgb = Tensor::zeros(&[4, 3, 3, 3]);
    assert!(matches!(
        Vision::comparison_figure(&fake, &rgb),
        Err(VisionError::GridMismatch { .. })
    ));
    Ok(())
}

#[test]
fn test_save_comparison_png() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("mnist-train-0001.png");
    let fake = Tensor::full(1.0, &[4, 1, 2, 2]);
    let real = Tensor::full(-1.0, &[4, 1, 2, 2]);
    Vision::save_comparison(&fake, &real, &path)?;

    let image = image::open(&path)?.to_luma8();
    assert_eq!(image.dimensions(), (8, 4));
    assert_eq!(image.get_pixel(0, 0)[0], 255);
    assert_eq!(image.get_pixel(7, 3)[0], 0);

    let rgb_path = dir.path().join("rgb.png");
    Vision::save_comparison(
        &Tensor::zeros(&[1, 3, 2, 2]),
        &Tensor::zeros(&[1, 3, 2, 2]),
        &rgb_path,
    )?;
    assert_eq!(image::open(&rgb_path)?.to_rgb8().dimensions(), (4, 2));
    Ok(())
}
