//! Behavioural properties of compiled pipelines.
//!
//! Tests cover:
//! - Cutout: identity at p = 0, always changes the image at p = 1
//! - Square padding geometry in both modes
//! - random_choice picks candidates uniformly
//! - Same config + same seed → pixel-identical output
//! - Noise-patch pool loading

mod common;
use common::{gradient_image, solid_image, write_noise_images};

use augmentation::rng::{init_worker_rng, seed_rng};
use augmentation::transforms::vision::{Cutout, PadMode, PadToSquare};
use augmentation::{create_aug_transforms, AugmentError, Pixels, Transform};

use anyhow::Result;
use image::{DynamicImage, GenericImageView};
use serde_json::json;

// ============================================================================
// Cutout
// ============================================================================

#[test]
fn test_cutout_probability_zero_is_identity() -> Result<()> {
    seed_rng(17);
    let pipeline = create_aug_transforms(&json!({
        "random_cutout": {"n_holes": 3, "length": 8, "prob": 0.0},
    }))?;
    let img = Pixels::Image(gradient_image(24, 24));
    for _ in 0..1000 {
        assert_eq!(pipeline.apply(img.clone())?, img);
    }
    Ok(())
}

#[test]
fn test_cutout_probability_one_always_changes() -> Result<()> {
    seed_rng(18);
    let cutout = Cutout::new(1, 4, 0.2, None, None, 1.0)?;
    let img = solid_image(20, 20, [255, 255, 255]);
    for _ in 0..200 {
        assert_ne!(cutout.apply(img.clone())?, img);
    }
    Ok(())
}

#[test]
fn test_cutout_hole_stays_inside_from_origin() -> Result<()> {
    seed_rng(19);
    // Centres hug the top-left corner, so holes are clamped at (0, 0)
    let cutout = Cutout::new(1, 10, 0.0, Some([0, 2]), Some([0, 2]), 1.0)?;
    for _ in 0..50 {
        let out = cutout.apply(solid_image(16, 16, [255, 255, 255]))?.to_rgb8();
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(out.get_pixel(15, 15).0, [255, 255, 255]);
    }
    Ok(())
}

// ============================================================================
// Square padding
// ============================================================================

#[test]
fn test_pad_to_square_average_centers() -> Result<()> {
    let pad = PadToSquare::new([9, 9, 9], PadMode::Average);
    for (w, h) in [(10, 4), (3, 8), (7, 7), (1, 6)] {
        let src = solid_image(w, h, [200, 100, 50]);
        let out = pad.apply(src)?;
        let side = w.max(h);
        assert_eq!(out.dimensions(), (side, side));

        let (x, y) = pad.offset(w, h);
        let left_gap = x as i64;
        let right_gap = (side - w - x) as i64;
        let top_gap = y as i64;
        let bottom_gap = (side - h - y) as i64;
        assert!((left_gap - right_gap).abs() <= 1);
        assert!((top_gap - bottom_gap).abs() <= 1);

        let rgb = out.to_rgb8();
        assert_eq!(rgb.get_pixel(x, y).0, [200, 100, 50]);
    }
    Ok(())
}

#[test]
fn test_pad_to_square_edge_is_flush() -> Result<()> {
    let pipeline = create_aug_transforms(&json!({
        "pad2square": {"pad_value": [1, 2, 3], "mode": "edge"},
    }))?;
    let out = pipeline
        .apply(solid_image(6, 2, [250, 250, 250]).into())?
        .into_image()?
        .to_rgb8();
    assert_eq!(out.dimensions(), (6, 6));
    // Padding entirely above; the source touches the bottom edge
    assert_eq!(out.get_pixel(0, 0).0, [1, 2, 3]);
    assert_eq!(out.get_pixel(5, 3).0, [1, 2, 3]);
    assert_eq!(out.get_pixel(0, 4).0, [250, 250, 250]);
    assert_eq!(out.get_pixel(5, 5).0, [250, 250, 250]);
    Ok(())
}

// ============================================================================
// random_choice
// ============================================================================

#[test]
fn test_random_choice_is_uniform() -> Result<()> {
    seed_rng(2024);
    let pipeline = create_aug_transforms(&json!({
        "random_choice": [
            {"random_invert": {"p": 1.0}},
            {"random_grayscale": {"p": 1.0}},
            {"random_horizonflip": {"p": 0.0}},
        ],
    }))?;
    let src = solid_image(2, 2, [200, 40, 10]);
    let inverted = solid_image(2, 2, [55, 215, 245]);

    const DRAWS: usize = 12_000;
    let mut counts = [0usize; 3];
    for _ in 0..DRAWS {
        let out = pipeline.apply(src.clone().into())?.into_image()?;
        let slot = if out == src {
            2
        } else if out == inverted {
            0
        } else {
            1
        };
        counts[slot] += 1;
    }
    for count in counts {
        let freq = count as f64 / DRAWS as f64;
        assert!((freq - 1.0 / 3.0).abs() < 0.03, "frequencies {counts:?}");
    }
    Ok(())
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_same_seed_same_output_across_compilations() -> Result<()> {
    let config = json!({
        "random_crop_and_resize": {"size": 24},
        "random_affine": {"degrees": 20, "translate": [0.1, 0.1]},
        "random_color_jitter": {"prob": 0.8, "brightness": 0.4, "hue": 0.1},
        "random_cutout": {"length": 6},
        "random_augment": "no_params",
        "to_tensor": "no_params",
        "normalize": "no_params",
    });
    let first = create_aug_transforms(&config)?;
    let second = create_aug_transforms(&config)?;
    let img = gradient_image(40, 32);

    for epoch in 0..3 {
        init_worker_rng(1, epoch, 42);
        let a = first.apply(img.clone().into())?;
        init_worker_rng(1, epoch, 42);
        let b = second.apply(img.clone().into())?;
        assert_eq!(a, b, "epoch {epoch} diverged");
    }
    Ok(())
}

#[test]
fn test_different_seeds_diverge() -> Result<()> {
    let pipeline = create_aug_transforms(&json!({
        "random_crop": {"size": 8},
        "random_cutout": {"length": 4, "prob": 1.0},
    }))?;
    let img = gradient_image(32, 32);
    let outputs: Vec<Pixels> = (0..8)
        .map(|seed| {
            seed_rng(seed);
            pipeline.apply(img.clone().into())
        })
        .collect::<Result<_>>()?;
    assert!(outputs.iter().any(|o| o != &outputs[0]));
    Ok(())
}

// ============================================================================
// Noise patches
// ============================================================================

#[test]
fn test_empty_noise_dir_fails_before_any_image() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let err = create_aug_transforms(&json!({
        "random_cutaddnoise": {"noisy_src": dir.path()},
    }))
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AugmentError>(),
        Some(AugmentError::EmptyNoisePool { .. })
    ));
    Ok(())
}

#[test]
fn test_noise_patches_replace_pixels() -> Result<()> {
    seed_rng(7);
    let dir = tempfile::tempdir()?;
    write_noise_images(dir.path(), 3)?;

    let pipeline = create_aug_transforms(&json!({
        "random_cutaddnoise": {"noisy_src": dir.path(), "n_holes": 2, "length": 8, "prob": 1.0},
    }))?;
    let src = solid_image(24, 24, [255, 255, 255]);
    let out: DynamicImage = pipeline.apply(src.clone().into())?.into_image()?;
    assert_eq!(out.dimensions(), (24, 24));
    assert_ne!(out, src);
    Ok(())
}
