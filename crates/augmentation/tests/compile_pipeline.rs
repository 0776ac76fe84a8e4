//! Compilation tests: registry lookup, step order, choice groups and errors.

mod common;
use common::gradient_image;

use augmentation::{
    compile, create_aug_transforms, is_spatial, list_augments, AugmentConfig, AugmentError,
    Params, Pixels, Transform, TransformRegistry,
};

use anyhow::Result;
use serde_json::json;

#[test]
fn test_n_plain_entries_give_n_steps_in_order() -> Result<()> {
    let pipeline = create_aug_transforms(&json!({
        "random_verticalflip": {"p": 0.0},
        "color_jitter": "no_params",
        "random_equalize": "no_params",
        "random_crop": {"size": 12},
        "to_tensor": "no_params",
        "normalize": "no_params",
    }))?;
    assert_eq!(pipeline.len(), 6);
    assert_eq!(
        pipeline.step_names(),
        vec![
            "random_verticalflip",
            "color_jitter",
            "random_equalize",
            "random_crop",
            "to_tensor",
            "normalize"
        ]
    );

    let tensor = pipeline.apply(gradient_image(20, 16).into())?.into_tensor()?;
    assert_eq!(tensor.dim(), (3, 12, 12));
    Ok(())
}

#[test]
fn test_duplicate_registration_keeps_first() -> Result<()> {
    let mut registry = TransformRegistry::with_builtins();
    let err = registry
        .register("resize", |_: &Params| -> Result<augmentation::transforms::BoxedTransform> {
            anyhow::bail!("replacement factory must not be stored")
        })
        .unwrap_err();
    assert!(matches!(err, AugmentError::DuplicateName { ref name } if name == "resize"));

    let config = AugmentConfig::from_value(&json!({"resize": {"size": 8}}))?;
    let out = compile(&config, &registry)?
        .apply(gradient_image(16, 32).into())?
        .into_image()?;
    assert_eq!((out.width(), out.height()), (8, 16));
    Ok(())
}

#[test]
fn test_unknown_name_fails_compilation() {
    let err = create_aug_transforms(&json!({
        "resize": {"size": 8},
        "random_sepia": "no_params",
    }))
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AugmentError>(),
        Some(AugmentError::UnknownName { name }) if name == "random_sepia"
    ));
}

#[test]
fn test_configuration_errors_name_offender() {
    let cases = [
        (json!({"resize": [8, 8]}), "resize"),
        (json!({"random_choice": [{"a": "no_params", "b": "no_params"}]}), "#0"),
        (json!({"pad2square": {"mode": "mirror"}}), "mirror"),
        (json!({"random_cutout": {"prob": 1.5}}), "prob"),
    ];
    for (config, needle) in cases {
        let err = create_aug_transforms(&config).unwrap_err();
        assert!(
            format!("{err:#}").contains(needle),
            "error for {config} does not mention {needle}: {err:#}"
        );
    }
}

#[test]
fn test_nested_choice_rejected() {
    let err = create_aug_transforms(&json!({
        "random_choice": [
            {"random_invert": "no_params"},
            {"random_choice": [{"random_equalize": "no_params"}]},
        ],
    }))
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AugmentError>(),
        Some(AugmentError::NestedChoice { position: 1 })
    ));
}

#[test]
fn test_config_embeds_in_serde_document() -> Result<()> {
    #[derive(serde::Deserialize)]
    struct Experiment {
        augment: AugmentConfig,
    }
    let experiment: Experiment = serde_json::from_value(json!({
        "augment": {"resize": {"size": 8}, "to_tensor_without_div": "no_params"},
    }))?;
    let pipeline = compile(&experiment.augment, augmentation::default_registry())?;
    let tensor = pipeline.apply(gradient_image(8, 8).into())?.into_tensor()?;
    assert!(tensor.iter().any(|v| *v > 1.0));

    let bad: Result<Experiment, _> = serde_json::from_value(json!({"augment": {"resize": 3}}));
    assert!(bad.is_err());
    Ok(())
}

#[test]
fn test_tensor_step_on_image_is_rejected() {
    let pipeline = create_aug_transforms(&json!({"normalize": "no_params"}));
    let err = pipeline
        .and_then(|p| p.apply(gradient_image(4, 4).into()))
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AugmentError>(),
        Some(AugmentError::UnexpectedInput { expected: "tensor", .. })
    ));
}

#[test]
fn test_spatial_introspection() -> Result<()> {
    let names = list_augments();
    assert_eq!(names.len(), 24);
    assert!(is_spatial("centercrop_resize"));
    assert!(!is_spatial("random_gaussianblur"));

    let photometric = create_aug_transforms(&json!({
        "random_invert": "no_params",
        "random_cutout": "no_params",
    }))?;
    assert!(!photometric.has_spatial_step());

    let spatial = create_aug_transforms(&json!({
        "random_invert": "no_params",
        "resize": {"size": 32},
    }))?;
    assert!(spatial.has_spatial_step());
    assert!(!spatial.select(&[0])?.has_spatial_step());

    let geometric = create_aug_transforms(&json!({
        "random_affine": {"degrees": 30},
        "random_rotate": {"degrees": 30},
    }))?;
    assert!(geometric.has_spatial_step());
    assert!(geometric.select(&[0])?.has_spatial_step());
    assert!(geometric.select(&[1])?.has_spatial_step());
    for name in ["random_horizonflip", "random_verticalflip", "random_augment"] {
        let single = create_aug_transforms(&json!({ name: "no_params" }))?;
        assert!(single.has_spatial_step(), "{name} should count as spatial");
    }

    let passthrough = Pixels::Image(gradient_image(4, 4));
    assert_eq!(create_aug_transforms(&json!({}))?.apply(passthrough.clone())?, passthrough);
    Ok(())
}
