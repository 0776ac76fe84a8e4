//! Discovery helpers for tooling and overlay-compatibility checks.

use crate::registry::default_registry;

/// Registry names of transforms that may move pixels (crop, resize, pad,
/// affine, flip). Box or keypoint overlays drawn on the input no longer
/// line up after a pipeline containing one of these runs. `random_augment`
/// counts because its op pool includes shear, translate and rotate.
///
/// Keep in sync with the spatial built-ins in `registry::builtins`.
pub const SPATIAL_TRANSFORMS: &[&str] = &[
    "center_crop",
    "centercrop_resize",
    "pad2square",
    "random_affine",
    "random_augment",
    "random_crop",
    "random_crop_and_resize",
    "random_horizonflip",
    "random_rotate",
    "random_verticalflip",
    "resize",
];

pub fn is_spatial(name: &str) -> bool {
    SPATIAL_TRANSFORMS.contains(&name)
}

/// Sorted names of every built-in transform.
pub fn list_augments() -> Vec<String> {
    default_registry().list_names()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spatial_set_is_registered() {
        let names = list_augments();
        for spatial in SPATIAL_TRANSFORMS {
            assert!(
                names.iter().any(|n| n == spatial),
                "{spatial} is marked spatial but not registered"
            );
        }
    }

    #[test]
    fn test_photometric_is_not_spatial() {
        assert!(is_spatial("pad2square"));
        assert!(!is_spatial("color_jitter"));
        assert!(!is_spatial("random_cutout"));
        assert!(!is_spatial("random_cutaddnoise"));
        assert!(!is_spatial("to_tensor"));
    }

    #[test]
    fn test_geometric_transforms_are_spatial() {
        for name in [
            "random_affine",
            "random_rotate",
            "random_horizonflip",
            "random_verticalflip",
            "random_augment",
        ] {
            assert!(is_spatial(name), "{name} moves pixels");
        }
    }

    #[test]
    fn test_list_augments_sorted_and_unique() {
        let names = list_augments();
        let mut sorted = names.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(names, sorted);
        assert!(names.contains(&"random_cutout".to_string()));
    }
}
