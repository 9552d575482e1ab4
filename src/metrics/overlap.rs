//! Dice overlap coefficient.

use crate::error::{Error, Result};
use crate::label::Label;
use crate::volume::LabelVolume;

/// Dice coefficient for `label`: `2|A∩B| / (|A|+|B|)`.
///
/// When neither volume contains `label` the two (empty) sets are identical and
/// the coefficient is defined as `1.0`.
///
/// # Errors
///
/// Returns [`Error::ShapeMismatch`] if the volumes differ in shape.
pub fn dice(reference: &LabelVolume, target: &LabelVolume, label: Label) -> Result<f64> {
    if reference.shape() != target.shape() {
        return Err(Error::ShapeMismatch {
            expected: reference.shape(),
            actual: target.shape(),
        });
    }

    let a = reference.count(label);
    let b = target.count(label);
    if a + b == 0 {
        return Ok(1.0);
    }

    let both = reference.intersection(target, label);
    Ok(2.0 * both as f64 / (a + b) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::Spacing;
    use ndarray::{Array3, s};

    fn volume(fill: impl FnOnce(&mut Array3<u16>)) -> LabelVolume {
        let mut data = Array3::<u16>::zeros((4, 8, 8));
        fill(&mut data);
        LabelVolume::new(data, Spacing::default())
    }

    #[test]
    fn test_identical_masks() {
        let a = volume(|d| d.slice_mut(s![1..3, 2..6, 2..6]).fill(1));
        let d = dice(&a, &a, Label::LvCavity).unwrap();
        assert_eq!(d, 1.0);
    }

    #[test]
    fn test_disjoint_masks() {
        let a = volume(|d| d.slice_mut(s![.., 0..2, 0..2]).fill(2));
        let b = volume(|d| d.slice_mut(s![.., 5..7, 5..7]).fill(2));
        assert_eq!(dice(&a, &b, Label::Myocardium).unwrap(), 0.0);
    }

    #[test]
    fn test_partial_overlap() {
        // 16 vs 8 voxels, 8 shared: 2*8/24
        let a = volume(|d| d.slice_mut(s![0..1, 0..4, 0..4]).fill(1));
        let b = volume(|d| d.slice_mut(s![0..1, 0..2, 0..4]).fill(1));
        let v = dice(&a, &b, Label::LvCavity).unwrap();
        assert!((v - 2.0 / 3.0).abs() < 1e-12);
        assert!((0.0..=1.0).contains(&v));
    }

    #[test]
    fn test_other_labels_do_not_count() {
        let a = volume(|d| {
            d.slice_mut(s![0..1, 0..4, 0..4]).fill(1);
            d[[3, 7, 7]] = 2;
        });
        let b = volume(|d| {
            d.slice_mut(s![0..1, 0..4, 0..4]).fill(1);
            d[[3, 7, 7]] = 3;
        });
        assert_eq!(dice(&a, &b, Label::LvCavity).unwrap(), 1.0);
        assert_eq!(dice(&a, &b, Label::Myocardium).unwrap(), 0.0);
    }

    #[test]
    fn test_both_empty_is_one() {
        let a = volume(|_| {});
        assert_eq!(dice(&a, &a, Label::Mvo).unwrap(), 1.0);
    }

    #[test]
    fn test_shape_mismatch() {
        let a = volume(|_| {});
        let b = LabelVolume::new(Array3::zeros((2, 2, 2)), Spacing::default());
        assert!(matches!(
            dice(&a, &b, Label::LvCavity),
            Err(Error::ShapeMismatch { .. })
        ));
    }
}
