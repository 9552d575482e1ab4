//! Boundary-based distances: Hausdorff distance and average symmetric surface
//! distance (ASSD).
//!
//! Both metrics are built on an exact Euclidean distance transform computed
//! separably, one axis at a time, as the lower envelope of parabolas
//! (Felzenszwalb & Huttenlocher, "Distance Transforms of Sampled Functions").
//! Voxel spacing enters as the distance between neighbouring samples on each
//! axis, so all results are in millimetres.

use ndarray::{Array3, ArrayView3, Axis, Zip};

use crate::error::{Error, Result};
use crate::label::Label;
use crate::volume::{LabelVolume, Spacing};

type Idx3d = (usize, usize, usize);

/// Squared Euclidean distance (mm²) from every voxel to the nearest `true`
/// voxel of `seeds`.
///
/// Seed voxels map to `0`. If there are no seeds at all every voxel is
/// `f64::INFINITY`.
#[must_use]
pub fn squared_distance_map(seeds: ArrayView3<'_, bool>, spacing: Spacing) -> Array3<f64> {
    let mut dist = seeds.mapv(|s| if s { 0.0 } else { f64::INFINITY });
    let longest = dist.shape().iter().copied().max().unwrap_or(0);

    let mut envelope = Envelope::with_capacity(longest);
    let mut input = Vec::with_capacity(longest);
    let mut output = Vec::with_capacity(longest);

    for (axis, step) in spacing.along_axes().into_iter().enumerate() {
        for mut lane in dist.lanes_mut(Axis(axis)) {
            input.clear();
            input.extend(lane.iter().copied());
            envelope.transform(&input, step, &mut output);
            for (d, v) in lane.iter_mut().zip(&output) {
                *d = *v;
            }
        }
    }

    dist
}

/// Scratch space for the 1D lower-envelope transform.
struct Envelope {
    /// Sample indices of the parabolas in the envelope.
    vertices: Vec<usize>,
    /// Left boundary of each parabola's region, same length as `vertices`.
    starts: Vec<f64>,
}

impl Envelope {
    fn with_capacity(n: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(n),
            starts: Vec::with_capacity(n),
        }
    }

    /// `out[q] = min_p (step·(q − p))² + f[p]` over the finite samples of `f`.
    fn transform(&mut self, f: &[f64], step: f64, out: &mut Vec<f64>) {
        self.vertices.clear();
        self.starts.clear();
        out.clear();

        for (q, &fq) in f.iter().enumerate() {
            if !fq.is_finite() {
                continue;
            }
            let xq = q as f64 * step;
            loop {
                let (Some(&p), Some(&start)) = (self.vertices.last(), self.starts.last()) else {
                    self.vertices.push(q);
                    self.starts.push(f64::NEG_INFINITY);
                    break;
                };
                let xp = p as f64 * step;
                // Where the parabola rooted at q overtakes the one rooted at p.
                let s = ((fq + xq * xq) - (f[p] + xp * xp)) / (2.0 * (xq - xp));
                if s <= start {
                    self.vertices.pop();
                    self.starts.pop();
                } else {
                    self.vertices.push(q);
                    self.starts.push(s);
                    break;
                }
            }
        }

        if self.vertices.is_empty() {
            out.resize(f.len(), f64::INFINITY);
            return;
        }

        let mut k = 0;
        for q in 0..f.len() {
            let xq = q as f64 * step;
            while k + 1 < self.vertices.len() && self.starts[k + 1] < xq {
                k += 1;
            }
            let p = self.vertices[k];
            let dx = xq - p as f64 * step;
            out.push(dx * dx + f[p]);
        }
    }
}

/// In-bounds face neighbours (6-connectivity) of `pos`.
#[inline]
fn face_neighbours((z, y, x): Idx3d, (nz, ny, nx): Idx3d) -> impl Iterator<Item = Idx3d> {
    [
        (z.wrapping_sub(1), y, x),
        (z.saturating_add(1), y, x),
        (z, y.wrapping_sub(1), x),
        (z, y.saturating_add(1), x),
        (z, y, x.wrapping_sub(1)),
        (z, y, x.saturating_add(1)),
    ]
    .into_iter()
    .filter(move |&(a, b, c)| a < nz && b < ny && c < nx)
}

/// Surface (contour) voxels of a binary mask: foreground voxels with at least
/// one face-connected background neighbour inside the volume.
#[must_use]
pub fn surface(mask: ArrayView3<'_, bool>) -> Array3<bool> {
    let dim = mask.dim();
    Array3::from_shape_fn(dim, |pos| {
        mask[pos] && face_neighbours(pos, dim).any(|n| !mask[n])
    })
}

/// Largest value of `dist` over the `true` voxels of `mask`.
fn max_over(mask: &Array3<bool>, dist: &Array3<f64>) -> f64 {
    let mut best = 0.0f64;
    Zip::from(mask).and(dist).for_each(|&m, &d| {
        if m {
            best = best.max(d);
        }
    });
    best
}

/// Distances (mm) sampled from a squared distance map at the `true` voxels of
/// `at`. Zero distances are kept: they mark voxels lying on both surfaces.
fn sample(dist: &Array3<f64>, at: &Array3<bool>) -> Vec<f64> {
    let mut out = Vec::new();
    Zip::from(dist).and(at).for_each(|&d, &s| {
        if s {
            out.push(d.sqrt());
        }
    });
    out
}

fn check_shapes(reference: &LabelVolume, target: &LabelVolume) -> Result<()> {
    if reference.shape() != target.shape() {
        return Err(Error::ShapeMismatch {
            expected: reference.shape(),
            actual: target.shape(),
        });
    }
    Ok(())
}

/// Binarize both volumes for `label`, failing if either mask is empty.
fn masks(
    reference: &LabelVolume,
    target: &LabelVolume,
    label: Label,
) -> Result<(Array3<bool>, Array3<bool>)> {
    check_shapes(reference, target)?;
    let a = reference.mask(label);
    if !a.iter().any(|&v| v) {
        return Err(Error::EmptyMask { label, side: "reference" });
    }
    let b = target.mask(label);
    if !b.iter().any(|&v| v) {
        return Err(Error::EmptyMask { label, side: "target" });
    }
    Ok((a, b))
}

/// Symmetric Hausdorff distance (mm) between the `label` masks of two volumes.
///
/// Distances use the reference volume's spacing.
///
/// # Errors
///
/// [`Error::EmptyMask`] if either mask is empty, [`Error::ShapeMismatch`] if
/// the volumes differ in shape.
pub fn hausdorff_distance(
    reference: &LabelVolume,
    target: &LabelVolume,
    label: Label,
) -> Result<f64> {
    let (a, b) = masks(reference, target, label)?;
    let spacing = reference.spacing();

    let to_a = squared_distance_map(a.view(), spacing);
    let to_b = squared_distance_map(b.view(), spacing);

    let a_to_b = max_over(&a, &to_b);
    let b_to_a = max_over(&b, &to_a);
    Ok(a_to_b.max(b_to_a).sqrt())
}

/// Surface-to-surface distances in both directions for one label.
#[derive(Debug, Clone, Default)]
pub struct SurfaceDistances {
    /// One entry per target surface voxel: distance to the reference surface.
    pub target_to_reference: Vec<f64>,
    /// One entry per reference surface voxel: distance to the target surface.
    pub reference_to_target: Vec<f64>,
}

impl SurfaceDistances {
    /// Compute both directed distance lists for `label`.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyMask`] if either mask is empty, [`Error::EmptySurface`] if
    /// a mask has no background neighbour anywhere, [`Error::ShapeMismatch`]
    /// if the volumes differ in shape.
    pub fn compute(reference: &LabelVolume, target: &LabelVolume, label: Label) -> Result<Self> {
        let (a, b) = masks(reference, target, label)?;
        let spacing = reference.spacing();

        let ref_surface = surface(a.view());
        let tar_surface = surface(b.view());
        let ref_count = ref_surface.iter().filter(|&&v| v).count();
        let tar_count = tar_surface.iter().filter(|&&v| v).count();
        if ref_count == 0 {
            return Err(Error::EmptySurface { label, side: "reference" });
        }
        if tar_count == 0 {
            return Err(Error::EmptySurface { label, side: "target" });
        }

        let to_ref = squared_distance_map(ref_surface.view(), spacing);
        let to_tar = squared_distance_map(tar_surface.view(), spacing);

        let target_to_reference = sample(&to_ref, &tar_surface);
        let reference_to_target = sample(&to_tar, &ref_surface);
        debug_assert_eq!(target_to_reference.len(), tar_count);
        debug_assert_eq!(reference_to_target.len(), ref_count);

        Ok(Self {
            target_to_reference,
            reference_to_target,
        })
    }

    /// Total number of surface voxels on both sides.
    #[must_use]
    pub fn len(&self) -> usize {
        self.target_to_reference.len() + self.reference_to_target.len()
    }

    /// Whether both lists are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Average symmetric surface distance: mean of both lists concatenated.
    #[must_use]
    pub fn assd(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let sum: f64 = self
            .target_to_reference
            .iter()
            .chain(&self.reference_to_target)
            .sum();
        sum / self.len() as f64
    }
}
