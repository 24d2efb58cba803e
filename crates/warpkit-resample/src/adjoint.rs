//! Adjoint resampling: scatter from the reference grid into the floating grid.
//!
//! The forward operator gathers each reference voxel from a handful of
//! floating voxels. Its adjoint distributes each reference voxel's value back
//! into those same floating voxels with the same weights, summing overlaps.
//! The taps are computed once per setup and stored as a [`SplatPlan`],
//! grouped by floating voxel so that the scatter runs as a race-free
//! parallel gather.

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use rayon::prelude::*;
use warpkit_core::image::{Image, ImageGeometry};
use warpkit_core::transform::{BSplineTransform, DeformationField};
use crate::config::Interpolation;
use crate::error::{ResampleError, Result};
use crate::forward::field_to_indices;
use crate::kernel;

/// Interpolation taps of a setup, grouped by the floating voxel they land on.
///
/// Row `t` lists every `(reference voxel, weight)` pair whose forward gather
/// reads floating voxel `t`, in ascending reference order. The adjoint then
/// becomes an independent weighted sum per floating voxel.
#[derive(Debug, Clone)]
pub struct SplatPlan {
    offsets: Vec<usize>,
    sources: Vec<usize>,
    weights: Vec<f64>,
    num_sources: usize,
    floating_dims: [usize; 3],
}

impl SplatPlan {
    /// Build the taps for `positions` (continuous floating indices, `[N * 3]`).
    ///
    /// Positions outside the floating extent get no taps.
    pub fn build(positions: &[f32], floating_dims: [usize; 3], interpolation: Interpolation) -> Self {
        let per_source: Vec<Vec<(usize, f64)>> = positions
            .par_chunks_exact(3)
            .map(|p| {
                let mut taps = Vec::new();
                let index = [p[0] as f64, p[1] as f64, p[2] as f64];
                kernel::for_each_tap(interpolation, index, floating_dims, |offset, w| taps.push((offset, w)));
                taps
            })
            .collect();

        let num_targets: usize = floating_dims.iter().product();
        let mut offsets = vec![0usize; num_targets + 1];
        for &(target, _) in per_source.iter().flatten() {
            offsets[target + 1] += 1;
        }
        for t in 0..num_targets {
            offsets[t + 1] += offsets[t];
        }

        // Visiting sources in order keeps each row sorted by source.
        let total = offsets[num_targets];
        let mut cursor = offsets.clone();
        let mut sources = vec![0usize; total];
        let mut weights = vec![0.0f64; total];
        for (source, taps) in per_source.iter().enumerate() {
            for &(target, w) in taps {
                let slot = cursor[target];
                sources[slot] = source;
                weights[slot] = w;
                cursor[target] += 1;
            }
        }

        Self {
            offsets,
            sources,
            weights,
            num_sources: per_source.len(),
            floating_dims,
        }
    }

    /// Number of reference voxels.
    pub fn num_sources(&self) -> usize {
        self.num_sources
    }

    /// Number of floating voxels.
    pub fn num_targets(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Total number of stored taps.
    pub fn num_taps(&self) -> usize {
        self.sources.len()
    }

    /// Floating grid size in index order.
    pub fn floating_dims(&self) -> [usize; 3] {
        self.floating_dims
    }

    /// Reference voxels and weights feeding one floating voxel.
    pub fn contributions(&self, target: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.offsets[target]..self.offsets[target + 1];
        self.sources[range.clone()]
            .iter()
            .copied()
            .zip(self.weights[range].iter().copied())
    }

    /// Distribute `input` (one value per reference voxel) into the floating grid.
    ///
    /// Each floating voxel sums its own row, so the result does not depend on
    /// thread count or scheduling.
    pub fn splat(&self, input: &[f32]) -> Vec<f64> {
        (0..self.num_targets())
            .into_par_iter()
            .map(|target| {
                self.contributions(target)
                    .fold(0.0f64, |acc, (source, w)| acc + w * input[source] as f64)
            })
            .collect()
    }
}

/// Control-point parameterisation of a deformation, with the adjoint operator.
///
/// The lattice is the grid of the deformation field and the parameters are the
/// field's positions. By default the dense field itself drives the adjoint;
/// replacing the parameters switches to the cubic B-spline the lattice defines.
#[derive(Debug, Clone)]
pub struct ControlPointTransformation<B: Backend> {
    spline: BSplineTransform<B>,
    dense_field: Option<DeformationField<B>>,
    interpolation: Interpolation,
    padding_value: f32,
    plan: Option<SplatPlan>,
}

impl<B: Backend> ControlPointTransformation<B> {
    /// Parameterise `field` on its own grid.
    pub fn new(field: &DeformationField<B>) -> Result<Self> {
        Ok(Self {
            spline: BSplineTransform::from_deformation(field)?,
            dense_field: Some(field.clone()),
            interpolation: Interpolation::Linear,
            padding_value: 0.0,
            plan: None,
        })
    }

    pub fn lattice(&self) -> &ImageGeometry<3> {
        self.spline.lattice()
    }

    /// Control-point positions, `[num_control_points, 3]`.
    pub fn parameters(&self) -> Tensor<B, 2> {
        self.spline.coefficients()
    }

    /// Replace the control-point positions. The dense override is dropped.
    pub fn set_parameters(&mut self, parameters: Tensor<B, 2>) -> Result<()> {
        self.spline.set_coefficients(parameters)?;
        self.dense_field = None;
        self.plan = None;
        Ok(())
    }

    /// Drive the adjoint from an explicit dense field on the lattice grid.
    pub fn set_dense_field(&mut self, field: DeformationField<B>) -> Result<()> {
        if field.geometry().shape() != self.lattice().shape() {
            return Err(ResampleError::incompatible_geometry(format!(
                "dense field shape {:?} does not match lattice {:?}",
                field.geometry().shape(),
                self.lattice().shape()
            )));
        }
        self.dense_field = Some(field);
        self.plan = None;
        Ok(())
    }

    /// Select the scatter kernel. Sinc has no adjoint.
    pub fn set_interpolation(&mut self, interpolation: Interpolation) -> Result<()> {
        if !interpolation.supports_adjoint() {
            return Err(ResampleError::unsupported_interpolation(format!(
                "{interpolation:?} has no adjoint"
            )));
        }
        if interpolation != self.interpolation {
            self.interpolation = interpolation;
            self.plan = None;
        }
        Ok(())
    }

    /// Padding of the matching forward operator. Positions outside the
    /// floating extent never receive taps, so the value does not enter the
    /// scatter.
    pub fn set_padding_value(&mut self, padding_value: f32) {
        self.padding_value = padding_value;
    }

    pub fn padding_value(&self) -> f32 {
        self.padding_value
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    /// Dense field of positions on the lattice grid.
    pub fn evaluate(&self) -> Result<DeformationField<B>> {
        match &self.dense_field {
            Some(field) => Ok(field.clone()),
            None => Ok(self.spline.evaluate_at_grid(self.lattice())?),
        }
    }

    /// Build the splat plan into a floating grid.
    pub fn prepare(&mut self, floating: &ImageGeometry<3>) -> Result<()> {
        let field = self.evaluate()?;
        let positions = field_to_indices(floating, &field)?;
        let plan = SplatPlan::build(&positions, floating.index_dims(), self.interpolation);
        tracing::debug!(
            sources = plan.num_sources(),
            taps = plan.num_taps(),
            interpolation = ?self.interpolation,
            "built splat plan"
        );
        self.plan = Some(plan);
        Ok(())
    }

    pub fn plan(&self) -> Option<&SplatPlan> {
        self.plan.as_ref()
    }

    /// Apply the adjoint to `input` (lattice grid), writing into `output`
    /// (floating grid). `output` is overwritten, not accumulated into.
    pub fn transform_image_adjoint(&self, input: &Image<B, 3>, output: &mut Image<B, 3>) -> Result<()> {
        let plan = self
            .plan
            .as_ref()
            .ok_or_else(|| ResampleError::uninitialized("splat plan has not been prepared"))?;

        if input.shape() != self.lattice().shape() {
            return Err(ResampleError::incompatible_geometry(format!(
                "adjoint input shape {:?} does not match lattice {:?}",
                input.shape(),
                self.lattice().shape()
            )));
        }
        if output.geometry().index_dims() != plan.floating_dims() {
            return Err(ResampleError::incompatible_geometry(format!(
                "adjoint output shape {:?} does not match floating grid {:?}",
                output.geometry().index_dims(),
                plan.floating_dims()
            )));
        }

        let accumulated = plan.splat(&input.to_voxels()?);
        output.set_voxels(accumulated.into_iter().map(|v| v as f32).collect())?;
        Ok(())
    }
}

/// One-shot adjoint of the forward resampling defined by `field`.
///
/// `input` lives on the field's grid; the result lives on `floating`.
pub fn resample_adjoint<B: Backend>(
    input: &Image<B, 3>,
    field: &DeformationField<B>,
    floating: &ImageGeometry<3>,
    interpolation: Interpolation,
    padding: f32,
) -> Result<Image<B, 3>> {
    let mut evaluator = ControlPointTransformation::new(field)?;
    evaluator.set_interpolation(interpolation)?;
    evaluator.set_padding_value(padding);
    evaluator.prepare(floating)?;

    let mut output = Image::zeros(floating.clone(), &input.device());
    evaluator.transform_image_adjoint(input, &mut output)?;
    Ok(output)
}
