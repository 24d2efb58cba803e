//! The resampling engine.
//!
//! A [`ResampleEngine`] holds a [`ResamplingContext`] (images, transformations
//! and options) and the setup cache derived from it. The forward operator
//! gathers the floating image onto the reference grid through the composed
//! deformation field; the adjoint scatters a reference-grid image back onto the
//! floating grid through the same field and weights.
//!
//! The field is always sampled on the reference grid, the grid the forward
//! operator writes and the adjoint reads.

use std::sync::Arc;
use burn::tensor::backend::Backend;
use warpkit_core::image::Image;
use warpkit_core::transform::{DeformationField, Transformation};
use crate::adjoint::ControlPointTransformation;
use crate::cache::{AdjointSetup, AdjointWeights, CacheState, ForwardSetup, SetupCache};
use crate::compose::compose;
use crate::config::{Interpolation, ResampleConfig, TransformDirection};
use crate::error::{ResampleError, Result};
use crate::forward::{field_to_indices, resample_forward};
use crate::reconcile::{reconcile, ImageHandle};
use crate::validation::check_image;

/// Inputs and options of a resampling run.
#[derive(Debug, Clone)]
pub struct ResamplingContext<B: Backend> {
    reference: Option<ImageHandle<B>>,
    floating: Option<ImageHandle<B>>,
    transformations: Vec<Transformation<B>>,
    adjoint_input: Option<Arc<Image<B, 3>>>,
    config: ResampleConfig,
    generation: u64,
}

impl<B: Backend> ResamplingContext<B> {
    fn new(config: ResampleConfig) -> Self {
        Self {
            reference: None,
            floating: None,
            transformations: Vec::new(),
            adjoint_input: None,
            config,
            generation: 0,
        }
    }

    pub fn reference(&self) -> Option<&ImageHandle<B>> {
        self.reference.as_ref()
    }

    pub fn floating(&self) -> Option<&ImageHandle<B>> {
        self.floating.as_ref()
    }

    pub fn transformations(&self) -> &[Transformation<B>] {
        &self.transformations
    }

    pub fn config(&self) -> &ResampleConfig {
        &self.config
    }

    /// Incremented by every change that invalidates setup.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Forward/adjoint resampling engine.
///
/// # Examples
/// ```rust
/// use burn_ndarray::NdArray;
/// use warpkit_core::image::{Image, ImageGeometry};
/// use warpkit_core::spatial::Vector;
/// use warpkit_core::transform::AffineTransform;
/// use warpkit_resample::{Interpolation, ResampleEngine};
///
/// type Backend = NdArray<f32>;
///
/// let device = Default::default();
/// let geometry = ImageGeometry::from_shape([4, 4, 4]);
/// let floating = Image::<Backend, 3>::filled(geometry.clone(), 1.0, &device);
///
/// let mut engine = ResampleEngine::new(device);
/// engine.set_reference_image(Image::zeros(geometry, &Default::default()));
/// engine.set_floating_image(floating);
/// engine.add_transformation(AffineTransform::from_translation(Vector::new([0.5, 0.0, 0.0])));
/// engine.set_interpolation(Interpolation::Linear);
///
/// let output = engine.process().unwrap();
/// assert_eq!(output.shape(), [4, 4, 4]);
/// ```
#[derive(Debug)]
pub struct ResampleEngine<B: Backend> {
    context: ResamplingContext<B>,
    cache: SetupCache<B>,
    output: Option<Image<B, 3>>,
    composition_count: usize,
    device: B::Device,
}

impl<B: Backend> ResampleEngine<B> {
    /// Create an engine with default options.
    pub fn new(device: B::Device) -> Self {
        Self::from_config(ResampleConfig::default(), device)
    }

    /// Create an engine with the given options.
    pub fn from_config(config: ResampleConfig, device: B::Device) -> Self {
        Self {
            context: ResamplingContext::new(config),
            cache: SetupCache::Uninitialized,
            output: None,
            composition_count: 0,
            device,
        }
    }

    pub fn context(&self) -> &ResamplingContext<B> {
        &self.context
    }

    fn invalidate(&mut self) {
        self.context.generation += 1;
        self.cache.reset();
    }

    /// Set the image defining the output grid of the forward operator.
    pub fn set_reference_image(&mut self, image: impl Into<ImageHandle<B>>) {
        self.context.reference = Some(image.into());
        self.invalidate();
    }

    /// Set the image the forward operator samples.
    pub fn set_floating_image(&mut self, image: impl Into<ImageHandle<B>>) {
        self.context.floating = Some(image.into());
        self.invalidate();
    }

    /// Append a transformation. Transformations apply in insertion order.
    pub fn add_transformation(&mut self, transformation: impl Into<Transformation<B>>) {
        self.context.transformations.push(transformation.into());
        self.invalidate();
    }

    /// Replace the transformation list.
    pub fn set_transformations(&mut self, transformations: Vec<Transformation<B>>) {
        self.context.transformations = transformations;
        self.invalidate();
    }

    pub fn clear_transformations(&mut self) {
        self.context.transformations.clear();
        self.invalidate();
    }

    pub fn set_interpolation(&mut self, interpolation: Interpolation) {
        self.context.config.interpolation = interpolation;
        self.invalidate();
    }

    /// Set the interpolation from an integer code (0, 1, 3 or 4).
    pub fn set_interpolation_code(&mut self, code: i32) -> Result<()> {
        self.set_interpolation(Interpolation::from_code(code)?);
        Ok(())
    }

    pub fn set_padding_value(&mut self, value: f32) {
        self.context.config.padding_value = value;
        self.invalidate();
    }

    /// Choose which operator `process` applies.
    pub fn set_direction(&mut self, direction: TransformDirection) {
        self.context.config.direction = direction;
        self.invalidate();
    }

    /// Set the reference-grid image `process` back-projects in the adjoint
    /// direction. Does not affect setup.
    pub fn set_adjoint_input(&mut self, image: impl Into<Arc<Image<B, 3>>>) {
        self.context.adjoint_input = Some(image.into());
    }

    /// Run the operator selected by the context's direction.
    ///
    /// The result is kept and available through [`ResampleEngine::output`].
    pub fn process(&mut self) -> Result<Image<B, 3>> {
        let output = match self.context.config.direction {
            TransformDirection::Forward => {
                self.ensure_forward()?;
                let setup = self.forward_setup()?;
                let floating = Arc::clone(&setup.floating);
                self.apply_forward(&floating)?
            }
            TransformDirection::Adjoint => {
                self.check_adjoint_interpolation()?;
                let input = self
                    .context
                    .adjoint_input
                    .clone()
                    .ok_or_else(|| ResampleError::uninitialized("adjoint input image not set"))?;
                self.adjoint(&input)?
            }
        };
        self.output = Some(output.clone());
        Ok(output)
    }

    /// Forward operator applied to an image on the floating grid.
    pub fn forward(&mut self, image: &Image<B, 3>) -> Result<Image<B, 3>> {
        self.ensure_forward()?;
        let setup = self.forward_setup()?;
        let config = &self.context.config;
        check_image(
            image,
            setup.floating.geometry(),
            config.geometry_tolerance,
            config.geometry_check,
            "forward input",
        )?;
        self.apply_forward(image)
    }

    /// Adjoint operator applied to an image on the reference grid.
    pub fn adjoint(&mut self, image: &Image<B, 3>) -> Result<Image<B, 3>> {
        self.check_adjoint_interpolation()?;
        self.ensure_adjoint()?;
        let (forward, adjoint) = self
            .cache
            .adjoint(self.context.generation)
            .ok_or_else(|| ResampleError::uninitialized("adjoint setup missing"))?;

        let config = &self.context.config;
        check_image(
            image,
            forward.reference.geometry(),
            config.geometry_tolerance,
            config.geometry_check,
            "adjoint input",
        )?;

        let mut output = Image::zeros(forward.floating.geometry().clone(), &self.device);
        adjoint.evaluator.transform_image_adjoint(image, &mut output)?;
        Ok(output)
    }

    /// Result of the last `process` call.
    pub fn output(&self) -> Option<&Image<B, 3>> {
        self.output.as_ref()
    }

    /// Composed field of the current setup, on the reference grid.
    pub fn deformation_field(&self) -> Option<&DeformationField<B>> {
        self.cache.forward(self.context.generation).map(|setup| &setup.field)
    }

    /// Weight images of the current adjoint setup.
    pub fn adjoint_weights(&self) -> Option<&AdjointWeights<B>> {
        self.cache
            .adjoint(self.context.generation)
            .map(|(_, adjoint)| &adjoint.weights)
    }

    pub fn state(&self) -> CacheState {
        self.cache.state()
    }

    pub fn generation(&self) -> u64 {
        self.context.generation
    }

    /// Number of times the transformation list has been composed.
    pub fn composition_count(&self) -> usize {
        self.composition_count
    }

    fn forward_setup(&self) -> Result<&ForwardSetup<B>> {
        self.cache
            .forward(self.context.generation)
            .ok_or_else(|| ResampleError::uninitialized("forward setup missing"))
    }

    fn apply_forward(&self, image: &Image<B, 3>) -> Result<Image<B, 3>> {
        let setup = self.forward_setup()?;
        let config = &self.context.config;
        resample_forward(
            image,
            &setup.positions,
            setup.reference.geometry(),
            config.interpolation,
            config.padding_value,
        )
    }

    fn check_adjoint_interpolation(&self) -> Result<()> {
        let interpolation = self.context.config.interpolation;
        if !interpolation.supports_adjoint() {
            return Err(ResampleError::unsupported_interpolation(format!(
                "{interpolation:?} has no adjoint"
            )));
        }
        Ok(())
    }

    fn ensure_forward(&mut self) -> Result<()> {
        let generation = self.context.generation;
        if self.cache.forward(generation).is_some() {
            return Ok(());
        }

        let reference_handle = self
            .context
            .reference
            .as_ref()
            .ok_or_else(|| ResampleError::uninitialized("reference image not set"))?;
        let floating_handle = self
            .context
            .floating
            .as_ref()
            .ok_or_else(|| ResampleError::uninitialized("floating image not set"))?;

        let reference = reconcile(reference_handle, &self.device)?;
        let floating = reconcile(floating_handle, &self.device)?;

        // The adjoint scatters from the forward operator's sample positions,
        // so both directions compose on the forward grid.
        let grid = TransformDirection::Forward.sampling_grid(reference.geometry(), floating.geometry());
        let field = compose(&self.context.transformations, grid, &self.device)?;
        self.composition_count += 1;
        let positions = field_to_indices(floating.geometry(), &field)?;

        tracing::info!(
            generation,
            transformations = self.context.transformations.len(),
            reference = ?reference.shape(),
            floating = ?floating.shape(),
            "forward setup complete"
        );

        self.cache = SetupCache::ForwardReady(ForwardSetup {
            generation,
            reference,
            floating,
            field,
            positions,
        });
        Ok(())
    }

    fn ensure_adjoint(&mut self) -> Result<()> {
        let generation = self.context.generation;
        if self.cache.adjoint(generation).is_some() {
            return Ok(());
        }
        self.ensure_forward()?;

        let adjoint = {
            let setup = self.forward_setup()?;
            let config = &self.context.config;

            let mut evaluator = ControlPointTransformation::new(&setup.field)?;
            evaluator.set_interpolation(config.interpolation)?;
            evaluator.set_padding_value(config.padding_value);
            evaluator.prepare(setup.floating.geometry())?;

            let input = Image::filled(setup.reference.geometry().clone(), 1.0, &self.device);
            let mut output = Image::zeros(setup.floating.geometry().clone(), &self.device);
            evaluator.transform_image_adjoint(&input, &mut output)?;

            AdjointSetup {
                evaluator,
                weights: AdjointWeights { input, output },
            }
        };

        tracing::info!(generation, "adjoint setup complete");
        self.cache.promote(adjoint);
        Ok(())
    }
}
