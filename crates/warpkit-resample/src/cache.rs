//! Setup state of a resampling engine.
//!
//! Composing the transformations and building the adjoint's splat plan are
//! the expensive steps; both are kept until the context changes. Each ready
//! state records the context generation it was built for.

use std::sync::Arc;
use burn::tensor::backend::Backend;
use warpkit_core::image::Image;
use warpkit_core::transform::DeformationField;
use crate::adjoint::ControlPointTransformation;

/// Observable cache state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Uninitialized,
    ForwardReady,
    AdjointReady,
}

/// Everything the forward operator needs.
#[derive(Debug, Clone)]
pub struct ForwardSetup<B: Backend> {
    pub generation: u64,
    pub reference: Arc<Image<B, 3>>,
    pub floating: Arc<Image<B, 3>>,
    /// Composed field on the reference grid.
    pub field: DeformationField<B>,
    /// Continuous floating index of every reference voxel, `[N * 3]`.
    pub positions: Vec<f32>,
}

/// Adjoint weighting images.
#[derive(Debug, Clone)]
pub struct AdjointWeights<B: Backend> {
    /// Ones on the reference grid.
    pub input: Image<B, 3>,
    /// Adjoint of `input`: total weight each floating voxel receives.
    pub output: Image<B, 3>,
}

/// Everything the adjoint operator needs on top of [`ForwardSetup`].
#[derive(Debug, Clone)]
pub struct AdjointSetup<B: Backend> {
    pub evaluator: ControlPointTransformation<B>,
    pub weights: AdjointWeights<B>,
}

/// Lazily built setup.
#[derive(Debug, Clone, Default)]
pub enum SetupCache<B: Backend> {
    #[default]
    Uninitialized,
    ForwardReady(ForwardSetup<B>),
    AdjointReady(ForwardSetup<B>, AdjointSetup<B>),
}

impl<B: Backend> SetupCache<B> {
    pub fn state(&self) -> CacheState {
        match self {
            Self::Uninitialized => CacheState::Uninitialized,
            Self::ForwardReady(_) => CacheState::ForwardReady,
            Self::AdjointReady(..) => CacheState::AdjointReady,
        }
    }

    /// Forward setup, if built for `generation`.
    pub fn forward(&self, generation: u64) -> Option<&ForwardSetup<B>> {
        match self {
            Self::ForwardReady(setup) | Self::AdjointReady(setup, _) if setup.generation == generation => Some(setup),
            _ => None,
        }
    }

    /// Forward and adjoint setup, if built for `generation`.
    pub fn adjoint(&self, generation: u64) -> Option<(&ForwardSetup<B>, &AdjointSetup<B>)> {
        match self {
            Self::AdjointReady(forward, adjoint) if forward.generation == generation => Some((forward, adjoint)),
            _ => None,
        }
    }

    /// Attach an adjoint setup to a forward-ready cache.
    ///
    /// Any other state is left as it was and the adjoint setup is dropped.
    pub fn promote(&mut self, adjoint: AdjointSetup<B>) {
        *self = match std::mem::take(self) {
            Self::ForwardReady(forward) => Self::AdjointReady(forward, adjoint),
            other => other,
        };
    }

    /// Discard all cached setup.
    pub fn reset(&mut self) {
        if !matches!(self, Self::Uninitialized) {
            tracing::debug!(previous = ?self.state(), "resetting resampling cache");
        }
        *self = Self::Uninitialized;
    }
}
