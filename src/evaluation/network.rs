use crate::evaluation::feature::NUM_FEATURES;
use std::ops::{Deref, DerefMut};

pub const HIDDEN_BIG: usize = 1024;
pub const HIDDEN_SMALL: usize = 128;
pub const PSQT_BUCKETS: usize = 8;

#[derive(Clone, Copy)]
#[repr(C, align(64))]
pub struct Align64<T>(pub T);

impl<T> Deref for Align64<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for Align64<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Read-only view of one network's first layer: a weight column and a PSQT row per feature
/// index. Columns are stored 64-byte aligned so the update kernels stream them directly.
/// Loading and quantising the weights happens upstream; this type only hands out slices.
pub struct FeatureTransformer<const HIDDEN: usize> {
    weights: Box<[Align64<[i16; HIDDEN]>]>,
    psqt_weights: Box<[[i32; PSQT_BUCKETS]]>,
}

impl<const HIDDEN: usize> FeatureTransformer<HIDDEN> {

    pub fn new(
        weights: Box<[Align64<[i16; HIDDEN]>]>,
        psqt_weights: Box<[[i32; PSQT_BUCKETS]]>,
    ) -> Self {
        assert_eq!(weights.len(), NUM_FEATURES);
        assert_eq!(psqt_weights.len(), NUM_FEATURES);
        FeatureTransformer { weights, psqt_weights }
    }

    #[inline(always)]
    pub fn column(&self, feature: usize) -> &Align64<[i16; HIDDEN]> {
        &self.weights[feature]
    }

    #[inline(always)]
    pub fn psqt(&self, feature: usize) -> &[i32; PSQT_BUCKETS] {
        &self.psqt_weights[feature]
    }

}

/// The two networks the evaluation switches between: a large one for balanced positions and a
/// small one for lopsided ones. Both are immutable and shared between search threads; each
/// thread keeps its own accumulators and refresh tables.
pub struct Networks {
    pub big: FeatureTransformer<HIDDEN_BIG>,
    pub small: FeatureTransformer<HIDDEN_SMALL>,
}
