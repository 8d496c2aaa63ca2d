use crate::board::side::Side;
use crate::evaluation::network::{
    Align64, FeatureTransformer, HIDDEN_BIG, HIDDEN_SMALL, PSQT_BUCKETS,
};
use crate::evaluation::update::DirtyPiece;

/// Pre-activation state of one network's first layer at a single ply, seen from both
/// perspectives, together with the small PSQT tally carried alongside it. The vectors only hold
/// meaningful data for a perspective while its `computed` flag is set; between a reset and the
/// next update they keep whatever bytes they had before.
#[derive(Clone, Copy)]
#[repr(C, align(64))]
pub struct Accumulator<const HIDDEN: usize> {
    pub features: [Align64<[i16; HIDDEN]>; 2],
    pub psqt: [[i32; PSQT_BUCKETS]; 2],
    pub computed: [bool; 2],
}

impl<const HIDDEN: usize> Default for Accumulator<HIDDEN> {
    fn default() -> Self {
        Accumulator {
            features: [Align64([0; HIDDEN]); 2],
            psqt: [[0; PSQT_BUCKETS]; 2],
            computed: [false; 2],
        }
    }
}

/// One ply on the search path: the accumulators of both networks plus the move delta that
/// produced this ply from its parent.
#[derive(Clone, Copy)]
pub struct AccumulatorState {
    pub big: Accumulator<HIDDEN_BIG>,
    pub small: Accumulator<HIDDEN_SMALL>,
    pub dirty: DirtyPiece,
}

impl Default for AccumulatorState {
    fn default() -> Self {
        AccumulatorState {
            big: Accumulator::default(),
            small: Accumulator::default(),
            dirty: DirtyPiece::none(),
        }
    }
}

impl AccumulatorState {

    /// Stage a new ply: record the delta and mark all four perspective slots stale. The vector
    /// contents are deliberately left untouched and must not be read until recomputed.
    pub fn reset(&mut self, dirty: DirtyPiece) {
        self.dirty = dirty;
        self.big.computed = [false; 2];
        self.small.computed = [false; 2];
    }

}

/// Picks one network's accumulator out of a ply state by its dimension, so that the kernels
/// and the stack walk monomorphize per network instead of branching at runtime.
pub trait AccumulatorSlot<const HIDDEN: usize> {
    fn acc(&self) -> &Accumulator<HIDDEN>;
    fn acc_mut(&mut self) -> &mut Accumulator<HIDDEN>;
}

impl AccumulatorSlot<HIDDEN_BIG> for AccumulatorState {
    #[inline(always)]
    fn acc(&self) -> &Accumulator<HIDDEN_BIG> {
        &self.big
    }

    #[inline(always)]
    fn acc_mut(&mut self) -> &mut Accumulator<HIDDEN_BIG> {
        &mut self.big
    }
}

impl AccumulatorSlot<HIDDEN_SMALL> for AccumulatorState {
    #[inline(always)]
    fn acc(&self) -> &Accumulator<HIDDEN_SMALL> {
        &self.small
    }

    #[inline(always)]
    fn acc_mut(&mut self) -> &mut Accumulator<HIDDEN_SMALL> {
        &mut self.small
    }
}

/// Apply one move's feature delta to a single perspective, reading from a computed source
/// accumulator and writing the target in one fused pass per vector. The caller has already
/// resolved direction: undoing a move is the same operation with the added and removed lists
/// swapped.
pub fn update_incremental<const HIDDEN: usize>(
    ft: &FeatureTransformer<HIDDEN>,
    perspective: Side,
    source: &Accumulator<HIDDEN>,
    target: &mut Accumulator<HIDDEN>,
    added: &[usize],
    removed: &[usize],
) {
    debug_assert!(source.computed[perspective]);
    debug_assert!(!target.computed[perspective]);
    debug_assert!(matches!(added.len(), 1 | 2));
    debug_assert!(matches!(removed.len(), 1 | 2));

    let input = &source.features[perspective];
    let output = &mut target.features[perspective];
    let psqt_in = &source.psqt[perspective];
    let psqt_out = &mut target.psqt[perspective];

    match (added.len(), removed.len()) {
        (1, 1) => {
            add_sub(input, output, ft.column(added[0]), ft.column(removed[0]));
            psqt_add_sub(psqt_in, psqt_out, ft.psqt(added[0]), ft.psqt(removed[0]));
        }
        (1, 2) => {
            add_sub_sub(
                input,
                output,
                ft.column(added[0]),
                ft.column(removed[0]),
                ft.column(removed[1]),
            );
            psqt_add_sub_sub(
                psqt_in,
                psqt_out,
                ft.psqt(added[0]),
                ft.psqt(removed[0]),
                ft.psqt(removed[1]),
            );
        }
        (2, 1) => {
            add_add_sub(
                input,
                output,
                ft.column(added[0]),
                ft.column(added[1]),
                ft.column(removed[0]),
            );
            psqt_add_add_sub(
                psqt_in,
                psqt_out,
                ft.psqt(added[0]),
                ft.psqt(added[1]),
                ft.psqt(removed[0]),
            );
        }
        _ => {
            add_add_sub_sub(
                input,
                output,
                ft.column(added[0]),
                ft.column(added[1]),
                ft.column(removed[0]),
                ft.column(removed[1]),
            );
            psqt_add_add_sub_sub(
                psqt_in,
                psqt_out,
                ft.psqt(added[0]),
                ft.psqt(added[1]),
                ft.psqt(removed[0]),
                ft.psqt(removed[1]),
            );
        }
    }

    target.computed[perspective] = true;
}

#[inline]
pub fn add_sub<const HIDDEN: usize>(
    input: &Align64<[i16; HIDDEN]>,
    output: &mut Align64<[i16; HIDDEN]>,
    add1: &Align64<[i16; HIDDEN]>,
    sub1: &Align64<[i16; HIDDEN]>,
) {
    let mut i = 0;
    while i < HIDDEN {
        unsafe {
            *output.get_unchecked_mut(i) = input
                .get_unchecked(i)
                .wrapping_add(*add1.get_unchecked(i))
                .wrapping_sub(*sub1.get_unchecked(i));
        }
        i += 1;
    }
}

#[inline]
pub fn add_sub_sub<const HIDDEN: usize>(
    input: &Align64<[i16; HIDDEN]>,
    output: &mut Align64<[i16; HIDDEN]>,
    add1: &Align64<[i16; HIDDEN]>,
    sub1: &Align64<[i16; HIDDEN]>,
    sub2: &Align64<[i16; HIDDEN]>,
) {
    let mut i = 0;
    while i < HIDDEN {
        unsafe {
            *output.get_unchecked_mut(i) = input
                .get_unchecked(i)
                .wrapping_add(*add1.get_unchecked(i))
                .wrapping_sub(*sub1.get_unchecked(i))
                .wrapping_sub(*sub2.get_unchecked(i));
        }
        i += 1;
    }
}

#[inline]
pub fn add_add_sub<const HIDDEN: usize>(
    input: &Align64<[i16; HIDDEN]>,
    output: &mut Align64<[i16; HIDDEN]>,
    add1: &Align64<[i16; HIDDEN]>,
    add2: &Align64<[i16; HIDDEN]>,
    sub1: &Align64<[i16; HIDDEN]>,
) {
    let mut i = 0;
    while i < HIDDEN {
        unsafe {
            *output.get_unchecked_mut(i) = input
                .get_unchecked(i)
                .wrapping_add(*add1.get_unchecked(i))
                .wrapping_add(*add2.get_unchecked(i))
                .wrapping_sub(*sub1.get_unchecked(i));
        }
        i += 1;
    }
}

#[inline]
pub fn add_add_sub_sub<const HIDDEN: usize>(
    input: &Align64<[i16; HIDDEN]>,
    output: &mut Align64<[i16; HIDDEN]>,
    add1: &Align64<[i16; HIDDEN]>,
    add2: &Align64<[i16; HIDDEN]>,
    sub1: &Align64<[i16; HIDDEN]>,
    sub2: &Align64<[i16; HIDDEN]>,
) {
    let mut i = 0;
    while i < HIDDEN {
        unsafe {
            *output.get_unchecked_mut(i) = input
                .get_unchecked(i)
                .wrapping_add(*add1.get_unchecked(i))
                .wrapping_add(*add2.get_unchecked(i))
                .wrapping_sub(*sub1.get_unchecked(i))
                .wrapping_sub(*sub2.get_unchecked(i));
        }
        i += 1;
    }
}

#[inline]
pub fn add_assign<const HIDDEN: usize>(
    acc: &mut Align64<[i16; HIDDEN]>,
    add1: &Align64<[i16; HIDDEN]>,
) {
    let mut i = 0;
    while i < HIDDEN {
        unsafe {
            let lane = acc.get_unchecked_mut(i);
            *lane = lane.wrapping_add(*add1.get_unchecked(i));
        }
        i += 1;
    }
}

#[inline]
pub fn sub_assign<const HIDDEN: usize>(
    acc: &mut Align64<[i16; HIDDEN]>,
    sub1: &Align64<[i16; HIDDEN]>,
) {
    let mut i = 0;
    while i < HIDDEN {
        unsafe {
            let lane = acc.get_unchecked_mut(i);
            *lane = lane.wrapping_sub(*sub1.get_unchecked(i));
        }
        i += 1;
    }
}

#[inline]
pub fn add_sub_assign<const HIDDEN: usize>(
    acc: &mut Align64<[i16; HIDDEN]>,
    add1: &Align64<[i16; HIDDEN]>,
    sub1: &Align64<[i16; HIDDEN]>,
) {
    let mut i = 0;
    while i < HIDDEN {
        unsafe {
            let lane = acc.get_unchecked_mut(i);
            *lane = lane
                .wrapping_add(*add1.get_unchecked(i))
                .wrapping_sub(*sub1.get_unchecked(i));
        }
        i += 1;
    }
}

#[inline]
pub fn add_sub_sub_assign<const HIDDEN: usize>(
    acc: &mut Align64<[i16; HIDDEN]>,
    add1: &Align64<[i16; HIDDEN]>,
    sub1: &Align64<[i16; HIDDEN]>,
    sub2: &Align64<[i16; HIDDEN]>,
) {
    let mut i = 0;
    while i < HIDDEN {
        unsafe {
            let lane = acc.get_unchecked_mut(i);
            *lane = lane
                .wrapping_add(*add1.get_unchecked(i))
                .wrapping_sub(*sub1.get_unchecked(i))
                .wrapping_sub(*sub2.get_unchecked(i));
        }
        i += 1;
    }
}

#[inline]
pub fn add_add_sub_assign<const HIDDEN: usize>(
    acc: &mut Align64<[i16; HIDDEN]>,
    add1: &Align64<[i16; HIDDEN]>,
    add2: &Align64<[i16; HIDDEN]>,
    sub1: &Align64<[i16; HIDDEN]>,
) {
    let mut i = 0;
    while i < HIDDEN {
        unsafe {
            let lane = acc.get_unchecked_mut(i);
            *lane = lane
                .wrapping_add(*add1.get_unchecked(i))
                .wrapping_add(*add2.get_unchecked(i))
                .wrapping_sub(*sub1.get_unchecked(i));
        }
        i += 1;
    }
}

#[inline]
pub fn psqt_add_sub(
    input: &[i32; PSQT_BUCKETS],
    output: &mut [i32; PSQT_BUCKETS],
    add1: &[i32; PSQT_BUCKETS],
    sub1: &[i32; PSQT_BUCKETS],
) {
    for i in 0..PSQT_BUCKETS {
        output[i] = input[i].wrapping_add(add1[i]).wrapping_sub(sub1[i]);
    }
}

#[inline]
pub fn psqt_add_sub_sub(
    input: &[i32; PSQT_BUCKETS],
    output: &mut [i32; PSQT_BUCKETS],
    add1: &[i32; PSQT_BUCKETS],
    sub1: &[i32; PSQT_BUCKETS],
    sub2: &[i32; PSQT_BUCKETS],
) {
    for i in 0..PSQT_BUCKETS {
        output[i] = input[i]
            .wrapping_add(add1[i])
            .wrapping_sub(sub1[i])
            .wrapping_sub(sub2[i]);
    }
}

#[inline]
pub fn psqt_add_add_sub(
    input: &[i32; PSQT_BUCKETS],
    output: &mut [i32; PSQT_BUCKETS],
    add1: &[i32; PSQT_BUCKETS],
    add2: &[i32; PSQT_BUCKETS],
    sub1: &[i32; PSQT_BUCKETS],
) {
    for i in 0..PSQT_BUCKETS {
        output[i] = input[i]
            .wrapping_add(add1[i])
            .wrapping_add(add2[i])
            .wrapping_sub(sub1[i]);
    }
}

#[inline]
pub fn psqt_add_add_sub_sub(
    input: &[i32; PSQT_BUCKETS],
    output: &mut [i32; PSQT_BUCKETS],
    add1: &[i32; PSQT_BUCKETS],
    add2: &[i32; PSQT_BUCKETS],
    sub1: &[i32; PSQT_BUCKETS],
    sub2: &[i32; PSQT_BUCKETS],
) {
    for i in 0..PSQT_BUCKETS {
        output[i] = input[i]
            .wrapping_add(add1[i])
            .wrapping_add(add2[i])
            .wrapping_sub(sub1[i])
            .wrapping_sub(sub2[i]);
    }
}

#[inline]
pub fn psqt_add_assign(acc: &mut [i32; PSQT_BUCKETS], add1: &[i32; PSQT_BUCKETS]) {
    for i in 0..PSQT_BUCKETS {
        acc[i] = acc[i].wrapping_add(add1[i]);
    }
}

#[inline]
pub fn psqt_sub_assign(acc: &mut [i32; PSQT_BUCKETS], sub1: &[i32; PSQT_BUCKETS]) {
    for i in 0..PSQT_BUCKETS {
        acc[i] = acc[i].wrapping_sub(sub1[i]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::side::Side::White;
    use crate::evaluation::feature::NUM_FEATURES;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const SIZE: usize = 64;

    fn random_vector(rng: &mut StdRng) -> Align64<[i16; SIZE]> {
        let mut vector = Align64([0; SIZE]);
        for lane in vector.iter_mut() {
            *lane = rng.gen::<i16>();
        }
        vector
    }

    #[test]
    fn fused_kernels_match_sequential_updates() {
        let mut rng = StdRng::seed_from_u64(42);
        let input = random_vector(&mut rng);
        let a1 = random_vector(&mut rng);
        let a2 = random_vector(&mut rng);
        let s1 = random_vector(&mut rng);
        let s2 = random_vector(&mut rng);

        let mut expected = input;
        add_assign(&mut expected, &a1);
        add_assign(&mut expected, &a2);
        sub_assign(&mut expected, &s1);
        sub_assign(&mut expected, &s2);

        let mut fused = Align64([0; SIZE]);
        add_add_sub_sub(&input, &mut fused, &a1, &a2, &s1, &s2);
        assert_eq!(fused.0, expected.0);

        let mut in_place = input;
        add_sub_assign(&mut in_place, &a1, &s1);
        add_sub_assign(&mut in_place, &a2, &s2);
        assert_eq!(in_place.0, expected.0);

        let mut triple = Align64([0; SIZE]);
        add_sub_sub(&input, &mut triple, &a1, &s1, &s2);
        let mut expected = input;
        add_assign(&mut expected, &a1);
        sub_assign(&mut expected, &s1);
        sub_assign(&mut expected, &s2);
        assert_eq!(triple.0, expected.0);
    }

    #[test]
    fn add_and_sub_are_inverses() {
        let mut rng = StdRng::seed_from_u64(7);
        let original = random_vector(&mut rng);
        let column = random_vector(&mut rng);

        let mut vector = original;
        add_assign(&mut vector, &column);
        sub_assign(&mut vector, &column);
        assert_eq!(vector.0, original.0);
    }

    #[test]
    fn wrapping_arithmetic_is_silent() {
        let mut acc = Align64([i16::MAX; SIZE]);
        let column = Align64([1; SIZE]);
        add_assign(&mut acc, &column);
        assert_eq!(acc.0, [i16::MIN; SIZE]);
    }

    #[test]
    fn incremental_updates_reverse_exactly() {
        let mut rng = StdRng::seed_from_u64(99);

        let mut weights = vec![Align64([0i16; SIZE]); NUM_FEATURES].into_boxed_slice();
        for column in weights.iter_mut() {
            for weight in column.iter_mut() {
                *weight = rng.gen::<i16>();
            }
        }
        let mut psqt_weights = vec![[0i32; PSQT_BUCKETS]; NUM_FEATURES].into_boxed_slice();
        for row in psqt_weights.iter_mut() {
            for weight in row.iter_mut() {
                *weight = rng.gen::<i32>();
            }
        }
        let ft: FeatureTransformer<SIZE> = FeatureTransformer::new(weights, psqt_weights);

        let mut origin = Accumulator::<SIZE>::default();
        for lane in origin.features[White].iter_mut() {
            *lane = rng.gen::<i16>();
        }
        for bucket in origin.psqt[White].iter_mut() {
            *bucket = rng.gen::<i32>();
        }
        origin.computed = [true; 2];

        // A capture applied forward, then undone: the lists swap roles on the way back.
        let added = [123usize];
        let removed = [456usize, 789usize];

        let mut after = Accumulator::<SIZE>::default();
        update_incremental(&ft, White, &origin, &mut after, &added, &removed);

        let mut restored = Accumulator::<SIZE>::default();
        update_incremental(&ft, White, &after, &mut restored, &removed, &added);

        assert_eq!(restored.features[White].0, origin.features[White].0);
        assert_eq!(restored.psqt[White], origin.psqt[White]);
    }
}
