pub mod accumulator;
pub mod cache;
pub mod feature;
pub mod network;
pub mod update;

use crate::board::piece::PIECES;
use crate::board::side::Side;
use crate::board::side::Side::{Black, White};
use crate::board::Board;
use crate::evaluation::accumulator::{AccumulatorSlot, AccumulatorState};
use crate::evaluation::cache::{RefreshCaches, RefreshTable};
use crate::evaluation::feature::{Feature, IndexList};
use crate::evaluation::network::{FeatureTransformer, Networks};
use crate::evaluation::update::DirtyPiece;
use crate::utils::boxed_and_zeroed;
use arrayvec::ArrayVec;

pub const MAX_PLY: usize = 256;
pub const MAX_ACCUMULATORS: usize = MAX_PLY + 8;

/// Stack of per-ply accumulator states along the current search path. The search pushes a move
/// delta before making each move and pops on undo; nothing is recomputed at that point. Only
/// when an evaluation is requested does the stack walk backwards to the nearest usable state
/// and bring the newest one up to date, moving forward from a computed ancestor, or, when a
/// king move forces a rebuild, refreshing the newest state directly and walking backwards from
/// it so that the plies the search is about to revisit come along for free.
pub struct AccumulatorStack {
    stack: Box<[AccumulatorState; MAX_ACCUMULATORS]>,
    current: usize,
}

impl Default for AccumulatorStack {
    fn default() -> Self {
        Self::new()
    }
}

impl AccumulatorStack {

    pub fn new() -> Self {
        let mut stack: Box<[AccumulatorState; MAX_ACCUMULATORS]> = unsafe { boxed_and_zeroed() };
        for state in stack.iter_mut() {
            *state = AccumulatorState::default();
        }
        AccumulatorStack { stack, current: 1 }
    }

    /// Rebuild the root accumulators of both networks for both perspectives. Called once per
    /// search; every later ply is produced incrementally from this state.
    pub fn reset(&mut self, board: &Board, networks: &Networks, caches: &mut RefreshCaches) {
        self.current = 1;
        for perspective in [White, Black] {
            full_refresh(&networks.big, board, &mut self.stack[0], perspective, &mut caches.big);
            full_refresh(
                &networks.small,
                board,
                &mut self.stack[0],
                perspective,
                &mut caches.small,
            );
        }
    }

    /// Stage the accumulators for the move about to be made. The new state stays uncomputed
    /// until an evaluation asks for it.
    pub fn push(&mut self, dirty: DirtyPiece) {
        debug_assert!(self.current + 1 < MAX_ACCUMULATORS);
        self.stack[self.current].reset(dirty);
        self.current += 1;
    }

    /// Undo the last move. The abandoned state keeps its bytes and may seed a backward update
    /// if the search comes this way again.
    pub fn pop(&mut self) {
        debug_assert!(self.current > 1);
        self.current -= 1;
    }

    #[inline(always)]
    pub fn latest(&self) -> &AccumulatorState {
        &self.stack[self.current - 1]
    }

    #[inline(always)]
    pub fn latest_mut(&mut self) -> &mut AccumulatorState {
        &mut self.stack[self.current - 1]
    }

    /// Bring the newest state up to date for both perspectives of one network. On return the
    /// latest accumulator is computed and ready to feed that network's dense layers.
    pub fn evaluate<const HIDDEN: usize>(
        &mut self,
        board: &Board,
        ft: &FeatureTransformer<HIDDEN>,
        cache: &mut RefreshTable<HIDDEN>,
    ) where
        AccumulatorState: AccumulatorSlot<HIDDEN>,
    {
        self.evaluate_side(board, ft, cache, White);
        self.evaluate_side(board, ft, cache, Black);
    }

    fn evaluate_side<const HIDDEN: usize>(
        &mut self,
        board: &Board,
        ft: &FeatureTransformer<HIDDEN>,
        cache: &mut RefreshTable<HIDDEN>,
        perspective: Side,
    ) where
        AccumulatorState: AccumulatorSlot<HIDDEN>,
    {
        let usable = self.find_last_usable::<HIDDEN>(perspective);

        if self.stack[usable].acc().computed[perspective] {
            self.forward_update(board, ft, perspective, usable);
        } else {
            full_refresh(ft, board, &mut self.stack[self.current - 1], perspective, cache);
            self.backward_update(board, ft, perspective, usable);
        }
    }

    /// Find the closest state at or below the newest that can seed an update for this
    /// perspective: either it is already computed, or its delta forces a refresh and the walk
    /// cannot continue past it. Falls through to the root, which is always computed.
    fn find_last_usable<const HIDDEN: usize>(&self, perspective: Side) -> usize
    where
        AccumulatorState: AccumulatorSlot<HIDDEN>,
    {
        for idx in (1..self.current).rev() {
            if self.stack[idx].acc().computed[perspective] {
                return idx;
            }
            if feature::requires_refresh(&self.stack[idx].dirty, perspective) {
                return idx;
            }
        }
        0
    }

    /// Replay each staged delta from a computed ancestor up to the newest state.
    fn forward_update<const HIDDEN: usize>(
        &mut self,
        board: &Board,
        ft: &FeatureTransformer<HIDDEN>,
        perspective: Side,
        begin: usize,
    ) where
        AccumulatorState: AccumulatorSlot<HIDDEN>,
    {
        debug_assert!(self.stack[begin].acc().computed[perspective]);

        let ksq = board.king_sq(perspective);

        for next in begin + 1..self.current {
            let (front, back) = self.stack.split_at_mut(next);
            let source = front.last().unwrap();
            let target = back.first_mut().unwrap();

            let mut removed = IndexList::new();
            let mut added = IndexList::new();
            feature::append_changed_indices(perspective, ksq, &target.dirty, &mut removed, &mut added);
            debug_assert!(added.len() <= removed.len());

            accumulator::update_incremental(ft, perspective, source.acc(), target.acc_mut(), &added, &removed);
        }

        debug_assert!(self.latest().acc().computed[perspective]);
    }

    /// Walk downwards from the freshly refreshed newest state, undoing each delta to
    /// reconstruct the states beneath it. Undoing swaps the roles of the added and removed
    /// feature lists.
    fn backward_update<const HIDDEN: usize>(
        &mut self,
        board: &Board,
        ft: &FeatureTransformer<HIDDEN>,
        perspective: Side,
        end: usize,
    ) where
        AccumulatorState: AccumulatorSlot<HIDDEN>,
    {
        debug_assert!(end < self.current);
        debug_assert!(self.latest().acc().computed[perspective]);

        let ksq = board.king_sq(perspective);

        for next in (end..self.current - 1).rev() {
            let (front, back) = self.stack.split_at_mut(next + 1);
            let target = front.last_mut().unwrap();
            let source = back.first().unwrap();

            let mut removed = IndexList::new();
            let mut added = IndexList::new();
            feature::append_changed_indices(perspective, ksq, &source.dirty, &mut added, &mut removed);
            debug_assert!(removed.len() <= added.len());

            accumulator::update_incremental(ft, perspective, source.acc(), target.acc_mut(), &added, &removed);
        }

        debug_assert!(self.stack[end].acc().computed[perspective]);
    }

}

/// Rebuild one perspective of a state from the refresh table. The cached snapshot for the
/// current king square is corrected by the bitboard difference between the remembered placement
/// and the current one, copied into the state, and left in the table reflecting the current
/// position.
fn full_refresh<const HIDDEN: usize>(
    ft: &FeatureTransformer<HIDDEN>,
    board: &Board,
    state: &mut AccumulatorState,
    perspective: Side,
    cache: &mut RefreshTable<HIDDEN>,
) where
    AccumulatorState: AccumulatorSlot<HIDDEN>,
{
    let ksq = board.king_sq(perspective);
    let entry = cache.entry(ksq, perspective);

    let mut adds = ArrayVec::<usize, 32>::new();
    let mut subs = ArrayVec::<usize, 32>::new();

    for side in [White, Black] {
        for pc in PIECES {
            let pieces = board.pieces(pc) & board.side(side);
            let cached = entry.by_piece[pc] & entry.by_side[side];

            for sq in pieces & !cached {
                adds.push(Feature::new(pc, sq, side).index(perspective, ksq));
            }
            for sq in cached & !pieces {
                subs.push(Feature::new(pc, sq, side).index(perspective, ksq));
            }
        }
    }

    // Pair up additions and removals so most of the delta is applied in fused passes. When one
    // list is exactly one longer and there is more than one pair in total, the last pair and
    // the odd index out combine into a single fused triple.
    let combine_last3 = adds.len().abs_diff(subs.len()) == 1 && adds.len() + subs.len() > 2;
    let paired = adds.len().min(subs.len()) - combine_last3 as usize;

    let mut i = 0;
    while i < paired {
        accumulator::add_sub_assign(&mut entry.features, ft.column(adds[i]), ft.column(subs[i]));
        i += 1;
    }
    if combine_last3 {
        if subs.len() > adds.len() {
            accumulator::add_sub_sub_assign(
                &mut entry.features,
                ft.column(adds[i]),
                ft.column(subs[i]),
                ft.column(subs[i + 1]),
            );
        } else {
            accumulator::add_add_sub_assign(
                &mut entry.features,
                ft.column(adds[i]),
                ft.column(adds[i + 1]),
                ft.column(subs[i]),
            );
        }
    } else {
        for &sub in &subs[i..] {
            accumulator::sub_assign(&mut entry.features, ft.column(sub));
        }
        for &add in &adds[i..] {
            accumulator::add_assign(&mut entry.features, ft.column(add));
        }
    }

    for &sub in subs.iter() {
        accumulator::psqt_sub_assign(&mut entry.psqt, ft.psqt(sub));
    }
    for &add in adds.iter() {
        accumulator::psqt_add_assign(&mut entry.psqt, ft.psqt(add));
    }

    // The snapshot now matches the current position; publish it into the state and remember
    // the placement it was derived from.
    let acc = state.acc_mut();
    acc.features[perspective] = entry.features;
    acc.psqt[perspective] = entry.psqt;
    acc.computed[perspective] = true;

    for side in [White, Black] {
        entry.by_side[side] = board.side(side);
    }
    for pc in PIECES {
        entry.by_piece[pc] = board.pieces(pc);
    }
}
