use crate::board::file::File;
use crate::board::piece::Piece;
use crate::board::side::Side;
use crate::board::side::Side::White;
use crate::board::square::Square;
use crate::evaluation::update::DirtyPiece;
use arrayvec::ArrayVec;

/// The perspective's own king square selects which slice of the input layer the remaining
/// pieces index into. Kings on files e-h reuse the a-d slices with every square mirrored, so
/// the table below folds the board onto 32 buckets.
#[rustfmt::skip]
pub const KING_BUCKETS: [usize; 64] = [
     0,  1,  2,  3,  3,  2,  1,  0,
     4,  5,  6,  7,  7,  6,  5,  4,
     8,  9, 10, 11, 11, 10,  9,  8,
    12, 13, 14, 15, 15, 14, 13, 12,
    16, 17, 18, 19, 19, 18, 17, 16,
    20, 21, 22, 23, 23, 22, 21, 20,
    24, 25, 26, 27, 27, 26, 25, 24,
    28, 29, 30, 31, 31, 30, 29, 28,
];

pub const NUM_BUCKETS: usize = get_num_buckets(&KING_BUCKETS);

const PIECE_OFFSET: usize = 64;
const SIDE_OFFSET: usize = 64 * 6;
pub const BUCKET_OFFSET: usize = 64 * 6 * 2;
pub const NUM_FEATURES: usize = NUM_BUCKETS * BUCKET_OFFSET;

/// At most two features are added and two removed by any single move, in either direction.
pub type IndexList = ArrayVec<usize, 2>;

/// Represents a single feature used by the neural network. A feature is a piece of a given
/// colour on a given square. The feature is active when that piece stands on that square, and
/// its index additionally depends on which side is looking at the board and on where that
/// side's king stands.
#[derive(Copy, Clone)]
pub struct Feature {
    pc: Piece,
    sq: Square,
    side: Side,
}

impl Feature {

    pub fn new(pc: Piece, sq: Square, side: Side) -> Self {
        Feature { pc, sq, side }
    }

    pub fn index(&self, perspective: Side, ksq: Square) -> usize {
        let king = if perspective == White { ksq } else { ksq.flip_rank() };
        let mirror = File::of(king) > File::D;
        let bucket = KING_BUCKETS[king];

        let sq_index = self.square_index(perspective, mirror);
        let pc_offset = self.pc as usize * PIECE_OFFSET;
        let side_offset = if self.side == perspective {
            0
        } else {
            SIDE_OFFSET
        };
        bucket * BUCKET_OFFSET + side_offset + pc_offset + sq_index
    }

    fn square_index(&self, perspective: Side, mirror: bool) -> usize {
        let mut sq = self.sq;
        if perspective != White {
            sq = sq.flip_rank();
        }
        if mirror {
            sq = sq.flip_file();
        }
        sq.0 as usize
    }

}

/// A move of the perspective's own king relocates that perspective's entire half of the input
/// space, so nothing can be updated incrementally and the accumulator must be rebuilt. Moves by
/// any other piece, including the opponent's king, stay incremental.
pub fn requires_refresh(dirty: &DirtyPiece, perspective: Side) -> bool {
    dirty.entries().iter().any(|entry| {
        entry.pc == Piece::King
            && entry.side == perspective
            && entry.from.is_some()
            && entry.to.is_some()
    })
}

/// Translate a move delta into the feature indices it removes and adds for one perspective.
/// Forward application of a move never adds more than it removes; undoing one is the mirror
/// image, which the caller obtains by swapping the two output lists.
pub fn append_changed_indices(
    perspective: Side,
    ksq: Square,
    dirty: &DirtyPiece,
    removed: &mut IndexList,
    added: &mut IndexList,
) {
    for entry in dirty.entries() {
        if let Some(from) = entry.from {
            removed.push(Feature::new(entry.pc, from, entry.side).index(perspective, ksq));
        }
        if let Some(to) = entry.to {
            added.push(Feature::new(entry.pc, to, entry.side).index(perspective, ksq));
        }
    }
}

pub const fn get_num_buckets<const N: usize>(arr: &[usize; N]) -> usize {
    let mut max = 0;
    let mut i = 0;

    while i < N {
        if arr[i] > max {
            max = arr[i];
        }
        i += 1;
    }
    max + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::piece::PIECES;
    use crate::board::side::Side::{Black, White};
    use crate::board::side::SIDES;

    fn sq(name: &str) -> Square {
        let bytes = name.as_bytes();
        Square((bytes[1] - b'1') * 8 + (bytes[0] - b'a'))
    }

    #[test]
    fn indices_stay_in_bounds() {
        for perspective in SIDES {
            for ksq in Square::iter() {
                for side in SIDES {
                    for pc in PIECES {
                        for square in Square::iter() {
                            let index = Feature::new(pc, square, side).index(perspective, ksq);
                            assert!(index < NUM_FEATURES);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn perspectives_are_symmetric() {
        // A white piece seen by White with the king on g1 must index the same slot as the
        // rank-flipped black piece seen by Black with the king on g8.
        for pc in PIECES {
            let white = Feature::new(pc, sq("e4"), White).index(White, sq("g1"));
            let black = Feature::new(pc, sq("e5"), Black).index(Black, sq("g8"));
            assert_eq!(white, black);
        }
    }

    #[test]
    fn mirrored_king_files_share_buckets() {
        // A king on the e-file flips every square onto the d-file half of the space.
        let mirrored = Feature::new(Piece::Pawn, sq("c3"), White).index(White, sq("e1"));
        let direct = Feature::new(Piece::Pawn, sq("f3"), White).index(White, sq("d1"));
        assert_eq!(mirrored, direct);
    }

    #[test]
    fn distinct_king_squares_use_distinct_buckets() {
        let feature = Feature::new(Piece::Knight, sq("c3"), White);
        let mut indices = Vec::new();
        for ksq in Square::iter().filter(|ksq| File::of(*ksq) <= File::D) {
            indices.push(feature.index(White, ksq));
        }
        indices.sort_unstable();
        indices.dedup();
        // One bucket per king square on the unmirrored half of the board.
        assert_eq!(indices.len(), NUM_BUCKETS);
    }

    #[test]
    fn king_moves_require_refresh() {
        let king_move = DirtyPiece::standard(Piece::King, White, sq("e1"), sq("e2"));
        assert!(requires_refresh(&king_move, White));
        assert!(!requires_refresh(&king_move, Black));

        let castle = DirtyPiece::castle(Black, sq("e8"), sq("g8"), sq("h8"), sq("f8"));
        assert!(requires_refresh(&castle, Black));
        assert!(!requires_refresh(&castle, White));

        let pawn_move = DirtyPiece::standard(Piece::Pawn, White, sq("e2"), sq("e4"));
        assert!(!requires_refresh(&pawn_move, White));
        assert!(!requires_refresh(&pawn_move, Black));
    }

    #[test]
    fn changed_index_counts_per_move_shape() {
        let ksq = sq("g1");

        let mut removed = IndexList::new();
        let mut added = IndexList::new();
        let quiet = DirtyPiece::standard(Piece::Knight, White, sq("g1"), sq("f3"));
        append_changed_indices(White, ksq, &quiet, &mut removed, &mut added);
        assert_eq!((removed.len(), added.len()), (1, 1));

        let mut removed = IndexList::new();
        let mut added = IndexList::new();
        let capture =
            DirtyPiece::capture(Piece::Pawn, White, sq("e4"), sq("d5"), Piece::Pawn, sq("d5"));
        append_changed_indices(White, ksq, &capture, &mut removed, &mut added);
        assert_eq!((removed.len(), added.len()), (2, 1));

        let mut removed = IndexList::new();
        let mut added = IndexList::new();
        let castle = DirtyPiece::castle(White, sq("e1"), sq("g1"), sq("h1"), sq("f1"));
        append_changed_indices(White, ksq, &castle, &mut removed, &mut added);
        assert_eq!((removed.len(), added.len()), (2, 2));

        let mut removed = IndexList::new();
        let mut added = IndexList::new();
        let promo =
            DirtyPiece::promotion(White, sq("a7"), sq("b8"), Piece::Queen, Some(Piece::Rook));
        append_changed_indices(White, ksq, &promo, &mut removed, &mut added);
        assert_eq!((removed.len(), added.len()), (2, 1));
    }
}
