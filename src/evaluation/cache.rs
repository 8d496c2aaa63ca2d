use crate::board::bitboard::Bitboard;
use crate::board::piece::Piece;
use crate::board::side::Side;
use crate::board::square::Square;
use crate::evaluation::network::{Align64, HIDDEN_BIG, HIDDEN_SMALL, PSQT_BUCKETS};
use crate::utils::boxed_and_zeroed;

/// Whenever a perspective's own king moves, a costly full rebuild of that accumulator is
/// required. This table implements a technique to soften that cost known as 'Finny tables'.
///
/// For every (king square, perspective) pair we keep the last accumulator refreshed there
/// together with the piece placement it was computed from. A refresh then starts from that
/// snapshot and only applies the difference between the remembered placement and the current
/// one, instead of starting from an empty board. Entries are never invalidated; a stale entry
/// just means a larger difference to apply.
pub struct RefreshTable<const HIDDEN: usize> {
    entries: Box<[[RefreshEntry<HIDDEN>; 2]; 64]>,
}

/// Snapshot of the last accumulator refreshed with the king on a given square, plus the
/// per-side and per-piece bitboards of the position it was derived from. The snapshot and its
/// bitboards sit side by side so a refresh touches one region of memory.
#[derive(Clone, Copy)]
#[repr(C, align(64))]
pub struct RefreshEntry<const HIDDEN: usize> {
    pub features: Align64<[i16; HIDDEN]>,
    pub psqt: [i32; PSQT_BUCKETS],
    pub by_side: [Bitboard; 2],
    pub by_piece: [Bitboard; Piece::COUNT],
}

impl<const HIDDEN: usize> RefreshTable<HIDDEN> {

    /// Entries start out as the empty board with an all-zero snapshot, so the first refresh
    /// for each king square pays for the full position exactly once.
    pub fn new() -> Self {
        RefreshTable {
            entries: unsafe { boxed_and_zeroed() },
        }
    }

    #[inline(always)]
    pub fn entry(&mut self, ksq: Square, perspective: Side) -> &mut RefreshEntry<HIDDEN> {
        &mut self.entries[ksq][perspective]
    }

}

impl<const HIDDEN: usize> Default for RefreshTable<HIDDEN> {
    fn default() -> Self {
        Self::new()
    }
}

/// The pair of refresh tables a search thread owns, one per network.
pub struct RefreshCaches {
    pub big: RefreshTable<HIDDEN_BIG>,
    pub small: RefreshTable<HIDDEN_SMALL>,
}

impl RefreshCaches {
    pub fn new() -> Self {
        RefreshCaches {
            big: RefreshTable::new(),
            small: RefreshTable::new(),
        }
    }
}

impl Default for RefreshCaches {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::side::Side::White;

    #[test]
    fn entries_start_from_the_empty_board() {
        let mut table: RefreshTable<HIDDEN_SMALL> = RefreshTable::new();
        let entry = table.entry(Square(4), White);
        assert!(entry.by_side.iter().all(|bb| bb.is_empty()));
        assert!(entry.by_piece.iter().all(|bb| bb.is_empty()));
        assert!(entry.features.iter().all(|&lane| lane == 0));
        assert!(entry.psqt.iter().all(|&bucket| bucket == 0));
    }
}
