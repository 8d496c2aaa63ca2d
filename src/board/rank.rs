use crate::board::square::Square;

#[derive(PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash, Debug)]
#[repr(u8)]
pub enum Rank {
    One, Two, Three, Four, Five, Six, Seven, Eight
}

impl Rank {

    pub fn parse(rank: usize) -> Rank {
        match rank {
            0 => Rank::One,
            1 => Rank::Two,
            2 => Rank::Three,
            3 => Rank::Four,
            4 => Rank::Five,
            5 => Rank::Six,
            6 => Rank::Seven,
            7 => Rank::Eight,
            _ => panic!("Invalid rank index: {}", rank),
        }
    }

    pub fn of(sq: Square) -> Rank {
        Rank::parse((sq.0 >> 3) as usize)
    }

}
