use crate::board::file::File;
use crate::board::piece::Piece;
use crate::board::rank::Rank;
use crate::board::side::Side::{Black, White};
use crate::board::square::Square;
use crate::board::Board;

pub const STARTPOS: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

impl Board {

    pub fn from_fen(fen: &str) -> Result<Board, String> {

        if fen.is_empty() {
            return Err("FEN string cannot be empty".to_string());
        }

        let mut board = Board::empty();
        let parts: Vec<&str> = fen.split_whitespace().collect();

        if parts.len() < 2 {
            return Err("FEN string has an invalid number of parts".to_string());
        }

        let board_part = parts[0];
        if board_part.matches('/').count() != 7 {
            return Err("FEN string does not have exactly 8 ranks".to_string());
        }

        let white_kings = board_part.matches('K').count();
        let black_kings = board_part.matches('k').count();
        if white_kings != 1 || black_kings != 1 {
            return Err("FEN string must have exactly one king per side".to_string());
        }

        for (rank, row) in board_part.split('/').enumerate() {

            let mut file = 0;
            for ch in row.chars() {
                if file >= 8 {
                    return Err("FEN string has too many squares in a rank".to_string());
                }
                match ch {
                    '1'..='8' => {
                        let squares = ch.to_digit(10).unwrap() as usize;
                        file += squares;
                    }
                    'P' | 'N' | 'B' | 'R' | 'Q' | 'K' | 'p' | 'n' | 'b' | 'r' | 'q' | 'k' => {
                        let sq = Square::from(File::parse(file), Rank::parse(7 - rank));
                        let piece = parse_piece(ch);
                        let side = if ch.is_uppercase() { White } else { Black };
                        board.toggle_sq(sq, piece, side);
                        file += 1;
                    }
                    _ => return Err(format!("Invalid character in FEN string: {}", ch)),
                }
            }
            if file != 8 {
                return Err("FEN string does not add up to 8 squares in a rank".to_string());
            }
        }

        board.stm = match parts[1] {
            "w" => White,
            "b" => Black,
            _ => return Err("FEN string has an invalid side to move".to_string()),
        };

        Ok(board)
    }

}

fn parse_piece(ch: char) -> Piece {
    match ch.to_ascii_lowercase() {
        'p' => Piece::Pawn,
        'n' => Piece::Knight,
        'b' => Piece::Bishop,
        'r' => Piece::Rook,
        'q' => Piece::Queen,
        'k' => Piece::King,
        _ => unreachable!(),
    }
}
