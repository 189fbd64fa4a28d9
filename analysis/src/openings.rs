//! Opening detection by longest common prefix against a fixed catalogue.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Opening {
    pub eco: &'static str,
    pub name: &'static str,
    pub variation: &'static str,
    /// SAN moves from the standard start.
    pub moves: &'static [&'static str],
}

impl Opening {
    /// `"Name: Variation (ECO)"`, or `"Name (ECO)"` for a main line.
    pub fn display_name(&self) -> String {
        if self.variation.is_empty() || self.variation == MAIN_LINE {
            format!("{} ({})", self.name, self.eco)
        } else {
            format!("{}: {} ({})", self.name, self.variation, self.eco)
        }
    }
}

impl std::fmt::Display for Opening {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display_name())
    }
}

/// An opening and how many plies of the game it matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OpeningMatch {
    pub opening: &'static Opening,
    pub matched_plies: usize,
}

const MAIN_LINE: &str = "Main Line";

/// Fewest matching plies (one move each) that count as an opening.
pub const MIN_MATCH_PLIES: usize = 2;

macro_rules! opening {
    ($eco:literal, $name:literal, $variation:literal, [$($mv:literal),+ $(,)?]) => {
        Opening {
            eco: $eco,
            name: $name,
            variation: $variation,
            moves: &[$($mv),+],
        }
    };
}

/// Order matters: among equally long matches the earliest entry wins.
pub static OPENINGS: [Opening; 42] = [
    // King's pawn
    opening!("C50", "Italian Game", "Giuoco Piano", ["e4", "e5", "Nf3", "Nc6", "Bc4", "Bc5"]),
    opening!("C50", "Italian Game", "Main Line", ["e4", "e5", "Nf3", "Nc6", "Bc4"]),
    opening!("C55", "Two Knights Defense", "Main Line", ["e4", "e5", "Nf3", "Nc6", "Bc4", "Nf6"]),
    opening!("C42", "Russian Game", "Main Line", ["e4", "e5", "Nf3", "Nf6"]),
    opening!("C44", "Scotch Game", "Main Line", ["e4", "e5", "Nf3", "Nc6", "d4"]),
    opening!("C65", "Ruy Lopez", "Berlin Defense", ["e4", "e5", "Nf3", "Nc6", "Bb5", "Nf6"]),
    opening!("C60", "Ruy Lopez", "Main Line", ["e4", "e5", "Nf3", "Nc6", "Bb5"]),
    opening!(
        "C84",
        "Ruy Lopez",
        "Closed",
        ["e4", "e5", "Nf3", "Nc6", "Bb5", "a6", "Ba4", "Nf6", "O-O", "Be7"]
    ),
    // Sicilian
    opening!("B20", "Sicilian Defense", "Main Line", ["e4", "c5"]),
    opening!("B50", "Sicilian Defense", "Main Line", ["e4", "c5", "Nf3", "d6"]),
    opening!(
        "B90",
        "Sicilian Defense",
        "Najdorf",
        ["e4", "c5", "Nf3", "d6", "d4", "cxd4", "Nxd4", "Nf6", "Nc3", "a6"]
    ),
    opening!(
        "B70",
        "Sicilian Defense",
        "Dragon",
        ["e4", "c5", "Nf3", "d6", "d4", "cxd4", "Nxd4", "Nf6", "Nc3", "g6"]
    ),
    opening!(
        "B40",
        "Sicilian Defense",
        "Accelerated Dragon",
        ["e4", "c5", "Nf3", "Nc6", "d4", "cxd4", "Nxd4", "g6"]
    ),
    // French
    opening!("C00", "French Defense", "Main Line", ["e4", "e6"]),
    opening!("C10", "French Defense", "Main Line", ["e4", "e6", "d4", "d5"]),
    opening!("C11", "French Defense", "Winawer", ["e4", "e6", "d4", "d5", "Nc3", "Bb4"]),
    // Caro-Kann
    opening!("B10", "Caro-Kann Defense", "Main Line", ["e4", "c6"]),
    opening!("B12", "Caro-Kann Defense", "Advance", ["e4", "c6", "d4", "d5", "e5"]),
    opening!(
        "B18",
        "Caro-Kann Defense",
        "Classical",
        ["e4", "c6", "d4", "d5", "Nc3", "dxe4", "Nxe4", "Bf5"]
    ),
    // Queen's pawn
    opening!("D06", "Queen's Gambit", "Main Line", ["d4", "d5", "c4"]),
    opening!("D30", "Queen's Gambit Declined", "Main Line", ["d4", "d5", "c4", "e6"]),
    opening!(
        "D37",
        "Queen's Gambit Declined",
        "Orthodox",
        ["d4", "d5", "c4", "e6", "Nf3", "Nf6", "Nc3", "Be7"]
    ),
    opening!("D20", "Queen's Gambit Accepted", "Main Line", ["d4", "d5", "c4", "dxc4"]),
    opening!("D85", "Grünfeld Defense", "Main Line", ["d4", "Nf6", "c4", "g6", "Nc3", "d5"]),
    // Indian defenses
    opening!("E60", "King's Indian Defense", "Main Line", ["d4", "Nf6", "c4", "g6"]),
    opening!(
        "E90",
        "King's Indian Defense",
        "Classical",
        ["d4", "Nf6", "c4", "g6", "Nc3", "Bg7", "e4", "d6"]
    ),
    opening!("E20", "Nimzo-Indian Defense", "Main Line", ["d4", "Nf6", "c4", "e6", "Nc3", "Bb4"]),
    opening!(
        "E40",
        "Nimzo-Indian Defense",
        "Rubinstein",
        ["d4", "Nf6", "c4", "e6", "Nc3", "Bb4", "e3"]
    ),
    // English
    opening!("A10", "English Opening", "Main Line", ["c4"]),
    opening!("A20", "English Opening", "Symmetrical", ["c4", "e5"]),
    opening!("A30", "English Opening", "Symmetrical", ["c4", "c5"]),
    // Réti
    opening!("A04", "Réti Opening", "Main Line", ["Nf3"]),
    opening!("A09", "Réti Opening", "Accepted", ["Nf3", "d5", "c4"]),
    // Others
    opening!("A00", "Van't Kruijs Opening", "Main Line", ["e3"]),
    opening!("A40", "Modern Defense", "Main Line", ["d4", "g6"]),
    opening!("B00", "Nimzowitsch Defense", "Main Line", ["e4", "Nc6"]),
    opening!("B01", "Scandinavian Defense", "Main Line", ["e4", "d5"]),
    opening!("C20", "King's Pawn Game", "Main Line", ["e4", "e5"]),
    opening!("D00", "Queen's Pawn Game", "Main Line", ["d4", "d5"]),
    opening!("A45", "Indian Defense", "Main Line", ["d4", "Nf6"]),
    opening!("C30", "King's Gambit", "Main Line", ["e4", "e5", "f4"]),
    opening!("C33", "King's Gambit Accepted", "Main Line", ["e4", "e5", "f4", "exf4"]),
];

fn common_prefix<S: AsRef<str>>(played: &[S], line: &[&str]) -> usize {
    played
        .iter()
        .zip(line)
        .take_while(|&(played, expected)| played.as_ref() == *expected)
        .count()
}

/// Best catalogue match for the SAN moves of a game.
pub fn match_opening<S: AsRef<str>>(moves: &[S]) -> Option<OpeningMatch> {
    let mut best: Option<OpeningMatch> = None;
    for opening in OPENINGS.iter() {
        let matched_plies = common_prefix(moves, opening.moves);
        let longest = best.map_or(0, |m| m.matched_plies);
        if matched_plies >= MIN_MATCH_PLIES && matched_plies > longest {
            best = Some(OpeningMatch {
                opening,
                matched_plies,
            });
        }
    }
    best
}

pub fn detect_opening<S: AsRef<str>>(moves: &[S]) -> Option<&'static Opening> {
    match_opening(moves).map(|m| m.opening)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_giuoco_piano_beats_main_line() {
        let found = match_opening(&["e4", "e5", "Nf3", "Nc6", "Bc4", "Bc5"]).unwrap();
        assert_eq!(found.opening.eco, "C50");
        assert_eq!(found.opening.variation, "Giuoco Piano");
        assert_eq!(found.matched_plies, 6);
        assert_eq!(
            found.opening.display_name(),
            "Italian Game: Giuoco Piano (C50)"
        );
    }

    #[test]
    fn test_ties_go_to_the_earlier_entry() {
        // Giuoco Piano, Italian main line and Two Knights all match 5 plies
        let found = match_opening(&["e4", "e5", "Nf3", "Nc6", "Bc4", "h6"]).unwrap();
        assert_eq!(found.matched_plies, 5);
        assert_eq!(found.opening.variation, "Giuoco Piano");
    }

    #[test]
    fn test_longer_game_still_matches_its_opening() {
        let moves = ["e4", "e6", "d4", "d5", "Nc3", "Bb4", "e5", "c5", "a3"];
        let opening = detect_opening(&moves).unwrap();
        assert_eq!(opening.display_name(), "French Defense: Winawer (C11)");
    }

    #[test]
    fn test_main_line_display() {
        let opening = detect_opening(&["e4", "c5"]).unwrap();
        assert_eq!(opening.display_name(), "Sicilian Defense (B20)");
        assert_eq!(opening.to_string(), "Sicilian Defense (B20)");
    }

    #[test]
    fn test_needs_two_matching_plies() {
        let none: [&str; 0] = [];
        assert!(detect_opening(&none).is_none());
        // English and Réti are one ply long
        assert!(detect_opening(&["c4"]).is_none());
        assert!(detect_opening(&["Nf3", "Nf6"]).is_none());
        assert!(detect_opening(&["a4", "a5"]).is_none());
    }

    #[test]
    fn test_accepts_owned_strings() {
        let moves: Vec<String> = ["d4", "d5", "c4", "dxc4"].iter().map(|s| s.to_string()).collect();
        assert_eq!(detect_opening(&moves).unwrap().eco, "D20");
    }

    #[test]
    fn test_catalogue_lines_are_legal() {
        for opening in OPENINGS.iter() {
            let mut position = chess::Position::startpos();
            for mv in opening.moves {
                let record = position
                    .play_str(mv)
                    .unwrap_or_else(|e| panic!("{}: {mv}: {e}", opening.display_name()));
                assert_eq!(record.san, *mv);
            }
        }
    }
}
