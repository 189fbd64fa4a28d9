use serde::{Deserialize, Serialize};

/// Quality of a played move, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveClassification {
    /// No loss and the mover's position improved by more than a pawn.
    Brilliant,
    /// 0-10 cp lost.
    Great,
    /// 11-25 cp lost.
    Good,
    /// 26-100 cp lost.
    Inaccuracy,
    /// 101-300 cp lost.
    Mistake,
    /// More than 300 cp lost.
    Blunder,
}

impl MoveClassification {
    pub const ALL: [Self; 6] = [
        Self::Brilliant,
        Self::Great,
        Self::Good,
        Self::Inaccuracy,
        Self::Mistake,
        Self::Blunder,
    ];

    /// Classify from centipawn loss and the mover's improvement, both in
    /// the mover's frame.
    pub fn classify(cp_loss: i32, improvement: i32) -> Self {
        if cp_loss <= 0 && improvement > 100 {
            return Self::Brilliant;
        }
        match cp_loss {
            i if i <= 10 => Self::Great,
            11..=25 => Self::Good,
            26..=100 => Self::Inaccuracy,
            101..=300 => Self::Mistake,
            _ => Self::Blunder,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Brilliant => "brilliant",
            Self::Great => "great",
            Self::Good => "good",
            Self::Inaccuracy => "inaccuracy",
            Self::Mistake => "mistake",
            Self::Blunder => "blunder",
        }
    }
}

impl std::fmt::Display for MoveClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brilliant_needs_no_loss_and_real_gain() {
        assert_eq!(
            MoveClassification::classify(0, 150),
            MoveClassification::Brilliant
        );
        assert_eq!(
            MoveClassification::classify(0, 100),
            MoveClassification::Great
        );
        assert_eq!(
            MoveClassification::classify(5, 500),
            MoveClassification::Great
        );
    }

    #[test]
    fn test_band_upper_bounds_are_inclusive() {
        let cases = [
            (10, MoveClassification::Great),
            (11, MoveClassification::Good),
            (25, MoveClassification::Good),
            (26, MoveClassification::Inaccuracy),
            (100, MoveClassification::Inaccuracy),
            (101, MoveClassification::Mistake),
            (300, MoveClassification::Mistake),
            (301, MoveClassification::Blunder),
            (5000, MoveClassification::Blunder),
        ];
        for (loss, expected) in cases {
            assert_eq!(MoveClassification::classify(loss, 0), expected, "loss {loss}");
        }
    }

    #[test]
    fn test_ordered_by_severity() {
        let mut sorted = MoveClassification::ALL;
        sorted.reverse();
        sorted.sort();
        assert_eq!(sorted, MoveClassification::ALL);
        assert!(MoveClassification::Blunder > MoveClassification::Mistake);
    }

    #[test]
    fn test_serializes_snake_case() {
        let json = serde_json::to_string(&MoveClassification::Inaccuracy).unwrap();
        assert_eq!(json, "\"inaccuracy\"");
        assert_eq!(MoveClassification::Blunder.to_string(), "blunder");
    }
}
