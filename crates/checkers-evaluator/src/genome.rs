//! Board evaluation weights ("brains") that parameterize a checkers AI.
//!
//! A [`Genome`] is stored as a record with one named field per heuristic so the
//! evaluation code can read `genome.king` instead of `weights[2]`. The genetic
//! algorithm, on the other hand, works on flat weight vectors. The two views are
//! connected by an explicit mapping ([`Genome::to_weights`], [`Genome::from_weights`]
//! and the [`Index`]/[`IndexMut`] impls) whose order is fixed by [`Genome::NAMES`].
//!
//! # Weight order
//!
//! | Index | Field                | Name                          |
//! |-------|----------------------|-------------------------------|
//! | 0     | `men_at_home_row`    | `pointsForMenAtHomeRow`       |
//! | 1     | `men_at_king_row`    | `pointsForMenAtKingRow`       |
//! | 2     | `king`               | `pointsForKing`               |
//! | 3     | `move_available`     | `pointsForMoveAvailable`      |
//! | 4     | `piece_in_center`    | `pointsForPieceInCenter`      |
//! | 5     | `adjacent_ally`      | `pointsPerAdjacentAlly`       |
//! | 6     | `adjacent_boundary`  | `pointsPerAdjacentBoundary`   |
//! | 7     | `adjacent_opponent`  | `pointsPerAdjacentOpponent`   |
//! | 8     | `adjacent_empty`     | `pointsPerAdjacentEmptySpace` |
//!
//! Weight 0 is the conventional reference weight: training may pin it so the
//! remaining weights are expressed relative to the value of an unadvanced man.

use std::{
    fmt,
    ops::{Index, IndexMut},
};

use serde::{Deserialize, Serialize};

/// Evaluation weights for one AI player.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    /// Value of a man still on its home row.
    #[serde(rename = "pointsForMenAtHomeRow")]
    pub men_at_home_row: f64,
    /// Value of a man one step away from promotion.
    ///
    /// Men between the two rows are valued by linear interpolation.
    #[serde(rename = "pointsForMenAtKingRow")]
    pub men_at_king_row: f64,
    /// Value of a king.
    #[serde(rename = "pointsForKing")]
    pub king: f64,
    /// Value of each legal move available to a side.
    #[serde(rename = "pointsForMoveAvailable")]
    pub move_available: f64,
    /// Bonus for a piece standing in the center, scaled by Manhattan distance.
    #[serde(rename = "pointsForPieceInCenter")]
    pub piece_in_center: f64,
    /// Value per diagonal neighbour occupied by an ally.
    #[serde(rename = "pointsPerAdjacentAlly")]
    pub adjacent_ally: f64,
    /// Value per diagonal direction blocked by the board edge.
    #[serde(rename = "pointsPerAdjacentBoundary")]
    pub adjacent_boundary: f64,
    /// Value per diagonal neighbour occupied by an opponent.
    #[serde(rename = "pointsPerAdjacentOpponent")]
    pub adjacent_opponent: f64,
    /// Value per empty diagonal neighbour.
    #[serde(rename = "pointsPerAdjacentEmptySpace")]
    pub adjacent_empty: f64,
}

impl Default for Genome {
    fn default() -> Self {
        Self {
            men_at_home_row: 1.0,
            men_at_king_row: 1.5,
            king: 3.0,
            move_available: 0.1,
            piece_in_center: 0.2,
            adjacent_ally: 0.1,
            adjacent_boundary: 0.05,
            adjacent_opponent: -0.1,
            adjacent_empty: 0.0,
        }
    }
}

impl Genome {
    /// Number of weights in a genome.
    pub const LEN: usize = 9;

    /// Index of the weight that may be pinned as a constant reference.
    pub const REFERENCE_WEIGHT: usize = 0;

    /// Serialized weight names, in weight-vector order.
    pub const NAMES: [&'static str; Self::LEN] = [
        "pointsForMenAtHomeRow",
        "pointsForMenAtKingRow",
        "pointsForKing",
        "pointsForMoveAvailable",
        "pointsForPieceInCenter",
        "pointsPerAdjacentAlly",
        "pointsPerAdjacentBoundary",
        "pointsPerAdjacentOpponent",
        "pointsPerAdjacentEmptySpace",
    ];

    /// Builds a genome from a flat weight vector.
    ///
    /// # Examples
    ///
    /// ```
    /// use checkers_evaluator::Genome;
    ///
    /// let mut weights = [0.0; Genome::LEN];
    /// weights[2] = 4.0;
    /// let genome = Genome::from_weights(weights);
    /// assert_eq!(genome.king, 4.0);
    /// assert_eq!(genome.to_weights(), weights);
    /// ```
    #[must_use]
    pub fn from_weights(weights: [f64; Self::LEN]) -> Self {
        let [
            men_at_home_row,
            men_at_king_row,
            king,
            move_available,
            piece_in_center,
            adjacent_ally,
            adjacent_boundary,
            adjacent_opponent,
            adjacent_empty,
        ] = weights;
        Self {
            men_at_home_row,
            men_at_king_row,
            king,
            move_available,
            piece_in_center,
            adjacent_ally,
            adjacent_boundary,
            adjacent_opponent,
            adjacent_empty,
        }
    }

    /// Returns the weights as a flat vector in [`Genome::NAMES`] order.
    #[must_use]
    pub fn to_weights(&self) -> [f64; Self::LEN] {
        [
            self.men_at_home_row,
            self.men_at_king_row,
            self.king,
            self.move_available,
            self.piece_in_center,
            self.adjacent_ally,
            self.adjacent_boundary,
            self.adjacent_opponent,
            self.adjacent_empty,
        ]
    }

    /// Iterates over the weights in [`Genome::NAMES`] order.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        (0..Self::LEN).map(|i| self[i])
    }

    /// Iterates over `(name, weight)` pairs.
    pub fn named_weights(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        Self::NAMES.iter().copied().zip(self.iter())
    }

    /// Mean of the absolute weight values.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn mean_abs_weight(&self) -> f64 {
        self.iter().map(f64::abs).sum::<f64>() / Self::LEN as f64
    }
}

impl Index<usize> for Genome {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        match index {
            0 => &self.men_at_home_row,
            1 => &self.men_at_king_row,
            2 => &self.king,
            3 => &self.move_available,
            4 => &self.piece_in_center,
            5 => &self.adjacent_ally,
            6 => &self.adjacent_boundary,
            7 => &self.adjacent_opponent,
            8 => &self.adjacent_empty,
            _ => panic!("weight index {index} out of range (len {})", Self::LEN),
        }
    }
}

impl IndexMut<usize> for Genome {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        match index {
            0 => &mut self.men_at_home_row,
            1 => &mut self.men_at_king_row,
            2 => &mut self.king,
            3 => &mut self.move_available,
            4 => &mut self.piece_in_center,
            5 => &mut self.adjacent_ally,
            6 => &mut self.adjacent_boundary,
            7 => &mut self.adjacent_opponent,
            8 => &mut self.adjacent_empty,
            _ => panic!("weight index {index} out of range (len {})", Self::LEN),
        }
    }
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "_____Brain values_____")?;
        for (name, weight) in self.named_weights() {
            writeln!(f, "{name} : {weight}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_matches_named_fields() {
        let genome = Genome::from_weights([0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        assert_eq!(genome.men_at_home_row, 0.0);
        assert_eq!(genome.king, 2.0);
        assert_eq!(genome.adjacent_empty, 8.0);
        for i in 0..Genome::LEN {
            #[expect(clippy::cast_precision_loss)]
            let expected = i as f64;
            assert_eq!(genome[i], expected);
        }
    }

    #[test]
    fn test_index_mut_writes_through() {
        let mut genome = Genome::default();
        genome[7] = -3.5;
        assert_eq!(genome.adjacent_opponent, -3.5);
        assert_eq!(genome.to_weights()[7], -3.5);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_index_out_of_range_panics() {
        let genome = Genome::default();
        let _ = genome[Genome::LEN];
    }

    #[test]
    fn test_serialized_names_follow_name_table() {
        let genome = Genome::default();
        let value = serde_json::to_value(genome).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), Genome::LEN);
        for (name, weight) in genome.named_weights() {
            assert_eq!(object[name].as_f64().unwrap(), weight);
        }
        let back: Genome = serde_json::from_value(value).unwrap();
        assert_eq!(back, genome);
    }

    #[test]
    fn test_mean_abs_weight() {
        let genome = Genome::from_weights([1.0, -1.0, 2.0, -2.0, 0.0, 0.0, 0.0, 0.0, 4.5]);
        assert!((genome.mean_abs_weight() - 1.166_666_666_666_666_7).abs() < 1e-12);
    }

    #[test]
    fn test_default_reference_weight_is_one() {
        assert_eq!(Genome::default()[Genome::REFERENCE_WEIGHT], 1.0);
    }
}
