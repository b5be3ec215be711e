use std::cmp::Ordering;

use crate::board::Board;
use crate::player::Rack;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoardScore {
    infinity: bool,
    neg_infinity: bool,
    occupancy: f32,
    rack_potential: f32,
    premium_control: f32,
    conceded: f32,
}

impl BoardScore {
    pub fn occupancy(mut self, value: f32) -> Self {
        self.occupancy = value;
        self
    }

    pub fn rack_potential(mut self, value: f32) -> Self {
        self.rack_potential = value;
        self
    }

    pub fn premium_control(mut self, value: f32) -> Self {
        self.premium_control = value;
        self
    }

    /// Points handed to the opponent. Negative values widen a search window instead.
    pub fn conceding(&self, points: f32) -> Self {
        Self {
            conceded: self.conceded + points,
            ..self.clone()
        }
    }
}

impl BoardScore {
    pub fn inf() -> Self {
        Self {
            infinity: true,
            ..Self::default()
        }
    }

    pub fn neg_inf() -> Self {
        Self {
            neg_infinity: true,
            ..Self::default()
        }
    }

    /// Scores the position from the side of whoever holds `rack`.
    pub fn of_position(board: &Board, rack: &Rack) -> Self {
        let premium_control: u32 = board
            .tiles()
            .filter_map(|(position, _)| board.bonus(position))
            .map(|bonus| {
                if bonus.is_word_bonus() {
                    3
                } else if bonus.is_letter_bonus() {
                    1
                } else {
                    0
                }
            })
            .sum();

        Self::default()
            .occupancy(board.tile_count() as f32)
            .rack_potential(rack.total_value() as f32)
            .premium_control(premium_control as f32)
    }
}

impl BoardScore {
    pub fn rank(&self) -> f32 {
        self.occupancy * 2.0 + self.rack_potential + self.premium_control - self.conceded
    }
}

impl PartialOrd for BoardScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.infinity.partial_cmp(&other.infinity) {
            Some(core::cmp::Ordering::Equal) => {}
            ord => return ord,
        }
        match other.neg_infinity.partial_cmp(&self.neg_infinity) {
            Some(core::cmp::Ordering::Equal) => {}
            ord => return ord,
        }

        self.rank().partial_cmp(&other.rank())
    }
}
