use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::rules;

/// Letter, count in a fresh bag, and point value.
pub const STANDARD_DISTRIBUTION: [(char, usize, u32); 27] = [
    ('A', 9, 1),
    ('B', 2, 3),
    ('C', 2, 3),
    ('D', 4, 2),
    ('E', 12, 1),
    ('F', 2, 4),
    ('G', 3, 2),
    ('H', 2, 4),
    ('I', 9, 1),
    ('J', 1, 8),
    ('K', 1, 5),
    ('L', 4, 1),
    ('M', 2, 3),
    ('N', 6, 1),
    ('O', 8, 1),
    ('P', 2, 3),
    ('Q', 1, 10),
    ('R', 6, 1),
    ('S', 4, 1),
    ('T', 6, 1),
    ('U', 4, 1),
    ('V', 2, 4),
    ('W', 2, 4),
    ('X', 1, 8),
    ('Y', 2, 4),
    ('Z', 1, 10),
    (Tile::BLANK, 2, 0),
];

/// Point value of a letter under the standard distribution, 0 for blanks and unknown characters.
pub fn standard_value(letter: char) -> u32 {
    let letter = letter.to_ascii_uppercase();
    STANDARD_DISTRIBUTION
        .iter()
        .find(|(l, _, _)| *l == letter)
        .map(|(_, _, value)| *value)
        .unwrap_or(0)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    pub letter: char,
    pub value: u32,
    /// Blanks keep this flag after being given a letter, so they score 0 and go back to a rack blank.
    pub blank: bool,
}

impl Tile {
    pub const BLANK: char = '?';

    pub fn new(letter: char, value: u32) -> Self {
        Self {
            letter: letter.to_ascii_uppercase(),
            value,
            blank: false,
        }
    }

    pub fn standard(letter: char) -> Self {
        Self::new(letter, standard_value(letter))
    }

    pub fn blank() -> Self {
        Self {
            letter: Self::BLANK,
            value: 0,
            blank: true,
        }
    }

    pub fn designate(self, letter: char) -> Self {
        debug_assert!(self.blank, "Only blank tiles can be designated");
        Self {
            letter: letter.to_ascii_uppercase(),
            value: 0,
            blank: true,
        }
    }

    pub fn is_designated(&self) -> bool {
        self.blank && self.letter != Self::BLANK
    }

    pub fn undesignated(self) -> Self {
        if self.blank {
            Self::blank()
        } else {
            self
        }
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.letter)
    }
}

pub(crate) fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

#[derive(Debug, Clone)]
pub struct TileBag {
    bag: Vec<Tile>,
    rng: StdRng,
    values: HashMap<char, u32>,
}

impl TileBag {
    pub fn new(tile_distribution: &rules::TileDistribution, seed: Option<u64>) -> Self {
        match tile_distribution {
            rules::TileDistribution::Standard => Self::custom(&STANDARD_DISTRIBUTION, seed),
        }
    }

    pub fn custom(letter_distribution: &[(char, usize, u32)], seed: Option<u64>) -> Self {
        let bag = letter_distribution
            .iter()
            .flat_map(|&(letter, count, value)| {
                let tile = if letter == Tile::BLANK {
                    Tile::blank()
                } else {
                    Tile::new(letter, value)
                };
                std::iter::repeat(tile).take(count)
            })
            .collect();
        let values = letter_distribution
            .iter()
            .map(|&(letter, _, value)| (letter, value))
            .collect();

        let mut tile_bag = TileBag {
            bag,
            rng: seeded_rng(seed),
            values,
        };
        tile_bag.shuffle();
        tile_bag
    }

    /// A bag holding exactly these tiles.
    pub fn explicit(tiles: Vec<Tile>, seed: Option<u64>) -> Self {
        let values = tiles.iter().map(|t| (t.letter, t.value)).collect();
        TileBag {
            bag: tiles,
            rng: seeded_rng(seed),
            values,
        }
    }

    pub fn draw_tile(&mut self) -> Option<Tile> {
        if self.bag.is_empty() {
            return None;
        }
        let index = self.rng.gen_range(0..self.bag.len());
        Some(self.bag.swap_remove(index))
    }

    /// Draws up to `n` tiles, fewer if the bag runs out.
    pub fn draw(&mut self, n: usize) -> Vec<Tile> {
        (0..n).map_while(|_| self.draw_tile()).collect()
    }

    pub fn return_tiles<I: IntoIterator<Item = Tile>>(&mut self, tiles: I) {
        self.bag.extend(tiles.into_iter().map(Tile::undesignated));
        self.shuffle();
    }

    /// Swaps `tiles` for the same number of fresh ones.
    /// Returns nothing, and keeps nothing, if the bag can't cover the whole exchange.
    pub fn exchange(&mut self, tiles: &[Tile]) -> Vec<Tile> {
        if tiles.is_empty() || tiles.len() > self.bag.len() {
            return vec![];
        }
        // Drawing first means a player can never get their own tiles back.
        let drawn = self.draw(tiles.len());
        self.return_tiles(tiles.iter().copied());
        drawn
    }

    pub fn remaining_count(&self) -> usize {
        self.bag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bag.is_empty()
    }

    pub fn letter_value(&self, letter: char) -> u32 {
        self.values
            .get(&letter.to_ascii_uppercase())
            .copied()
            .unwrap_or(0)
    }

    /// How many tiles of this letter are still in the bag.
    pub fn letter_count(&self, letter: char) -> usize {
        let letter = letter.to_ascii_uppercase();
        self.bag.iter().filter(|t| t.letter == letter).count()
    }

    /// Takes out a specific tile, e.g. one already known to be on the board.
    pub fn remove_tile(&mut self, tile: &Tile) -> Option<Tile> {
        let index = self.bag.iter().position(|t| {
            if tile.blank {
                t.blank
            } else {
                !t.blank && t.letter == tile.letter
            }
        })?;
        Some(self.bag.swap_remove(index))
    }

    pub fn remaining_tiles(&self) -> &[Tile] {
        &self.bag
    }

    fn shuffle(&mut self) {
        self.bag.shuffle(&mut self.rng);
    }
}

impl Default for TileBag {
    fn default() -> Self {
        Self::new(&rules::TileDistribution::Standard, None)
    }
}

impl PartialEq for TileBag {
    fn eq(&self, rhs: &Self) -> bool {
        let mut lhs_tiles = self.bag.clone();
        let mut rhs_tiles = rhs.bag.clone();
        lhs_tiles.sort_by_key(|t| t.letter);
        rhs_tiles.sort_by_key(|t| t.letter);
        lhs_tiles == rhs_tiles
    }
}

impl fmt::Display for TileBag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut letters: Vec<char> = self.bag.iter().map(|t| t.letter).collect();
        letters.sort_unstable();
        write!(f, "Letters in the bag:\n{:?}", letters)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn standard_bag_contents() {
        let bag = TileBag::new(&rules::TileDistribution::Standard, Some(1));
        assert_eq!(bag.remaining_count(), 100);
        assert_eq!(bag.letter_count('E'), 12);
        assert_eq!(bag.letter_count('?'), 2);
        assert_eq!(bag.letter_value('q'), 10);
        assert_eq!(bag.letter_value('?'), 0);
        assert_eq!(bag.letter_value('7'), 0);
    }

    #[test]
    fn draw_then_return_restores_count() {
        let mut bag = TileBag::new(&rules::TileDistribution::Standard, Some(2));
        let drawn = bag.draw(7);
        assert_eq!(drawn.len(), 7);
        assert_eq!(bag.remaining_count(), 93);

        bag.return_tiles(drawn);
        assert_eq!(bag.remaining_count(), 100);
        assert_eq!(bag, TileBag::new(&rules::TileDistribution::Standard, Some(3)));
    }

    #[test]
    fn draws_no_more_than_remaining() {
        let mut bag = a_b_bag();
        assert_eq!(bag.to_string(), "Letters in the bag:\n['A', 'B']");

        let drawn = bag.draw(5);
        assert_eq!(drawn.len(), 2);
        assert!(bag.is_empty());
        assert_eq!(bag.draw_tile(), None);
        assert!(bag.draw(3).is_empty());
    }

    #[test]
    fn designated_blanks_return_as_blanks() {
        let mut bag = TileBag::explicit(vec![], Some(0));
        bag.return_tiles([Tile::blank().designate('k')]);
        assert_eq!(bag.remaining_tiles(), &[Tile::blank()]);
    }

    #[test]
    fn exchange() {
        let mut bag = a_b_bag();
        let z = Tile::new('Z', 10);

        assert!(bag.exchange(&[z, z, z]).is_empty());
        assert_eq!(bag.remaining_count(), 2);
        assert!(bag.exchange(&[]).is_empty());

        let swapped = bag.exchange(&[z, z]);
        assert_eq!(swapped.len(), 2);
        assert!(swapped.iter().all(|t| t.letter == 'A' || t.letter == 'B'));
        assert_eq!(bag.to_string(), "Letters in the bag:\n['Z', 'Z']");
    }

    #[test]
    fn seeded_bags_draw_alike() {
        let mut a = TileBag::new(&rules::TileDistribution::Standard, Some(99));
        let mut b = TileBag::new(&rules::TileDistribution::Standard, Some(99));
        assert_eq!(a.draw(20), b.draw(20));
    }

    // Util functions
    pub fn a_b_bag() -> TileBag {
        TileBag::custom(&[('A', 1, 1), ('B', 1, 3)], Some(0))
    }
}
