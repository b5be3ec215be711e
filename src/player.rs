use serde::{Deserialize, Serialize};
use std::fmt;
use std::slice::Iter;

use crate::bag::{Tile, TileBag};

pub const RACK_SIZE: usize = 7;
pub const AI_PLAYER_ID: i64 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rack {
    tiles: Vec<Tile>,
    capacity: usize,
}

impl Default for Rack {
    fn default() -> Self {
        Self::new(RACK_SIZE)
    }
}

impl Rack {
    pub fn new(capacity: usize) -> Self {
        Self {
            tiles: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn with_tiles(tiles: Vec<Tile>) -> Self {
        let mut rack = Self::new(RACK_SIZE.max(tiles.len()));
        rack.extend(tiles);
        rack
    }

    pub fn add(&mut self, tile: Tile) {
        assert!(
            self.tiles.len() < self.capacity,
            "Rack can hold at most {} tiles",
            self.capacity
        );
        self.tiles.push(tile.undesignated());
    }

    pub fn extend<I: IntoIterator<Item = Tile>>(&mut self, tiles: I) {
        for tile in tiles {
            self.add(tile);
        }
    }

    /// Removes a tile matching `tile`: a blank for any blank, otherwise the same letter.
    pub fn take(&mut self, tile: &Tile) -> Option<Tile> {
        let index = self.tiles.iter().position(|t| {
            if tile.blank {
                t.blank
            } else {
                !t.blank && t.letter == tile.letter
            }
        })?;
        Some(self.tiles.remove(index))
    }

    /// Takes every tile in `tiles` or none of them. Returns the rack's own tiles that were taken.
    pub fn remove_all(&mut self, tiles: &[Tile]) -> Option<Vec<Tile>> {
        let mut remaining = self.clone();
        let taken = tiles
            .iter()
            .map(|tile| remaining.take(tile))
            .collect::<Option<Vec<_>>>()?;
        *self = remaining;
        Some(taken)
    }

    /// Draws from the bag until the rack is full or the bag is empty. Returns what was drawn.
    pub fn refill(&mut self, bag: &mut TileBag) -> Vec<Tile> {
        let drawn = bag.draw(self.missing());
        self.tiles.extend(drawn.iter().copied());
        drawn
    }

    pub fn drain(&mut self) -> Vec<Tile> {
        std::mem::take(&mut self.tiles)
    }

    pub fn total_value(&self) -> u32 {
        self.tiles.iter().map(|t| t.value).sum()
    }

    pub fn missing(&self) -> usize {
        self.capacity.saturating_sub(self.tiles.len())
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn iter(&self) -> Iter<'_, Tile> {
        self.tiles.iter()
    }

    pub fn letters(&self) -> String {
        self.tiles.iter().map(|t| t.letter).collect()
    }

    /// Order-insensitive comparison.
    pub fn same_tiles(&self, other: &Rack) -> bool {
        let mut a = self.tiles.clone();
        let mut b = other.tiles.clone();
        a.sort_by_key(|t| (t.letter, t.blank));
        b.sort_by_key(|t| (t.letter, t.blank));
        a == b
    }
}

impl fmt::Display for Rack {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            self.tiles
                .iter()
                .map(|t| t.letter.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: i64,
    pub name: String,
    pub is_ai: bool,
    pub rack: Rack,
}

impl Player {
    pub fn new(id: i64, name: String, is_ai: bool, rack_size: usize) -> Self {
        Self {
            id,
            name,
            is_ai,
            rack: Rack::new(rack_size),
        }
    }

    pub fn human(id: i64, name: String, rack_size: usize) -> Self {
        Self::new(id, name, false, rack_size)
    }

    pub fn ai(rack_size: usize) -> Self {
        Self::new(AI_PLAYER_ID, "AI".into(), true, rack_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rack(letters: &str) -> Rack {
        Rack::with_tiles(
            letters
                .chars()
                .map(|c| if c == '?' { Tile::blank() } else { Tile::standard(c) })
                .collect(),
        )
    }

    #[test]
    fn refills_to_capacity() {
        let mut bag = TileBag::custom(&[('A', 10, 1)], Some(0));
        let mut r = rack("QZ");

        let drawn = r.refill(&mut bag);
        assert_eq!(drawn.len(), 5);
        assert_eq!(r.len(), RACK_SIZE);
        assert_eq!(bag.remaining_count(), 5);
        assert_eq!(r.total_value(), 10 + 10 + 5);

        assert!(r.refill(&mut bag).is_empty());
    }

    #[test]
    #[should_panic(expected = "at most 7")]
    fn overfull_racks_are_bugs() {
        let mut r = rack("ABCDEFG");
        r.add(Tile::standard('H'));
    }

    #[test]
    fn takes_letters_and_blanks() {
        let mut r = rack("AB?");

        assert_eq!(r.take(&Tile::standard('C')), None);
        assert_eq!(r.take(&Tile::blank().designate('C')), Some(Tile::blank()));
        assert_eq!(r.take(&Tile::standard('a')), Some(Tile::standard('A')));
        assert_eq!(r.letters(), "B");
    }

    #[test]
    fn removes_all_or_nothing() {
        let mut r = rack("CAT");
        assert_eq!(
            r.remove_all(&[Tile::standard('C'), Tile::standard('C')]),
            None
        );
        assert_eq!(r.len(), 3);
        assert_eq!(
            r.remove_all(&[Tile::new('T', 0), Tile::standard('C')]),
            Some(vec![Tile::standard('T'), Tile::standard('C')])
        );
        assert_eq!(r.to_string(), "A");
    }
}
