pub mod bag;
pub mod board;
pub mod error;
pub mod game;
pub mod judge;
pub mod moves;
pub mod npc;
pub mod persistence;
pub mod player;
pub mod reporting;
pub mod rules;
pub mod scoring;
