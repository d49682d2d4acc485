pub mod calibration;
pub mod config;
pub mod draft_analysis;
pub mod error;
pub mod export;
pub mod per90;
pub mod player_ratings;
pub mod provider;
pub mod records;
pub mod scaling;
pub mod scoregrid;
pub mod synthetic;
pub mod tables;
pub mod team_impact;
pub mod team_strength;
pub mod weights;
pub mod win_prob;
