pub mod synthetic_tile;
