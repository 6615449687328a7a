pub mod activity;
pub mod cell_statistics;
pub mod event_labeler;
pub mod label_canonicalizer;
pub mod label_forest;
pub mod neighbor_graph;
pub mod wave_characterizer;
pub mod wave_raster;
