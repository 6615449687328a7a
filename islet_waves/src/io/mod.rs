// THEORY:
// The `io` module is the boundary between the engine and the file system. The
// core stages never touch a file; everything they consume or produce crosses
// this boundary as plain whitespace-delimited text or, for the raster plot, PNG.

pub mod raster_image;
pub mod text;
