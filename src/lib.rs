// THEORY:
// This file is the entry point for the `point_tracker` library crate. It follows
// the standard Rust convention of using `lib.rs` to define the public API.
//
// The library follows one uniquely colored marker through a finite, pre-extracted
// sequence of video frames. The layers, leaves first:
//
// - `core_modules::color`: color similarity (normalized RGB distance).
// - `core_modules::point_search`: centroid of matching pixels inside a window.
// - `core_modules::motion`: constant-velocity prediction from the last two positions.
// - `core_modules::tracker`: the expanding-window search and the per-run track.
// - `core_modules::annotator`: marks and speed label drawn onto each frame.
// - `pipeline` / `parallel_pipeline`: the driving loops over a whole sequence.
//
// Decoding video into frames and encoding frames back into video happen outside
// this crate; `frame_store` reads and writes the directory of frames in between.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod frame_store;
pub mod parallel_pipeline;
pub mod pipeline;

pub use config::TrackingConfig;
pub use core_modules::color::Color;
pub use core_modules::frame::Frame;
pub use core_modules::position::Position;
pub use core_modules::track::Track;
pub use error::TrackError;
pub use frame_store::FrameDirectory;
pub use parallel_pipeline::ParallelPipeline;
pub use pipeline::{TrackingPipeline, track_sequence};
