pub mod annotator;
pub mod color;
pub mod frame;
pub mod glyphs;
pub mod motion;
pub mod point_search;
pub mod position;
pub mod track;
pub mod tracker;
