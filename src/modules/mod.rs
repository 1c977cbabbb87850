pub mod trigger;
pub mod video;
