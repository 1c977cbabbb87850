pub mod db;
pub mod jobs;
pub mod media;
pub mod storage;
