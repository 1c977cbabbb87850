pub mod cloud_run;
pub mod transport;
