pub mod observation;
pub mod series;
pub mod source_target;
