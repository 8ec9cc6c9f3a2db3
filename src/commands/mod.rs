pub mod replay;
pub mod rules;
pub mod status;
