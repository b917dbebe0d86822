pub mod sample;
pub mod track;
pub mod ui;
