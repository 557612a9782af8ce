pub mod console;
pub mod normalize;
pub mod render;
pub mod studentvue;
pub mod web;
pub mod xml;
