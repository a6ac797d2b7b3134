pub mod console;
pub mod management;
