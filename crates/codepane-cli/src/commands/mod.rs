pub mod open;
pub mod render;
pub mod run;
pub mod share;
pub mod watch;
