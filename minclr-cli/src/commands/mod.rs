pub mod common;
pub mod demo;
pub mod disasm;
pub mod run;
pub mod types;
