// vigil/src/commands/mod.rs

pub mod baselines;
pub mod init;
pub mod run;
