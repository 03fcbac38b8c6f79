pub mod config;
pub mod help;
pub mod init;
pub mod run;
