pub mod command;
pub mod fastq;
pub mod file;
pub mod peaks;
pub mod streams;
pub mod system;
