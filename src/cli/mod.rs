pub mod args;

use clap::Parser;

pub use args::{Arguments, Bowtie2Mode, PeakCaller, ReadAligner};

pub fn parse() -> Arguments {
    Arguments::parse()
}
