pub mod chip_seq;
