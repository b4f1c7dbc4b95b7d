//! CLI command implementations for juncfilt.
//!
//! Each submodule implements one command:
//!
//! - [`filter`] - filter spliced alignments against a trusted junction set

#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::struct_excessive_bools,
    clippy::too_many_lines
)]

pub mod command;
pub mod common;
pub mod filter;
