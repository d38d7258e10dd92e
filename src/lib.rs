//! halpatch: plan incremental updates of HAL multi-genome alignments.
//!
//! Layers, inner to outer: `domain` (tree, patches, plans), `application`
//! (services over I/O traits), `infrastructure` (real I/O and wiring),
//! `cli` (arguments, dispatch, output).

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
