//! Library surface of the `strata` binary: subcommand implementations and
//! the file-backed collaborator implementations they run against.
//!
//! Split out of the binary so integration tests can drive the same code
//! paths the CLI does.

pub mod collaborators;
pub mod commands;
pub mod output;
