pub mod aggregate;
pub mod bugs;
pub mod classify;
pub mod cli;
pub mod commit_types;
pub mod config;
pub mod context;
pub mod contributors;
pub mod error;
pub mod frequency;
pub mod git;
pub mod issues;
pub mod model;
pub mod parse;
pub mod releases;
pub mod report;
pub mod summary;
pub mod util;
