//! Kiln core library.
//!
//! Kiln reads a `Kilnfile` project description, builds one backend-agnostic
//! [`graph::RuleGraph`] for the whole project and renders it into the build
//! files of a make dialect described by a [`backend::BackendProfile`].

pub mod ast;
pub mod backend;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod expand;
pub mod graph;
pub mod hasher;
pub mod manifest;
pub mod runner;
pub mod sources;
pub mod submit;
