//! gql-from-source - GraphQL schemas extracted from doc-comment tagged Rust code.
//!
//! Types, fields and resolvers are declared in ordinary Rust and tagged in
//! their doc comments (`/// @gqlType`, `/// @gqlField`, ...). This crate reads
//! those sources statically and produces a deterministic schema description
//! plus a map telling an executor how to call each field's resolver, or the
//! complete list of diagnostics explaining why it could not.
//!
//! # Architecture
//!
//! 1. [`scanner`] - finds the `.rs` files of a project
//! 2. [`parser`] - parses them with `syn`
//! 3. [`lower`] - turns syntax trees into the host-neutral [`model`]
//! 4. [`host`] - name resolution over the model ([`host::TypeHost`])
//! 5. [`collector`] and [`tags`] - find tagged declarations and read their doc tags
//! 6. [`type_resolver`], [`field_binder`] and [`schema_generator`] - build type definitions
//! 7. [`directives`], [`inheritance`] and [`schema_builder`] - validate and assemble
//! 8. [`extract`] - the pipeline driving all of the above
//! 9. [`serializer`] - YAML or JSON output
//!
//! # Example Usage
//!
//! ```no_run
//! use gql_from_source::{
//!     config::ExtractConfig,
//!     diagnostics::CodeFrame,
//!     extract::extract_modules,
//!     lower::lower_files,
//!     parser::AstParser,
//!     scanner::FileScanner,
//!     serializer::serialize_yaml,
//! };
//! use std::path::PathBuf;
//!
//! let scan_result = FileScanner::new(PathBuf::from("./my-server")).scan().unwrap();
//! let parsed: Vec<_> = AstParser::parse_files(&scan_result.rust_files)
//!     .into_iter()
//!     .filter_map(Result::ok)
//!     .collect();
//! let modules = lower_files(&parsed).unwrap();
//!
//! match extract_modules(&modules, &ExtractConfig::default()).unwrap() {
//!     Ok(output) => println!("{}", serialize_yaml(&output.schema).unwrap()),
//!     Err(diagnostics) => eprintln!("{}", CodeFrame::new(&modules.sources).format_all(&diagnostics)),
//! }
//! ```
//!
//! # Command-Line Interface
//!
//! See the [`cli`] module for the `gql-from-source` binary.

pub mod cli;
pub mod collector;
pub mod config;
pub mod diagnostics;
pub mod directives;
pub mod error;
pub mod extract;
pub mod field_binder;
pub mod host;
pub mod inheritance;
pub mod literal;
pub mod lower;
pub mod model;
pub mod parser;
pub mod scanner;
pub mod schema;
pub mod schema_builder;
pub mod schema_generator;
pub mod serializer;
pub mod session;
pub mod tags;
pub mod type_resolver;
