//! The extraction pipeline.
//!
//! ```text
//! collect -> generate (worklist) -> attach roots -> directives
//!         -> inheritance -> derived contexts -> assemble
//! ```
//!
//! Every pass reports into one diagnostic sink and keeps going. The run
//! yields a schema only when the sink is empty at the end.

use crate::collector::collect;
use crate::config::ExtractConfig;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::Result;
use crate::host::{ModuleIndex, TypeHost};
use crate::model::ModuleSet;
use crate::schema::SchemaOutput;
use crate::schema_builder::SchemaBuilder;
use crate::schema_generator::SchemaGenerator;
use crate::session::Session;
use log::debug;

/// Outcome of a run that did not fail fatally.
pub type Extraction = std::result::Result<SchemaOutput, Vec<Diagnostic>>;

/// Extracts the schema from the modules behind `host`.
///
/// The outer `Result` carries fatal failures of the type host or of an
/// engine invariant; user errors come back as `Ok(Err(diagnostics))`.
pub fn extract(host: &dyn TypeHost, config: &ExtractConfig) -> Result<Extraction> {
    let modules = host.modules();
    let mut sink = DiagnosticSink::new();

    let collection = collect(modules, &mut sink);
    debug!(
        "Collected {} declarations, {} root fields, {} function fields",
        collection.declarations.len(),
        collection.root_fields.len(),
        collection.functional_fields.len()
    );

    let mut session = Session::new(host, config, collection, sink);
    let generated = SchemaGenerator::new(&mut session).generate()?;
    let (mut sink, externals) = session.finish();

    let mut builder = SchemaBuilder::new(generated);
    builder.attach_fields(&mut sink);
    builder.check_directives(&mut sink);
    builder.resolve_inheritance(config, &mut sink);
    builder.check_derived_contexts(modules, &mut sink);
    let output = builder.build(&externals, &mut sink);

    let diagnostics = sink.finish();
    if diagnostics.is_empty() {
        Ok(Ok(output))
    } else {
        debug!("Extraction failed with {} diagnostics", diagnostics.len());
        Ok(Err(diagnostics))
    }
}

/// Extracts from an already lowered module set using [`ModuleIndex`].
pub fn extract_modules(modules: &ModuleSet, config: &ExtractConfig) -> Result<Extraction> {
    let index = ModuleIndex::new(modules);
    extract(&index, config)
}
