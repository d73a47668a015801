pub mod clip;
pub mod color;
mod debug;
mod error;
pub mod extract;
pub mod flatten;
pub mod gradient;
pub mod node;
pub mod path;
pub mod resolve;
pub mod shapes;
pub mod style;
pub mod transform;
pub mod tree;
pub mod writer;

use debug::DebugLogger;
pub use error::ConvertError;
use roxmltree::{Document, ParsingOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
pub use transform::AffineTransform;
pub use tree::{LogLevel, LogMessage, SvgTree};

// Stand-in for input that is not well-formed XML; it yields no content.
const EMPTY_SVG: &str = "<svg/>";
const MAX_COORDINATE_DIGITS: usize = 10;

// Result of one conversion. `output` is empty when nothing drawable was
// found, and must be discarded whenever `has_errors` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    pub output: String,
    pub diagnostics: String,
    pub has_errors: bool,
}

impl Conversion {
    pub fn has_output(&self) -> bool {
        !self.output.is_empty()
    }
}

#[derive(Clone)]
pub struct Converter {
    scale_factor: f64,
    coordinate_digits: Option<usize>,
    debug: Option<Arc<DebugLogger>>,
}

#[derive(Clone)]
pub struct ConverterBuilder {
    scale_factor: f64,
    coordinate_digits: Option<usize>,
    debug_path: Option<PathBuf>,
}

pub fn convert(svg: &str) -> Conversion {
    Converter::default().convert_str(svg)
}

impl Default for Converter {
    fn default() -> Self {
        Self {
            scale_factor: 1.0,
            coordinate_digits: None,
            debug: None,
        }
    }
}

impl Converter {
    pub fn builder() -> ConverterBuilder {
        ConverterBuilder::new()
    }

    pub fn convert_str(&self, svg: &str) -> Conversion {
        let conversion = self.convert_at(None, svg);
        self.emit_debug_summary("convert_str");
        conversion
    }

    // Reads `input`, converts it and writes `output` when there is content
    // to write. Diagnostics do not make this fail; only I/O does.
    pub fn convert_file(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> Result<Conversion, ConvertError> {
        let result = self.convert_file_at(None, input.as_ref(), output.as_ref());
        self.emit_debug_summary("convert_file");
        result
    }

    // Independent conversions in parallel; results keep the input order.
    pub fn convert_many(&self, jobs: &[(PathBuf, PathBuf)]) -> Vec<Result<Conversion, ConvertError>> {
        use rayon::prelude::*;

        let mut results: Vec<(usize, Result<Conversion, ConvertError>)> = jobs
            .par_iter()
            .enumerate()
            .map(|(idx, (input, output))| (idx, self.convert_file_at(Some(idx), input, output)))
            .collect();
        results.sort_by_key(|(idx, _)| *idx);
        self.emit_debug_summary("convert_many");
        results.into_iter().map(|(_, res)| res).collect()
    }

    fn convert_file_at(
        &self,
        doc_id: Option<usize>,
        input: &Path,
        output: &Path,
    ) -> Result<Conversion, ConvertError> {
        let svg = std::fs::read_to_string(input)?;
        let conversion = self.convert_at(doc_id, &svg);
        if conversion.has_output() {
            std::fs::write(output, &conversion.output)?;
        }
        Ok(conversion)
    }

    fn convert_at(&self, doc_id: Option<usize>, svg: &str) -> Conversion {
        let mut tree = SvgTree::new();
        tree.scale_factor = self.scale_factor;
        tree.digits_override = self.coordinate_digits;

        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        let document = self.timed("parse", doc_id, || {
            match Document::parse_with_options(svg, options) {
                Ok(doc) => Some(doc),
                Err(err) => {
                    tree.log_error(err.to_string(), err.pos().row);
                    Document::parse(EMPTY_SVG).ok()
                }
            }
        });

        if let Some(document) = document {
            self.timed("extract", doc_id, || {
                if let Err(err) = extract::extract_document(&mut tree, &document) {
                    tree.log_error(err.to_string(), 0);
                }
            });
        }
        self.timed("resolve", doc_id, || resolve::resolve_uses(&mut tree));
        self.timed("style", doc_id, || style::apply_styles(&mut tree));
        self.timed("clip", doc_id, || clip::substitute_clips(&mut tree));
        self.timed("flatten", doc_id, || flatten::flatten(&mut tree));
        self.timed("validate", doc_id, || writer::validate(&mut tree));
        let output = self.timed("write", doc_id, || {
            if tree.has_leaf {
                writer::write_xml(&tree)
            } else {
                String::new()
            }
        });

        self.record_run(doc_id, &tree);
        Conversion {
            output,
            diagnostics: tree.error_message(),
            has_errors: tree.has_errors(),
        }
    }

    fn timed<T>(&self, stage: &str, doc_id: Option<usize>, run: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let out = run();
        if let Some(logger) = self.debug.as_deref() {
            logger.log_stage_ms(stage, doc_id, started.elapsed().as_secs_f64() * 1000.0);
        }
        out
    }

    fn record_run(&self, doc_id: Option<usize>, tree: &SvgTree) {
        let Some(logger) = self.debug.as_deref() else {
            return;
        };
        for message in tree.messages() {
            logger.log_diagnostic(doc_id, message);
        }
        let leaves = (0..tree.node_count())
            .filter(|idx| tree.node(node::NodeId(*idx)).as_leaf().is_some())
            .count();
        logger.increment("documents", 1);
        logger.increment("nodes", tree.node_count() as u64);
        logger.increment("leaves", leaves as u64);
        logger.increment("use_expansions", tree.use_expansions);
        logger.increment("clip_substitutions", tree.clip_substitutions);
        logger.increment("diagnostics", tree.messages().len() as u64);
        if tree.has_errors() {
            logger.increment("documents_with_errors", 1);
        }
    }

    fn emit_debug_summary(&self, context: &str) {
        if let Some(logger) = self.debug.as_deref() {
            logger.emit_summary(context);
            logger.flush();
        }
    }
}

impl Default for ConverterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConverterBuilder {
    pub fn new() -> Self {
        Self {
            scale_factor: 1.0,
            coordinate_digits: None,
            debug_path: None,
        }
    }

    pub fn scale_factor(mut self, scale: f64) -> Self {
        self.scale_factor = scale;
        self
    }

    pub fn coordinate_digits(mut self, digits: Option<usize>) -> Self {
        self.coordinate_digits = digits;
        self
    }

    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<Converter, ConvertError> {
        if !self.scale_factor.is_finite() || self.scale_factor <= 0.0 {
            return Err(ConvertError::InvalidConfiguration(
                "scale_factor must be a finite number > 0".to_string(),
            ));
        }
        if self
            .coordinate_digits
            .is_some_and(|digits| digits > MAX_COORDINATE_DIGITS)
        {
            return Err(ConvertError::InvalidConfiguration(format!(
                "coordinate_digits must be <= {MAX_COORDINATE_DIGITS}"
            )));
        }
        let debug = match self.debug_path {
            Some(path) => Some(Arc::new(DebugLogger::new(path)?)),
            None => None,
        };
        Ok(Converter {
            scale_factor: self.scale_factor,
            coordinate_digits: self.coordinate_digits,
            debug,
        })
    }
}
