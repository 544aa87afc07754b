//! Program to source text

use std::io;

use swc_core::common::comments::{Comments, SingleThreadedComments};
use swc_core::common::{sync::Lrc, SourceMap, Span, DUMMY_SP};
use swc_core::ecma::ast::Program;
use swc_core::ecma::codegen::{text_writer::JsWriter, Config, Emitter};
use swc_core::ecma::visit::{VisitMut, VisitMutWith};

use crate::{PrecompileError, Result};

/// Print a program as JavaScript source text
pub fn emit_program(
    cm: &Lrc<SourceMap>,
    comments: Option<&dyn Comments>,
    program: &Program,
) -> Result<String> {
    let mut buf = Vec::new();
    {
        let mut emitter = Emitter {
            cfg: Config::default(),
            cm: cm.clone(),
            comments,
            wr: JsWriter::new(cm.clone(), "\n", &mut buf, None),
        };
        emitter.emit_program(program).map_err(PrecompileError::Emit)?;
    }
    String::from_utf8(buf)
        .map_err(|err| PrecompileError::Emit(io::Error::new(io::ErrorKind::InvalidData, err)))
}

/// Prints programs against one source map and comment store.
///
/// A printer is detached from the program it prints, so it can be used while
/// that program is being mutated elsewhere.
#[derive(Clone, Default)]
pub struct Printer {
    cm: Lrc<SourceMap>,
    comments: Option<SingleThreadedComments>,
    detached: bool,
}

impl Printer {
    pub fn new(cm: Lrc<SourceMap>, comments: SingleThreadedComments) -> Self {
        Self {
            cm,
            comments: Some(comments),
            detached: false,
        }
    }

    /// Printer for programs whose source map is not available.
    ///
    /// Spans are cleared before printing since they point into an unknown map.
    pub fn detached() -> Self {
        Self {
            detached: true,
            ..Default::default()
        }
    }

    pub fn print(&self, program: &Program) -> Result<String> {
        let comments = self.comments.as_ref().map(|c| c as &dyn Comments);
        if self.detached {
            let mut program = program.clone();
            program.visit_mut_with(&mut ClearSpans);
            return emit_program(&self.cm, comments, &program);
        }
        emit_program(&self.cm, comments, program)
    }
}

struct ClearSpans;

impl VisitMut for ClearSpans {
    fn visit_mut_span(&mut self, span: &mut Span) {
        *span = DUMMY_SP;
    }
}
