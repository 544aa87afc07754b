//! JavaScript source handling
//!
//! Parses source text into an SWC [`Program`] and prints it back. Comments are
//! collected during parsing and re-attached on emit, so a file that passes
//! through untouched keeps its documentation.

pub mod emit;

use swc_core::common::{comments::SingleThreadedComments, sync::Lrc, FileName, SourceMap, Spanned};
use swc_core::ecma::ast::{EsVersion, ModuleItem, Program};
use swc_core::ecma::parser::{parse_file_as_program, EsSyntax, Syntax};

use crate::{PrecompileError, Result};

pub use emit::{emit_program, Printer};

/// How the derived clone of a program publishes its export map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleFormat {
    /// The program has import/export declarations: `export const KEY = {}`
    EsModule,
    /// Plain script: `exports.KEY = {}`
    CommonJs,
}

impl ModuleFormat {
    pub fn detect(program: &Program) -> Self {
        match program {
            Program::Module(module)
                if module
                    .body
                    .iter()
                    .any(|item| matches!(item, ModuleItem::ModuleDecl(_))) =>
            {
                ModuleFormat::EsModule
            }
            _ => ModuleFormat::CommonJs,
        }
    }

    /// File extension node uses to pick the matching module loader
    pub fn extension(&self) -> &'static str {
        match self {
            ModuleFormat::EsModule => "mjs",
            ModuleFormat::CommonJs => "cjs",
        }
    }
}

/// A parsed file together with the source map and comments needed to print it
pub struct ParsedSource {
    pub program: Program,
    cm: Lrc<SourceMap>,
    comments: SingleThreadedComments,
}

impl ParsedSource {
    /// Parse JavaScript source text.
    ///
    /// Recoverable syntax errors are treated as fatal: a file the parser had to
    /// patch up is not a file we want to execute at build time.
    pub fn parse(source: &str, filename: &str) -> Result<Self> {
        let cm: Lrc<SourceMap> = Default::default();
        let comments = SingleThreadedComments::default();
        let fm = cm.new_source_file(
            FileName::Custom(filename.to_string()).into(),
            source.to_string(),
        );

        let mut recovered = Vec::new();
        let program = parse_file_as_program(
            &fm,
            Syntax::Es(EsSyntax::default()),
            EsVersion::EsNext,
            Some(&comments),
            &mut recovered,
        );

        let program = match program {
            Ok(program) => program,
            Err(err) => return Err(syntax_error(&cm, filename, err)),
        };
        if let Some(err) = recovered.into_iter().next() {
            return Err(syntax_error(&cm, filename, err));
        }

        Ok(Self {
            program,
            cm,
            comments,
        })
    }

    pub fn format(&self) -> ModuleFormat {
        ModuleFormat::detect(&self.program)
    }

    /// Print the (possibly transformed) program
    pub fn emit(&self) -> Result<String> {
        emit_program(&self.cm, Some(&self.comments), &self.program)
    }

    /// Print another program with this file's source map, e.g. a derived clone
    pub fn emit_other(&self, program: &Program) -> Result<String> {
        emit_program(&self.cm, Some(&self.comments), program)
    }

    /// A printer sharing this file's source map and comments
    pub fn printer(&self) -> Printer {
        Printer::new(self.cm.clone(), self.comments.clone())
    }
}

fn syntax_error(
    cm: &Lrc<SourceMap>,
    filename: &str,
    err: swc_core::ecma::parser::error::Error,
) -> PrecompileError {
    let loc = cm.lookup_char_pos(err.span().lo);
    PrecompileError::Parse {
        filename: filename.to_string(),
        message: format!(
            "{}:{}: {}",
            loc.line,
            loc.col_display + 1,
            err.into_kind().msg()
        ),
    }
}
