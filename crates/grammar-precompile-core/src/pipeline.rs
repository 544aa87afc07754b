/*!
# Precompile Pipeline

Runs one file end to end:

```text
parse → bindings → gate → materialize → emit clone → load → extract → inject → emit
```

Every early exit leaves the program exactly as it came in. Errors from the
runtime abort the file before anything is injected.
*/

use swc_core::ecma::ast::Program;

use crate::analysis::{BaseClassAliases, GateDecision, SkipReason, UsageGate};
use crate::extract::GrammarExtractor;
use crate::runtime::{CompiledModule, ModuleLoader};
use crate::source::{ParsedSource, Printer};
use crate::transform::{
    is_derived_clone, ClassInjection, ExportMaterializer, FileContext, InjectionOutcome, Injector,
};
use crate::{PrecompileConfig, Result};

/// What the pipeline did to one file
#[derive(Debug, Clone, PartialEq)]
pub enum PrecompileOutcome {
    /// The program was not modified
    Skipped(SkipReason),
    /// Grammars were extracted; the report says which classes received one
    Transformed(TransformReport),
}

impl PrecompileOutcome {
    /// Whether any class received a grammar
    pub fn modified(&self) -> bool {
        match self {
            PrecompileOutcome::Skipped(_) => false,
            PrecompileOutcome::Transformed(report) => report.injected_count() > 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformReport {
    pub aliases: BaseClassAliases,
    /// One entry per parser class, in source order
    pub injections: Vec<ClassInjection>,
}

impl TransformReport {
    pub fn injected_count(&self) -> usize {
        self.injections
            .iter()
            .filter(|injection| !matches!(injection.outcome, InjectionOutcome::Skipped(_)))
            .count()
    }
}

/// Grammar precompiler for single files
pub struct GrammarPrecompiler {
    config: PrecompileConfig,
    loader: Box<dyn ModuleLoader>,
}

impl GrammarPrecompiler {
    pub fn new(config: PrecompileConfig, loader: Box<dyn ModuleLoader>) -> Self {
        Self { config, loader }
    }

    /// Parse, transform and print one source file.
    ///
    /// A file in which no class received a grammar is returned byte for byte.
    pub fn precompile_source(
        &self,
        source: &str,
        filename: &str,
    ) -> Result<(String, PrecompileOutcome)> {
        let mut parsed = ParsedSource::parse(source, filename)?;
        let ctx = FileContext::new(filename).with_debug(self.config.debug);
        let printer = parsed.printer();
        let outcome = self.precompile_with(&mut parsed.program, &ctx, &printer)?;
        if !outcome.modified() {
            return Ok((source.to_string(), outcome));
        }
        Ok((parsed.emit()?, outcome))
    }

    /// Transform an already parsed program in place.
    ///
    /// The source map of `program` is unknown here, so the clone handed to the
    /// runtime is printed without positions or comments.
    pub fn precompile(&self, program: &mut Program, ctx: &FileContext) -> Result<PrecompileOutcome> {
        self.precompile_with(program, ctx, &Printer::detached())
    }

    fn precompile_with(
        &self,
        program: &mut Program,
        ctx: &FileContext,
        printer: &Printer,
    ) -> Result<PrecompileOutcome> {
        if is_derived_clone(program) {
            return Ok(self.skip(SkipReason::DerivedClone, ctx));
        }

        let (aliases, class_names) = match UsageGate::new(&self.config).evaluate(program) {
            GateDecision::Skip(reason) => return Ok(self.skip(reason, ctx)),
            GateDecision::Proceed {
                aliases,
                class_names,
            } => (aliases, class_names),
        };
        diagnostic!(
            ctx,
            file = %ctx.filename,
            aliases = %aliases,
            "Parser classes found: {}",
            class_names.join(", ")
        );

        let materialized = ExportMaterializer::new(&aliases).materialize(program);
        let module = CompiledModule {
            code: printer.print(&materialized.program)?,
            filename: ctx.filename.clone(),
            format: materialized.format,
            export_key: materialized.export_key,
            class_names: materialized.class_names,
        };

        let exports = match self.loader.load(&module)? {
            Some(exports) if !exports.is_empty() => exports,
            _ => return Ok(self.skip(SkipReason::NoExports, ctx)),
        };
        let grammars = GrammarExtractor::extract(&exports, ctx)?;

        let injections = Injector::new(
            &aliases,
            &grammars,
            &self.config.grammar_property,
            self.config.duplicate_policy,
        )
        .inject(program, ctx)?;

        Ok(PrecompileOutcome::Transformed(TransformReport {
            aliases,
            injections,
        }))
    }

    fn skip(&self, reason: SkipReason, ctx: &FileContext) -> PrecompileOutcome {
        diagnostic!(ctx, file = %ctx.filename, "Skipping file: {reason}");
        PrecompileOutcome::Skipped(reason)
    }
}
