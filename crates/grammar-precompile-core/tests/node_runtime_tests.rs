/*!
# Node Runtime Integration Tests

Runs real derived clones with `node` against a stub `chevrotain` package
installed in a temporary `node_modules`. Every test returns early when no
`node` binary is on `PATH`.
*/

mod common;

use std::fs;
use std::path::Path;

use common::embedded_grammars;
use grammar_precompile_core::{
    FilePrecompiler, GrammarPrecompiler, NodeRuntime, PrecompileConfig, PrecompileError,
    PrecompileOutcome,
};
use serde_json::json;
use tempfile::TempDir;

const STUB_PACKAGE: &str = r#"{ "name": "chevrotain", "version": "0.0.0", "main": "index.js" }"#;

const STUB_LIBRARY: &str = r#"class Parser {
  constructor(tokens, config) {
    this.config = config || {};
    this.rules = [];
  }
  RULE(name, definition) {
    this.rules.push({ type: "Rule", name, definition: definition || [] });
  }
  performSelfAnalysis() {}
  getSerializedGastProductions() {
    return this.rules;
  }
}
exports.Parser = Parser;
"#;

fn project() -> Option<(TempDir, FilePrecompiler)> {
    let config = PrecompileConfig::default();
    let runtime = match NodeRuntime::new(&config) {
        Ok(runtime) => runtime,
        Err(_) => {
            eprintln!("node not found, skipping");
            return None;
        }
    };

    let dir = tempfile::tempdir().unwrap();
    let package = dir.path().join("node_modules").join("chevrotain");
    fs::create_dir_all(&package).unwrap();
    fs::write(package.join("package.json"), STUB_PACKAGE).unwrap();
    fs::write(package.join("index.js"), STUB_LIBRARY).unwrap();

    let files = FilePrecompiler::new(GrammarPrecompiler::new(config, Box::new(runtime)));
    Some((dir, files))
}

fn write(dir: &Path, name: &str, source: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, source).unwrap();
    path
}

fn leftover_clones(dir: &Path) -> Vec<String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .filter(|name| name.starts_with(".grammar-precompile-"))
        .collect()
}

#[test]
fn test_es_module_end_to_end() -> anyhow::Result<()> {
    let Some((dir, files)) = project() else {
        return Ok(());
    };
    let path = write(
        dir.path(),
        "json.js",
        r#"import { Parser } from "chevrotain";

export class JsonParser extends Parser {
    constructor(tokens) {
        super(tokens);
        this.RULE("json");
        this.RULE("value", [{ type: "Terminal", name: "String" }]);
        this.performSelfAnalysis();
    }
}
"#,
    );

    let (code, outcome) = files.precompile_file(&path)?;

    assert!(outcome.modified(), "{outcome:?}");
    assert_eq!(
        embedded_grammars(&code),
        vec![json!([
            { "type": "Rule", "name": "json", "definition": [] },
            { "type": "Rule", "name": "value", "definition": [{ "type": "Terminal", "name": "String" }] }
        ])]
    );
    assert!(leftover_clones(dir.path()).is_empty());
    Ok(())
}

#[test]
fn test_commonjs_end_to_end() -> anyhow::Result<()> {
    let Some((dir, files)) = project() else {
        return Ok(());
    };
    let path = write(
        dir.path(),
        "calc.js",
        r#"const chevrotain = require("chevrotain");

class Calculator extends chevrotain.Parser {
    constructor() {
        super([], { maxLookahead: 2 });
        this.RULE("expression");
    }
}

exports.Calculator = Calculator;
"#,
    );

    let (code, outcome) = files.precompile_file(&path)?;

    assert!(outcome.modified(), "{outcome:?}");
    assert!(code.contains("maxLookahead: 2"), "{code}");
    assert_eq!(
        embedded_grammars(&code),
        vec![json!([{ "type": "Rule", "name": "expression", "definition": [] }])]
    );
    Ok(())
}

#[test]
fn test_lone_surrogate_in_grammar_is_replaced() -> anyhow::Result<()> {
    let Some((dir, files)) = project() else {
        return Ok(());
    };
    let path = write(
        dir.path(),
        "odd.mjs",
        r#"import { Parser } from "chevrotain";

export class OddParser extends Parser {
    constructor() {
        super([]);
        this.RULE("lone" + String.fromCharCode(0xd800));
        this.RULE("pair" + String.fromCharCode(0xd83d, 0xde00));
    }
}
"#,
    );

    let (code, outcome) = files.precompile_file(&path)?;

    assert!(outcome.modified(), "{outcome:?}");
    assert_eq!(
        embedded_grammars(&code),
        vec![json!([
            { "type": "Rule", "name": "lone\u{fffd}", "definition": [] },
            { "type": "Rule", "name": "pair\u{1f600}", "definition": [] }
        ])]
    );
    Ok(())
}

#[test]
fn test_constructor_error_is_reported() -> anyhow::Result<()> {
    let Some((dir, files)) = project() else {
        return Ok(());
    };
    let path = write(
        dir.path(),
        "broken.js",
        r#"import { Parser } from "chevrotain";

class Broken extends Parser {
    constructor() {
        super([]);
        throw new Error("Duplicate rule name: value");
    }
}
"#,
    );

    match files.precompile_file(&path) {
        Err(PrecompileError::Extraction {
            class_name,
            message,
            ..
        }) => {
            assert_eq!(class_name, "Broken");
            assert_eq!(message, "Duplicate rule name: value");
        }
        other => panic!("expected extraction error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_module_load_error_is_reported() -> anyhow::Result<()> {
    let Some((dir, files)) = project() else {
        return Ok(());
    };
    let path = write(
        dir.path(),
        "throws.js",
        r#"import { Parser } from "chevrotain";

class P extends Parser {
    constructor() {
        super([]);
    }
}

throw new TypeError("configuration missing");
"#,
    );

    match files.precompile_file(&path) {
        Err(PrecompileError::Load { message, .. }) => {
            assert_eq!(message, "configuration missing");
        }
        other => panic!("expected load error, got {other:?}"),
    }
    assert!(leftover_clones(dir.path()).is_empty());
    Ok(())
}

#[test]
fn test_directory_mode_isolates_failures() -> anyhow::Result<()> {
    let Some((dir, files)) = project() else {
        return Ok(());
    };
    let src = dir.path().join("src");
    fs::create_dir_all(src.join("nested"))?;
    write(
        &src,
        "good.js",
        r#"const { Parser } = require("chevrotain");
class Good extends Parser {
    constructor() {
        super([]);
        this.RULE("top");
    }
}
"#,
    );
    write(
        &src.join("nested"),
        "bad.mjs",
        r#"import { Parser } from "chevrotain";
class Bad extends Parser {
    constructor() {
        super([]);
        throw new Error("nope");
    }
}
"#,
    );
    write(&src, "plain.js", "export const  answer=42 // kept as written\n");
    write(&src, "notes.txt", "not javascript\n");

    let out = dir.path().join("out");
    let summary = files.transform_directory(&src, &out)?;

    assert_eq!(summary.files_processed, 3);
    assert_eq!(summary.files_transformed, 1);
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].contains("nope"), "{:?}", summary.errors);

    let good = fs::read_to_string(out.join("good.js"))?;
    assert_eq!(
        embedded_grammars(&good),
        vec![json!([{ "type": "Rule", "name": "top", "definition": [] }])]
    );
    assert_eq!(
        fs::read_to_string(out.join("plain.js"))?,
        "export const  answer=42 // kept as written\n"
    );
    assert!(!out.join("nested").join("bad.mjs").exists());
    assert!(!out.join("notes.txt").exists());
    Ok(())
}

#[test]
fn test_untouched_file_never_reaches_node() -> anyhow::Result<()> {
    let Some((dir, files)) = project() else {
        return Ok(());
    };
    let path = write(dir.path(), "lexer.js", "import { Lexer } from \"chevrotain\";\nexport const lexer = 1;\n");
    let (_, outcome) = files.precompile_file(&path)?;
    assert!(matches!(outcome, PrecompileOutcome::Skipped(_)));
    Ok(())
}
