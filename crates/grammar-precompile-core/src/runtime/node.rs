/*!
# Node Runtime

[`ModuleLoader`] backed by a `node` binary.

For every file the runtime writes three scratch files:

- the clone, as `.mjs` or `.cjs`, in the directory of the original file so that
  bare specifiers resolve against the project's `node_modules`
- the driver script below, in the system temp directory
- the result document the driver writes

The driver loads the clone, reads the export map under the export key, and for
each class runs `new Class([])` followed by the introspection method. It stops
at the first class that throws. The result is reported as JSON:

```text
{"status":"ok","parsers":[{"name":"P","grammar":[...]}]}
{"status":"ok","parsers":[{"name":"P","error":{"phase":"construct","message":"..."}}]}
{"status":"missing"}
{"status":"error","message":"..."}
```

Lone UTF-16 surrogates in any string or key of the document are replaced with
U+FFFD before it is written, since they have no UTF-8 encoding.

Class failures are replayed through [`ParserClass::instantiate`] and
[`ParserInstance::introspect`], so callers see the same sequence of events as
if they had driven the classes themselves.
*/

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;
use serde_json::Value;

use super::{CompiledModule, ModuleLoader, ParserClass, ParserExports, ParserInstance, RuntimeError};
use crate::source::ModuleFormat;
use crate::{PrecompileConfig, PrecompileError, Result};

const DRIVER: &str = r#"import { writeFileSync } from "node:fs";
import { createRequire } from "node:module";
import { pathToFileURL } from "node:url";

const [modulePath, exportKey, format, method, resultPath] = process.argv.slice(2);

const messageOf = (err) =>
  err !== null && typeof err === "object" && "message" in err ? String(err.message) : String(err);

const LONE_SURROGATE = /[\ud800-\udbff](?![\udc00-\udfff])|(?<![\ud800-\udbff])[\udc00-\udfff]/g;

const wellFormed = (value) => {
  if (typeof value === "string") return value.replace(LONE_SURROGATE, "\ufffd");
  if (Array.isArray(value)) return value.map(wellFormed);
  if (value !== null && typeof value === "object") {
    return Object.fromEntries(Object.entries(value).map(([key, item]) => [wellFormed(key), wellFormed(item)]));
  }
  return value;
};

const report = (doc) =>
  writeFileSync(resultPath, JSON.stringify(wellFormed(JSON.parse(JSON.stringify(doc)))));

let exported;
try {
  exported =
    format === "esm"
      ? await import(pathToFileURL(modulePath).href)
      : createRequire(modulePath)(modulePath);
} catch (err) {
  report({ status: "error", message: messageOf(err) });
  process.exit(0);
}

const map = exported ? exported[exportKey] : undefined;
if (map === null || typeof map !== "object") {
  report({ status: "missing" });
  process.exit(0);
}

const parsers = [];
for (const name of Object.keys(map)) {
  let instance;
  try {
    instance = new map[name]([]);
  } catch (err) {
    parsers.push({ name, error: { phase: "construct", message: messageOf(err) } });
    break;
  }
  try {
    const grammar = instance[method]();
    JSON.stringify(grammar);
    parsers.push({ name, grammar });
  } catch (err) {
    parsers.push({ name, error: { phase: "introspect", message: messageOf(err) } });
    break;
  }
}
report({ status: "ok", parsers });
process.exit(0);
"#;

/// Result document written by the driver
#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum DriverReport {
    Ok { parsers: Vec<ClassReport> },
    Missing,
    Error { message: String },
}

#[derive(Debug, Deserialize)]
struct ClassReport {
    name: String,
    #[serde(default)]
    grammar: Value,
    #[serde(default)]
    error: Option<ClassFailure>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "phase", rename_all = "lowercase")]
enum ClassFailure {
    Construct { message: String },
    Introspect { message: String },
}

/// Runs derived clones with `node`
#[derive(Debug, Clone)]
pub struct NodeRuntime {
    node: PathBuf,
    introspection_method: String,
}

impl NodeRuntime {
    /// Use the first `node` found on `PATH`
    pub fn new(config: &PrecompileConfig) -> Result<Self> {
        let node = which::which("node")?;
        tracing::debug!(node = %node.display(), "Using Node.js runtime");
        Ok(Self::with_node_path(node, config))
    }

    /// Use a specific `node` executable
    pub fn with_node_path(node: impl Into<PathBuf>, config: &PrecompileConfig) -> Self {
        Self {
            node: node.into(),
            introspection_method: config.introspection_method.clone(),
        }
    }

    pub fn node_path(&self) -> &Path {
        &self.node
    }
}

impl ModuleLoader for NodeRuntime {
    fn load(&self, module: &CompiledModule) -> Result<Option<ParserExports>> {
        let mut clone = tempfile::Builder::new()
            .prefix(".grammar-precompile-")
            .suffix(&format!(".{}", module.format.extension()))
            .tempfile_in(clone_dir(&module.filename))?;
        clone.write_all(module.code.as_bytes())?;
        clone.flush()?;

        let mut driver = tempfile::Builder::new()
            .prefix("grammar-precompile-driver-")
            .suffix(".mjs")
            .tempfile()?;
        driver.write_all(DRIVER.as_bytes())?;
        driver.flush()?;

        let result = tempfile::NamedTempFile::new()?;

        let format = match module.format {
            ModuleFormat::EsModule => "esm",
            ModuleFormat::CommonJs => "cjs",
        };
        let output = Command::new(&self.node)
            .arg(driver.path())
            .arg(clone.path())
            .arg(&module.export_key)
            .arg(format)
            .arg(&self.introspection_method)
            .arg(result.path())
            .output()?;
        tracing::debug!(
            file = %module.filename,
            status = %output.status,
            "Node.js driver finished"
        );

        let document = fs::read_to_string(result.path())?;
        if document.trim().is_empty() {
            // The driver never got to report, e.g. the process was killed.
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PrecompileError::Load {
                filename: module.filename.clone(),
                message: stderr.trim().to_string(),
            });
        }

        let report: DriverReport = serde_json::from_str(&document)?;
        exports_from_report(report, &module.filename)
    }
}

/// Directory the clone is written to
fn clone_dir(filename: &str) -> PathBuf {
    match Path::new(filename).parent() {
        Some(dir) if dir.as_os_str().is_empty() => PathBuf::from("."),
        Some(dir) if dir.is_dir() => dir.to_path_buf(),
        _ => std::env::temp_dir(),
    }
}

fn exports_from_report(report: DriverReport, filename: &str) -> Result<Option<ParserExports>> {
    match report {
        DriverReport::Error { message } => Err(PrecompileError::Load {
            filename: filename.to_string(),
            message,
        }),
        DriverReport::Missing => Ok(None),
        DriverReport::Ok { parsers } => {
            let mut exports = ParserExports::new();
            for parser in parsers {
                exports.insert(
                    parser.name,
                    Box::new(NodeParserClass {
                        grammar: parser.grammar,
                        failure: parser.error,
                    }),
                );
            }
            Ok(Some(exports))
        }
    }
}

/// A class the driver already constructed and introspected
struct NodeParserClass {
    grammar: Value,
    failure: Option<ClassFailure>,
}

impl ParserClass for NodeParserClass {
    fn instantiate(&self, _tokens: &[Value]) -> std::result::Result<Box<dyn ParserInstance>, RuntimeError> {
        let result = match &self.failure {
            Some(ClassFailure::Construct { message }) => return Err(RuntimeError::new(message.clone())),
            Some(ClassFailure::Introspect { message }) => Err(RuntimeError::new(message.clone())),
            None => Ok(self.grammar.clone()),
        };
        Ok(Box::new(NodeParserInstance { result }))
    }
}

struct NodeParserInstance {
    result: std::result::Result<Value, RuntimeError>,
}

impl ParserInstance for NodeParserInstance {
    fn introspect(&self) -> std::result::Result<Value, RuntimeError> {
        self.result.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn exports(document: Value) -> Result<Option<ParserExports>> {
        let report: DriverReport = serde_json::from_value(document).unwrap();
        exports_from_report(report, "grammar.js")
    }

    #[test]
    fn test_ok_report_preserves_order_and_values() {
        let exports = exports(json!({
            "status": "ok",
            "parsers": [
                { "name": "Second", "grammar": [{ "type": "Rule", "name": "b" }] },
                { "name": "First", "grammar": { "nested": [1, 2.5, null] } },
            ]
        }))
        .unwrap()
        .unwrap();

        let names: Vec<&str> = exports.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Second", "First"]);

        let grammar = exports["First"].instantiate(&[]).unwrap().introspect().unwrap();
        assert_eq!(grammar, json!({ "nested": [1, 2.5, null] }));
    }

    #[test]
    fn test_missing_grammar_is_null() {
        let exports = exports(json!({ "status": "ok", "parsers": [{ "name": "P" }] }))
            .unwrap()
            .unwrap();
        let grammar = exports["P"].instantiate(&[]).unwrap().introspect().unwrap();
        assert_eq!(grammar, Value::Null);
    }

    #[test]
    fn test_class_failures_are_replayed() {
        let exports = exports(json!({
            "status": "ok",
            "parsers": [
                { "name": "Broken", "error": { "phase": "construct", "message": "boom" } },
                { "name": "Odd", "error": { "phase": "introspect", "message": "no method" } },
            ]
        }))
        .unwrap()
        .unwrap();

        let err = exports["Broken"].instantiate(&[]).err().unwrap();
        assert_eq!(err.message, "boom");

        let instance = exports["Odd"].instantiate(&[]).unwrap();
        assert_eq!(instance.introspect().unwrap_err(), RuntimeError::new("no method"));
    }

    #[test]
    fn test_missing_map_and_load_error() {
        assert!(exports(json!({ "status": "missing" })).unwrap().is_none());

        match exports(json!({ "status": "error", "message": "Unexpected token '}'" })) {
            Err(PrecompileError::Load { filename, message }) => {
                assert_eq!(filename, "grammar.js");
                assert_eq!(message, "Unexpected token '}'");
            }
            other => panic!("expected load error, got {:?}", other.map(|e| e.is_some())),
        }
    }

    #[test]
    fn test_clone_dir() {
        assert_eq!(clone_dir("grammar.js"), PathBuf::from("."));
        assert_eq!(clone_dir("/definitely/not/here/grammar.js"), std::env::temp_dir());
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("grammar.js");
        assert_eq!(clone_dir(&file.to_string_lossy()), dir.path());
    }

    #[test]
    fn test_with_node_path() {
        let runtime = NodeRuntime::with_node_path("/opt/node/bin/node", &PrecompileConfig::default());
        assert_eq!(runtime.node_path(), Path::new("/opt/node/bin/node"));
        assert_eq!(runtime.introspection_method, "getSerializedGastProductions");
    }
}
