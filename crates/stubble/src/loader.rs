//! Rule sources: concatenated or newline-delimited JSON rule definitions.
//!
//! Rule files are decoded with the strict schema, which rejects fields the
//! rule format does not know. The registration endpoint uses the lenient
//! schema instead.

use crate::rule::{Rule, RuleDefinition, RuleError, RESPONSE_FIELDS, RULE_FIELDS};
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// How unknown fields in a rule definition are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Schema {
    /// Unknown fields are an error.
    #[default]
    Strict,
    /// Unknown fields are ignored.
    Lenient,
}

/// Errors raised while loading rule sources.
///
/// `index` is the zero-based position of the rule within its source.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("error reading {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("error decoding rule {index} in {}", path.display())]
    Decode {
        path: PathBuf,
        index: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("error initialising rule {index} in {}", path.display())]
    Rule {
        path: PathBuf,
        index: usize,
        #[source]
        source: RuleError,
    },
    #[error("unknown field `{field}` in rule {index}")]
    UnknownField { index: usize, field: String },
}

/// Decode every rule definition in a stream.
pub fn parse_rules<R: Read>(reader: R, schema: Schema) -> Result<Vec<RuleDefinition>, LoadError> {
    parse_source(reader, schema, Path::new("<input>"))
}

/// Convert one decoded JSON value into a rule definition.
///
/// Returns the name of the first unknown field as the error in strict mode.
pub fn parse_definition(value: Value, schema: Schema) -> Result<RuleDefinition, DefinitionError> {
    if schema == Schema::Strict {
        if let Some(field) = unknown_field(&value) {
            return Err(DefinitionError::UnknownField(field));
        }
    }
    serde_json::from_value(value).map_err(DefinitionError::Decode)
}

/// Failure to turn a single JSON value into a definition.
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    #[error("unknown field `{0}`")]
    UnknownField(String),
    #[error(transparent)]
    Decode(serde_json::Error),
}

/// Read and initialize the rules of every file, in argument order.
///
/// Fails on the first unreadable file or bad rule.
pub fn load_rule_files<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Rule>, LoadError> {
    let mut rules = Vec::new();
    for path in paths {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let definitions = parse_source(BufReader::new(file), Schema::Strict, path)?;
        let count = definitions.len();
        for (index, definition) in definitions.into_iter().enumerate() {
            let rule = Rule::new(definition).map_err(|source| LoadError::Rule {
                path: path.to_path_buf(),
                index,
                source,
            })?;
            rules.push(rule);
        }
        info!("Loaded {} rules from {}", count, path.display());
    }
    Ok(rules)
}

fn parse_source<R: Read>(
    reader: R,
    schema: Schema,
    path: &Path,
) -> Result<Vec<RuleDefinition>, LoadError> {
    let stream = serde_json::Deserializer::from_reader(reader).into_iter::<Value>();
    let mut definitions = Vec::new();
    for (index, item) in stream.enumerate() {
        let value = item.map_err(|source| decode_error(path, index, source))?;
        let definition = match parse_definition(value, schema) {
            Ok(definition) => definition,
            Err(DefinitionError::UnknownField(field)) => {
                return Err(LoadError::UnknownField { index, field })
            }
            Err(DefinitionError::Decode(source)) => return Err(decode_error(path, index, source)),
        };
        debug!(index, name = %definition.name, "Decoded rule definition");
        definitions.push(definition);
    }
    Ok(definitions)
}

fn decode_error(path: &Path, index: usize, source: serde_json::Error) -> LoadError {
    LoadError::Decode {
        path: path.to_path_buf(),
        index,
        source,
    }
}

fn unknown_field(value: &Value) -> Option<String> {
    let rule = value.as_object()?;
    if let Some(key) = rule.keys().find(|k| !RULE_FIELDS.contains(&k.as_str())) {
        return Some(key.clone());
    }
    let response = rule.get("response")?.as_object()?;
    response
        .keys()
        .find(|k| !RESPONSE_FIELDS.contains(&k.as_str()))
        .map(|k| format!("response.{k}"))
}
