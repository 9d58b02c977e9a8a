//! Parser for generated RTDN C headers.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::expr::evaluate;
use crate::types::FieldType;
use crate::{Result, RtdnError};

/// Version label used when a header file name carries none.
pub const DEFAULT_VERSION: &str = "1_0";

/// A `#define NAME VALUE` constant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constant {
    pub name: String,
    pub value: i64,
    /// Whatever followed the value on the line, usually a comment
    pub comment: String,
}

/// One member of a parsed struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    /// Canonical type name (`uint32`, `float32`, ...) or the name of another struct
    pub type_name: String,
    /// Element count, 1 for scalars
    pub count: usize,
    /// Text of any `/* ... */` comments attached to the member
    pub comment: String,
}

impl FieldDef {
    /// Fundamental type of this member, if it has one.
    pub fn field_type(&self) -> Option<FieldType> {
        FieldType::from_c_name(&self.type_name)
    }
}

/// A `typedef struct` definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
    /// Header version label, e.g. `2_2` from `test1_2_2.h`
    pub version: String,
    pub file: Option<PathBuf>,
}

/// Everything extracted from one header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderFile {
    pub path: Option<PathBuf>,
    pub version: String,
    /// Targets of `#include` directives, as written
    pub includes: Vec<String>,
    /// Constants in definition order
    pub constants: Vec<Constant>,
    pub structs: Vec<StructDef>,
}

/// Compiled patterns for the header grammar.
#[derive(Debug, Clone)]
pub struct HeaderParser {
    define: Regex,
    include: Regex,
    structure: Regex,
    member: Regex,
    comment: Regex,
    version: Regex,
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|err| RtdnError::parse_error("header grammar", err.to_string()))
}

impl HeaderParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            define: compile(r"^\s*#\s*define\s+(\w+)\s+(.+)$")?,
            include: compile(r#"^\s*#\s*include\s+[<"]([^>"]+)[>"]"#)?,
            structure: compile(r"typedef\s+struct\s*(\w*)\s*\{([^}]*)\}\s*(\w*)\s*;")?,
            member: compile(r"^(?:const\s+)?(\w+)\s+(\w+)\s*(?:\[\s*([^\]]+?)\s*\])?$")?,
            comment: compile(r"/\*([\s\S]*?)\*/")?,
            version: compile(r"_(\d+_\d+)\.h$")?,
        })
    }

    /// Version label from a header file name (`test3_5_7.h` gives `5_7`).
    pub fn version_label(&self, path: &Path) -> String {
        path.file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| self.version.captures(name))
            .map(|captures| captures[1].to_string())
            .unwrap_or_else(|| DEFAULT_VERSION.to_string())
    }

    /// `#include` targets in order of appearance.
    pub fn includes(&self, text: &str) -> Vec<String> {
        text.lines()
            .filter_map(|line| self.include.captures(line))
            .map(|captures| captures[1].to_string())
            .collect()
    }

    /// Parse `text`, resolving constant references against `definitions`.
    ///
    /// Constants defined by this header are added to `definitions` as they
    /// are read, so later lines can refer to earlier ones.
    pub fn parse(
        &self,
        text: &str,
        file: Option<&Path>,
        definitions: &mut BTreeMap<String, Constant>,
    ) -> Result<HeaderFile> {
        let context = file.map(|path| path.display().to_string()).unwrap_or_else(|| "<memory>".to_string());
        let version = file.map(|path| self.version_label(path)).unwrap_or_else(|| DEFAULT_VERSION.to_string());

        let constants = self.parse_defines(text, &context, definitions);

        let body: String = text
            .lines()
            .filter(|line| !line.trim_start().starts_with('#'))
            .collect::<Vec<_>>()
            .join("\n");

        let mut structs = Vec::new();
        for captures in self.structure.captures_iter(&body) {
            let name = match (&captures[3], &captures[1]) {
                ("", "") => {
                    warn!(file = %context, "Skipping anonymous struct without typedef name");
                    continue;
                }
                ("", tag) => tag,
                (name, _) => name,
            };
            let fields = self.parse_members(&captures[2], name, &context, definitions)?;
            structs.push(StructDef {
                name: name.to_string(),
                fields,
                version: version.clone(),
                file: file.map(Path::to_path_buf),
            });
        }

        debug!(
            file = %context,
            version = %version,
            constants = constants.len(),
            structs = structs.len(),
            "Parsed header"
        );

        Ok(HeaderFile {
            path: file.map(Path::to_path_buf),
            version,
            includes: self.includes(text),
            constants,
            structs,
        })
    }

    fn parse_defines(
        &self,
        text: &str,
        context: &str,
        definitions: &mut BTreeMap<String, Constant>,
    ) -> Vec<Constant> {
        let mut constants = Vec::new();

        for line in text.lines() {
            let Some(captures) = self.define.captures(line) else {
                continue;
            };
            let name = &captures[1];
            let (expression, comment) = split_comment(&captures[2]);

            let value = match evaluate(expression, definitions) {
                Ok(value) => value,
                Err(err) => {
                    // Non-numeric macros are legal C; they just aren't constants
                    debug!(file = %context, name, error = %err, "Skipping non-constant define");
                    continue;
                }
            };

            let constant = Constant { name: name.to_string(), value, comment: comment.to_string() };
            if let Some(previous) = definitions.get(name) {
                if previous.value != value {
                    warn!(file = %context, name, old = previous.value, new = value, "Constant redefined");
                }
            }
            definitions.insert(constant.name.clone(), constant.clone());
            constants.push(constant);
        }

        constants
    }

    fn parse_members(
        &self,
        body: &str,
        struct_name: &str,
        context: &str,
        definitions: &BTreeMap<String, Constant>,
    ) -> Result<Vec<FieldDef>> {
        let mut fields: Vec<FieldDef> = Vec::new();

        for part in body.split(';') {
            // A comment on the same line as the previous ';' belongs to the previous member
            let (trailing, own) = match part.find('\n') {
                Some(index) if !fields.is_empty() => part.split_at(index),
                _ => ("", part),
            };
            let trailing_comment = self.comments(trailing);
            if let (Some(previous), false) = (fields.last_mut(), trailing_comment.is_empty()) {
                append_comment(&mut previous.comment, &trailing_comment);
            }

            let declaration = self.comment.replace_all(own, " ");
            let declaration = declaration.split_whitespace().collect::<Vec<_>>().join(" ");
            if declaration.is_empty() {
                continue;
            }

            let captures = self.member.captures(&declaration).ok_or_else(|| {
                RtdnError::parse_error(
                    format!("{context}: struct {struct_name}"),
                    format!("unrecognised member declaration '{declaration}'"),
                )
            })?;

            let count = match captures.get(3) {
                None => 1,
                Some(bound) => {
                    let value = evaluate(bound.as_str(), definitions).map_err(|err| {
                        RtdnError::parse_error(
                            format!("{context}: struct {struct_name}"),
                            format!("array bound of '{}': {err}", &captures[2]),
                        )
                    })?;
                    usize::try_from(value).map_err(|_| {
                        RtdnError::parse_error(
                            format!("{context}: struct {struct_name}"),
                            format!("negative array bound {value} for '{}'", &captures[2]),
                        )
                    })?
                }
            };

            let declared = &captures[1];
            let type_name = FieldType::from_c_name(declared)
                .map(|field_type| field_type.c_name().to_string())
                .unwrap_or_else(|| declared.to_string());

            fields.push(FieldDef {
                name: captures[2].to_string(),
                type_name,
                count,
                comment: self.comments(own),
            });
        }

        Ok(fields)
    }

    fn comments(&self, text: &str) -> String {
        self.comment
            .captures_iter(text)
            .map(|captures| captures[1].trim().to_string())
            .filter(|comment| !comment.is_empty())
            .collect::<Vec<_>>()
            .join(". ")
    }
}

fn append_comment(target: &mut String, comment: &str) {
    if !target.is_empty() {
        target.push_str(". ");
    }
    target.push_str(comment);
}

/// Split a define value from a trailing `/* */` or `//` comment.
fn split_comment(value: &str) -> (&str, &str) {
    let cut = [value.find("/*"), value.find("//")].into_iter().flatten().min();
    match cut {
        Some(index) => (value[..index].trim(), value[index..].trim()),
        None => (value.trim(), ""),
    }
}

/// Parse a single header with no previously known constants.
pub fn parse_header(text: &str, file: Option<&Path>) -> Result<HeaderFile> {
    HeaderParser::new()?.parse(text, file, &mut BTreeMap::new())
}
