//! YAML front-end.
//!
//! A program document has three sections: `func` (name, return type,
//! arguments), `lvars` (additional locals) and `ins` (instructions).
//! Instruction entries are either a bare keyword, a single-entry mapping
//! `{keyword: operand}`, or a label marker `{label: name}` binding the
//! name to the offset of the next instruction. Variable and code labels
//! share one namespace and are resolved to integers here; the core never
//! sees a label operand.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_yaml::Value as Yaml;

use crate::error::{ParseError, VmError};
use crate::instruction::{self, ArgKind, Instruction, Operand};
use crate::program::Program;
use crate::vm::mem::ValueType;

#[derive(Debug, Deserialize)]
struct Document {
    func: Option<Func>,
    #[serde(default)]
    lvars: Vec<VarDecl>,
    #[serde(default)]
    ins: Vec<Yaml>,
}

#[derive(Debug, Deserialize)]
struct Func {
    name: String,
    #[serde(rename = "type")]
    return_type: String,
    #[serde(default)]
    args: Vec<VarDecl>,
}

#[derive(Debug, Deserialize)]
struct VarDecl {
    #[serde(rename = "type")]
    vtype: String,
    label: Option<String>,
}

pub fn parse_file(path: impl AsRef<Path>) -> Result<Program, VmError> {
    let data = fs::read_to_string(path)?;
    Ok(parse_str(&data)?)
}

pub fn parse_str(data: &str) -> Result<Program, ParseError> {
    let document: Document = serde_yaml::from_str(data)?;
    process(document)
}

fn process(document: Document) -> Result<Program, ParseError> {
    let func = document.func.ok_or(ParseError::MissingFunc)?;
    let return_type = parse_type(&func.return_type)?;
    let mut program = Program::new(func.name, return_type);

    for decl in &func.args {
        add_variable(&mut program, decl)?;
        program.argument_count += 1;
    }
    for decl in &document.lvars {
        add_variable(&mut program, decl)?;
    }

    collect_labels(&mut program, &document.ins)?;
    collect_instructions(&mut program, &document.ins)?;
    Ok(program)
}

fn parse_type(name: &str) -> Result<ValueType, ParseError> {
    ValueType::from_keyword(&name.to_ascii_lowercase())
        .ok_or_else(|| ParseError::UnknownType(name.to_string()))
}

fn add_variable(program: &mut Program, decl: &VarDecl) -> Result<(), ParseError> {
    let vtype = parse_type(&decl.vtype)?;
    program.locals.push(vtype);
    let label = decl
        .label
        .as_deref()
        .ok_or(ParseError::MissingVariableLabel)?;
    let index = program.locals.len() - 1;
    program.add_label(label, index)
}

/// A single-entry mapping whose key is `label` marks the offset of the
/// following instruction; anything else counts as an instruction.
fn label_marker(entry: &Yaml) -> Result<Option<&str>, ParseError> {
    let mapping = match entry {
        Yaml::Mapping(mapping) => mapping,
        _ => return Ok(None),
    };
    if mapping.len() != 1 {
        return Err(ParseError::MalformedEntry(format!("{:?}", entry)));
    }
    match mapping.get(&Yaml::String("label".to_string())) {
        Some(Yaml::String(name)) => Ok(Some(name.as_str())),
        Some(_) => Err(ParseError::MalformedEntry(format!("{:?}", entry))),
        None => Ok(None),
    }
}

/// First pass: bind label names to instruction offsets.
fn collect_labels(program: &mut Program, entries: &[Yaml]) -> Result<(), ParseError> {
    let mut offset = 0usize;
    let mut pending: Option<String> = None;
    for entry in entries {
        if let Some(name) = label_marker(entry)? {
            if let Some(previous) = &pending {
                return Err(ParseError::LabelAfterLabel(
                    previous.clone(),
                    name.to_string(),
                ));
            }
            program.add_label(name, offset)?;
            pending = Some(name.to_string());
        } else {
            pending = None;
            offset += 1;
        }
    }
    if let Some(last) = pending {
        return Err(ParseError::LabelAtEnd(last));
    }
    Ok(())
}

/// Second pass: assemble instructions, resolving label operands.
fn collect_instructions(program: &mut Program, entries: &[Yaml]) -> Result<(), ParseError> {
    for entry in entries {
        if label_marker(entry)?.is_some() {
            continue;
        }
        match entry {
            Yaml::String(keyword) => {
                let kw = keyword.to_ascii_lowercase();
                if instruction::keyword_arg_kind(&kw).is_none() {
                    return Err(ParseError::UnknownKeyword(keyword.clone()));
                }
                program.code.push(Instruction::from_parts(&kw, None)?);
            }
            Yaml::Mapping(mapping) => {
                // single entry guaranteed by the first pass
                let (key, value) = match mapping.iter().next() {
                    Some(pair) => pair,
                    None => return Err(ParseError::MalformedEntry(format!("{:?}", entry))),
                };
                let keyword = match key {
                    Yaml::String(keyword) => keyword,
                    _ => return Err(ParseError::MalformedEntry(format!("{:?}", entry))),
                };
                let kw = keyword.to_ascii_lowercase();
                let kind = instruction::keyword_arg_kind(&kw)
                    .ok_or_else(|| ParseError::UnknownKeyword(keyword.clone()))?;
                let operand = resolve_operand(program, kind, value)?;
                program
                    .code
                    .push(Instruction::from_parts(&kw, Some(operand))?);
            }
            other => return Err(ParseError::MalformedEntry(format!("{:?}", other))),
        }
    }
    Ok(())
}

fn resolve_operand(program: &Program, kind: ArgKind, value: &Yaml) -> Result<Operand, ParseError> {
    if kind == ArgKind::Label {
        if let Yaml::String(name) = value {
            let offset = program
                .labels
                .get(name.as_str())
                .ok_or_else(|| ParseError::UndefinedLabel(name.clone()))?;
            return Ok(Operand::Int(*offset as i64));
        }
    }
    match value {
        Yaml::Number(number) => {
            if let Some(v) = number.as_i64() {
                Ok(Operand::Int(v))
            } else if let Some(v) = number.as_f64() {
                Ok(Operand::Float(v))
            } else {
                Err(ParseError::MalformedEntry(format!("{:?}", value)))
            }
        }
        other => Err(ParseError::MalformedEntry(format!("{:?}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn parses_a_complete_program() {
        let program = parse_str(indoc! {"
            func:
              name: sample
              type: int
              args:
              - {type: int, label: a}
            lvars:
            - {type: float, label: x}
            ins:
            - {label: start}
            - {iload: a}
            - {label: end}
            - ireturn
        "})
        .unwrap();

        assert_eq!(program.name, "sample");
        assert_eq!(program.return_type, ValueType::Int);
        assert_eq!(program.argument_count, 1);
        assert_eq!(program.locals, vec![ValueType::Int, ValueType::Float]);
        assert_eq!(
            program.code,
            vec![Instruction::ILoad(0), Instruction::IReturn]
        );
        assert_eq!(program.labels["a"], 0);
        assert_eq!(program.labels["x"], 1);
        assert_eq!(program.labels["start"], 0);
        assert_eq!(program.labels["end"], 1);
    }

    #[test]
    fn func_section_is_required() {
        assert!(matches!(
            parse_str("lvars: []"),
            Err(ParseError::MissingFunc)
        ));
    }

    #[test]
    fn variables_need_labels() {
        let source = indoc! {"
            func:
              name: f
              type: int
              args:
              - {type: int}
            ins:
            - {ipush: 1}
            - ireturn
        "};
        assert!(matches!(
            parse_str(source),
            Err(ParseError::MissingVariableLabel)
        ));
    }

    #[test]
    fn unknown_type_and_keyword() {
        assert!(matches!(
            parse_str("func: {name: f, type: string, args: []}"),
            Err(ParseError::UnknownType(_))
        ));
        let source = indoc! {"
            func: {name: f, type: int, args: []}
            ins:
            - frobnicate
        "};
        assert!(matches!(
            parse_str(source),
            Err(ParseError::UnknownKeyword(_))
        ));
    }

    #[test]
    fn duplicate_labels_are_rejected() {
        let source = indoc! {"
            func:
              name: f
              type: int
              args:
              - {type: int, label: a}
            ins:
            - {label: a}
            - {ipush: 1}
            - ireturn
        "};
        assert!(matches!(
            parse_str(source),
            Err(ParseError::DuplicateLabel(_))
        ));
    }

    #[test]
    fn label_cannot_follow_label() {
        let source = indoc! {"
            func: {name: f, type: int, args: []}
            ins:
            - {label: one}
            - {label: two}
            - ireturn
        "};
        assert!(matches!(
            parse_str(source),
            Err(ParseError::LabelAfterLabel(_, _))
        ));
    }

    #[test]
    fn label_cannot_be_last() {
        let source = indoc! {"
            func: {name: f, type: int, args: []}
            ins:
            - ireturn
            - {label: tail}
        "};
        assert!(matches!(parse_str(source), Err(ParseError::LabelAtEnd(_))));
    }

    #[test]
    fn labels_resolve_to_offsets() {
        let source = indoc! {"
            func: {name: f, type: int, args: []}
            ins:
            - {goto: skip}
            - nop
            - {label: skip}
            - {ipush: 1}
            - ireturn
        "};
        let program = parse_str(source).unwrap();
        assert_eq!(program.code[0], Instruction::Goto(2));
    }

    #[test]
    fn undefined_label_is_rejected() {
        let source = indoc! {"
            func: {name: f, type: int, args: []}
            ins:
            - {goto: nowhere}
            - ireturn
        "};
        assert!(matches!(
            parse_str(source),
            Err(ParseError::UndefinedLabel(_))
        ));
    }

    #[test]
    fn integer_immediates_reject_float_literals() {
        let source = indoc! {"
            func: {name: f, type: int, args: []}
            ins:
            - {ipush: 1.5}
            - ireturn
        "};
        match parse_str(source) {
            Err(ParseError::Instruction(e)) => {
                assert_eq!(e.to_string(), "instruction ipush requires an integer argument");
            }
            other => panic!("expected construction error, got {:?}", other),
        }
        // the strict front-end rejects integral float literals as well
        let source = indoc! {"
            func: {name: f, type: int, args: []}
            ins:
            - {ipush: 2.0}
            - ireturn
        "};
        assert!(matches!(
            parse_str(source),
            Err(ParseError::Instruction(_))
        ));
    }

    #[test]
    fn float_immediates_accept_integral_literals() {
        let source = indoc! {"
            func: {name: f, type: float, args: []}
            ins:
            - {fpush: 3}
            - freturn
        "};
        let program = parse_str(source).unwrap();
        assert_eq!(program.code[0], Instruction::FPush(3.0));
    }

    #[test]
    fn bare_keyword_with_required_argument_is_rejected() {
        let source = indoc! {"
            func: {name: f, type: int, args: []}
            ins:
            - ipush
            - ireturn
        "};
        assert!(matches!(
            parse_str(source),
            Err(ParseError::Instruction(_))
        ));
    }

    #[test]
    fn argument_on_bare_opcode_is_rejected() {
        let source = indoc! {"
            func: {name: f, type: int, args: []}
            ins:
            - {nop: 1}
            - ireturn
        "};
        assert!(matches!(
            parse_str(source),
            Err(ParseError::Instruction(_))
        ));
    }

    #[test]
    fn multi_entry_mappings_are_malformed() {
        let source = indoc! {"
            func: {name: f, type: int, args: []}
            ins:
            - {ipush: 1, iload: 0}
            - ireturn
        "};
        assert!(matches!(
            parse_str(source),
            Err(ParseError::MalformedEntry(_))
        ));
    }

    #[test]
    fn keywords_parse_case_insensitively() {
        let source = indoc! {"
            func: {name: f, type: int, args: []}
            ins:
            - {IPUSH: 1}
            - IRETURN
        "};
        let program = parse_str(source).unwrap();
        assert_eq!(
            program.code,
            vec![Instruction::IPush(1), Instruction::IReturn]
        );
    }
}
