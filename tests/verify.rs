//! Programs the verifier must reject before anything runs.

use indoc::indoc;

use tinyvm::error::{VerifyError, VmError};
use tinyvm::vm::VirtualMachine;

fn verify_error(source: &str) -> VerifyError {
    match VirtualMachine::load_str(source) {
        Err(VmError::Verify(error)) => error,
        Err(other) => panic!("expected verify error, got {}", other),
        Ok(_) => panic!("expected verify error, program was accepted"),
    }
}

#[test]
fn jump_out_of_range() {
    let source = indoc! {"
        func: {name: f, type: int, args: []}
        ins:
        - {goto: -1}
        - {ipush: 1}
        - ireturn
    "};
    assert!(matches!(
        verify_error(source),
        VerifyError::JumpOutOfBounds { target: -1, .. }
    ));

    let source = indoc! {"
        func: {name: f, type: int, args: []}
        ins:
        - {ipush: 1}
        - {ipush: 1}
        - {if_icmpeq: 9}
        - {ipush: 1}
        - ireturn
    "};
    assert!(matches!(
        verify_error(source),
        VerifyError::JumpOutOfBounds { target: 9, .. }
    ));
}

#[test]
fn store_disagrees_with_declared_type() {
    let source = indoc! {"
        func:
          name: f
          type: int
          args:
          - {type: int, label: a}
        lvars:
        - {type: float, label: x}
        ins:
        - {iload: a}
        - {istore: x}
        - {iload: a}
        - ireturn
    "};
    assert!(matches!(verify_error(source), VerifyError::Expected { .. }));
}

#[test]
fn leaf_block_without_return() {
    let source = indoc! {"
        func: {name: f, type: int, args: []}
        ins:
        - {ipush: 1}
        - {ipush: 2}
        - iadd
    "};
    assert!(matches!(
        verify_error(source),
        VerifyError::LeafWithoutReturn(_)
    ));
}

#[test]
fn stack_heights_must_agree_at_joins() {
    let source = indoc! {"
        func:
          name: bad
          type: int
          args:
          - {type: int, label: a}
        ins:
        - {ipush: 0}
        - {iload: a}
        - {if_icmpeq: join}
        - {ipush: 1}
        - {label: join}
        - {ipush: 2}
        - ireturn
    "};
    assert!(matches!(
        verify_error(source),
        VerifyError::StackHeightMismatch(_, _)
    ));
}

#[test]
fn operand_types_are_checked() {
    // float operand for integer addition
    let source = indoc! {"
        func: {name: f, type: int, args: []}
        ins:
        - {ipush: 1}
        - {fpush: 1.5}
        - iadd
        - ireturn
    "};
    assert!(matches!(verify_error(source), VerifyError::Expected { .. }));
}

#[test]
fn return_type_is_checked() {
    let source = indoc! {"
        func: {name: f, type: float, args: []}
        ins:
        - {ipush: 1}
        - ireturn
    "};
    // ireturn itself expects an int return type
    assert!(matches!(verify_error(source), VerifyError::Expected { .. }));

    // sort-based subtyping: intarray sorts below floatarray, so returning
    // an intarray where a floatarray is declared is rejected
    let source = indoc! {"
        func:
          name: f
          type: floatarray
          args:
          - {type: intarray, label: a}
        ins:
        - {aload: a}
        - areturn
    "};
    assert!(matches!(
        verify_error(source),
        VerifyError::NotSubtype { .. }
    ));
}

#[test]
fn uninitialized_locals_cannot_be_read() {
    let source = indoc! {"
        func: {name: f, type: int, args: []}
        lvars:
        - {type: int, label: x}
        ins:
        - {iload: x}
        - ireturn
    "};
    assert!(matches!(verify_error(source), VerifyError::Expected { .. }));
}

#[test]
fn merge_of_diverging_local_types_loses_the_slot() {
    // the two paths store different types into x via its alias slot, so
    // the join forgets the type and the later load is rejected
    let source = indoc! {"
        func:
          name: f
          type: int
          args:
          - {type: int, label: a}
        lvars:
        - {type: int, label: x}
        ins:
        - {iload: a}
        - {ipush: 0}
        - {if_icmpeq: other}
        - {iload: a}
        - {istore: x}
        - {goto: join}
        - {label: other}
        - nop
        - {label: join}
        - {iload: x}
        - ireturn
    "};
    assert!(matches!(verify_error(source), VerifyError::Expected { .. }));
}

#[test]
fn array_element_types_are_checked() {
    let source = indoc! {"
        func:
          name: f
          type: int
          args:
          - {type: floatarray, label: a}
        ins:
        - {aload: a}
        - {ipush: 0}
        - iaload
        - ireturn
    "};
    assert!(matches!(verify_error(source), VerifyError::Expected { .. }));
}

#[test]
fn trailing_branch_falls_off_the_end() {
    let source = indoc! {"
        func: {name: f, type: int, args: []}
        ins:
        - {ipush: 0}
        - {ipush: 1}
        - {if_icmpeq: 0}
    "};
    // the fall-through path of the final branch leaves the code; either
    // the leaf check or the dataflow pass must refuse it
    let error = verify_error(source);
    assert!(
        matches!(error, VerifyError::FallsOffEnd)
            || matches!(error, VerifyError::LeafWithoutReturn(_)),
        "got {:?}",
        error
    );
}

#[test]
fn empty_programs_are_rejected() {
    let source = "func: {name: f, type: int, args: []}";
    let error = verify_error(source);
    assert!(
        matches!(error, VerifyError::EmptyCode) || matches!(error, VerifyError::LeafWithoutReturn(_)),
        "got {:?}",
        error
    );
}
