//! End-to-end assembler tests: whole programs in, bytes and listing out.

mod common;

use common::{assemble, assemble_bytes, try_assemble, try_assemble_with};
use sixfive_base::ErrorKind;
use sixfive_emit::emit;
use sixfive_lang::{AsmOptions, Assembler, RuleType};

// ═══════════════════════════════════════════════════════════════════
// REFERENCE ENCODINGS
// ═══════════════════════════════════════════════════════════════════

#[test]
fn implied_form_emits_single_opcode() {
    let (image, rows) = assemble("nop\n");
    assert_eq!(image.bytes, vec![0xEA]);
    assert_eq!(rows[0].pc, 0x1000);
}

#[test]
fn implied_form_ast_shape() {
    let (_, _, ast) = try_assemble_with("nop\n", AsmOptions::default()).unwrap();
    let dump = ast.dump();
    // Prog(LineList(Line(Statement(OpInstruction(OpImplied(OpCode))))))
    for rule in [
        "Prog",
        "LineList",
        "Line",
        "Statement",
        "OpInstruction",
        "OpImplied",
        "OpCode",
    ] {
        assert!(dump.contains(rule), "AST dump missing {}:\n{}", rule, dump);
    }
}

#[test]
fn immediate_with_hex_literal() {
    assert_eq!(assemble_bytes("lda #$01\n"), vec![0xA9, 0x01]);
}

#[test]
fn zero_page_selected_when_operand_fits() {
    assert_eq!(assemble_bytes("sta $04\n"), vec![0x85, 0x04]);
}

#[test]
fn word_directive_is_little_endian() {
    assert_eq!(
        assemble_bytes(".word $1234, $5678\n"),
        vec![0x34, 0x12, 0x78, 0x56]
    );
}

#[test]
fn expression_operands_fold_before_encoding() {
    assert_eq!(assemble_bytes("lda #(2 + 3) * 8\n"), vec![0xA9, 40]);
    assert_eq!(assemble_bytes("lda #1 << 6 | 1\n"), vec![0xA9, 0x41]);
    assert_eq!(assemble_bytes(".byte 'H', 'i', 0\n"), vec![0x48, 0x69, 0x00]);
}

// ═══════════════════════════════════════════════════════════════════
// FORWARD REFERENCES AND NARROWING
// ═══════════════════════════════════════════════════════════════════

#[test]
fn forward_reference_stays_absolute_at_high_origin() {
    let source = "\
.org $1000
start: lda foo
       bne start
foo:   nop
";
    assert_eq!(
        assemble_bytes(source),
        vec![0xAD, 0x05, 0x10, 0xD0, 0xFB, 0xEA]
    );
}

#[test]
fn forward_reference_narrows_to_zero_page_at_low_origin() {
    let source = "\
.org $0010
start: lda foo
       bne start
foo:   nop
";
    assert_eq!(assemble_bytes(source), vec![0xA5, 0x14, 0xD0, 0xFC, 0xEA]);
}

#[test]
fn resolved_symbol_value_equals_its_definition_pc() {
    let source = ".org $0200\n jmp end\n.byte 1, 2, 3\nend: rts\n";
    let mut asm = Assembler::new(AsmOptions::default());
    asm.add_source("t.s", source);
    let ast = asm.assemble().unwrap();
    let (image, _) = emit(&ast, asm.origin(), asm.cache()).unwrap();

    // jmp(3) + .byte(3) puts end at $0206, and the image covers it
    assert_eq!(asm.parser().globals.get("end").unwrap().value, 0x0206);
    assert_eq!(image.origin as i32 + image.len() as i32, asm.parser().pc);
    assert_eq!(image.bytes[1], 0x06);
    assert_eq!(image.bytes[2], 0x02);
}

#[test]
fn branch_out_of_range_is_deferred_then_fatal() {
    let source = ".org $1000\n bne far\n.org $1100\nfar: nop\n";
    let err = try_assemble(source).unwrap_err();
    assert_eq!(err.kind, ErrorKind::OperandOutOfRange);
}

#[test]
fn undefined_symbol_reports_unresolved_not_range() {
    let err = try_assemble(" bne nowhere\n").unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnresolvedSymbol);
}

#[test]
fn reordering_independent_equates_preserves_the_image() {
    let a = "x = 1\ny = 2\nlda #x\nldx #y\n";
    let b = "y = 2\nx = 1\nlda #x\nldx #y\n";
    assert_eq!(assemble_bytes(a), assemble_bytes(b));
}

#[test]
fn case_insensitive_sources_assemble_identically() {
    let lower = "start: lda #$0f\n sta $0400\n jmp start\n";
    let upper = "START: LDA #$0F\n STA $0400\n JMP START\n";
    assert_eq!(assemble_bytes(lower), assemble_bytes(upper));
}

// ═══════════════════════════════════════════════════════════════════
// LOCAL SYMBOLS
// ═══════════════════════════════════════════════════════════════════

#[test]
fn local_labels_are_scoped_per_global_label() {
    let source = "\
first:  ldx #2
@loop:  dex
        bne @loop
second: ldx #4
@loop:  dex
        bne @loop
";
    let bytes = assemble_bytes(source);
    // both loops branch back to their own @loop (dex is 1 byte back, so
    // the displacement is -3 from each bne)
    assert_eq!(bytes[3], 0xD0);
    assert_eq!(bytes[4], 0xFD);
    assert_eq!(bytes[8], 0xD0);
    assert_eq!(bytes[9], 0xFD);
}

#[test]
fn unresolved_local_at_scope_exit_is_fatal() {
    let source = "first: bne @missing\nsecond: rts\n";
    let err = try_assemble(source).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnresolvedLocal);
}

// ═══════════════════════════════════════════════════════════════════
// DIRECTIVES AND DIALECT
// ═══════════════════════════════════════════════════════════════════

#[test]
fn org_moves_labels_without_padding_the_image() {
    let source = ".org $1000\nnop\n.org $2000\nlate: rts\n";
    let (image, _, _) = try_assemble_with(source, AsmOptions::default()).unwrap();
    assert_eq!(image.origin, 0x1000);
    assert_eq!(image.bytes, vec![0xEA, 0x60]);

    let mut asm = Assembler::new(AsmOptions::default());
    asm.add_source("t.s", source);
    asm.assemble().unwrap();
    assert_eq!(asm.parser().globals.get("late").unwrap().value, 0x2000);
}

#[test]
fn conditional_assembly_selects_an_arm() {
    let with_else = ".if 2 > 1\n.byte 1\n.else\n.byte 2\n.endif\n";
    assert_eq!(assemble_bytes(with_else), vec![1]);

    let no_else = ".if 0\n.byte 1\n.endif\n.byte 9\n";
    assert_eq!(assemble_bytes(no_else), vec![9]);
}

#[test]
fn macro_expansion_emits_per_call() {
    let source = "\
.macro store
lda #\\1
sta \\2
.endm
start:
store 1, $0400
store 2, $0401
";
    assert_eq!(
        assemble_bytes(source),
        vec![0xA9, 0x01, 0x8D, 0x00, 0x04, 0xA9, 0x02, 0x8D, 0x01, 0x04]
    );
}

#[test]
fn recursive_macro_is_rejected() {
    let source = ".macro m\nm\n.endm\nm\n";
    let err = try_assemble(source).unwrap_err();
    assert_eq!(err.kind, ErrorKind::MacroRecursion);
}

#[test]
fn do_while_expands_per_iteration() {
    let source = ".var i = 0\n.do\n.byte i * 2\ni = i + 1\n.while i < 4\n";
    assert_eq!(assemble_bytes(source), vec![0, 2, 4, 6]);
}

#[test]
fn cpu_gating_controls_extended_sets() {
    assert_eq!(
        try_assemble("bra skip\nskip: nop\n").unwrap_err().kind,
        ErrorKind::UnknownOpcode
    );

    let mut options = AsmOptions::default();
    options.c65c02 = true;
    let (image, _, _) =
        try_assemble_with("bra skip\nskip: nop\n", options).unwrap();
    assert_eq!(image.bytes, vec![0x80, 0x00, 0xEA]);

    assert_eq!(
        try_assemble("lax $10\n").unwrap_err().kind,
        ErrorKind::UnknownOpcode
    );
    let mut options = AsmOptions::default();
    options.illegal = true;
    let (image, _, _) = try_assemble_with("lax $10\n", options).unwrap();
    assert_eq!(image.bytes, vec![0xA7, 0x10]);
}

// ═══════════════════════════════════════════════════════════════════
// MULTIPLE FILES AND INCLUDES
// ═══════════════════════════════════════════════════════════════════

#[test]
fn files_concatenate_in_argument_order() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("a.s");
    let second = dir.path().join("b.s");
    std::fs::write(&first, "lda #1\n").unwrap();
    std::fs::write(&second, "rts\n").unwrap();

    let mut asm = Assembler::new(AsmOptions::default());
    asm.add_file(&first).unwrap();
    asm.add_file(&second).unwrap();
    let ast = asm.assemble().unwrap();
    let (image, _) = emit(&ast, asm.origin(), asm.cache()).unwrap();
    assert_eq!(image.bytes, vec![0xA9, 0x01, 0x60]);
}

#[test]
fn include_splices_the_file_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let main = dir.path().join("main.s");
    let lib = dir.path().join("lib.s");
    std::fs::write(&main, "lda #1\n.include \"lib.s\"\nrts\n").unwrap();
    std::fs::write(&lib, "sta $0400\n").unwrap();

    let mut asm = Assembler::new(AsmOptions::default());
    asm.add_file(&main).unwrap();
    let ast = asm.assemble().unwrap();
    let (image, rows) = emit(&ast, asm.origin(), asm.cache()).unwrap();
    assert_eq!(image.bytes, vec![0xA9, 0x01, 0x8D, 0x00, 0x04, 0x60]);

    // the listing resumes the including file after the include
    let files: Vec<_> = rows.iter().map(|r| r.pos.base_name().to_string()).collect();
    assert!(files.contains(&"lib.s".to_string()));
    assert_eq!(files.first().unwrap(), "main.s");
    assert_eq!(files.last().unwrap(), "main.s");
}

#[test]
fn missing_include_is_reported() {
    let err = try_assemble(".include \"missing.s\"\n").unwrap_err();
    assert_eq!(err.kind, ErrorKind::IncludeNotFound);
}

#[test]
fn self_include_is_a_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let main = dir.path().join("main.s");
    std::fs::write(&main, ".include \"main.s\"\n").unwrap();

    let mut asm = Assembler::new(AsmOptions::default());
    asm.add_file(&main).unwrap();
    let err = asm.assemble().unwrap_err();
    assert_eq!(err.kind, ErrorKind::IncludeCycle);
}

// ═══════════════════════════════════════════════════════════════════
// LISTING SHAPE
// ═══════════════════════════════════════════════════════════════════

#[test]
fn listing_has_one_row_per_source_line_plus_wraps() {
    let source = "start: lda #1\n; comment line\n.byte 1, 2, 3, 4\n";
    let (_, rows) = assemble(source);
    // 3 source lines, one wrap row for the fourth data byte
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[1].bytes.len(), 0);
    assert!(rows[1].source.contains("comment"));
    assert_eq!(rows[3].bytes, vec![4]);
    assert!(rows[3].source.is_empty());
}

#[test]
fn listing_pc_tracks_org() {
    let source = ".org $0810\nstart: lda #1\n";
    let (_, rows) = assemble(source);
    let code_row = rows.iter().find(|r| !r.bytes.is_empty()).unwrap();
    assert_eq!(code_row.pc, 0x0810);
}

// ═══════════════════════════════════════════════════════════════════
// ROUND TRIPS
// ═══════════════════════════════════════════════════════════════════

#[test]
fn assembling_twice_yields_identical_results() {
    let source = "\
.org $c000
init:  ldx #$ff
       txs
@wait: lda $d012
       cmp #$80
       bne @wait
       jmp init
table: .byte 1, 2, 3, \"end\", 0
";
    let (image1, rows1) = assemble(source);
    let (image2, rows2) = assemble(source);
    assert_eq!(image1, image2);
    assert_eq!(rows1.len(), rows2.len());
}

#[test]
fn resolved_ast_reports_every_line() {
    let source = "one: nop\ntwo: nop\nthree: nop\n";
    let (_, _, ast) = try_assemble_with(source, AsmOptions::default()).unwrap();
    let list = ast.first_node(RuleType::LineList).unwrap();
    assert_eq!(list.child_nodes().count(), 3);
}
