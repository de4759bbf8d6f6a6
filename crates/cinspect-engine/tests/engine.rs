//! End-to-end tests of the engine: source in, AST and diagnostics out.

use cinspect_engine::{
    persist, Ast, CursorKind, Engine, EngineError, EngineSettings, Entity, ParseFlags, ParseRequest,
    Severity, ROOT,
};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn parse_source(source: &str, args: &[&str]) -> Ast {
    let mut engine = Engine::new(EngineSettings::default()).unwrap();
    engine
        .parse(&ParseRequest {
            filename: PathBuf::from("input.c"),
            contents: Some(source.to_string()),
            args: args.iter().map(|a| a.to_string()).collect(),
            ..Default::default()
        })
        .unwrap()
}

fn top_level<'a>(ast: &'a Ast, kind: CursorKind) -> Vec<&'a Entity> {
    ast.root()
        .children
        .iter()
        .map(|&id| &ast.nodes[id as usize].entity)
        .filter(|e| e.kind() == kind)
        .collect()
}

fn messages(ast: &Ast) -> Vec<&str> {
    ast.diagnostics.iter().map(|d| d.message.as_str()).collect()
}

#[test]
fn test_unused_variable_with_wall() {
    let ast = parse_source("int main(void) {int a; return 0;}", &["-Wall"]);
    assert_eq!(messages(&ast), vec!["unused variable 'a'"]);
    assert_eq!(ast.diagnostics[0].option.as_deref(), Some("-Wunused-variable"));
}

#[test]
fn test_unused_variable_needs_flag() {
    let ast = parse_source("int main(void) {int a; return 0;}", &[]);
    assert!(ast.diagnostics.is_empty());
}

#[test]
fn test_broken_main_yields_four_diagnostics() {
    let ast = parse_source("void main() {int a = \"\"; return 0}", &[]);
    assert_eq!(ast.diagnostics.len(), 4, "{:?}", messages(&ast));
    assert_eq!(ast.diagnostics[0].message, "return type of 'main' is not 'int'");
    assert_eq!(ast.diagnostics[0].notes.len(), 1);
    assert!(ast.diagnostics[1].message.starts_with("incompatible pointer to integer conversion"));
    assert_eq!(
        ast.diagnostics[2].message,
        "void function 'main' should not return a value"
    );
    assert_eq!(ast.diagnostics[3].message, "expected ';' after return statement");
}

#[test]
fn test_warning_policy() {
    let source = "int main(void) {int a; return 0;}";
    let ast = parse_source(source, &["-Wall", "-Werror"]);
    assert_eq!(ast.diagnostics[0].severity, Severity::Error);

    let ast = parse_source(source, &["-Wall", "-w"]);
    assert!(ast.diagnostics.is_empty());
}

#[test]
fn test_includes_resolve_and_splice() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("util.h"),
        "#ifndef UTIL_H\n#define UTIL_H\nint util(int x);\n#endif\n",
    )
    .unwrap();
    let main = dir.path().join("main.c");
    fs::write(&main, "#include \"util.h\"\nint main(void) { return util(1); }\n").unwrap();

    let mut engine = Engine::new(EngineSettings::default()).unwrap();
    let ast = engine
        .parse(&ParseRequest {
            filename: main,
            ..Default::default()
        })
        .unwrap();

    assert_eq!(ast.files.len(), 2);
    assert!(ast.files[1].guarded);
    assert_eq!(ast.include_stack(1).len(), 1);

    let functions = top_level(&ast, CursorKind::FunctionDecl);
    let names: Vec<_> = functions.iter().filter_map(|e| e.spelling()).collect();
    assert_eq!(names, vec!["util", "main"]);
    assert!(ast.diagnostics.is_empty());
}

#[test]
fn test_overlay_header_wins() {
    let dir = TempDir::new().unwrap();
    let header = dir.path().join("config.h");
    fs::write(&header, "int on_disk;\n").unwrap();
    let main = dir.path().join("main.c");
    fs::write(&main, "#include \"config.h\"\n").unwrap();

    let mut engine = Engine::new(EngineSettings::default()).unwrap();
    let ast = engine
        .parse(&ParseRequest {
            filename: main,
            overlays: vec![(header, "int in_memory;\n".to_string())],
            ..Default::default()
        })
        .unwrap();
    let vars = top_level(&ast, CursorKind::VarDecl);
    assert_eq!(vars[0].spelling(), Some("in_memory"));
}

#[test]
fn test_missing_include_is_fatal() {
    let ast = parse_source("#include \"missing.h\"\nint x = ;\n", &[]);
    assert_eq!(ast.diagnostics.len(), 1);
    assert_eq!(ast.diagnostics[0].severity, Severity::Fatal);
    assert_eq!(ast.diagnostics[0].message, "'missing.h' file not found");
}

#[test]
fn test_conditionals() {
    let source = "#define LEVEL 2\n#if LEVEL > 1 && defined(LEVEL)\nint high;\n#else\nint low;\n#endif\n#ifdef MISSING\nint never;\n#endif\n";
    let ast = parse_source(source, &[]);
    let vars: Vec<_> = top_level(&ast, CursorKind::VarDecl)
        .iter()
        .filter_map(|e| e.spelling())
        .collect();
    assert_eq!(vars, vec!["high"]);

    let ast = parse_source(source, &["-DMISSING"]);
    assert_eq!(top_level(&ast, CursorKind::VarDecl).len(), 2);
}

#[test]
fn test_type_spellings() {
    let ast = parse_source(
        "const char *name;\nint arr[4];\nint (*fp)(int, char);\nunsigned long count;\n",
        &[],
    );
    let types: Vec<_> = top_level(&ast, CursorKind::VarDecl)
        .iter()
        .filter_map(|e| e.type_spelling())
        .collect();
    assert_eq!(types, vec!["const char *", "int[4]", "int (*)(int, char)", "unsigned long"]);
}

#[test]
fn test_function_signature() {
    let ast = parse_source("static int add(int a, int b);\nint printf(const char *fmt, ...);\n", &[]);
    let types: Vec<_> = top_level(&ast, CursorKind::FunctionDecl)
        .iter()
        .filter_map(|e| e.type_spelling())
        .collect();
    assert_eq!(types, vec!["int (int, int)", "int (const char *, ...)"]);
}

#[test]
fn test_enum_values() {
    let ast = parse_source("enum color { RED, GREEN = 5, BLUE };", &[]);
    let enum_id = ast.root().children[0];
    let values: Vec<i64> = ast.nodes[enum_id as usize]
        .children
        .iter()
        .filter_map(|&id| match &ast.nodes[id as usize].entity {
            Entity::EnumConstantDecl { value, .. } => Some(*value),
            _ => None,
        })
        .collect();
    assert_eq!(values, vec![0, 5, 6]);
}

#[test]
fn test_references_resolve_to_declarations() {
    let ast = parse_source("int g;\nint f(void) { return g; }\n", &[]);
    let global = ast.root().children[0];
    let reference = ast
        .nodes
        .iter()
        .position(|n| n.kind() == CursorKind::DeclRefExpr)
        .unwrap();
    assert_eq!(ast.nodes[reference].referenced, Some(global));
    assert_eq!(ast.nodes[global as usize].references, 1);
    assert_eq!(ast.nodes[global as usize].usr.as_deref(), Some("c:@g"));
}

#[test]
fn test_block_scopes_shadow() {
    let ast = parse_source(
        "int x;\nint f(void) { int x = 1; { return x; } }\n",
        &[],
    );
    let reference = ast
        .nodes
        .iter()
        .find(|n| n.kind() == CursorKind::DeclRefExpr)
        .unwrap();
    let target = reference.referenced.unwrap();
    assert_ne!(target, ast.root().children[0]);
    assert!(matches!(&ast.nodes[target as usize].entity, Entity::VarDecl(info) if info.is_local));
}

#[test]
fn test_skip_function_bodies() {
    let mut engine = Engine::new(EngineSettings::default()).unwrap();
    let ast = engine
        .parse(&ParseRequest {
            filename: PathBuf::from("input.c"),
            contents: Some("int f(int a) { return a; }".to_string()),
            flags: ParseFlags {
                skip_function_bodies: true,
                ..Default::default()
            },
            ..Default::default()
        })
        .unwrap();
    let function = &ast.nodes[ast.root().children[0] as usize];
    let kinds: Vec<_> = function
        .children
        .iter()
        .map(|&id| ast.nodes[id as usize].kind())
        .collect();
    assert_eq!(kinds, vec![CursorKind::ParmDecl]);
    assert!(function.entity.is_definition());
}

#[test]
fn test_detailed_preprocessing_record() {
    let mut engine = Engine::new(EngineSettings::default()).unwrap();
    let ast = engine
        .parse(&ParseRequest {
            filename: PathBuf::from("input.c"),
            contents: Some("#define ANSWER 42\nint x = ANSWER;\n".to_string()),
            flags: ParseFlags {
                detailed_preprocessing_record: true,
                ..Default::default()
            },
            ..Default::default()
        })
        .unwrap();
    let first = &ast.nodes[ast.root().children[0] as usize];
    assert_eq!(first.kind(), CursorKind::MacroDefinition);
    assert_eq!(first.entity.spelling(), Some("ANSWER"));
}

#[test]
fn test_brief_comments() {
    let mut engine = Engine::new(EngineSettings::default()).unwrap();
    let ast = engine
        .parse(&ParseRequest {
            filename: PathBuf::from("input.c"),
            contents: Some("/// Adds numbers.\nint add(int a, int b);\n// plain\nint sub(int a, int b);\n".to_string()),
            flags: ParseFlags {
                include_brief_comments: true,
                ..Default::default()
            },
            ..Default::default()
        })
        .unwrap();
    let comments: Vec<_> = ast
        .root()
        .children
        .iter()
        .map(|&id| ast.nodes[id as usize].brief_comment.clone())
        .collect();
    assert_eq!(comments, vec![Some("Adds numbers.".to_string()), None]);
}

#[test]
fn test_cxx_main_must_return_int() {
    let mut engine = Engine::new(EngineSettings::default()).unwrap();
    let ast = engine
        .parse(&ParseRequest {
            filename: PathBuf::from("input.cpp"),
            contents: Some("void main() {}".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(messages(&ast), vec!["'main' must return 'int'"]);
    assert_eq!(ast.diagnostics[0].severity, Severity::Error);
}

#[test]
fn test_cxx_records_and_namespaces() {
    let mut engine = Engine::new(EngineSettings::default()).unwrap();
    let ast = engine
        .parse(&ParseRequest {
            filename: PathBuf::from("input.cpp"),
            contents: Some(
                "namespace geo {\nclass Point {\n  int x;\n  int norm();\n};\n}\n".to_string(),
            ),
            ..Default::default()
        })
        .unwrap();
    let namespace = &ast.nodes[ast.root().children[0] as usize];
    assert_eq!(namespace.kind(), CursorKind::Namespace);
    let class = &ast.nodes[namespace.children[0] as usize];
    assert_eq!(class.kind(), CursorKind::ClassDecl);
    assert_eq!(class.usr.as_deref(), Some("c:@N@geo@S@Point"));
    let members: Vec<_> = class
        .children
        .iter()
        .map(|&id| ast.nodes[id as usize].kind())
        .collect();
    assert_eq!(members, vec![CursorKind::FieldDecl, CursorKind::CxxMethod]);
}

#[test]
fn test_save_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("unit.ast");
    let ast = parse_source("int main(void) { return 0; }", &["-Wall"]);

    persist::save(&ast, &path).unwrap();
    let loaded = persist::load(&path).unwrap();
    assert_eq!(loaded.nodes.len(), ast.nodes.len());
    assert_eq!(loaded.args, vec!["-Wall".to_string()]);
    assert_eq!(loaded.main_file().tokens, ast.main_file().tokens);

    assert!(matches!(
        persist::load(&dir.path().join("absent.ast")).unwrap_err(),
        EngineError::FileNotFound(_)
    ));
    assert_eq!(loaded.node(ROOT).map(|n| n.kind()), Some(CursorKind::TranslationUnit));
}
