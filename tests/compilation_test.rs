//! End-to-end compilation: source text and files through analysis

use fdl::{error_kind, Compilation, ErrorKind};
use fdl_sema::ModuleResolver;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const MODES: &str = "\
enum Mode = (slow, fast)
func twice(int a) -> int:
  logic:
    return a * 2
";

const TOP: &str = "\
import lib.modes
module Top:
  ports:
    int out x
  arch rtl(Top):
    declare:
      modes.Mode m
    logic:
      x = modes.twice(2)
";

fn write(root: &Path, relative: &str, text: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, text).unwrap();
}

fn compile_in(roots: &[&Path], name: &str, text: &str) -> anyhow::Result<fdl::Analysis> {
    let resolver = ModuleResolver::new(roots.iter().map(|r| r.to_path_buf()).collect());
    let mut compilation = Compilation::new(resolver);
    compilation.add_source(name, text);
    compilation.run()
}

#[test]
fn test_in_memory_module() {
    let analysis = compile_in(
        &[],
        "m.fdl",
        "module M:\n  ports:\n    int x\n  arch A(M):\n    logic:\n      x = 1\n",
    )
    .unwrap();

    let id = analysis.lookup("M.x").unwrap();
    let signal = analysis.table().symbol(id).as_signal().unwrap();
    assert!(signal.value_assigned().all());
    assert_eq!(analysis.files().len(), 1);
}

#[test]
fn test_imports_load_from_search_root() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "lib/modes.fdl", MODES);

    let analysis = compile_in(&[temp_dir.path()], "top.fdl", TOP).unwrap();
    assert!(analysis.analyzer().library_scope("lib.modes").is_some());
    assert!(analysis.lookup("Top.rtl").is_some());
}

#[test]
fn test_transitive_imports() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "lib/modes.fdl", MODES);
    write(
        temp_dir.path(),
        "lib/wrap.fdl",
        "import lib.modes\nfunc quad(int a) -> int:\n  logic:\n    return modes.twice(modes.twice(a))\n",
    );
    let top = "\
import lib.wrap
module Top:
  ports:
    int out x
  arch rtl(Top):
    logic:
      x = wrap.quad(1)
";

    let analysis = compile_in(&[temp_dir.path()], "top.fdl", top).unwrap();
    let libraries: Vec<&str> = analysis.analyzer().libraries().map(|(key, _)| key).collect();
    assert!(libraries.contains(&"lib.wrap"));
    assert!(libraries.contains(&"lib.modes"));
}

#[test]
fn test_project_manifest_src_dirs() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "fdl.toml", "[build]\nsrc_dirs = [\"rtl\"]\n");
    write(temp_dir.path(), "rtl/lib/modes.fdl", MODES);
    write(temp_dir.path(), "top.fdl", TOP);

    let mut compilation = Compilation::from_project(temp_dir.path()).unwrap();
    compilation.add_file(temp_dir.path().join("top.fdl")).unwrap();
    let analysis = compilation.run().unwrap();
    assert!(analysis.analyzer().library_scope("lib.modes").is_some());
}

#[test]
fn test_ambiguous_import() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    write(first.path(), "lib/modes.fdl", MODES);
    write(second.path(), "lib/modes.fdl", MODES);

    let err = compile_in(&[first.path(), second.path()], "top.fdl", TOP).unwrap_err();
    assert_eq!(error_kind(&err), Some(ErrorKind::Import));
}

#[test]
fn test_missing_import() {
    let temp_dir = TempDir::new().unwrap();
    let err = compile_in(&[temp_dir.path()], "top.fdl", TOP).unwrap_err();
    assert_eq!(error_kind(&err), Some(ErrorKind::Import));
}

#[test]
fn test_file_import_cycle() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "a.fdl", "import b\n");
    write(temp_dir.path(), "b.fdl", "import a\n");

    let err = compile_in(&[temp_dir.path()], "top.fdl", "import a\n").unwrap_err();
    assert_eq!(error_kind(&err), Some(ErrorKind::Cycle));
}

#[test]
fn test_errors_in_libraries_surface() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "lib/modes.fdl", "enum Mode = (slow, fast\n");

    let err = compile_in(&[temp_dir.path()], "top.fdl", TOP).unwrap_err();
    assert_eq!(error_kind(&err), Some(ErrorKind::Syntax));
    assert!(format!("{err:#}").contains("lib.modes"));
}

#[test]
fn test_lex_error_kind() {
    let err = compile_in(&[], "bad.fdl", "x = 1\ny = $z + 1\n").unwrap_err();
    assert_eq!(error_kind(&err), Some(ErrorKind::Lex));
}

#[test]
fn test_overload_arity() {
    let source = "\
func f(int a, int b = 0) -> int:
  logic:
    return a + b
module M:
  ports:
    int out x
  arch A(M):
    logic:
      x = f(1, 2, 3)
";
    let err = compile_in(&[], "m.fdl", source).unwrap_err();
    assert_eq!(error_kind(&err), Some(ErrorKind::Arity));
}

#[test]
fn test_unreadable_file_has_no_kind() {
    let temp_dir = TempDir::new().unwrap();
    let mut compilation = Compilation::new(ModuleResolver::default());
    let err = compilation.add_file(temp_dir.path().join("missing.fdl")).unwrap_err();
    assert_eq!(error_kind(&err), None);
}

#[test]
fn test_demo_sources_compile() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos");
    let mut compilation = Compilation::new(ModuleResolver::new(vec![root.clone()]));
    compilation.add_file(root.join("counter.fdl")).unwrap();
    compilation.add_file(root.join("fifo.fdl")).unwrap();

    let analysis = compilation.run().unwrap();
    assert!(analysis.lookup("Top.A.u1").is_some());
    assert!(analysis.lookup("Buffer.rtl").is_some());
}
