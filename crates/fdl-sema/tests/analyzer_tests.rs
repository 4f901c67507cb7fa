//! Semantic analysis over complete FDL sources
//!
//! Covers:
//! - Driver tracking per concurrent statement
//! - Overload resolution with trailing defaults
//! - Constant folding of array bounds
//! - Processes, conditions and reports
//! - Traits, impls and generic bounds
//! - Module instances
//! - Library imports and cycles

use fdl_frontend::ast::*;
use fdl_frontend::{parse, ConstValue, GrammarConfig};
use fdl_sema::{Analyzer, ErrorKind, ModuleResolver, ResolveError, SemaError, SemaResult};
use std::path::PathBuf;

fn parse_source(source: &str) -> SemaResult<SourceFile> {
    Ok(parse(source, &GrammarConfig::default(), "test.fdl")?)
}

fn analyze(source: &str) -> SemaResult<Analyzer> {
    let mut file = parse_source(source)?;
    let mut analyzer = Analyzer::standard(ModuleResolver::default())?;
    analyzer.process(&mut file)?;
    Ok(analyzer)
}

fn error_kind(source: &str) -> ErrorKind {
    match analyze(source) {
        Ok(_) => panic!("expected an error for:\n{source}"),
        Err(err) => err.kind(),
    }
}

/// `module M` with the given ports, declarations and logic
fn module(ports: &[&str], declare: &[&str], logic: &[&str]) -> String {
    let mut source = String::from("module M:\n  ports:\n");
    for port in ports {
        source.push_str(&format!("    {port}\n"));
    }
    source.push_str("  arch A(M):\n");
    if !declare.is_empty() {
        source.push_str("    declare:\n");
        for decl in declare {
            source.push_str(&format!("      {decl}\n"));
        }
    }
    source.push_str("    logic:\n");
    for line in logic {
        source.push_str(&format!("      {line}\n"));
    }
    source
}

#[test]
fn test_scalar_port_driven_once() {
    let analyzer = analyze("module M:\n  ports:\n    int x\n  arch A(M):\n    logic:\n      x = 1\n").unwrap();
    let id = analyzer.lookup("M.x").unwrap();
    let signal = analyzer.table().symbol(id).as_signal().unwrap();
    assert_eq!(signal.type_dim(), 0);
    assert!(signal.value_assigned().all());
    assert!(analyzer.lookup("M.A").is_some());
}

#[test]
fn test_second_driver_conflicts() {
    let source = module(&["int x"], &[], &["x = 1", "x = 2"]);
    assert_eq!(error_kind(&source), ErrorKind::DriverConflict);
}

#[test]
fn test_disjoint_slices_share_a_vector() {
    let source = module(
        &["bit[7:0] out y"],
        &[],
        &["y[3:0] = b'1010'", "y[7:4] = b'0101'"],
    );
    let analyzer = analyze(&source).unwrap();
    let signal = analyzer.table().symbol(analyzer.lookup("M.y").unwrap()).as_signal().unwrap();
    assert!(signal.is_fully_assigned());

    let overlap = module(&["bit[7:0] out y"], &[], &["y[3:0] = b'1010'", "y[4:3] = b'01'"]);
    assert_eq!(error_kind(&overlap), ErrorKind::DriverConflict);
}

#[test]
fn test_loop_drives_its_range() {
    let source = module(
        &["bit[7:0] in a", "bit[7:0] out y"],
        &[],
        &["for i in [0:3]:", "  y[i] = a[7 - i]", "y[7:4] = a[3:0]"],
    );
    assert!(analyze(&source).is_ok());

    let overlap = module(
        &["bit[7:0] in a", "bit[7:0] out y"],
        &[],
        &["for i in [0:4]:", "  y[i] = a[i]", "y[7:4] = a[3:0]"],
    );
    assert_eq!(error_kind(&overlap), ErrorKind::DriverConflict);
}

#[test]
fn test_branches_of_one_process_are_one_driver() {
    let source = module(
        &["bit in clk", "bit in rst", "int out x"],
        &["int a"],
        &[
            "spro(clk, rst):",
            "  if (a == 1):",
            "    x = 1",
            "  elif (a == 2):",
            "    x = 2",
            "  else:",
            "    x = 3",
        ],
    );
    assert!(analyze(&source).is_ok());
}

#[test]
fn test_unwritable_targets() {
    let input = module(&["bit in a"], &[], &["a = '1'"]);
    assert_eq!(error_kind(&input), ErrorKind::Type);

    let constant = module(&["int out x"], &["const int LIMIT = 3"], &["LIMIT = 4"]);
    assert_eq!(error_kind(&constant), ErrorKind::Type);
}

#[test]
fn test_trailing_default_overloads() {
    let mut source = String::from("func f(int a, int b = 0) -> int:\n  logic:\n    return a + b\n");
    source.push_str(&module(&["int out x", "int out y"], &[], &["x = f(1)", "y = f(1, 2)"]));
    let analyzer = analyze(&source).unwrap();

    let table = analyzer.table();
    let root = table.root();
    let short = table.lookup_local(root, "f_int0").unwrap();
    let long = table.lookup_local(root, "f_int0_int0").unwrap();
    assert_eq!(short, long);

    let mut too_many = String::from("func f(int a, int b = 0) -> int:\n  logic:\n    return a + b\n");
    too_many.push_str(&module(&["int out x"], &[], &["x = f(1, 2, 3)"]));
    assert_eq!(error_kind(&too_many), ErrorKind::Arity);
}

#[test]
fn test_default_before_required_is_rejected() {
    let source = "func f(int a = 0, int b) -> int:\n  logic:\n    return a + b\n";
    assert_eq!(error_kind(source), ErrorKind::Arity);
}

#[test]
fn test_overloads_resolve_by_argument_type() {
    let mut source = String::from("func g(int a) -> int\nfunc g(bit* a) -> int\n");
    source.push_str(&module(&["int out x", "int out y"], &[], &["x = g(1)", "y = g(b'10')"]));
    assert!(analyze(&source).is_ok());

    let mut wrong = String::from("func g(int a) -> int\nfunc g(bit* a) -> int\n");
    wrong.push_str(&module(&["int out x"], &[], &["x = g('1')"]));
    assert_eq!(error_kind(&wrong), ErrorKind::Type);
}

#[test]
fn test_array_bounds_fold_in_place() {
    let source = "\
module M:
  generics:
    int DEPTH = 16
  ports:
    bit[clog2(DEPTH) - 1:0] in addr
";
    let mut file = parse_source(source).unwrap();
    let mut analyzer = Analyzer::standard(ModuleResolver::default()).unwrap();
    analyzer.process(&mut file).unwrap();

    let Item::Module(module) = &file.items[0] else {
        panic!("expected module");
    };
    assert_eq!(module.ports[0].array[0], Index::Slice(Expr::int(3), Expr::int(0)));

    let addr = analyzer.table().symbol(analyzer.lookup("M.addr").unwrap());
    assert_eq!(addr.as_signal().unwrap().cell_count(), 4);
}

#[test]
fn test_array_bound_must_be_constant() {
    let source = module(&["int in n", "bit out y"], &["bit[n:0] data"], &["y = '1'"]);
    assert_eq!(error_kind(&source), ErrorKind::ArrayBound);
}

#[test]
fn test_index_outside_declared_range() {
    let source = module(&["bit[7:0] out y"], &[], &["y[8] = '1'"]);
    assert_eq!(error_kind(&source), ErrorKind::ArrayBound);
}

#[test]
fn test_array_bounds_at_numeric_limits() {
    let widest = "module M:\n  ports:\n    bit[9223372036854775807:0] in x\n";
    assert_eq!(error_kind(widest), ErrorKind::ArrayBound);

    let huge = "module M:\n  ports:\n    bit[4000000000:0][4000000000:0] in x\n";
    assert_eq!(error_kind(huge), ErrorKind::ArrayBound);
}

#[test]
fn test_bit_vector_operands_fold() {
    let source = module(
        &["bit[3:0] out y", "bit[3:0] out z"],
        &[
            "const bit[3:0] SUM = b'0011' + 1",
            "const bit[3:0] BOTH = b'0011' + b'0001'",
            "const bit[3:0] WRAP = b'1111' + 1",
            "const bool BELOW = b'0011' < 5",
            "const bool SAME = b'0001' == 1",
        ],
        &["y = SUM", "z = b'0011' - 1"],
    );
    let analyzer = analyze(&source).unwrap();
    let value = |name: &str| {
        let id = analyzer.lookup(&format!("M.A.{name}")).unwrap();
        analyzer.table().symbol(id).as_signal().unwrap().const_value()
    };

    let four = ConstValue::Bit(vec![false, true, false, false]);
    assert_eq!(value("SUM"), Some(four.clone()));
    assert_eq!(value("BOTH"), Some(four));
    assert_eq!(value("WRAP"), Some(ConstValue::Bit(vec![false; 4])));
    assert_eq!(value("BELOW"), Some(ConstValue::Bool(true)));
    assert_eq!(value("SAME"), Some(ConstValue::Bool(true)));
}

#[test]
fn test_partial_index_selects_whole_rows() {
    let rows = module(
        &["bit[1:0][3:0] out mem"],
        &[],
        &["mem[0] = b'1010'", "mem[1] = b'0101'"],
    );
    let analyzer = analyze(&rows).unwrap();
    let mem = analyzer.table().symbol(analyzer.lookup("M.mem").unwrap());
    assert!(mem.as_signal().unwrap().is_fully_assigned());

    let overlap = module(
        &["bit[1:0][3:0] out mem"],
        &[],
        &["mem[0] = b'1010'", "mem[0][2] = '1'"],
    );
    assert_eq!(error_kind(&overlap), ErrorKind::DriverConflict);
}

#[test]
fn test_process_arguments() {
    let arity = module(&["bit in clk", "int out x"], &[], &["spro(clk):", "  x = 1"]);
    assert_eq!(error_kind(&arity), ErrorKind::Arity);

    let vector = module(
        &["bit in clk", "bit[1:0] in rst", "int out x"],
        &[],
        &["apro(clk, rst):", "  x = 1"],
    );
    assert_eq!(error_kind(&vector), ErrorKind::Type);
}

#[test]
fn test_condition_and_report_types() {
    let condition = module(
        &["bit in clk", "bit in rst", "int out x"],
        &["int a"],
        &["spro(clk, rst):", "  if (a):", "    x = 1"],
    );
    assert_eq!(error_kind(&condition), ErrorKind::Type);

    let report = module(&["int x"], &[], &["assert x == 1:", "  warning(1)"]);
    assert_eq!(error_kind(&report), ErrorKind::Type);
}

#[test]
fn test_names_must_resolve() {
    let unknown = module(&["int out x"], &[], &["x = z"]);
    assert_eq!(error_kind(&unknown), ErrorKind::Name);

    let duplicate = module(&["int x", "int x"], &[], &["x = 1"]);
    assert_eq!(error_kind(&duplicate), ErrorKind::Name);
}

#[test]
fn test_enum_states_in_case() {
    let mut source = String::from("enum State = (idle, busy)\n");
    source.push_str(&module(
        &["bit in clk", "bit in rst"],
        &["State s"],
        &[
            "spro(clk, rst):",
            "  case (s):",
            "    idle:",
            "      s = busy",
            "    others:",
            "      s = idle",
        ],
    ));
    assert!(analyze(&source).is_ok());
}

const TRAITS: &str = "\
trait Printable:
  func id(Self self) -> int
  func twice(Self self) -> int:
    logic:
      return 2

struct Word:
  bit[7:0] data

struct Pair:
  int a
  bit b

struct Holder<T(Printable)>:
  int n

impl Printable for Word:
  func id(Self self) -> int:
    logic:
      return 1

impl Word:
  func low(Self self) -> bit*:
    logic:
      return self.data[3:0]
";

#[test]
fn test_trait_impl_and_bounds() {
    let mut source = String::from(TRAITS);
    source.push_str(&module(
        &["int out x", "int out y", "bit[3:0] out z", "int out n"],
        &["Word w", "Holder<Word> h", "Pair p"],
        &["x = w.id()", "y = w.twice()", "z = w.low()", "n = p.a"],
    ));
    let analyzer = analyze(&source).unwrap();
    let word = analyzer.table().symbol(analyzer.lookup("Word").unwrap());
    assert_eq!(word.as_type().unwrap().traits, vec!["Printable".to_string()]);
}

#[test]
fn test_generic_bound_violation() {
    let mut source = String::from(TRAITS);
    source.push_str(&module(&["int out x"], &["Holder<Pair> h"], &["x = 1"]));
    assert_eq!(error_kind(&source), ErrorKind::Type);
}

#[test]
fn test_missing_trait_function() {
    let source = "\
trait Printable:
  func id(Self self) -> int

struct Word:
  bit[7:0] data

impl Printable for Word
";
    assert_eq!(error_kind(source), ErrorKind::Name);
}

#[test]
fn test_unknown_struct_field() {
    let mut source = String::from(TRAITS);
    source.push_str(&module(&["int out x"], &["Pair p"], &["x = p.c"]));
    assert_eq!(error_kind(&source), ErrorKind::Name);
}

const COUNTER: &str = "\
module Counter:
  generics:
    int WIDTH = 8
  ports:
    bit in clk
    bit in rst
    uint(WIDTH) out count
  arch rtl(Counter):
    logic:
      spro(clk, rst):
        count += 1

";

fn top(extra: &[&str]) -> String {
    let mut source = String::from(COUNTER);
    source.push_str(
        "module Top:\n  ports:\n    bit in clk\n    bit in rst\n    uint(4) out total\n  arch A(Top):\n    logic:\n",
    );
    source.push_str("      u1 Counter(rtl):\n        generics:\n          WIDTH = 4\n");
    source.push_str("        ports:\n          clk = clk\n          rst = rst\n          count = total\n");
    for line in extra {
        source.push_str(&format!("      {line}\n"));
    }
    source
}

#[test]
fn test_instance_connections() {
    let analyzer = analyze(&top(&[])).unwrap();
    let total = analyzer.table().symbol(analyzer.lookup("Top.total").unwrap());
    assert!(total.as_signal().unwrap().is_fully_assigned());
    assert!(analyzer.lookup("Top.A.u1").is_some());
}

#[test]
fn test_instance_output_is_a_driver() {
    assert_eq!(error_kind(&top(&["total = 0"])), ErrorKind::DriverConflict);
}

#[test]
fn test_instance_of_unknown_architecture() {
    let source = top(&[]).replace("Counter(rtl)", "Counter(gates)");
    assert_eq!(error_kind(&source), ErrorKind::Name);
}

#[test]
fn test_tuple_assignment_counts_values() {
    let task = "\
task split(bit* word) -> (bit*, bit*):
  logic:
    return (word[7:4], word[3:0])
";
    let mut source = String::from(task);
    source.push_str(&module(
        &["bit[7:0] in w", "bit[3:0] out hi", "bit[3:0] out lo"],
        &[],
        &["(hi, lo) = split(w)"],
    ));
    assert!(analyze(&source).is_ok());

    let mut short = String::from(task);
    short.push_str(&module(&["bit[7:0] in w", "bit[3:0] out hi"], &[], &["(hi) = split(w)"]));
    assert_eq!(error_kind(&short), ErrorKind::Arity);
}

#[test]
fn test_imported_library_members() {
    let library = parse_source("enum Mode = (slow, fast)\nfunc twice(int a) -> int:\n  logic:\n    return a * 2\n").unwrap();
    let mut root = parse_source(&format!(
        "import lib.modes\n{}",
        module(&["int out x"], &["modes.Mode m"], &["x = modes.twice(2)"])
    ))
    .unwrap();

    let mut analyzer = Analyzer::standard(ModuleResolver::default()).unwrap();
    analyzer.add_library("lib.modes", PathBuf::from("lib/modes.fdl"), library);
    analyzer.process(&mut root).unwrap();
    assert!(analyzer.library_scope("lib.modes").is_some());
}

#[test]
fn test_unloaded_import() {
    let err = analyze("import lib.modes\n").unwrap_err();
    assert!(matches!(
        err,
        SemaError::Import {
            error: ResolveError::NotLoaded { .. },
            ..
        }
    ));
}

#[test]
fn test_import_cycle() {
    let mut analyzer = Analyzer::standard(ModuleResolver::default()).unwrap();
    analyzer.add_library("a", PathBuf::from("a.fdl"), parse_source("import b\n").unwrap());
    analyzer.add_library("b", PathBuf::from("b.fdl"), parse_source("import a\n").unwrap());

    let mut root = parse_source("import a\n").unwrap();
    let err = analyzer.process(&mut root).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cycle);
}
