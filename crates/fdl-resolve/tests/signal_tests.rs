//! Tests for signal coverage tracking through the symbol table

use fdl_frontend::ConstValue;
use fdl_resolve::*;

fn declare(table: &mut SymbolTable, name: &str, bounds: &[(i64, i64)]) -> SymbolId {
    let mut signal = SignalSymbol::new(name, "bit");
    signal.set_array(bounds).unwrap();
    let root = table.root();
    table.insert(root, Symbol::signal(signal, 1)).unwrap()
}

#[test]
fn test_byte_initializer_containment() {
    let mut table = SymbolTable::new();
    let id = declare(&mut table, "data", &[(7, 0)]);
    let signal = table.symbol_mut(id).as_signal_mut().unwrap();

    signal.assign_init_value(None, Some(&[(3, 0)])).unwrap();
    assert!(matches!(
        signal.assign_init_value(None, Some(&[(8, 0)])),
        Err(SymbolError::OutOfBounds { .. })
    ));
    assert!(matches!(
        signal.assign_init_value(None, Some(&[(3, 0)])),
        Err(SymbolError::AlreadyAssigned { .. })
    ));
    signal.assign_init_value(None, Some(&[(7, 4)])).unwrap();
    assert!(signal.init_assigned().all());
}

#[test]
fn test_ascending_and_descending_ranges_store_alike() {
    let mut up = SignalSymbol::new("up", "bit");
    up.set_array(&[(0, 3)]).unwrap();
    let mut down = SignalSymbol::new("down", "bit");
    down.set_array(&[(3, 0)]).unwrap();

    let value = ConstValue::Bit(vec![true, true, false, false]);
    up.assign_init_value(Some(&value), None).unwrap();
    down.assign_init_value(Some(&value), None).unwrap();

    // The first literal bit lands on the leftmost declared index
    assert_eq!(up.values()[up.offset(&[0])], Some(ConstValue::Bit(vec![true])));
    assert_eq!(down.values()[down.offset(&[3])], Some(ConstValue::Bit(vec![true])));
    assert_eq!(down.values()[down.offset(&[0])], Some(ConstValue::Bit(vec![false])));
    assert!(!up.dims()[0].flip);
    assert!(down.dims()[0].flip);
}

#[test]
fn test_scalar_constant_folds() {
    let mut table = SymbolTable::new();
    let mut depth = SignalSymbol::new("DEPTH", "int");
    depth.assign_const_value(&ConstValue::Int(16)).unwrap();
    let root = table.root();
    let id = table.insert(root, Symbol::signal(depth, 2)).unwrap();

    let signal = table.symbol(id).as_signal().unwrap();
    assert!(signal.is_const);
    assert!(signal.is_fully_assigned());
    assert_eq!(signal.const_value(), Some(ConstValue::Int(16)));
}

#[test]
fn test_overloads_bound_in_table() {
    let mut table = SymbolTable::new();
    let root = table.root();

    let mut params = ParamList::new("f");
    params.push(ParamSymbol::new("a", "int", 0));
    params.push(ParamSymbol::new("b", "int", 0).with_default(ConstValue::Int(0)));
    let keys = params.overload_keys("f").unwrap();

    let id = table.add(Symbol::new("f", SymbolKind::Function, 1).with_params(params));
    for key in &keys {
        assert!(table.bind(root, key, id));
    }

    let call = overload_key("f", [("uint", 0)]);
    assert_eq!(table.lookup(root, &call, SymbolKind::Function.into(), true), Some(id));
    let call = overload_key("f", [("int", 0), ("int", 0), ("int", 0)]);
    assert_eq!(table.lookup(root, &call, KindFilter::Any, true), None);
}
