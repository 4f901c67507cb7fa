//! Builtin type, function and attribute catalog
//!
//! The analyzer seeds its root scope from a [`BuiltinCatalog`]. The catalog
//! is plain serde data so callers may load it from any document format.

use fdl_frontend::ConstValue;
use fdl_resolve::{ParamList, ParamSymbol, TypeSig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuiltinCatalog {
    #[serde(default)]
    pub types: Vec<BuiltinType>,
    #[serde(default)]
    pub functions: Vec<BuiltinFunction>,
    #[serde(default)]
    pub attrs: Vec<BuiltinAttr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuiltinParam {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub dim: usize,
    #[serde(default)]
    pub default: Option<ConstValue>,
}

/// A builtin type with its configuration parameters, e.g. `uint(width)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuiltinType {
    pub name: String,
    #[serde(default)]
    pub params: Vec<BuiltinParam>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuiltinFunction {
    pub name: String,
    #[serde(default)]
    pub params: Vec<BuiltinParam>,
    #[serde(default)]
    pub returns: Vec<TypeSig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuiltinAttr {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

fn param(name: &str, type_name: &str, default: Option<i64>) -> BuiltinParam {
    BuiltinParam {
        name: name.to_string(),
        type_name: type_name.to_string(),
        dim: 0,
        default: default.map(ConstValue::Int),
    }
}

fn scalar(name: &str) -> BuiltinType {
    BuiltinType {
        name: name.to_string(),
        params: Vec::new(),
    }
}

fn function(name: &str, params: Vec<BuiltinParam>, returns: &str) -> BuiltinFunction {
    BuiltinFunction {
        name: name.to_string(),
        params,
        returns: vec![TypeSig::new(returns, 0)],
    }
}

impl BuiltinCatalog {
    /// The catalog every compilation starts from unless told otherwise
    pub fn standard() -> Self {
        let sized = |name: &str| BuiltinType {
            name: name.to_string(),
            params: vec![param("width", "int", Some(32))],
        };

        Self {
            types: vec![
                scalar("bit"),
                scalar("bool"),
                scalar("int"),
                sized("sint"),
                sized("uint"),
                scalar("natural"),
                scalar("integer"),
                scalar("float"),
                scalar("str"),
                scalar("time"),
            ],
            functions: vec![
                function("clog2", vec![param("n", "int", None)], "int"),
                function("abs", vec![param("a", "int", None)], "int"),
                function(
                    "max",
                    vec![param("a", "int", None), param("b", "int", None)],
                    "int",
                ),
                function(
                    "min",
                    vec![param("a", "int", None), param("b", "int", None)],
                    "int",
                ),
                function(
                    "rising_edge",
                    vec![BuiltinParam {
                        name: "clk".to_string(),
                        type_name: "bit".to_string(),
                        dim: 0,
                        default: None,
                    }],
                    "bool",
                ),
                function(
                    "falling_edge",
                    vec![BuiltinParam {
                        name: "clk".to_string(),
                        type_name: "bit".to_string(),
                        dim: 0,
                        default: None,
                    }],
                    "bool",
                ),
            ],
            attrs: vec![
                BuiltinAttr {
                    name: "width".to_string(),
                    type_name: "int".to_string(),
                },
                BuiltinAttr {
                    name: "keep".to_string(),
                    type_name: "bool".to_string(),
                },
                BuiltinAttr {
                    name: "description".to_string(),
                    type_name: "str".to_string(),
                },
            ],
        }
    }
}

/// Parameter list for a builtin type or function
pub fn param_list(owner: &str, params: &[BuiltinParam]) -> ParamList {
    let mut list = ParamList::new(owner);
    for p in params {
        let mut symbol = ParamSymbol::new(p.name.clone(), p.type_name.clone(), p.dim);
        symbol.default = p.default.clone();
        list.push(symbol);
    }
    list
}
