//! Parameter lists, argument binding and overload naming

use crate::error::{SymbolError, SymbolResult};
use fdl_frontend::ConstValue;
use serde::{Deserialize, Serialize};

/// Type names that are interchangeable integer representations
pub const INTEGER_FAMILY: &[&str] = &["int", "sint", "uint", "natural", "integer"];

pub fn is_integer_type(type_name: &str) -> bool {
    INTEGER_FAMILY.contains(&type_name)
}

/// Name fragment a type contributes to an overload key
pub fn mangle(type_name: &str) -> &str {
    if is_integer_type(type_name) {
        "int"
    } else {
        type_name.rsplit('.').next().unwrap_or(type_name)
    }
}

/// Whether a value of type `found` may bind where `expected` is declared
pub fn types_compatible(expected: &str, found: &str) -> bool {
    expected == found || mangle(expected) == mangle(found)
}

/// Overload key for one call signature
pub fn overload_key<'a>(base: &str, args: impl IntoIterator<Item = (&'a str, usize)>) -> String {
    let mut key = base.to_string();
    for (type_name, dim) in args {
        key.push('_');
        key.push_str(mangle(type_name));
        key.push_str(&dim.to_string());
    }
    key
}

/// A type name with its dimension count
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeSig {
    pub type_name: String,
    pub dim: usize,
}

impl TypeSig {
    pub fn new(type_name: impl Into<String>, dim: usize) -> Self {
        Self {
            type_name: type_name.into(),
            dim,
        }
    }

    pub fn accepts(&self, other: &TypeSig) -> bool {
        self.dim == other.dim && types_compatible(&self.type_name, &other.type_name)
    }
}

impl std::fmt::Display for TypeSig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.type_name)?;
        for _ in 0..self.dim {
            f.write_str("*")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSymbol {
    pub name: String,
    pub type_name: String,
    pub type_dim: usize,
    pub default: Option<ConstValue>,
    /// Declared with a generic type parameter, binds any argument type
    pub generic: bool,
}

impl ParamSymbol {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, type_dim: usize) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            type_dim,
            default: None,
            generic: false,
        }
    }

    pub fn with_default(mut self, value: ConstValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn signature(&self) -> TypeSig {
        TypeSig::new(self.type_name.clone(), self.type_dim)
    }

    fn accepts(&self, arg: &ArgSig) -> bool {
        self.generic || self.signature().accepts(&arg.sig)
    }
}

/// The observed signature of one call argument
#[derive(Debug, Clone, PartialEq)]
pub struct ArgSig {
    pub sig: TypeSig,
    /// Folded value when the argument is constant
    pub value: Option<ConstValue>,
}

impl ArgSig {
    pub fn new(type_name: impl Into<String>, dim: usize, value: Option<ConstValue>) -> Self {
        Self {
            sig: TypeSig::new(type_name, dim),
            value,
        }
    }

    pub fn constant(value: ConstValue) -> Self {
        let dim = usize::from(matches!(&value, ConstValue::Bit(bits) if bits.len() > 1));
        Self::new(value.type_name(), dim, Some(value))
    }
}

/// Ordered parameter list of a function, task or configurable type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamList {
    /// Name used in diagnostics
    pub owner: String,
    pub params: Vec<ParamSymbol>,
}

impl ParamList {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            params: Vec::new(),
        }
    }

    pub fn push(&mut self, param: ParamSymbol) {
        self.params.push(param);
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ParamSymbol> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Number of leading parameters without a default
    pub fn required(&self) -> usize {
        self.params
            .iter()
            .take_while(|p| p.default.is_none())
            .count()
    }

    /// Once a parameter has a default, every later one needs one too
    pub fn verify_defaults(&self) -> SymbolResult<()> {
        let mut defaulted = false;
        for param in &self.params {
            if param.default.is_some() {
                defaulted = true;
            } else if defaulted {
                return Err(SymbolError::InvalidParams {
                    owner: self.owner.clone(),
                    param: param.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Whether `count` arguments is an admissible call arity
    pub fn accepts_arity(&self, count: usize) -> bool {
        (self.required()..=self.params.len()).contains(&count)
    }

    /// Bind call arguments positionally, filling the remainder from defaults.
    ///
    /// Returns one value per parameter; `None` for non-constant arguments.
    pub fn bind(&self, args: &[ArgSig]) -> SymbolResult<Vec<Option<ConstValue>>> {
        if args.len() > self.params.len() {
            return Err(SymbolError::TooManyArgs {
                owner: self.owner.clone(),
                expected: self.params.len(),
                found: args.len(),
            });
        }

        let mut bound = Vec::with_capacity(self.params.len());
        for (position, param) in self.params.iter().enumerate() {
            match args.get(position) {
                Some(arg) if param.accepts(arg) => bound.push(arg.value.clone()),
                Some(arg) => {
                    return Err(SymbolError::ArgType {
                        owner: self.owner.clone(),
                        param: param.name.clone(),
                        expected: param.signature().to_string(),
                        found: arg.sig.to_string(),
                    })
                }
                None => match &param.default {
                    Some(value) => bound.push(Some(value.clone())),
                    None => {
                        return Err(SymbolError::MissingArg {
                            owner: self.owner.clone(),
                            param: param.name.clone(),
                        })
                    }
                },
            }
        }
        Ok(bound)
    }

    /// Every name this list can be called under, shortest first
    pub fn overload_keys(&self, base: &str) -> SymbolResult<Vec<String>> {
        self.verify_defaults()?;
        let keys = (self.required()..=self.params.len())
            .map(|count| {
                overload_key(
                    base,
                    self.params[..count]
                        .iter()
                        .map(|p| (p.type_name.as_str(), p.type_dim)),
                )
            })
            .collect();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f_list() -> ParamList {
        let mut list = ParamList::new("f");
        list.push(ParamSymbol::new("a", "int", 0));
        list.push(ParamSymbol::new("b", "int", 0).with_default(ConstValue::Int(0)));
        list
    }

    #[test]
    fn test_overload_keys_for_trailing_default() {
        let keys = f_list().overload_keys("f").unwrap();
        assert_eq!(keys, vec!["f_int0".to_string(), "f_int0_int0".to_string()]);
    }

    #[test]
    fn test_overload_keys_without_params() {
        let keys = ParamList::new("g").overload_keys("g").unwrap();
        assert_eq!(keys, vec!["g".to_string()]);
    }

    #[test]
    fn test_integer_family_mangles_alike() {
        assert_eq!(mangle("uint"), "int");
        assert_eq!(mangle("natural"), "int");
        assert_eq!(mangle("bit"), "bit");
        assert_eq!(mangle("bus.Word"), "Word");
        assert_eq!(overload_key("g", [("sint", 0), ("bit", 1)]), "g_int0_bit1");
    }

    #[test]
    fn test_bind_arity() {
        let list = f_list();
        let one = ArgSig::constant(ConstValue::Int(3));

        assert!(matches!(list.bind(&[]), Err(SymbolError::MissingArg { .. })));
        assert_eq!(
            list.bind(&[one.clone()]).unwrap(),
            vec![Some(ConstValue::Int(3)), Some(ConstValue::Int(0))]
        );
        assert!(list.bind(&[one.clone(), one.clone()]).is_ok());
        assert!(matches!(
            list.bind(&[one.clone(), one.clone(), one]),
            Err(SymbolError::TooManyArgs { expected: 2, found: 3, .. })
        ));
        assert!(!list.accepts_arity(0));
        assert!(list.accepts_arity(2));
    }

    #[test]
    fn test_bind_type_mismatch() {
        let list = f_list();
        let bits = ArgSig::constant(ConstValue::Bit(vec![true, false]));
        assert!(matches!(list.bind(&[bits]), Err(SymbolError::ArgType { .. })));
    }

    #[test]
    fn test_generic_param_binds_anything() {
        let mut list = ParamList::new("id");
        let mut param = ParamSymbol::new("v", "T", 0);
        param.generic = true;
        list.push(param);
        assert!(list.bind(&[ArgSig::constant(ConstValue::Str("x".into()))]).is_ok());
    }

    #[test]
    fn test_defaults_must_trail() {
        let mut list = ParamList::new("h");
        list.push(ParamSymbol::new("a", "int", 0).with_default(ConstValue::Int(1)));
        list.push(ParamSymbol::new("b", "int", 0));
        assert!(matches!(
            list.verify_defaults(),
            Err(SymbolError::InvalidParams { ref param, .. }) if param == "b"
        ));
        assert!(list.overload_keys("h").is_err());
    }
}
