use std::collections::HashMap;
use std::sync::OnceLock;
use crate::sema::tree::StructKey;
use crate::util::map_join;

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Ty {
    Void,
    Bool,
    Int { bits: u8 },
    String,
    Array(Box<Ty>),
    Struct { key: StructKey, name: String, args: Vec<Ty> },
    Function { params: Vec<Ty>, ret: Box<Ty> },
    Ptr(Box<Ty>),
    Generic { name: String, id: u32 }
}

impl Ty {
    // Stable text form; also the monomorphization key material.
    pub fn render(&self) -> String {
        match self {
            Ty::Void => "Void".into(),
            Ty::Bool => "Bool".into(),
            Ty::Int { bits } => format!("Int{bits}"),
            Ty::String => "String".into(),
            Ty::Array(elem) => format!("Array<{}>", elem.render()),
            Ty::Struct { name, args, .. } => {
                if args.is_empty() {
                    name.clone()
                } else {
                    format!("{}<{}>", name, map_join(args, Ty::render))
                }
            },
            Ty::Function { params, ret } => {
                format!("({}) -> {}", map_join(params, Ty::render), ret.render())
            },
            Ty::Ptr(inner) => format!("Ptr<{}>", inner.render()),
            Ty::Generic { name, .. } => name.clone()
        }
    }

    pub fn subs(&self, map: &HashMap<u32, Ty>) -> Ty {
        match self {
            Ty::Void | Ty::Bool | Ty::Int { .. } | Ty::String => self.clone(),
            Ty::Generic { id, .. } if map.contains_key(id) => map[id].clone(),
            Ty::Generic { .. } => self.clone(),
            Ty::Array(elem) => Ty::Array(Box::new(elem.subs(map))),
            Ty::Struct { key, name, args } => {
                Ty::Struct { key: *key, name: name.clone(), args: args.iter().map(|t| t.subs(map)).collect() }
            },
            Ty::Function { params, ret } => {
                Ty::Function { params: params.iter().map(|t| t.subs(map)).collect(), ret: Box::new(ret.subs(map)) }
            },
            Ty::Ptr(inner) => Ty::Ptr(Box::new(inner.subs(map)))
        }
    }

    pub fn contains(&self, other: &Ty) -> bool {
        if self == other {
            return true;
        }
        match self {
            Ty::Array(elem) => elem.contains(other),
            Ty::Ptr(inner) => inner.contains(other),
            Ty::Struct { args, .. } => args.iter().any(|t| t.contains(other)),
            Ty::Function { params, ret } => {
                params.iter().any(|t| t.contains(other)) || ret.contains(other)
            },
            _ => false
        }
    }

    pub fn contains_generic(&self, generic_id: u32) -> bool {
        match self {
            Ty::Generic { id, .. } => *id == generic_id,
            Ty::Array(elem) => elem.contains_generic(generic_id),
            Ty::Ptr(inner) => inner.contains_generic(generic_id),
            Ty::Struct { args, .. } => args.iter().any(|t| t.contains_generic(generic_id)),
            Ty::Function { params, ret } => {
                params.iter().any(|t| t.contains_generic(generic_id)) || ret.contains_generic(generic_id)
            },
            _ => false
        }
    }

    pub fn is_concrete(&self) -> bool {
        match self {
            Ty::Void | Ty::Bool | Ty::Int { .. } | Ty::String => true,
            Ty::Generic { .. } => false,
            Ty::Array(elem) => elem.is_concrete(),
            Ty::Ptr(inner) => inner.is_concrete(),
            Ty::Struct { args, .. } => args.iter().all(Ty::is_concrete),
            Ty::Function { params, ret } => params.iter().all(Ty::is_concrete) && ret.is_concrete()
        }
    }

    pub fn builtin(name: &str) -> Option<&'static Ty> {
        static BUILTINS: OnceLock<HashMap<&'static str, Ty>> = OnceLock::new();
        let builtins = BUILTINS.get_or_init(|| {
            HashMap::from([
                ("Void", Ty::Void),
                ("Bool", Ty::Bool),
                ("Int8", Ty::Int { bits: 8 }),
                ("Int16", Ty::Int { bits: 16 }),
                ("Int32", Ty::Int { bits: 32 }),
                ("Int64", Ty::Int { bits: 64 }),
                ("String", Ty::String)
            ])
        });
        builtins.get(name)
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;
    use crate::sema::types::Ty;

    fn generic(name: &str, id: u32) -> Ty {
        Ty::Generic { name: name.into(), id }
    }

    #[test]
    fn test_render() {
        assert_eq!(Ty::Int { bits: 32 }.render(), "Int32");
        assert_eq!(Ty::Array(Box::new(Ty::String)).render(), "Array<String>");
        let f = Ty::Function { params: vec![Ty::Int { bits: 32 }, Ty::Bool], ret: Box::new(Ty::Void) };
        assert_eq!(f.render(), "(Int32, Bool) -> Void");
        assert_eq!(Ty::Ptr(Box::new(Ty::Int { bits: 8 })).render(), "Ptr<Int8>");
    }

    #[test]
    fn test_builtins() {
        assert_eq!(Ty::builtin("Int8"), Some(&Ty::Int { bits: 8 }));
        assert_eq!(Ty::builtin("String"), Some(&Ty::String));
        assert_eq!(Ty::builtin("Float"), None);
    }

    #[test]
    fn test_subs() {
        let map = HashMap::from([(0, Ty::Int { bits: 32 })]);
        let arr = Ty::Array(Box::new(generic("T", 0)));
        assert_eq!(arr.subs(&map), Ty::Array(Box::new(Ty::Int { bits: 32 })));
        let unrelated = Ty::Array(Box::new(generic("U", 1)));
        assert_eq!(unrelated.subs(&map), unrelated);
    }

    #[test]
    fn test_contains() {
        let inner = Ty::Int { bits: 32 };
        let arr = Ty::Array(Box::new(inner.clone()));
        assert!(arr.contains(&inner));
        assert!(arr.contains(&arr));
        assert!(!inner.contains(&arr));
    }

    #[test]
    fn test_is_concrete() {
        assert!(Ty::Array(Box::new(Ty::Bool)).is_concrete());
        assert!(!Ty::Array(Box::new(generic("T", 3))).is_concrete());
    }
}
