use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamShape {
    Str,
    Bool,
    Int,
    Float,
    Enum(String),
    Struct(String),
    Reference(String),
}

impl ParamShape {
    /// Value used for every parameter after the scene identifier. Discovery
    /// has no way to know what the host intended, so each gets its zero.
    pub fn default_argument(&self) -> ArgValue {
        match self {
            ParamShape::Str => ArgValue::Str(String::new()),
            ParamShape::Bool => ArgValue::Bool(false),
            ParamShape::Int => ArgValue::Int(0),
            ParamShape::Float => ArgValue::Float(0.0),
            ParamShape::Enum(name) | ParamShape::Struct(name) => ArgValue::Zeroed(name.clone()),
            ParamShape::Reference(_) => ArgValue::Null,
        }
    }
}

impl fmt::Display for ParamShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamShape::Str => f.write_str("String"),
            ParamShape::Bool => f.write_str("Boolean"),
            ParamShape::Int => f.write_str("Int32"),
            ParamShape::Float => f.write_str("Single"),
            ParamShape::Enum(name) | ParamShape::Struct(name) | ParamShape::Reference(name) => {
                f.write_str(name)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDesc {
    pub name: String,
    pub params: Vec<ParamShape>,
    pub is_static: bool,
}

impl MethodDesc {
    pub fn new(name: impl Into<String>, params: Vec<ParamShape>, is_static: bool) -> Self {
        Self {
            name: name.into(),
            params,
            is_static,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Property,
    Field,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticMember {
    pub name: String,
    pub kind: MemberKind,
    pub value_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HostType {
    pub name: String,
    pub methods: Vec<MethodDesc>,
    pub static_members: Vec<StaticMember>,
}

impl HostType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_method(mut self, method: MethodDesc) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_static_member(
        mut self,
        name: impl Into<String>,
        kind: MemberKind,
        value_type: impl Into<String>,
    ) -> Self {
        self.static_members.push(StaticMember {
            name: name.into(),
            kind,
            value_type: value_type.into(),
        });
        self
    }

    /// Compiler-generated types carry names like `<Module>` or `<>c`.
    pub fn is_generated(&self) -> bool {
        self.name.starts_with('<')
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Str(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Zero value of the named enum or struct type.
    Zeroed(String),
    Null,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallTarget {
    pub type_name: String,
    pub method_name: String,
    pub params: Vec<ParamShape>,
    pub instance: Option<InstanceId>,
}

impl fmt::Display for CallTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.type_name, self.method_name)
    }
}
