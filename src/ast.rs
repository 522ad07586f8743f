use crate::value::Value;

/// One node of a parsed template.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text, emitted verbatim.
    Text(String),
    /// An interpolation: `{{ expr|filter(..):, }}`.
    Output(Expr),
    For(ForLoop),
    If(IfChain),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForLoop {
    pub target: LoopTarget,
    pub iterable: Expr,
    pub body: Vec<Node>,
    /// Rendered instead of `body` when the iterable yields nothing.
    pub empty_body: Option<Vec<Node>>,
}

/// Names bound by each iteration of a `for` loop.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopTarget {
    Single(String),
    /// `for key, value in ...`: each element is unpacked positionally.
    Unpack(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfChain {
    /// `if` followed by every `elif`, in source order.
    pub branches: Vec<(Expr, Vec<Node>)>,
    pub else_body: Option<Vec<Node>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Path(Path),
    Filter {
        target: Box<Expr>,
        call: FilterCall,
    },
    Compare {
        op: CmpOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Contains {
        needle: Box<Expr>,
        haystack: Box<Expr>,
        negated: bool,
    },
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

/// A variable reference such as `user.roles[0]` or `params.items()`.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub root: String,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// `.name` or `['name']`; numeric names also index sequences.
    Key(String),
    /// `[3]`, `[-1]` or `.3`.
    Index(i64),
    Method(Method),
}

/// Mapping views usable as `for` iterables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Items,
    Keys,
    Values,
}

impl Method {
    pub fn from_name(name: &str) -> Option<Method> {
        match name {
            "items" => Some(Method::Items),
            "keys" => Some(Method::Keys),
            "values" => Some(Method::Values),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Items => "items()",
            Method::Keys => "keys()",
            Method::Values => "values()",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterCall {
    pub name: String,
    pub args: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

impl Path {
    /// Dotted text of the root plus the first `len` segments, as used in
    /// `Undefined` errors.
    pub fn display_prefix(&self, len: usize) -> String {
        let mut out = self.root.clone();
        for segment in self.segments.iter().take(len) {
            match segment {
                Segment::Key(key) => {
                    out.push('.');
                    out.push_str(key);
                }
                Segment::Index(index) => out.push_str(&format!("[{index}]")),
                Segment::Method(method) => {
                    out.push('.');
                    out.push_str(method.as_str());
                }
            }
        }
        out
    }
}
