//! The typed syntax tree. Every node carries the code that computes it until
//! an ancestor splices that code into its own list.

use crate::middle::{
    error::InternalFault,
    iloc::{Concat, InstructionList, Opcode, RegisterId},
    ty::Type,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub ty: Type,
    pub line: u32,
    pub children: Vec<Node>,
    /// Virtual register holding the node's value. `None` for nodes that
    /// yield nothing, such as calls.
    pub result: Option<RegisterId>,
    /// Code not yet claimed by an ancestor. `None` once spliced away.
    pub code: Option<InstructionList>,
}

impl Node {
    pub fn new(kind: NodeKind, ty: Type, line: u32) -> Self {
        Self {
            kind,
            ty,
            line,
            children: Vec::new(),
            result: None,
            code: None,
        }
    }

    #[must_use]
    pub fn with_result(mut self, result: RegisterId) -> Self {
        self.result = Some(result);
        self
    }

    #[must_use]
    pub fn with_code(mut self, code: InstructionList) -> Self {
        self.code = Some(code);
        self
    }

    /// Splices `code` into this node's list, creating the list if the node
    /// has none yet
    pub fn splice_code(&mut self, code: Option<InstructionList>, concat: Concat) {
        if let Some(code) = code {
            self.code
                .get_or_insert_with(InstructionList::new)
                .splice(code, concat);
        }
    }

    /// Adopts `child` as the last child, moving its code into this node's
    /// list in the given orientation
    pub fn add_child(&mut self, mut child: Node, concat: Concat) {
        self.splice_code(child.take_code(), concat);
        self.children.push(child);
    }

    /// Claims this node's code, leaving it in the consumed state
    pub fn take_code(&mut self) -> Option<InstructionList> {
        self.code.take()
    }

    /// Removes and returns every child, leaving this node childless
    pub fn detach_children(&mut self) -> Vec<Node> {
        std::mem::take(&mut self.children)
    }

    pub fn left(&self) -> Option<&Node> {
        self.children.first()
    }

    pub fn right(&self) -> Option<&Node> {
        self.children.get(1)
    }

    /// The register an enclosing operation reads this node's value from
    pub fn value(&self) -> Result<RegisterId, InternalFault> {
        self.result
            .ok_or(InternalFault::ValuelessOperand { line: self.line })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Literal(String),
    Identifier(String),
    Unary(UnaryOperator),
    Binary(BinaryOperator),
    Assignment,
    Initialization,
    /// Temporary container gathering call arguments before the call node
    /// re-links them
    ArgumentList,
    Call { callee: String },
    If,
    While,
    Return,
    Function { name: String },
}

impl core::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKind::Literal(lexeme) | NodeKind::Identifier(lexeme) => write!(f, "{lexeme}"),
            NodeKind::Unary(operator) => write!(f, "{operator}"),
            NodeKind::Binary(operator) => write!(f, "{operator}"),
            NodeKind::Assignment => write!(f, ":="),
            NodeKind::Initialization => write!(f, "with"),
            NodeKind::ArgumentList => write!(f, "arguments"),
            NodeKind::Call { callee } => write!(f, "call {callee}"),
            NodeKind::If => write!(f, "if"),
            NodeKind::While => write!(f, "while"),
            NodeKind::Return => write!(f, "return"),
            NodeKind::Function { name } => write!(f, "{name}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
pub enum BinaryOperator {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Subtract,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "<")]
    LessThan,
    #[strum(serialize = ">")]
    GreaterThan,
    #[strum(serialize = "<=")]
    LessThanOrEqualTo,
    #[strum(serialize = ">=")]
    GreaterThanOrEqualTo,
    #[strum(serialize = "==")]
    Equals,
    #[strum(serialize = "!=")]
    NotEquals,
    #[strum(serialize = "&")]
    And,
    #[strum(serialize = "|")]
    Or,
}

impl BinaryOperator {
    pub fn opcode(self) -> Opcode {
        match self {
            BinaryOperator::Add => Opcode::Add,
            BinaryOperator::Subtract => Opcode::Sub,
            BinaryOperator::Multiply => Opcode::Mult,
            BinaryOperator::Divide => Opcode::Div,
            BinaryOperator::LessThan => Opcode::CmpLT,
            BinaryOperator::GreaterThan => Opcode::CmpGT,
            BinaryOperator::LessThanOrEqualTo => Opcode::CmpLE,
            BinaryOperator::GreaterThanOrEqualTo => Opcode::CmpGE,
            BinaryOperator::Equals => Opcode::CmpEQ,
            BinaryOperator::NotEquals => Opcode::CmpNE,
            BinaryOperator::And => Opcode::And,
            BinaryOperator::Or => Opcode::Or,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
pub enum UnaryOperator {
    #[strum(serialize = "+")]
    Plus,
    #[strum(serialize = "-")]
    Minus,
    #[strum(serialize = "!")]
    Not,
}
