//! Builds the typed tree and its ILOC code, one construction call per
//! grammar reduction.
//!
//! Each call type checks its inputs, allocates a fresh register for its
//! value when it has one, and splices the code of its children into its own
//! list in evaluation order. The first semantic fault is returned as an
//! error and ends the compilation.

use tracing::debug;

use crate::{
    frontend::Token,
    index::IndexCounter,
    middle::{
        ast::{Node, NodeKind},
        error::{CompileError, InternalFault},
        iloc::{Concat, Instruction, InstructionList, Label, LabelId, Program, RegisterId},
        scope::ScopeStack,
        symbol::{Parameter, Storage, StorageAllocator, Symbol},
        ty::Type,
    },
};

mod expr;
mod stmt;

/// The state of one compilation, threaded through every construction call
#[derive(Debug)]
pub struct Compiler {
    scopes: ScopeStack,
    storage: StorageAllocator,
    registers: IndexCounter<RegisterId>,
    labels: IndexCounter<LabelId>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    /// Creates a compiler with the global scope already open
    pub fn new() -> Self {
        let mut scopes = ScopeStack::new();
        scopes.push_scope();

        Self {
            scopes,
            storage: StorageAllocator::new(),
            registers: IndexCounter::new(),
            labels: IndexCounter::new(),
        }
    }

    pub fn scopes(&self) -> &ScopeStack {
        &self.scopes
    }

    /// Opens a block scope
    pub fn push_scope(&mut self) -> usize {
        self.scopes.push_scope()
    }

    /// Closes the innermost scope. Does nothing once every scope is closed.
    pub fn pop_scope(&mut self) {
        self.scopes.pop_scope();
    }

    /// Releases every live scope. Called when a fatal error ends the
    /// compilation, returns how many scopes were still open.
    pub fn abort(&mut self) -> usize {
        self.scopes.drain()
    }

    fn fresh_register(&mut self) -> RegisterId {
        self.registers.fresh()
    }

    fn fresh_label(&mut self) -> Label {
        Label::Generated(self.labels.fresh())
    }

    /// Number of virtual registers handed out so far
    pub fn register_count(&self) -> usize {
        self.registers.count()
    }

    /// Resolves a name that must denote a variable
    fn variable(&self, token: &Token) -> Result<&Symbol, CompileError> {
        let symbol = self.lookup(token)?;

        if symbol.is_function() {
            return Err(CompileError::UsedAsVariable {
                name: token.lexeme.clone(),
                line: token.line,
            });
        }

        Ok(symbol)
    }

    fn lookup(&self, token: &Token) -> Result<&Symbol, CompileError> {
        self.scopes
            .lookup(&token.lexeme)
            .ok_or_else(|| CompileError::Undeclared {
                name: token.lexeme.clone(),
                line: token.line,
            })
    }

    /// Inserts a variable into the current scope and gives it the next free
    /// offset of its storage class
    fn insert_variable(&mut self, token: &Token, ty: Type) -> Result<Symbol, CompileError> {
        if let Some(existing) = self.scopes.lookup_local(&token.lexeme) {
            return Err(CompileError::AlreadyDeclared {
                name: token.lexeme.clone(),
                line: token.line,
                previous_line: existing.line(),
            });
        }

        let storage = if self.scopes.is_global() {
            Storage::Global
        } else {
            Storage::Local
        };
        let location = self.storage.allocate(storage, ty);
        let symbol = Symbol::variable(token, ty, location);

        self.scopes.insert(symbol.clone())?;

        Ok(symbol)
    }

    /// Declares a variable without an initializer. Produces no code.
    pub fn declare_variable(&mut self, token: Token, ty: Type) -> Result<(), CompileError> {
        self.insert_variable(&token, ty).map(drop)
    }

    /// First phase of a function definition: declares the function in the
    /// current scope and opens the scope its parameters and body live in
    pub fn declare_function(&mut self, token: Token, ty: Type) -> Result<(), CompileError> {
        self.scopes.declare_function(Symbol::function(&token, ty))
    }

    /// Declares a parameter as a local of the function scope
    pub fn declare_parameter(&mut self, token: Token, ty: Type) -> Result<Parameter, CompileError> {
        let symbol = self.insert_variable(&token, ty)?;

        Ok(Parameter {
            name: symbol.name,
            ty,
        })
    }

    /// Stores the parameter list on the function symbol. Done before the body
    /// is built so the body can call the function recursively.
    pub fn bind_parameters(&mut self, parameters: Vec<Parameter>) -> Result<(), CompileError> {
        Ok(self.scopes.attach_parameters(parameters)?)
    }

    /// Second phase of a function definition: closes the function scope and
    /// labels the body's code with the function name
    pub fn define_function(&mut self, body: Option<Node>) -> Result<Node, CompileError> {
        let name = self
            .scopes
            .current_function()
            .ok_or(InternalFault::NoEnclosingFunction)?
            .to_owned();

        self.scopes.pop_scope();

        let function = self
            .scopes
            .lookup(&name)
            .ok_or(InternalFault::NoEnclosingFunction)?;
        let (ty, line) = (function.ty, function.line());

        debug!(%name, parameters = function.parameters.len(), "defined function");

        let entry = Instruction::nop().with_label(Label::Function(name.clone()));
        let mut node = Node::new(NodeKind::Function { name }, ty, line)
            .with_code(InstructionList::single(entry));

        if let Some(body) = body {
            node.add_child(body, Concat::Append);
        }

        Ok(node)
    }

    /// Chains `next` after `first` in a statement or function list
    pub fn sequence(&mut self, mut first: Node, next: Node) -> Node {
        first.add_child(next, Concat::Append);
        first
    }

    /// Claims the root's code and collects the global data it refers to. A
    /// program without functions has no root.
    pub fn program(&self, root: Option<Node>) -> Program {
        Program {
            code: root
                .and_then(|mut root| root.take_code())
                .unwrap_or_default(),
            globals: self
                .scopes
                .global_variables()
                .map(|symbol| symbol.name.clone())
                .collect(),
        }
    }
}
