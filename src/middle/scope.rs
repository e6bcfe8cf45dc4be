//! Lexical scopes and the symbol table.
//!
//! Scopes form a stack: the scope at index `n` is the parent of the scope at
//! index `n + 1`, so the parent link is purely positional and never owns
//! anything. Each scope exclusively owns its symbols, and popping a scope
//! drops every symbol, token copy and parameter list it holds.

use hashbrown::HashMap;
use tracing::trace;

use crate::middle::{
    error::{CompileError, InternalFault},
    symbol::{Parameter, Symbol},
    ty::Type,
};

/// A single block or function scope
#[derive(Debug, Default)]
pub struct Scope {
    /// Symbols in declaration order
    symbols: Vec<Symbol>,
    /// Name to position in `symbols`
    index: HashMap<String, usize>,
    /// Name of the function whose parameters and body live in this scope.
    /// The function symbol itself lives in the parent scope.
    current_function: Option<String>,
    return_type: Option<Type>,
}

impl Scope {
    fn with_return_type(return_type: Option<Type>) -> Self {
        Self {
            return_type,
            ..Default::default()
        }
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.index.get(name).map(|&i| &self.symbols[i])
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut Symbol> {
        self.index.get(name).map(|&i| &mut self.symbols[i])
    }

    /// Symbols in the order they were declared
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn return_type(&self) -> Option<Type> {
        self.return_type
    }

    pub fn current_function(&self) -> Option<&str> {
        self.current_function.as_deref()
    }
}

#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live scopes
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// True when only the outermost scope is live
    pub fn is_global(&self) -> bool {
        self.scopes.len() == 1
    }

    /// Creates a new block or function scope, inheriting the return type of
    /// the current one. Returns the new depth.
    pub fn push_scope(&mut self) -> usize {
        let return_type = self.scopes.last().and_then(Scope::return_type);
        self.scopes.push(Scope::with_return_type(return_type));

        trace!(depth = self.scopes.len(), "pushed scope");

        self.scopes.len()
    }

    /// Destroys the current scope and everything in it. Popping an empty
    /// stack does nothing.
    pub fn pop_scope(&mut self) -> Option<Scope> {
        let scope = self.scopes.pop()?;

        trace!(
            depth = self.scopes.len(),
            symbols = scope.len(),
            "popped scope"
        );

        Some(scope)
    }

    /// Pops every live scope. Used to release the whole table when a fatal
    /// error ends the compilation. Returns how many scopes were dropped.
    pub fn drain(&mut self) -> usize {
        let mut popped = 0;

        while self.pop_scope().is_some() {
            popped += 1;
        }

        popped
    }

    fn top(&self) -> Result<&Scope, InternalFault> {
        self.scopes.last().ok_or(InternalFault::ScopeStackEmpty)
    }

    fn top_mut(&mut self) -> Result<&mut Scope, InternalFault> {
        self.scopes.last_mut().ok_or(InternalFault::ScopeStackEmpty)
    }

    /// Adds a symbol to the current scope. Names may shadow declarations of
    /// enclosing scopes but not of the current one.
    pub fn insert(&mut self, symbol: Symbol) -> Result<(), CompileError> {
        if let Some(existing) = self.lookup_local(&symbol.name) {
            return Err(CompileError::AlreadyDeclared {
                name: symbol.name,
                line: symbol.token.line,
                previous_line: existing.line(),
            });
        }

        let scope = self.top_mut()?;

        trace!(name = %symbol.name, kind = %symbol.kind, ty = %symbol.ty, "declared symbol");

        scope.index.insert(symbol.name.clone(), scope.symbols.len());
        scope.symbols.push(symbol);

        Ok(())
    }

    /// Traverses the scope stack from innermost to outermost looking for the
    /// nearest declaration of `name`
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Looks for a declaration only within the current (most nested) scope
    pub fn lookup_local(&self, name: &str) -> Option<&Symbol> {
        self.scopes.last().and_then(|scope| scope.get(name))
    }

    /// First phase of a function definition. The function symbol is added to
    /// the current scope and a new scope is opened for its parameters and
    /// body, carrying the declared return type.
    pub fn declare_function(&mut self, symbol: Symbol) -> Result<(), CompileError> {
        let name = symbol.name.clone();
        let return_type = symbol.ty;

        self.insert(symbol)?;
        self.push_scope();

        let scope = self.top_mut()?;
        scope.return_type = Some(return_type);
        scope.current_function = Some(name);

        Ok(())
    }

    /// Stores the ordered parameter list on the function whose scope is
    /// currently open. The list lives on the symbol, so it survives the
    /// parameter scope being popped.
    pub fn attach_parameters(&mut self, parameters: Vec<Parameter>) -> Result<(), InternalFault> {
        let depth = self.scopes.len();
        let name = self
            .top()?
            .current_function
            .clone()
            .ok_or(InternalFault::NoEnclosingFunction)?;

        let function = depth
            .checked_sub(2)
            .and_then(|parent| self.scopes[parent].get_mut(&name))
            .ok_or(InternalFault::NoEnclosingFunction)?;

        function.parameters = parameters;

        Ok(())
    }

    /// Return type expected by `return` statements in the current scope
    pub fn return_type(&self) -> Option<Type> {
        self.scopes.last().and_then(Scope::return_type)
    }

    /// Name of the function whose parameter scope is on top of the stack
    pub fn current_function(&self) -> Option<&str> {
        self.scopes.last().and_then(Scope::current_function)
    }

    /// The outermost scope, if any scope is live
    pub fn global_scope(&self) -> Option<&Scope> {
        self.scopes.first()
    }

    /// Variables of the outermost scope in declaration order
    pub fn global_variables(&self) -> impl Iterator<Item = &Symbol> {
        self.global_scope()
            .into_iter()
            .flat_map(Scope::symbols)
            .filter(|symbol| symbol.is_variable())
    }
}
