use crate::{frontend::Token, middle::ty::Type};

/// A named declaration stored in a scope
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub ty: Type,
    /// Copy of the declaring token. Owned so it outlives the grammar action
    /// that produced it.
    pub token: Token,
    pub storage: Storage,
    /// Byte offset within the storage class. Meaningless for functions.
    pub offset: u32,
    /// Ordered parameter list. Always empty unless `kind` is `Function`.
    pub parameters: Vec<Parameter>,
}

impl Symbol {
    pub fn variable(token: &Token, ty: Type, location: Location) -> Self {
        Self {
            name: token.lexeme.clone(),
            kind: SymbolKind::Variable,
            ty,
            token: token.clone(),
            storage: location.storage,
            offset: location.offset,
            parameters: Vec::new(),
        }
    }

    pub fn function(token: &Token, return_type: Type) -> Self {
        Self {
            name: token.lexeme.clone(),
            kind: SymbolKind::Function,
            ty: return_type,
            token: token.clone(),
            storage: Storage::Global,
            offset: 0,
            parameters: Vec::new(),
        }
    }

    /// Line of the declaring token
    pub fn line(&self) -> u32 {
        self.token.line
    }

    pub fn is_function(&self) -> bool {
        self.kind == SymbolKind::Function
    }

    pub fn is_variable(&self) -> bool {
        self.kind == SymbolKind::Variable
    }

    pub fn location(&self) -> Location {
        Location {
            storage: self.storage,
            offset: self.offset,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum SymbolKind {
    Variable,
    Function,
    Literal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Storage {
    /// Lives in the data segment, addressed from `rbss`
    Global,
    /// Lives in the stack frame, addressed from `rfp`
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub ty: Type,
}

/// Where a variable lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub storage: Storage,
    pub offset: u32,
}

/// Assigns word-aligned offsets per storage class in declaration order.
/// Offsets are never handed out twice within one compilation, so locals of
/// different functions never share a slot.
#[derive(Debug, Default, Clone)]
pub struct StorageAllocator {
    global: u32,
    local: u32,
}

impl StorageAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, storage: Storage, ty: Type) -> Location {
        let counter = match storage {
            Storage::Global => &mut self.global,
            Storage::Local => &mut self.local,
        };

        let offset = *counter;
        *counter += ty.size();

        Location { storage, offset }
    }

    /// Bytes handed out so far in a storage class
    pub fn size(&self, storage: Storage) -> u32 {
        match storage {
            Storage::Global => self.global,
            Storage::Local => self.local,
        }
    }
}
