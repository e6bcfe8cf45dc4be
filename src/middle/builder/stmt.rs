use crate::{
    frontend::Token,
    middle::{
        ast::{Node, NodeKind},
        builder::Compiler,
        error::{CompileError, TypeMismatch},
        iloc::{Address, Concat, Instruction, InstructionList},
        symbol::Location,
        ty::Type,
    },
};

impl Compiler {
    /// `name = expression`. The node's value is the stored register, so an
    /// assignment can itself be used as an operand.
    pub fn assignment(&mut self, token: Token, expression: Node) -> Result<Node, CompileError> {
        let symbol = self.variable(&token)?;
        let (ty, location) = (symbol.ty, symbol.location());

        if ty != expression.ty {
            return Err(CompileError::type_mismatch(
                token.line,
                TypeMismatch::Assignment {
                    name: token.lexeme,
                    variable: ty,
                    expression: expression.ty,
                },
            ));
        }

        store(NodeKind::Assignment, token, ty, location, expression)
    }

    /// A declaration with an initializer, `type name with expression`
    pub fn declare_initialized_variable(
        &mut self,
        token: Token,
        ty: Type,
        initializer: Node,
    ) -> Result<Node, CompileError> {
        let symbol = self.insert_variable(&token, ty)?;

        if ty != initializer.ty {
            return Err(CompileError::type_mismatch(
                token.line,
                TypeMismatch::Initialization {
                    name: token.lexeme,
                    variable: ty,
                    expression: initializer.ty,
                },
            ));
        }

        store(
            NodeKind::Initialization,
            token,
            ty,
            symbol.location(),
            initializer,
        )
    }

    /// `return expression`. The expression must have the type written at the
    /// return site, and that type must be the enclosing function's.
    pub fn return_statement(&mut self, mut expression: Node, ty: Type) -> Result<Node, CompileError> {
        if expression.ty != ty {
            return Err(CompileError::type_mismatch(
                expression.line,
                TypeMismatch::ReturnExpression {
                    expression: expression.ty,
                    declared: ty,
                },
            ));
        }

        let function = self.scopes.return_type();
        if function != Some(ty) {
            return Err(CompileError::type_mismatch(
                expression.line,
                TypeMismatch::ReturnFunction {
                    declared: ty,
                    function,
                },
            ));
        }

        let mut node = Node::new(NodeKind::Return, expression.ty, expression.line)
            .with_code(InstructionList::single(Instruction::ret(expression.result)));

        node.splice_code(expression.take_code(), Concat::Prepend);
        node.add_child(expression, Concat::Append);

        Ok(node)
    }

    /// `if (test) then else otherwise`. Either branch may be absent, in which
    /// case only its labels are emitted.
    ///
    /// ```text
    ///        test
    ///        cbr t -> Lthen, Lelse
    /// Lthen: nop
    ///        then
    ///        jumpI -> Lend
    /// Lelse: nop
    ///        otherwise
    /// Lend:  nop
    /// ```
    pub fn conditional(
        &mut self,
        mut test: Node,
        then: Option<Node>,
        otherwise: Option<Node>,
    ) -> Result<Node, CompileError> {
        if let (Some(then), Some(otherwise)) = (&then, &otherwise) {
            if then.ty != otherwise.ty {
                return Err(CompileError::type_mismatch(
                    test.line,
                    TypeMismatch::IfElse {
                        positive: then.ty,
                        negative: otherwise.ty,
                    },
                ));
            }
        }

        let condition = test.value()?;
        let then_label = self.fresh_label();
        let else_label = self.fresh_label();
        let end_label = self.fresh_label();

        let mut node = Node::new(NodeKind::If, test.ty, test.line).with_code(
            InstructionList::single(Instruction::branch(
                condition,
                then_label.clone(),
                else_label.clone(),
            )),
        );
        node.splice_code(test.take_code(), Concat::Prepend);
        node.add_child(test, Concat::Append);

        add_branch(&mut node, then, |code| {
            code.push_front(Instruction::nop().with_label(then_label));
            code.push_back(Instruction::jump(end_label.clone()));
        });
        add_branch(&mut node, otherwise, |code| {
            code.push_front(Instruction::nop().with_label(else_label));
            code.push_back(Instruction::nop().with_label(end_label));
        });

        Ok(node)
    }

    /// `while (test) body`
    ///
    /// ```text
    /// Ltest: nop
    ///        test
    ///        cbr t -> Lbody, Lend
    /// Lbody: nop
    ///        body
    ///        jumpI -> Ltest
    /// Lend:  nop
    /// ```
    pub fn while_loop(&mut self, mut test: Node, body: Option<Node>) -> Result<Node, CompileError> {
        let condition = test.value()?;
        let test_label = self.fresh_label();
        let body_label = self.fresh_label();
        let end_label = self.fresh_label();

        let mut test_code = test.take_code().unwrap_or_default();
        test_code.push_front(Instruction::nop().with_label(test_label.clone()));

        let mut node = Node::new(NodeKind::While, test.ty, test.line).with_code(
            InstructionList::single(Instruction::branch(
                condition,
                body_label.clone(),
                end_label.clone(),
            )),
        );
        node.splice_code(Some(test_code), Concat::Prepend);
        node.add_child(test, Concat::Append);

        add_branch(&mut node, body, |code| {
            code.push_front(Instruction::nop().with_label(body_label));
            code.push_back(Instruction::jump(test_label));
            code.push_back(Instruction::nop().with_label(end_label));
        });

        Ok(node)
    }
}

/// Shared code of assignments and initializations: `storeAI value =>
/// base, offset`, preceded by the code computing the value
fn store(
    kind: NodeKind,
    token: Token,
    ty: Type,
    location: Location,
    mut value: Node,
) -> Result<Node, CompileError> {
    let source = value.value()?;
    let instruction = Instruction::store_offset(
        source,
        &Address {
            location,
            name: &token.lexeme,
        },
    );

    let target = Node::new(NodeKind::Identifier(token.lexeme), ty, token.line);
    let mut node = Node::new(kind, ty, token.line)
        .with_result(source)
        .with_code(InstructionList::single(instruction));

    node.add_child(target, Concat::Append);
    node.splice_code(value.take_code(), Concat::Prepend);
    node.add_child(value, Concat::Append);

    Ok(node)
}

/// Wraps a branch's code with its labels and appends it to `node`. An
/// absent branch contributes a list holding only the labels.
fn add_branch(node: &mut Node, branch: Option<Node>, wrap: impl FnOnce(&mut InstructionList)) {
    match branch {
        Some(mut branch) => {
            let mut code = branch.take_code().unwrap_or_default();
            wrap(&mut code);
            branch.code = Some(code);
            node.add_child(branch, Concat::Append);
        }
        None => {
            let mut code = InstructionList::new();
            wrap(&mut code);
            node.splice_code(Some(code), Concat::Append);
        }
    }
}
