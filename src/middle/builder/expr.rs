use tracing::trace;

use crate::{
    frontend::{Token, TokenKind},
    middle::{
        ast::{BinaryOperator, Node, NodeKind, UnaryOperator},
        builder::Compiler,
        error::{CompileError, InternalFault, TypeMismatch},
        iloc::{Address, Concat, Instruction, InstructionList, Opcode},
        ty::Type,
    },
};

impl Compiler {
    /// Literals load their value into a fresh register. Decimals have no
    /// machine representation of their own, so a decimal literal loads its
    /// integer part, truncated toward zero.
    pub fn literal(&mut self, token: Token, ty: Type) -> Result<Node, CompileError> {
        let malformed = || InternalFault::MalformedLiteral {
            lexeme: token.lexeme.clone(),
            line: token.line,
        };

        let value = match token.kind {
            TokenKind::IntegerLiteral => token.lexeme.parse::<i32>().map_err(|_| malformed())?,
            TokenKind::DecimalLiteral => token
                .lexeme
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(|value| value.trunc() as i32)
                .ok_or_else(malformed)?,
            TokenKind::Identifier => return Err(malformed().into()),
        };
        let result = self.fresh_register();

        Ok(Node::new(NodeKind::Literal(token.lexeme), ty, token.line)
            .with_result(result)
            .with_code(InstructionList::single(Instruction::load_immediate(
                value, result,
            ))))
    }

    /// A variable read, `loadAI base, offset => r`
    pub fn identifier(&mut self, token: Token) -> Result<Node, CompileError> {
        let symbol = self.variable(&token)?;
        let (ty, location) = (symbol.ty, symbol.location());

        let result = self.fresh_register();
        let load = Instruction::load_offset(
            &Address {
                location,
                name: &token.lexeme,
            },
            result,
        );

        Ok(Node::new(NodeKind::Identifier(token.lexeme), ty, token.line)
            .with_result(result)
            .with_code(InstructionList::single(load)))
    }

    pub fn unary(&mut self, operator: UnaryOperator, mut child: Node) -> Result<Node, CompileError> {
        let mut node = Node::new(NodeKind::Unary(operator), child.ty, child.line);

        let code = match operator {
            UnaryOperator::Plus => {
                node.result = child.result;
                None
            }
            UnaryOperator::Minus => {
                let operand = child.value()?;
                let result = self.fresh_register();
                node.result = Some(result);

                Some(InstructionList::single(
                    Instruction::reverse_subtract_immediate(operand, 0, result),
                ))
            }
            UnaryOperator::Not => {
                let operand = child.value()?;
                let result = self.fresh_register();
                let zero = self.fresh_register();
                node.result = Some(result);

                Some(
                    [
                        Instruction::load_immediate(0, zero),
                        Instruction::binary(Opcode::CmpEQ, zero, operand, result),
                    ]
                    .into_iter()
                    .collect(),
                )
            }
        };

        if let Some(code) = code {
            node.code = Some(code);
            node.splice_code(child.take_code(), Concat::Prepend);
        }
        node.add_child(child, Concat::Append);

        Ok(node)
    }

    /// Both operands must have the same type. The emitted code evaluates the
    /// left operand, then the right operand, then applies the operator.
    pub fn binary(
        &mut self,
        operator: BinaryOperator,
        mut lhs: Node,
        mut rhs: Node,
    ) -> Result<Node, CompileError> {
        if lhs.ty != rhs.ty {
            return Err(CompileError::type_mismatch(
                lhs.line,
                TypeMismatch::BinaryOperation {
                    operator,
                    lhs: lhs.ty,
                    rhs: rhs.ty,
                },
            ));
        }

        let (left, right) = (lhs.value()?, rhs.value()?);
        let result = self.fresh_register();

        let mut node = Node::new(NodeKind::Binary(operator), lhs.ty, lhs.line)
            .with_result(result)
            .with_code(InstructionList::single(Instruction::binary(
                operator.opcode(),
                left,
                right,
                result,
            )));

        node.splice_code(rhs.take_code(), Concat::Prepend);
        node.splice_code(lhs.take_code(), Concat::Prepend);
        node.add_child(lhs, Concat::Append);
        node.add_child(rhs, Concat::Append);

        Ok(node)
    }

    /// Starts the temporary container that gathers call arguments. Further
    /// arguments are added with [`Node::add_child`] in append orientation.
    pub fn argument_list(&mut self, first: Node) -> Node {
        let mut list = Node::new(NodeKind::ArgumentList, first.ty, first.line);
        list.add_child(first, Concat::Append);
        list
    }

    /// Validates a call against the callee's parameter list and re-links the
    /// arguments into a chain where each argument's only child is the next
    /// one. The call itself emits no instruction and yields no value.
    pub fn call(&mut self, token: Token, arguments: Option<Node>) -> Result<Node, CompileError> {
        let callee = self.lookup(&token)?;

        if !callee.is_function() {
            return Err(CompileError::UsedAsFunction {
                name: token.lexeme,
                line: token.line,
            });
        }

        let ty = callee.ty;
        let mut container = arguments;
        let received = container.as_ref().map_or(0, |list| list.children.len());
        let expected = callee.parameters.len();

        if received < expected {
            return Err(CompileError::TooFewArgs {
                name: token.lexeme,
                line: token.line,
                expected,
                received,
            });
        }

        if received > expected {
            return Err(CompileError::TooManyArgs {
                name: token.lexeme,
                line: token.line,
                expected,
                received,
            });
        }

        let arguments = container.iter().flat_map(|list| &list.children);
        for (index, (parameter, argument)) in callee.parameters.iter().zip(arguments).enumerate() {
            if parameter.ty != argument.ty {
                return Err(CompileError::ArgTypeMismatch {
                    name: token.lexeme,
                    line: token.line,
                    index,
                    expected: parameter.ty,
                    received: argument.ty,
                });
            }
        }

        let mut node = Node::new(
            NodeKind::Call {
                callee: token.lexeme,
            },
            ty,
            token.line,
        );

        if let Some(list) = container.as_mut() {
            node.splice_code(list.take_code(), Concat::Append);

            let chain = list
                .detach_children()
                .into_iter()
                .rev()
                .fold(None, |next: Option<Node>, mut argument| {
                    if let Some(next) = next {
                        argument.add_child(next, Concat::Append);
                    }
                    Some(argument)
                });

            if let Some(chain) = chain {
                node.add_child(chain, Concat::Append);
            }
        }

        trace!(label = %node.kind, arguments = received, "built call");

        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        frontend::{Token, TokenKind},
        index::Index,
        middle::{
            ast::{BinaryOperator, Node, NodeKind, UnaryOperator},
            builder::Compiler,
            error::{CompileError, InternalFault, TypeMismatch},
            iloc::{Concat, RegisterId, pretty_print},
            symbol::Parameter,
            ty::Type,
        },
    };

    fn int(compiler: &mut Compiler, value: i32) -> Node {
        compiler.literal(Token::integer(value, 1), Type::Int).unwrap()
    }

    fn dump(node: &Node) -> String {
        pretty_print::dump(node.code.as_ref().unwrap())
    }

    #[test]
    fn decimal_literal_loads_its_integer_part() {
        let mut compiler = Compiler::new();
        let node = compiler.literal(Token::decimal("2.75", 1), Type::Decimal).unwrap();

        assert_eq!(node.ty, Type::Decimal);
        assert_eq!(node.result, Some(RegisterId::new(0)));
        assert_eq!(dump(&node), "loadI 2 => r0\n");
    }

    #[test]
    fn identifier_token_is_not_a_literal() {
        let mut compiler = Compiler::new();

        assert_eq!(
            compiler.literal(Token::identifier("x", 2), Type::Int),
            Err(CompileError::Internal(InternalFault::MalformedLiteral {
                lexeme: "x".into(),
                line: 2,
            }))
        );
        assert_eq!(compiler.register_count(), 0);
    }

    #[test]
    fn malformed_integer_literal_is_a_fault() {
        let mut compiler = Compiler::new();
        let token = Token::new("12x", TokenKind::IntegerLiteral, 3);

        assert_eq!(
            compiler.literal(token, Type::Int),
            Err(CompileError::Internal(InternalFault::MalformedLiteral {
                lexeme: "12x".into(),
                line: 3,
            }))
        );
    }

    #[test]
    fn global_read_carries_the_symbol_name() {
        let mut compiler = Compiler::new();
        compiler.declare_variable(Token::identifier("a", 1), Type::Int).unwrap();
        compiler.declare_variable(Token::identifier("b", 1), Type::Int).unwrap();

        let node = compiler.identifier(Token::identifier("b", 2)).unwrap();
        let load = node.code.as_ref().unwrap().first().unwrap();

        assert_eq!(dump(&node), "loadAI rbss, 4 => r0\n");
        assert_eq!(load.sources[1].global.as_deref(), Some("b"));
    }

    #[test]
    fn reading_a_function_is_an_error() {
        let mut compiler = Compiler::new();
        compiler.declare_function(Token::identifier("f", 1), Type::Int).unwrap();

        assert_eq!(
            compiler.identifier(Token::identifier("f", 4)),
            Err(CompileError::UsedAsVariable {
                name: "f".into(),
                line: 4,
            })
        );
    }

    #[test]
    fn undeclared_identifier() {
        let mut compiler = Compiler::new();
        let err = compiler.identifier(Token::identifier("nope", 9)).unwrap_err();

        assert_eq!(err.exit_code(), CompileError::EXIT_UNDECLARED);
        assert_eq!(err.line(), Some(9));
    }

    #[test]
    fn unary_operators() {
        let mut compiler = Compiler::new();

        let child = int(&mut compiler, 5);
        let plus = compiler.unary(UnaryOperator::Plus, child).unwrap();
        assert_eq!(plus.result, plus.left().unwrap().result);
        assert_eq!(dump(&plus), "loadI 5 => r0\n");

        let child = int(&mut compiler, 6);
        let minus = compiler.unary(UnaryOperator::Minus, child).unwrap();
        assert_eq!(dump(&minus), "loadI 6 => r1\nrsubI r1, 0 => r2\n");

        let child = int(&mut compiler, 7);
        let not = compiler.unary(UnaryOperator::Not, child).unwrap();
        assert_eq!(
            dump(&not),
            "loadI 7 => r3\nloadI 0 => r5\ncmp_EQ r5, r3 => r4\n"
        );
    }

    #[test]
    fn binary_type_mismatch() {
        let mut compiler = Compiler::new();
        let lhs = int(&mut compiler, 1);
        let rhs = compiler.literal(Token::decimal("2.0", 1), Type::Decimal).unwrap();

        assert_eq!(
            compiler.binary(BinaryOperator::Add, lhs, rhs),
            Err(CompileError::TypeMismatch {
                mismatch: TypeMismatch::BinaryOperation {
                    operator: BinaryOperator::Add,
                    lhs: Type::Int,
                    rhs: Type::Decimal,
                },
                line: 1,
            })
        );
    }

    #[test]
    fn decimal_operands_compute_like_integers() {
        let mut compiler = Compiler::new();
        let lhs = compiler.literal(Token::decimal("1.5", 2), Type::Decimal).unwrap();
        let rhs = compiler.literal(Token::decimal("2.5", 2), Type::Decimal).unwrap();

        let node = compiler.binary(BinaryOperator::Multiply, lhs, rhs).unwrap();

        assert_eq!(node.ty, Type::Decimal);
        assert_eq!(dump(&node), "loadI 1 => r0\nloadI 2 => r1\nmult r0, r1 => r2\n");
    }

    #[test]
    fn call_used_as_operand_is_a_fault() {
        let mut compiler = Compiler::new();
        compiler.declare_function(Token::identifier("f", 1), Type::Int).unwrap();
        compiler.define_function(None).unwrap();

        let call = compiler.call(Token::identifier("f", 2), None).unwrap();
        let one = int(&mut compiler, 1);

        assert_eq!(
            compiler.binary(BinaryOperator::Add, call, one),
            Err(CompileError::Internal(InternalFault::ValuelessOperand { line: 2 }))
        );
    }

    fn declare_pair(compiler: &mut Compiler) {
        compiler.declare_function(Token::identifier("pair", 1), Type::Int).unwrap();
        let a = compiler.declare_parameter(Token::identifier("a", 1), Type::Int).unwrap();
        let b = compiler
            .declare_parameter(Token::identifier("b", 1), Type::Decimal)
            .unwrap();
        assert_eq!(
            b,
            Parameter {
                name: "b".into(),
                ty: Type::Decimal,
            }
        );
        compiler.bind_parameters(vec![a, b]).unwrap();
        compiler.define_function(None).unwrap();
    }

    #[test]
    fn call_chains_arguments_and_keeps_their_code() {
        let mut compiler = Compiler::new();
        declare_pair(&mut compiler);

        let first = int(&mut compiler, 4);
        let second = compiler.literal(Token::decimal("0.5", 2), Type::Decimal).unwrap();
        let mut list = compiler.argument_list(first);
        list.add_child(second, Concat::Append);

        let call = compiler
            .call(Token::identifier("pair", 2), Some(list))
            .unwrap();

        assert_eq!(call.kind.to_string(), "call pair");
        assert_eq!(call.ty, Type::Int);
        assert!(call.result.is_none());
        assert_eq!(call.children.len(), 1);

        let first = call.left().unwrap();
        assert_eq!(first.kind, NodeKind::Literal("4".into()));
        assert_eq!(first.children.len(), 1);
        assert_eq!(first.left().unwrap().kind, NodeKind::Literal("0.5".into()));
        assert_eq!(dump(&call), "loadI 4 => r0\nloadI 0 => r1\n");
    }

    #[test]
    fn call_argument_count_and_types() {
        let mut compiler = Compiler::new();
        declare_pair(&mut compiler);

        let only = int(&mut compiler, 1);
        let list = compiler.argument_list(only);
        assert_eq!(
            compiler.call(Token::identifier("pair", 3), Some(list)),
            Err(CompileError::TooFewArgs {
                name: "pair".into(),
                line: 3,
                expected: 2,
                received: 1,
            })
        );

        let first = int(&mut compiler, 1);
        let mut list = compiler.argument_list(first);
        for _ in 0..2 {
            let extra = int(&mut compiler, 2);
            list.add_child(extra, Concat::Append);
        }
        assert_eq!(
            compiler
                .call(Token::identifier("pair", 4), Some(list))
                .unwrap_err()
                .exit_code(),
            CompileError::EXIT_EXCESS_ARGS
        );

        let first = int(&mut compiler, 1);
        let mut list = compiler.argument_list(first);
        let second = int(&mut compiler, 2);
        list.add_child(second, Concat::Append);
        assert_eq!(
            compiler.call(Token::identifier("pair", 5), Some(list)),
            Err(CompileError::ArgTypeMismatch {
                name: "pair".into(),
                line: 5,
                index: 1,
                expected: Type::Decimal,
                received: Type::Int,
            })
        );
    }

    #[test]
    fn calling_a_variable_is_an_error() {
        let mut compiler = Compiler::new();
        compiler.declare_variable(Token::identifier("x", 1), Type::Int).unwrap();

        assert_eq!(
            compiler.call(Token::identifier("x", 2), None).unwrap_err().exit_code(),
            CompileError::EXIT_VARIABLE
        );
    }
}
