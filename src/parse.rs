// SPDX: CC0-1.0

// implementation of shunting yard algorithm by dijkstra (see https://en.wikipedia.org/wiki/Shunting_yard_algorithm)

use crate::{
    eval::{
        Arity, Associativity, Fun, Ident, Idents, Operation, OperationTyp, OperatorTyp, Program,
        Value,
    },
    lex::{LexErr, LexErrTyp, Lexer, SubStr, Tok, TokTyp},
    Number,
};
use core::num::ParseFloatError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseErrTyp {
    #[error("{0}")]
    LexErr(LexErrTyp),
    #[error("invalid number: {0}")]
    ParseNum(ParseFloatError),
    #[error("mismatched parentheses")]
    ParenMismatch,
    #[error("formula is empty")]
    Empty,
    #[error("expected a value")]
    MissingOperand,
    #[error("expected an operator")]
    MissingOperator,
    #[error("function '{name}' must be called with parentheses")]
    ExpectedCall { name: String },
    #[error("function '{name}' takes {arity}, but {found} were given")]
    Arity {
        name: String,
        arity: Arity,
        found: usize,
    },
    #[error("',' outside of a function call")]
    UnexpectedComma,
}

#[derive(Debug, Error)]
#[error("{typ}")]
pub struct ParseErr {
    pub typ: ParseErrTyp,
    pub loc: SubStr,
}

impl From<LexErr> for ParseErr {
    fn from(err: LexErr) -> Self {
        Self {
            typ: ParseErrTyp::LexErr(err.typ),
            loc: err.loc,
        }
    }
}

#[derive(Clone, Debug)]
enum ShuntOpTyp {
    Operator(OperatorTyp),
    Call(Fun),
    OpenParen,
}

#[derive(Clone, Debug)]
struct ShuntOp {
    typ: ShuntOpTyp,
    loc: SubStr,
}

// one per open parenthesis
#[derive(Debug)]
struct Group {
    call: Option<(SubStr, Fun)>,
    commas: usize,
}

/// Operators resolve through the environment by name so it can swap in its
/// own arithmetic.
fn operator_fun(op: OperatorTyp, idents: &Idents) -> Fun {
    match idents.get(&op.name().into()) {
        Some(Ident::Fun(fun)) => *fun,
        _ => op.fun(),
    }
}

fn emit(out: &mut Vec<Operation>, op: ShuntOp, idents: &Idents) -> Result<(), ParseErr> {
    let typ = match op.typ {
        ShuntOpTyp::Operator(typ) => {
            let fun = operator_fun(typ, idents);
            OperationTyp::Call {
                name: typ.name().into(),
                fun,
                argc: fun.arity.min,
            }
        }
        // calls are emitted when their parenthesis closes
        ShuntOpTyp::Call(_) => {
            return Err(ParseErr {
                typ: ParseErrTyp::ParenMismatch,
                loc: op.loc,
            })
        }
        ShuntOpTyp::OpenParen => {
            return Err(ParseErr {
                typ: ParseErrTyp::ParenMismatch,
                loc: op.loc,
            })
        }
    };
    out.push(Operation { typ, loc: op.loc });
    Ok(())
}

/// Pops operators into the output until an open parenthesis (left on the
/// stack) or the bottom.
fn unwind_group(
    out: &mut Vec<Operation>,
    ops: &mut Vec<ShuntOp>,
    idents: &Idents,
) -> Result<(), ParseErr> {
    while let Some(op) = ops.pop() {
        if let ShuntOpTyp::OpenParen = op.typ {
            ops.push(op);
            break;
        }
        emit(out, op, idents)?;
    }
    Ok(())
}

pub fn parse(lex: Lexer<'_>, idents: &Idents) -> Result<Program, ParseErr> {
    let mut out: Vec<Operation> = Vec::new(); // output
    let mut ops: Vec<ShuntOp> = Vec::new(); // operator stack
    let mut groups: Vec<Group> = Vec::new();

    // true where a value (or prefix operator) may appear
    let mut expect_operand = true;
    let mut prev_open = false;
    let mut end = None;

    let mut lex = lex.peekable();
    while let Some(tok) = lex.next() {
        let tok = tok?;
        end = Some(SubStr::end(tok.loc.src()));
        let operand_here = |tok: &Tok| {
            if expect_operand {
                Ok(())
            } else {
                Err(ParseErr {
                    typ: ParseErrTyp::MissingOperator,
                    loc: tok.loc.clone(),
                })
            }
        };
        let was_open = core::mem::replace(&mut prev_open, false);

        match tok.typ {
            TokTyp::Number => {
                operand_here(&tok)?;
                let num: Number = tok.loc.get().parse().map_err(|err| ParseErr {
                    typ: ParseErrTyp::ParseNum(err),
                    loc: tok.loc.clone(),
                })?;
                out.push(Operation {
                    typ: OperationTyp::Val(Value::Real(num)),
                    loc: tok.loc,
                });
                expect_operand = false;
            }

            TokTyp::Ident => {
                operand_here(&tok)?;
                let typ = match idents.get(&tok.loc.clone().into()) {
                    Some(Ident::Fun(fun)) => {
                        // a lex error here is reported on the next iteration
                        let called = matches!(
                            lex.peek(),
                            Some(Ok(Tok {
                                typ: TokTyp::OpenParen,
                                ..
                            })) | Some(Err(_))
                        );
                        if !called {
                            return Err(ParseErr {
                                typ: ParseErrTyp::ExpectedCall {
                                    name: tok.loc.get().to_string(),
                                },
                                loc: tok.loc,
                            });
                        }
                        ops.push(ShuntOp {
                            typ: ShuntOpTyp::Call(*fun),
                            loc: tok.loc,
                        });
                        continue;
                    }
                    Some(Ident::Const(val)) => OperationTyp::Val(*val),
                    Some(Ident::Arg(idx)) => OperationTyp::Arg(*idx),
                    // left for evaluation to report
                    None => OperationTyp::Ident,
                };
                out.push(Operation { typ, loc: tok.loc });
                expect_operand = false;
            }

            TokTyp::Op(o1) if expect_operand => match o1 {
                // prefix operators bind to what follows, so nothing is popped
                OperatorTyp::Sub | OperatorTyp::Neg => ops.push(ShuntOp {
                    typ: ShuntOpTyp::Operator(OperatorTyp::Neg),
                    loc: tok.loc,
                }),
                OperatorTyp::Add => {}
                _ => {
                    return Err(ParseErr {
                        typ: ParseErrTyp::MissingOperand,
                        loc: tok.loc,
                    })
                }
            },

            TokTyp::Op(o1) => {
                while let Some(ShuntOp {
                    typ: ShuntOpTyp::Operator(o2),
                    ..
                }) = ops.last()
                {
                    if (o2.precedence() > o1.precedence())
                        || ((o1.precedence() == o2.precedence())
                            && (o1.associativity() == Associativity::Left))
                    {
                        if let Some(op) = ops.pop() {
                            emit(&mut out, op, idents)?;
                        }
                    } else {
                        break;
                    }
                }
                ops.push(ShuntOp {
                    typ: ShuntOpTyp::Operator(o1),
                    loc: tok.loc,
                });
                expect_operand = true;
            }

            TokTyp::Comma => {
                if expect_operand {
                    return Err(ParseErr {
                        typ: ParseErrTyp::MissingOperand,
                        loc: tok.loc,
                    });
                }
                unwind_group(&mut out, &mut ops, idents)?;
                match groups.last_mut() {
                    Some(Group {
                        call: Some(_),
                        commas,
                    }) => *commas += 1,
                    _ => {
                        return Err(ParseErr {
                            typ: ParseErrTyp::UnexpectedComma,
                            loc: tok.loc,
                        })
                    }
                }
                expect_operand = true;
            }

            TokTyp::OpenParen => {
                let call = match ops.last() {
                    Some(ShuntOp {
                        typ: ShuntOpTyp::Call(fun),
                        loc,
                    }) if expect_operand => Some((loc.clone(), *fun)),
                    _ => {
                        operand_here(&tok)?;
                        None
                    }
                };
                groups.push(Group { call, commas: 0 });
                ops.push(ShuntOp {
                    typ: ShuntOpTyp::OpenParen,
                    loc: tok.loc,
                });
                prev_open = true;
                expect_operand = true;
            }

            TokTyp::CloseParen => {
                let group = groups.pop().ok_or_else(|| ParseErr {
                    typ: ParseErrTyp::ParenMismatch,
                    loc: tok.loc.clone(),
                })?;
                if expect_operand && !(was_open && group.call.is_some()) {
                    return Err(ParseErr {
                        typ: ParseErrTyp::MissingOperand,
                        loc: tok.loc,
                    });
                }
                unwind_group(&mut out, &mut ops, idents)?;
                // drop the open parenthesis
                ops.pop();

                if let Some((name, fun)) = group.call {
                    let found = if was_open { 0 } else { group.commas + 1 };
                    if !fun.arity.contains(found) {
                        return Err(ParseErr {
                            typ: ParseErrTyp::Arity {
                                name: name.get().to_string(),
                                arity: fun.arity,
                                found,
                            },
                            loc: name,
                        });
                    }
                    // the call sits under its parenthesis
                    ops.pop();
                    out.push(Operation {
                        typ: OperationTyp::Call {
                            name: name.clone().into(),
                            fun,
                            argc: found,
                        },
                        loc: name,
                    });
                }
                expect_operand = false;
            }

            TokTyp::XGreater
            | TokTyp::XLess
            | TokTyp::XEqual
            | TokTyp::XPipe
            | TokTyp::XOpenSquareBracket
            | TokTyp::XCloseSquareBracket
            | TokTyp::XOpenCurly
            | TokTyp::XCloseCurly
            | TokTyp::XMember => unreachable!("unsupported token survived until parsing"),
        }
    }

    let end = match end {
        Some(end) => end,
        None => {
            return Err(ParseErr {
                typ: ParseErrTyp::Empty,
                loc: SubStr::new(Default::default(), 0, 0),
            })
        }
    };
    if expect_operand {
        return Err(ParseErr {
            typ: ParseErrTyp::MissingOperand,
            loc: end,
        });
    }

    while let Some(op) = ops.pop() {
        emit(&mut out, op, idents)?;
    }

    Ok(Program::new(out))
}
