//! Candidate expressions for non-constant weights.
//!
//! A small arithmetic language over candidate kinematics, compiled once
//! when the isolator is built and evaluated per candidate:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('-' | '+') unary | power
//! power   := primary ('^' unary)?
//! primary := NUMBER | VARIABLE ['(' ')'] | FUNCTION '(' expr (',' expr)* ')' | '(' expr ')'
//! ```
//!
//! Variables: pt, et, energy, eta, phi, mass, charge, p, px, py, pz, theta.
//! Functions: abs, sqrt, exp, log, sin, cos, tan, min, max, pow.

use std::fmt;

use thiserror::Error;

use crate::candidate::Candidate;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),

    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("function '{name}' takes {expected} argument(s), got {got}")]
    Arity {
        name: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("expression nests deeper than {0} levels")]
    TooDeep(usize),

    #[error("expression has more than {0} tokens")]
    TooLong(usize),

    #[error("evaluation failed: {0}")]
    Evaluation(String),
}

/// Limit on nested parentheses, unary signs and exponents.
const MAX_DEPTH: usize = 64;

/// Limit on expression length, which bounds chains of binary operators.
const MAX_TOKENS: usize = 1024;

// ─── Tokens ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(char),
    LParen,
    RParen,
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{n}"),
            Token::Ident(s) => write!(f, "{s}"),
            Token::Op(c) => write!(f, "{c}"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
        }
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>, ExprError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '+' | '-' | '*' | '/' | '^' => {
                tokens.push(Token::Op(c));
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // exponent: e10, e-3, E+2
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let literal: String = chars[start..i].iter().collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| ExprError::InvalidNumber(literal.clone()))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(ExprError::UnexpectedChar { ch: other, pos: i }),
        }
    }
    Ok(tokens)
}

// ─── AST ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Variable {
    Pt,
    Et,
    Energy,
    Eta,
    Phi,
    Mass,
    Charge,
    P,
    Px,
    Py,
    Pz,
    Theta,
}

impl Variable {
    fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "pt" => Variable::Pt,
            "et" => Variable::Et,
            "energy" => Variable::Energy,
            "eta" => Variable::Eta,
            "phi" => Variable::Phi,
            "mass" => Variable::Mass,
            "charge" => Variable::Charge,
            "p" => Variable::P,
            "px" => Variable::Px,
            "py" => Variable::Py,
            "pz" => Variable::Pz,
            "theta" => Variable::Theta,
            _ => return None,
        })
    }

    fn value(self, c: &Candidate) -> f64 {
        match self {
            Variable::Pt => c.pt,
            Variable::Et => c.et(),
            Variable::Energy => c.energy,
            Variable::Eta => c.eta,
            Variable::Phi => c.phi,
            Variable::Mass => c.mass,
            Variable::Charge => f64::from(c.charge),
            Variable::P => c.p(),
            Variable::Px => c.px(),
            Variable::Py => c.py(),
            Variable::Pz => c.pz(),
            Variable::Theta => c.theta(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Function {
    Abs,
    Sqrt,
    Exp,
    Log,
    Sin,
    Cos,
    Tan,
    Min,
    Max,
    Pow,
}

impl Function {
    fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "abs" => Function::Abs,
            "sqrt" => Function::Sqrt,
            "exp" => Function::Exp,
            "log" => Function::Log,
            "sin" => Function::Sin,
            "cos" => Function::Cos,
            "tan" => Function::Tan,
            "min" => Function::Min,
            "max" => Function::Max,
            "pow" => Function::Pow,
            _ => return None,
        })
    }

    fn name(self) -> &'static str {
        match self {
            Function::Abs => "abs",
            Function::Sqrt => "sqrt",
            Function::Exp => "exp",
            Function::Log => "log",
            Function::Sin => "sin",
            Function::Cos => "cos",
            Function::Tan => "tan",
            Function::Min => "min",
            Function::Max => "max",
            Function::Pow => "pow",
        }
    }

    fn arity(self) -> usize {
        match self {
            Function::Min | Function::Max | Function::Pow => 2,
            _ => 1,
        }
    }

    fn apply(self, args: &[f64]) -> f64 {
        match self {
            Function::Abs => args[0].abs(),
            Function::Sqrt => args[0].sqrt(),
            Function::Exp => args[0].exp(),
            Function::Log => args[0].ln(),
            Function::Sin => args[0].sin(),
            Function::Cos => args[0].cos(),
            Function::Tan => args[0].tan(),
            Function::Min => args[0].min(args[1]),
            Function::Max => args[0].max(args[1]),
            Function::Pow => args[0].powf(args[1]),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Number(f64),
    Var(Variable),
    Neg(Box<Node>),
    Binary(char, Box<Node>, Box<Node>),
    Call(Function, Vec<Node>),
}

impl Node {
    fn eval(&self, c: &Candidate) -> f64 {
        match self {
            Node::Number(n) => *n,
            Node::Var(v) => v.value(c),
            Node::Neg(inner) => -inner.eval(c),
            Node::Binary(op, lhs, rhs) => {
                let (a, b) = (lhs.eval(c), rhs.eval(c));
                match op {
                    '+' => a + b,
                    '-' => a - b,
                    '*' => a * b,
                    '/' => a / b,
                    _ => a.powf(b),
                }
            }
            Node::Call(func, args) => {
                let values: Vec<f64> = args.iter().map(|a| a.eval(c)).collect();
                func.apply(&values)
            }
        }
    }
}

// ─── Parser ──────────────────────────────────────────────────────────

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Token, ExprError> {
        let token = self.tokens.get(self.pos).cloned().ok_or(ExprError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, want: Token) -> Result<(), ExprError> {
        let got = self.next()?;
        if got == want {
            Ok(())
        } else {
            Err(ExprError::UnexpectedToken(got.to_string()))
        }
    }

    fn expr(&mut self) -> Result<Node, ExprError> {
        let mut node = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek() {
            let op = *op;
            self.pos += 1;
            node = Node::Binary(op, Box::new(node), Box::new(self.term()?));
        }
        Ok(node)
    }

    fn term(&mut self) -> Result<Node, ExprError> {
        let mut node = self.unary()?;
        while let Some(Token::Op(op @ ('*' | '/'))) = self.peek() {
            let op = *op;
            self.pos += 1;
            node = Node::Binary(op, Box::new(node), Box::new(self.unary()?));
        }
        Ok(node)
    }

    // Every nested construct re-enters through here.
    fn unary(&mut self) -> Result<Node, ExprError> {
        if self.depth >= MAX_DEPTH {
            return Err(ExprError::TooDeep(MAX_DEPTH));
        }
        self.depth += 1;
        let node = self.signed();
        self.depth -= 1;
        node
    }

    fn signed(&mut self) -> Result<Node, ExprError> {
        match self.peek() {
            Some(Token::Op('-')) => {
                self.pos += 1;
                Ok(Node::Neg(Box::new(self.unary()?)))
            }
            Some(Token::Op('+')) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Node, ExprError> {
        let base = self.primary()?;
        if let Some(Token::Op('^')) = self.peek() {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(Node::Binary('^', Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Node, ExprError> {
        match self.next()? {
            Token::Number(n) => Ok(Node::Number(n)),
            Token::LParen => {
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) => self.identifier(name),
            other => Err(ExprError::UnexpectedToken(other.to_string())),
        }
    }

    fn identifier(&mut self, name: String) -> Result<Node, ExprError> {
        let called = matches!(self.peek(), Some(Token::LParen));

        if let Some(var) = Variable::lookup(&name) {
            // accessor style: "pt()"
            if called {
                self.pos += 1;
                self.expect(Token::RParen)?;
            }
            return Ok(Node::Var(var));
        }

        if !called {
            return Err(ExprError::UnknownVariable(name));
        }
        let func = Function::lookup(&name).ok_or(ExprError::UnknownFunction(name))?;
        self.pos += 1;

        let mut args = vec![self.expr()?];
        while let Some(Token::Comma) = self.peek() {
            self.pos += 1;
            args.push(self.expr()?);
        }
        self.expect(Token::RParen)?;

        if args.len() != func.arity() {
            return Err(ExprError::Arity {
                name: func.name(),
                expected: func.arity(),
                got: args.len(),
            });
        }
        Ok(Node::Call(func, args))
    }
}

// ─── Public API ──────────────────────────────────────────────────────

/// A compiled candidate expression.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateExpr {
    text: String,
    root: Node,
}

impl CandidateExpr {
    pub fn compile(text: &str) -> Result<Self, ExprError> {
        let tokens = tokenize(text)?;
        if tokens.len() > MAX_TOKENS {
            return Err(ExprError::TooLong(MAX_TOKENS));
        }
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
        };
        let root = parser.expr()?;
        if let Some(extra) = parser.peek() {
            return Err(ExprError::UnexpectedToken(extra.to_string()));
        }
        Ok(Self {
            text: text.to_string(),
            root,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn eval(&self, cand: &Candidate) -> f64 {
        self.root.eval(cand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{assert_approx, DEFAULT_EPSILON};

    fn muon() -> Candidate {
        Candidate {
            pt: 20.0,
            eta: 0.5,
            phi: 1.0,
            energy: 22.5,
            mass: 0.105,
            charge: -1,
        }
    }

    fn eval(text: &str) -> f64 {
        CandidateExpr::compile(text).unwrap().eval(&muon())
    }

    #[test]
    fn arithmetic_precedence() {
        assert_approx(eval("1 + 2 * 3"), 7.0, DEFAULT_EPSILON);
        assert_approx(eval("(1 + 2) * 3"), 9.0, DEFAULT_EPSILON);
        assert_approx(eval("8 / 4 / 2"), 1.0, DEFAULT_EPSILON);
        assert_approx(eval("10 - 4 - 3"), 3.0, DEFAULT_EPSILON);
    }

    #[test]
    fn power_is_right_associative_and_binds_tighter_than_minus() {
        assert_approx(eval("2 ^ 3 ^ 2"), 512.0, DEFAULT_EPSILON);
        assert_approx(eval("-2 ^ 2"), -4.0, DEFAULT_EPSILON);
        assert_approx(eval("2 ^ -1"), 0.5, DEFAULT_EPSILON);
    }

    #[test]
    fn variables_read_candidate() {
        assert_approx(eval("pt"), 20.0, DEFAULT_EPSILON);
        assert_approx(eval("1/pt"), 0.05, DEFAULT_EPSILON);
        assert_approx(eval("pt()"), 20.0, DEFAULT_EPSILON);
        assert_approx(eval("charge * 2"), -2.0, DEFAULT_EPSILON);
        assert_approx(eval("energy - pt"), 2.5, DEFAULT_EPSILON);
    }

    #[test]
    fn functions() {
        assert_approx(eval("abs(charge)"), 1.0, DEFAULT_EPSILON);
        assert_approx(eval("sqrt(16)"), 4.0, DEFAULT_EPSILON);
        assert_approx(eval("max(pt, 30)"), 30.0, DEFAULT_EPSILON);
        assert_approx(eval("min(pt, 30)"), 20.0, DEFAULT_EPSILON);
        assert_approx(eval("pow(2, 10)"), 1024.0, DEFAULT_EPSILON);
        assert_approx(eval("log(exp(1.5))"), 1.5, DEFAULT_EPSILON);
    }

    #[test]
    fn scientific_literals() {
        assert_approx(eval("1e-3 * 1000"), 1.0, DEFAULT_EPSILON);
        assert_approx(eval("2.5E2"), 250.0, DEFAULT_EPSILON);
    }

    #[test]
    fn compile_errors() {
        assert_eq!(
            CandidateExpr::compile("ptx").unwrap_err(),
            ExprError::UnknownVariable("ptx".into())
        );
        assert_eq!(
            CandidateExpr::compile("foo(1)").unwrap_err(),
            ExprError::UnknownFunction("foo".into())
        );
        assert_eq!(
            CandidateExpr::compile("max(1)").unwrap_err(),
            ExprError::Arity {
                name: "max",
                expected: 2,
                got: 1
            }
        );
        assert_eq!(CandidateExpr::compile("1 +").unwrap_err(), ExprError::UnexpectedEnd);
        assert_eq!(
            CandidateExpr::compile("1 2").unwrap_err(),
            ExprError::UnexpectedToken("2".into())
        );
        assert!(matches!(
            CandidateExpr::compile("pt $ 2"),
            Err(ExprError::UnexpectedChar { ch: '$', .. })
        ));
        assert!(matches!(
            CandidateExpr::compile("1..2"),
            Err(ExprError::InvalidNumber(_))
        ));
    }

    #[test]
    fn nesting_is_bounded() {
        let nested = |n: usize| format!("{}pt{}", "(".repeat(n), ")".repeat(n));
        assert_approx(eval(&nested(60)), 20.0, DEFAULT_EPSILON);
        assert_eq!(
            CandidateExpr::compile(&nested(200)).unwrap_err(),
            ExprError::TooDeep(MAX_DEPTH)
        );
        assert_eq!(
            CandidateExpr::compile(&format!("{}1", "-".repeat(100))).unwrap_err(),
            ExprError::TooDeep(MAX_DEPTH)
        );
        assert_eq!(
            CandidateExpr::compile(&format!("{}2", "2^".repeat(100))).unwrap_err(),
            ExprError::TooDeep(MAX_DEPTH)
        );
    }

    #[test]
    fn length_is_bounded() {
        assert_approx(eval(&format!("{}1", "1+".repeat(400))), 401.0, DEFAULT_EPSILON);
        assert_eq!(
            CandidateExpr::compile(&format!("{}1", "1+".repeat(600))).unwrap_err(),
            ExprError::TooLong(MAX_TOKENS)
        );
        // far past any stack limit: still an error, not an abort
        let huge = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        assert_eq!(
            CandidateExpr::compile(&huge).unwrap_err(),
            ExprError::TooLong(MAX_TOKENS)
        );
    }

    #[test]
    fn text_is_preserved() {
        let e = CandidateExpr::compile("0.5*pt").unwrap();
        assert_eq!(e.text(), "0.5*pt");
    }
}
