//! Surface syntax of a single program line.
//!
//! The parser produces one [`Statement`] per numbered line. Nothing here
//! is checked beyond what the grammar enforces; the validator decides
//! whether names, literals and targets make sense.

/// Expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal, kept as the raw source text.
    Number(String),
    /// String literal without the surrounding quotes.
    Str(String),
    /// Scalar variable reference (`A`, `N1`, `NAME$`).
    Var(String),
    /// `NAME(args)`: either an array element or a builtin call.
    ///
    /// Which one it is depends on the names declared in the program, so
    /// the distinction is made by the validator and the interpreter.
    Index { name: String, args: Vec<Expr> },
    /// Call of a user-defined function (`FNA(X)`).
    FnCall { name: String, args: Vec<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "MOD",
            BinaryOp::Pow => "^",
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

/// One element of a `PRINT` list.
#[derive(Debug, Clone, PartialEq)]
pub enum PrintItem {
    Expr(Expr),
    /// `;` joins items without spacing.
    Semicolon,
    /// `,` advances to the next print zone.
    Comma,
}

/// One `NAME(bound, ...)` entry of a `DIM` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayDecl {
    pub name: String,
    pub bounds: Vec<Expr>,
}

/// A literal item of a `DATA` statement.
#[derive(Debug, Clone, PartialEq)]
pub enum DataItem {
    /// Raw numeric text, sign included.
    Number(String),
    Str(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Rem,
    Let {
        target: Expr,
        value: Expr,
    },
    Print(Vec<PrintItem>),
    Dim(Vec<ArrayDecl>),
    If {
        condition: Expr,
        then: Box<Statement>,
    },
    Goto(u32),
    Gosub(u32),
    Return,
    End,
    Stop,
    While(Expr),
    Wend,
    For {
        target: Expr,
        from: Expr,
        to: Expr,
        step: Option<Expr>,
    },
    Next(Option<String>),
    Read(Vec<Expr>),
    Data(Vec<DataItem>),
    Restore,
    DefFn {
        name: String,
        params: Vec<String>,
        body: Expr,
    },
}

impl Statement {
    /// Keyword used when a statement has to be named in a message.
    pub fn keyword(&self) -> &'static str {
        match self {
            Statement::Rem => "REM",
            Statement::Let { .. } => "LET",
            Statement::Print(_) => "PRINT",
            Statement::Dim(_) => "DIM",
            Statement::If { .. } => "IF",
            Statement::Goto(_) => "GOTO",
            Statement::Gosub(_) => "GOSUB",
            Statement::Return => "RETURN",
            Statement::End => "END",
            Statement::Stop => "STOP",
            Statement::While(_) => "WHILE",
            Statement::Wend => "WEND",
            Statement::For { .. } => "FOR",
            Statement::Next(_) => "NEXT",
            Statement::Read(_) => "READ",
            Statement::Data(_) => "DATA",
            Statement::Restore => "RESTORE",
            Statement::DefFn { .. } => "DEF",
        }
    }
}
