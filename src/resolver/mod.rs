// Tue Feb 17 2026 - Alex

pub mod error;
pub mod expression;
pub mod lexer;
pub mod variables;

pub use error::ExpressionError;
pub use expression::{resolve, AddressExpression, Expression};
pub use variables::Variables;
