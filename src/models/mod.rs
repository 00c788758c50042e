pub mod evaluation;
pub mod product;

pub use evaluation::{EvaluationBatch, EvaluationResult};
pub use product::Product;
