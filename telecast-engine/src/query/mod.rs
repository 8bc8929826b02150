//! Query planner / evaluator (§4.F): the AST, the three-variant result
//! type, the pairwise combine tables, face-tag resolution, and the
//! recursive evaluator tying them together.

mod ast;
mod combine;
mod eval;
mod facetag;
mod resultset;

pub use ast::{parse_query, QueryNode};
pub use eval::{eval, EvalEnv};
pub use resultset::{to_lazy_iset, SearchResult};
