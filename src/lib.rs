pub mod config;
pub mod expression;
pub mod filter_builder;
pub mod item;
pub mod lexer;
pub mod parser;
pub mod request;
pub mod search_state;
pub mod sql_compiler;
pub mod status_filter;
pub mod token;

pub use config::{ConfigError, SearchConfig};
pub use expression::{join, Expression, FilterExpression};
pub use filter_builder::{build_filter, BuildError, FilterBuilder};
pub use item::{
    create_attribute, create_group, create_mapping_criteria, create_operator, create_state,
    AttributeFilter, ItemNode, LogicalOp, MappingCriteria, StateFilter, StateOperator,
};
pub use parser::{parse_filter, ParseError};
pub use request::{QueryDescriptor, QueryType, SearchRequest};
pub use search_state::{AdvancedSearch, FilterList};
pub use sql_compiler::{CompileError, SqlCompiler};
pub use status_filter::{StateRegistry, StatusFilterBuilder};
