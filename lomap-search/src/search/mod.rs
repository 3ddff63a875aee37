//! Map product search: query interpretation, filtering and session state

pub mod criteria;
pub mod filter;
pub mod interpreter;
pub mod session;

pub use criteria::{FilterCriteria, ALL_CATEGORIES};
pub use filter::filter_products;
pub use interpreter::{
    DisabledParser, Interpretation, InterpretationSource, ParseError, ParsedQuery, QueryInterpreter,
    QueryParser,
};
pub use session::{
    SearchSession, SearchTicket, SessionRegistry, SessionSnapshot, DEFAULT_SESSION_ID,
    MAX_SESSION_ID_LEN,
};
