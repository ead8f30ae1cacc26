//! `Dhara` Core: document values, resource paths, query/sort/page state,
//! and the request-generation guard shared by every list view.

pub mod columns;
pub mod guard;
pub mod intent;
pub mod names;
pub mod page;
pub mod path;
pub mod preview;
pub mod query;
pub mod types;
pub mod view;

pub use columns::order_columns;
pub use guard::{InFlight, InFlightGuard, RequestGeneration, Ticket};
pub use intent::{MutationIntent, MutationState};
pub use page::{PageError, PageState, ResultSet};
pub use path::{PathError, ResourcePath};
pub use preview::{PreviewPolicy, PreviewRejection};
pub use query::{Filter, FilterPolicy, QuerySpec, SortDirection, SortSpec, ValidationError};
pub use types::{Document, Value, ID_FIELD};
pub use view::{CommandError, QuerySnapshot, ViewCommand, ViewQuery};
