pub mod allow_list;
pub mod error;
pub mod object;

pub use allow_list::TagAllowList;
pub use error::{DeletionFailure, Result, StoreError, StoreResult, SweepError};
pub use object::{MODEL_URI_PREFIX, ObjectId, RelationKind, RepositoryObject, model_name, model_uri};
