pub mod dispatcher;
pub mod etl;
pub mod pipeline;
pub mod resolver;

pub use crate::domain::model::{RawRow, RecipientSet};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
