pub mod buffered;
pub mod error;
pub mod merged;
pub mod page;
pub mod paginator;

pub use buffered::{paginate, BufferedPaginator, Endpoint, EndpointFetcher, PageFetcher, UniversalPaginator};
pub use error::PaginatorError;
pub use merged::{merge_sorted, MergedPaginator};
pub use page::{params, Page, PageParams, ParamValue};
pub use paginator::{flatten, BoxPaginator, IterPaginator, Paginator};
