pub mod commands;
pub mod queries;
pub mod routes;
pub mod types;

pub use commands::{
    CreateProductCommand, CreateProductError, DeleteAllProductsCommand, DeleteProductCommand,
    DeleteProductError, UpdateProductCommand, UpdateProductError,
};
pub use queries::{ListProductsError, ListProductsQuery, ListProductsResponse};
pub use routes::products_routes;
pub use types::{Product, ProductPatch};
