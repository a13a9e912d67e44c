pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod models;
pub mod registry;
pub mod services;

pub use client::{Paged, ServiceClient, ServiceConfig, ServiceDeclaration};
pub use config::{load_config, token_from_env, AtuykaConfig};
pub use endpoint::{MethodSignature, ParamSignature, ParamType, ServiceMethod, ServiceMethodParameter};
pub use error::{AtuykaError, Result};
pub use models::{
    Attachment, AttachmentUrl, Comment, Connection, Mention, Page, PageParams, ParamValue, Post,
    Resource, ServiceInfo, Tag, User,
};
pub use registry::{Plugin, ServiceDescriptor, ServiceRegistry, KNOWN_SERVICES};
