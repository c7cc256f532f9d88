pub mod collection;
pub mod credential;
pub mod request;

pub use collection::{Collection, ItemKind};
pub use credential::StoredCredentials;
pub use request::{
    AuthType, BasicCredential, BearerCredential, BodyMode, BodyOptions, GraphqlBody, KeyValue,
    RawLanguage, RawOptions, Request, RequestAuth, RequestBody, RequestSpec,
};
