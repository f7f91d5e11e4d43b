//! Runtime support for code produced by `stubgen`.
//!
//! Generated modules start with `use stubgen_runtime::prelude::*;` and rely
//! on nothing else from this crate.

pub mod dav;
pub mod error;
pub mod rpc;
pub mod stream;

pub use error::{error_code, RpcError};

/// Re-exported so generated handlers can log without their own dependency.
pub use tracing;

pub mod prelude {
    pub use std::fmt;

    pub use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
    pub use uuid::Uuid;

    pub use crate::dav::{
        Dav, DavCache, DavCheck, DavError, DavKind, DavMode, DavValue, Validate,
    };
    pub use crate::error::RpcError;
    pub use crate::rpc::{
        AuthToken, ClientTransport, Reply, ServerContext, ServerInterface, ServerMarshaler,
        ServerMarshalerAsync,
    };
    pub use crate::stream::{Reader, Serializable, Stream, StreamError, Writer};
}
