//! Contracts between generated marshalers, transports and server
//! implementations.

use std::fmt;

use crate::dav::DavCache;
use crate::error::{error_code, RpcError};
use crate::stream::Stream;

/// Authorization context produced by the auth hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken(pub String);

/// Input fields of a call, as handed to the auth hook.
pub type AuthArgs<'a> = [(&'a str, &'a dyn fmt::Debug)];

/// Outcome of one dispatched call.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub stream: Stream,
    pub code: i32,
    pub message: Option<String>,
}

impl Reply {
    pub fn ok(stream: Stream) -> Self {
        Self {
            stream,
            code: error_code::OK,
            message: None,
        }
    }

    pub fn error(err: &RpcError) -> Self {
        Self {
            stream: Stream::new(),
            code: err.error_code(),
            message: Some(err.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == error_code::OK
    }

    /// The response stream, or the error the server reported.
    pub fn into_result(self) -> Result<Stream, RpcError> {
        if self.is_ok() {
            Ok(self.stream)
        } else {
            Err(RpcError::Remote {
                code: self.code,
                message: self.message.unwrap_or_default(),
            })
        }
    }
}

/// Carries request streams to a server and brings responses back.
pub trait ClientTransport {
    fn send(&mut self, signature: &str, request: Stream) -> Result<(), RpcError>;
    fn receive(&mut self, signature: &str) -> Result<Stream, RpcError>;
}

/// Per-connection services available to a server marshaler.
pub trait ServerContext {
    /// Authorizes `call` against `requirement`.
    fn auth(
        &mut self,
        call: &str,
        requirement: &str,
        args: &AuthArgs<'_>,
    ) -> Result<AuthToken, RpcError>;

    fn client_address(&self) -> String {
        "local".to_string()
    }
}

/// Hooks every generated server interface inherits.
pub trait ServerInterface {
    /// Receives the token of the call about to run, or `None` for calls
    /// without an auth requirement.
    fn set_rpc_token(&mut self, token: Option<AuthToken>);

    /// Adds rules for the primitive inputs of `call` before the declared
    /// ones are registered.
    fn init_dav_cache(&mut self, _call: &str, _dvc: &mut DavCache) {}
}

pub trait ServerMarshaler {
    fn serve(
        &mut self,
        remote_sig: &str,
        input: &Stream,
        ctx: &mut dyn ServerContext,
    ) -> Result<Reply, RpcError>;
}

#[allow(async_fn_in_trait)]
pub trait ServerMarshalerAsync {
    async fn serve(
        &mut self,
        remote_sig: &str,
        input: &Stream,
        ctx: &mut dyn ServerContext,
    ) -> Result<Reply, RpcError>;
}

/// In-process transport: each request is served immediately by a server
/// marshaler and its reply is held for the matching `receive`.
pub struct Loopback<M, C> {
    marshaler: M,
    ctx: C,
    pending: Option<(String, Reply)>,
}

impl<M: ServerMarshaler, C: ServerContext> Loopback<M, C> {
    pub fn new(marshaler: M, ctx: C) -> Self {
        Self {
            marshaler,
            ctx,
            pending: None,
        }
    }

    pub fn marshaler(&self) -> &M {
        &self.marshaler
    }

    pub fn into_inner(self) -> (M, C) {
        (self.marshaler, self.ctx)
    }
}

impl<M: ServerMarshaler, C: ServerContext> ClientTransport for Loopback<M, C> {
    fn send(&mut self, signature: &str, request: Stream) -> Result<(), RpcError> {
        let reply = self.marshaler.serve(signature, &request, &mut self.ctx)?;
        self.pending = Some((signature.to_string(), reply));
        Ok(())
    }

    fn receive(&mut self, signature: &str) -> Result<Stream, RpcError> {
        match self.pending.take() {
            Some((sig, reply)) if sig == signature => reply.into_result(),
            Some((sig, _)) => Err(RpcError::Transport(format!(
                "reply for [{sig}] while waiting for [{signature}]"
            ))),
            None => Err(RpcError::Transport(format!(
                "no reply pending for [{signature}]"
            ))),
        }
    }
}
