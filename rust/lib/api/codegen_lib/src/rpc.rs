//! Call model shared by the client and server emitters.

use stubgen_ir::{Call, Field, IoKind};

use crate::context::{GenContext, Owner, StreamVar, Wire};
use crate::error::{GenError, Result};
use crate::ident::unraw;

/// Tag of the return value on the wire, in both directions.
pub(crate) const RETURN_TAG: &str = "returns";
/// Local holding the return value in generated code.
pub(crate) const RETURN_VAR: &str = "_ret";

pub(crate) const RPC_W: StreamVar<'static> = StreamVar {
    call: "_w",
    pass: "&mut _w",
};
pub(crate) const RPC_R: StreamVar<'static> = StreamVar {
    call: "_r",
    pass: "&mut _r",
};

pub(crate) struct Param<'c> {
    pub ident: String,
    pub tag: &'c str,
    pub io: IoKind,
    pub wire: Wire<'c>,
    pub context: String,
    pub field: &'c Field,
}

pub(crate) struct Returns<'c> {
    pub wire: Wire<'c>,
    pub ty: String,
    pub context: String,
}

pub(crate) struct CallModel<'c> {
    pub call: &'c Call,
    pub method: String,
    pub params: Vec<Param<'c>>,
    pub returns: Option<Returns<'c>>,
}

impl<'c> CallModel<'c> {
    pub fn new(ctx: &GenContext<'_>, call: &'c Call) -> Result<Self> {
        let owner = Owner::Call(&call.name);
        let params = call
            .fields
            .iter()
            .map(|field| {
                let context = owner.field(&field.name);
                let io = field.io.ok_or_else(|| GenError::InvalidModel {
                    context: context.clone(),
                    reason: "call field without io".to_string(),
                })?;
                Ok(Param {
                    ident: ctx.member(&field.name),
                    tag: &field.name,
                    io,
                    wire: Wire::of(field),
                    context,
                    field,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let returns = match &call.returns {
            Some(ret) => {
                let context = format!("{owner}, returns");
                let wire = Wire::of_return(ret);
                Some(Returns {
                    wire,
                    ty: ctx.rust_type(wire, &context)?,
                    context,
                })
            }
            None => None,
        };

        Ok(Self {
            call,
            method: ctx.method(&call.name),
            params,
            returns,
        })
    }

    /// Name of the marshaler method handling this call.
    pub fn handler(&self) -> String {
        format!("handle_{}", unraw(&self.method))
    }

    pub fn in_tag(&self) -> String {
        format!("{}_IN", self.call.name)
    }

    pub fn out_tag(&self) -> String {
        format!("{}_OUT", self.call.name)
    }

    pub fn has_input(&self) -> bool {
        self.call.has_input()
    }

    pub fn has_output(&self) -> bool {
        self.call.has_output()
    }

    pub fn inputs(&self) -> impl Iterator<Item = &Param<'c>> {
        self.params.iter().filter(|p| p.io.is_input())
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Param<'c>> {
        self.params.iter().filter(|p| p.io.is_output())
    }

    /// `fn name(&mut self, ..) -> Result<R, RpcError>`, without `async`.
    pub fn signature(&self, ctx: &GenContext<'_>) -> Result<String> {
        let mut args = vec!["&mut self".to_string()];
        for p in &self.params {
            args.push(format!(
                "{}: {}",
                p.ident,
                ctx.param_type(p.wire, p.io, &p.context)?
            ));
        }
        let ret = self.returns.as_ref().map_or("()", |r| r.ty.as_str());
        Ok(format!(
            "fn {}({}) -> Result<{ret}, RpcError>",
            self.method,
            args.join(", ")
        ))
    }

    /// Arguments handing locals of the same names to an implementation.
    pub fn call_args(&self, ctx: &GenContext<'_>) -> Result<String> {
        let args = self
            .params
            .iter()
            .map(|p| ctx.call_arg(p.wire, p.io, &p.ident, &p.context))
            .collect::<Result<Vec<_>>>()?;
        Ok(args.join(", "))
    }
}

pub(crate) fn calls<'c>(ctx: &GenContext<'c>) -> Result<Vec<CallModel<'c>>> {
    ctx.project
        .calls
        .iter()
        .map(|call| CallModel::new(ctx, call))
        .collect()
}
