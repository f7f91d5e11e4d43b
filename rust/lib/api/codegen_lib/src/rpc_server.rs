//! Server artifacts: the server interface and the dispatching marshaler.
//!
//! The sync and async variants come out of the same routine; a [`Flavor`]
//! supplies the few lexical markers that differ.

use crate::code_writer::CodeWriter;
use crate::context::{GenContext, Owner, Slot};
use crate::dav::{check_stmts, rule_expr, DavResolver};
use crate::error::Result;
use crate::ident::{unraw, IdentClass};
use crate::rpc::{calls, CallModel, RETURN_TAG, RETURN_VAR, RPC_R, RPC_W};
use crate::{Codegen, GeneratedCode};

/// Markers separating the sync and async server variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flavor {
    /// Prefix of every handler and interface method.
    pub async_kw: &'static str,
    /// Suffix of every call into the implementation.
    pub await_sfx: &'static str,
    /// Appended to the project name and to the runtime marshaler trait.
    pub class_suffix: &'static str,
}

impl Flavor {
    pub const SYNC: Flavor = Flavor {
        async_kw: "",
        await_sfx: "",
        class_suffix: "",
    };

    pub const ASYNC: Flavor = Flavor {
        async_kw: "async ",
        await_sfx: ".await",
        class_suffix: "Async",
    };
}

pub struct ServerGenerator {
    flavor: Flavor,
}

impl ServerGenerator {
    pub fn new(flavor: Flavor) -> Self {
        Self { flavor }
    }

    fn emit_interface(
        &self,
        ctx: &GenContext<'_>,
        name: &str,
        models: &[CallModel<'_>],
    ) -> Result<String> {
        let mut w = CodeWriter::new();
        w.doc(&format!(
            "Server side of the `{}` calls, implemented by the application.",
            ctx.project.name
        ))?;
        w.line("#[allow(async_fn_in_trait)]")?;
        w.block(&format!("pub trait {name}: ServerInterface"), |w| {
            for (i, m) in models.iter().enumerate() {
                if i > 0 {
                    w.blank_line()?;
                }
                if let Some(descr) = &m.call.descr {
                    w.doc(descr)?;
                }
                writeln!(w, "{}{};", self.flavor.async_kw, m.signature(ctx)?)?;
            }
            Ok(())
        })?;
        Ok(w.finish())
    }

    fn emit_handler(&self, ctx: &GenContext<'_>, w: &mut CodeWriter, m: &CallModel<'_>) -> Result<()> {
        let rt = ctx.rt();
        let call = m.call;
        let label = unraw(&m.method);
        let header = format!(
            "{}fn {}(&mut self, _input: &Stream, _ctx: &mut dyn ServerContext) -> Result<Stream, RpcError>",
            self.flavor.async_kw,
            m.handler()
        );
        w.block(&header, |w| {
            writeln!(w, "{rt}::tracing::debug!(\"[{label} - Start]\");")?;

            // inputs, mirroring the client's write order
            if m.has_input() {
                let tag = m.in_tag();
                w.line("let mut _r = _input.reader();")?;
                writeln!(w, "_r.read_start(\"{tag}\")?;")?;
                for p in m.inputs() {
                    let slot = if p.io.is_output() {
                        Slot::LocalMut(&p.ident)
                    } else {
                        Slot::Local(&p.ident)
                    };
                    for stmt in ctx.read_stmts(RPC_R, p.tag, slot, p.wire, &p.context)? {
                        w.line(&stmt)?;
                    }
                }
                writeln!(w, "_r.read_end(\"{tag}\")?;")?;
            }
            for p in m.outputs().filter(|p| !p.io.is_input()) {
                writeln!(w, "let mut {} = {};", p.ident, ctx.default_expr(p.wire, &p.context)?)?;
            }

            // authorization
            match &call.auth {
                Some(requirement) => {
                    let args: Vec<String> = m
                        .inputs()
                        .map(|p| format!("(\"{}\", &{} as &dyn fmt::Debug)", p.tag, p.ident))
                        .collect();
                    writeln!(
                        w,
                        "let _tok = _ctx.auth(\"{}\", {requirement:?}, &[{}])?;",
                        call.name,
                        args.join(", ")
                    )?;
                    w.line("self.server_impl.set_rpc_token(Some(_tok));")?;
                }
                None => w.line("self.server_impl.set_rpc_token(None);")?,
            }

            // input validation
            let resolver = DavResolver::new(ctx.project);
            let owner = Owner::Call(&call.name);
            let mut adds = Vec::new();
            let mut checks = Vec::new();
            for p in m.inputs() {
                let dav = resolver.resolve(owner, p.field)?;
                if dav.is_cleared() {
                    continue;
                }
                let target = unraw(&p.ident);
                for r in &dav.rules {
                    adds.push(format!("_dvc.add_rule(\"{target}\", {});", rule_expr(r)));
                }
                checks.extend(check_stmts(ctx, "_dvc", &p.ident, target, p.field, dav, &p.context)?);
            }
            if !checks.is_empty() {
                w.line("let mut _dvc = DavCache::new();")?;
                writeln!(w, "self.server_impl.init_dav_cache({:?}, &mut _dvc);", call.name)?;
                for line in adds.iter().chain(&checks) {
                    w.line(line)?;
                }
            }

            // implementation
            let invoke = format!(
                "self.server_impl.{}({}){}?;",
                m.method,
                m.call_args(ctx)?,
                self.flavor.await_sfx
            );
            if m.returns.is_some() {
                writeln!(w, "let {RETURN_VAR} = {invoke}")?;
            } else {
                w.line(&invoke)?;
            }

            // outputs, mirroring the client's read order
            if m.has_output() {
                let tag = m.out_tag();
                w.line("let mut _o = Stream::new();")?;
                w.block("", |w| {
                    w.line("let mut _w = _o.writer();")?;
                    writeln!(w, "_w.write_start(\"{tag}\")?;")?;
                    if let Some(ret) = &m.returns {
                        w.line(&ctx.write_stmt(RPC_W, RETURN_TAG, Slot::Local(RETURN_VAR), ret.wire, &ret.context)?)?;
                    }
                    for p in m.outputs() {
                        w.line(&ctx.write_stmt(RPC_W, p.tag, Slot::Local(&p.ident), p.wire, &p.context)?)?;
                    }
                    writeln!(w, "_w.write_end(\"{tag}\")?;")?;
                    Ok(())
                })?;
            } else {
                w.line("let _o = Stream::new();")?;
            }
            writeln!(w, "{rt}::tracing::debug!(\"[{label} - Done]\");")?;
            w.line("Ok(_o)")?;
            Ok(())
        })
    }

    fn emit_marshaler(
        &self,
        ctx: &GenContext<'_>,
        name: &str,
        interface: &str,
        models: &[CallModel<'_>],
    ) -> Result<String> {
        let f = self.flavor;
        let mut w = CodeWriter::new();
        w.doc(&format!(
            "Dispatches request streams by signature to a [`{interface}`] implementation."
        ))?;
        w.block(&format!("pub struct {name}<S: {interface}>"), |w| {
            w.line("server_impl: S,")?;
            Ok(())
        })?;
        w.blank_line()?;

        w.block(&format!("impl<S: {interface}> {name}<S>"), |w| {
            w.block("pub fn new(server_impl: S) -> Self", |w| {
                w.line("Self { server_impl }")?;
                Ok(())
            })?;
            w.blank_line()?;
            w.block("pub fn server_impl(&self) -> &S", |w| {
                w.line("&self.server_impl")?;
                Ok(())
            })?;
            w.blank_line()?;
            w.block("pub fn server_impl_mut(&mut self) -> &mut S", |w| {
                w.line("&mut self.server_impl")?;
                Ok(())
            })?;
            w.blank_line()?;
            w.block("pub fn into_inner(self) -> S", |w| {
                w.line("self.server_impl")?;
                Ok(())
            })?;
            for m in models {
                w.blank_line()?;
                self.emit_handler(ctx, w, m)?;
            }
            Ok(())
        })?;
        w.blank_line()?;

        let rt = ctx.rt();
        w.block(
            &format!("impl<S: {interface}> ServerMarshaler{} for {name}<S>", f.class_suffix),
            |w| {
                w.block(
                    &format!(
                        "{}fn serve(&mut self, remote_sig: &str, input: &Stream, ctx: &mut dyn ServerContext) -> Result<Reply, RpcError>",
                        f.async_kw
                    ),
                    |w| {
                        w.line("let result = match remote_sig {")?;
                        {
                            let _indent = w.indent();
                            for m in models {
                                writeln!(
                                    w,
                                    "{:?} => self.{}(input, ctx){},",
                                    m.call.signature,
                                    m.handler(),
                                    f.await_sfx
                                )?;
                            }
                            w.line("_ => Err(RpcError::UnknownSignature(remote_sig.to_string())),")?;
                        }
                        w.line("};")?;
                        w.block("match result", |w| {
                            w.line("Ok(stream) => Ok(Reply::ok(stream)),")?;
                            w.line("Err(err) if err.is_terminal() => Err(err),")?;
                            w.block("Err(err) =>", |w| {
                                writeln!(
                                    w,
                                    "{rt}::tracing::warn!(client = %ctx.client_address(), \"[{{remote_sig}}] failed: {{err}}\");"
                                )?;
                                w.line("Ok(Reply::error(&err))")?;
                                Ok(())
                            })
                        })
                    },
                )
            },
        )?;
        Ok(w.finish())
    }
}

impl Codegen for ServerGenerator {
    fn generate(&self, ctx: &GenContext<'_>) -> Result<GeneratedCode> {
        let raw = format!("{}{}", ctx.project.name, self.flavor.class_suffix);
        let models = calls(ctx)?;

        let interface = ctx.ident(IdentClass::ServerInterface, &raw);
        let marshaler = ctx.ident(IdentClass::ServerMarshaler, &raw);

        let mut code = GeneratedCode::default();
        code.files
            .push(ctx.unit(&interface, &self.emit_interface(ctx, &interface, &models)?));
        code.files.push(ctx.unit(
            &marshaler,
            &self.emit_marshaler(ctx, &marshaler, &interface, &models)?,
        ));

        tracing::debug!("server artifacts {} / {} ({} calls)", interface, marshaler, models.len());
        Ok(code)
    }

    fn name(&self) -> &str {
        if self.flavor == Flavor::ASYNC {
            "rpc-server-async"
        } else {
            "rpc-server"
        }
    }
}
